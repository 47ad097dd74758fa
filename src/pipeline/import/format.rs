use crate::models::MediaType;

const MAX_FILENAME_CHARS: usize = 255;

/// Strip any path components and NULs from an uploaded filename.
pub fn sanitize_filename(original: &str) -> String {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let clean: String = name
        .chars()
        .filter(|c| *c != '\0' && !c.is_control())
        .take(MAX_FILENAME_CHARS)
        .collect();
    let clean = clean.trim();

    if clean.is_empty() || clean == "." || clean == ".." {
        "document".to_string()
    } else {
        clean.to_string()
    }
}

/// Identify an accepted media type from magic bytes.
pub fn sniff_media_type(bytes: &[u8]) -> Option<MediaType> {
    match bytes {
        [0x25, 0x50, 0x44, 0x46, ..] => Some(MediaType::Pdf),
        [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(MediaType::Png),
        [0xFF, 0xD8, 0xFF, ..] => Some(MediaType::Jpeg),
        _ => None,
    }
}

/// Best-effort media type for an upload that carried no usable content type.
pub fn guess_media_type(filename: &str, bytes: &[u8]) -> Option<MediaType> {
    mime_guess::from_path(filename)
        .iter()
        .find_map(|mime| MediaType::parse_declared(mime.essence_str()))
        .or_else(|| sniff_media_type(bytes))
}
