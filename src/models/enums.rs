use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Complexity {
    Simple => "simple",
    Average => "average",
    Complex => "complex",
});

str_enum!(IntakeStatus {
    Open => "open",
    Done => "done",
});

str_enum!(DocKind {
    T4 => "T4",
    Receipt => "receipt",
    Id => "id",
    Unknown => "unknown",
});

str_enum!(ChecklistKind {
    T4 => "T4",
    Receipt => "receipt",
    Id => "id",
});

str_enum!(ChecklistStatus {
    Missing => "missing",
    Received => "received",
});

str_enum!(MediaType {
    Pdf => "application/pdf",
    Png => "image/png",
    Jpeg => "image/jpeg",
});

impl DocKind {
    pub fn is_classified(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// The checklist slot this kind can satisfy, if any.
    pub fn checklist_kind(&self) -> Option<ChecklistKind> {
        match self {
            Self::T4 => Some(ChecklistKind::T4),
            Self::Receipt => Some(ChecklistKind::Receipt),
            Self::Id => Some(ChecklistKind::Id),
            Self::Unknown => None,
        }
    }
}

impl From<ChecklistKind> for DocKind {
    fn from(kind: ChecklistKind) -> Self {
        match kind {
            ChecklistKind::T4 => Self::T4,
            ChecklistKind::Receipt => Self::Receipt,
            ChecklistKind::Id => Self::Id,
        }
    }
}

impl ChecklistStatus {
    /// `received` iff the expected quantity has been reached.
    pub fn derive(quantity_received: u32, quantity_expected: u32) -> Self {
        if quantity_received >= quantity_expected {
            Self::Received
        } else {
            Self::Missing
        }
    }
}

impl MediaType {
    /// Parse a declared content type as sent by an uploader.
    ///
    /// Case-insensitive, ignores parameters (`; charset=...`) and accepts
    /// the non-standard `image/jpg` alias.
    pub fn parse_declared(declared: &str) -> Option<Self> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn doc_kind_round_trip() {
        for (variant, s) in [
            (DocKind::T4, "T4"),
            (DocKind::Receipt, "receipt"),
            (DocKind::Id, "id"),
            (DocKind::Unknown, "unknown"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(DocKind::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn complexity_round_trip() {
        for (variant, s) in [
            (Complexity::Simple, "simple"),
            (Complexity::Average, "average"),
            (Complexity::Complex, "complex"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Complexity::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        assert_eq!(serde_json::to_string(&DocKind::T4).unwrap(), "\"T4\"");
        assert_eq!(serde_json::to_string(&DocKind::Receipt).unwrap(), "\"receipt\"");
        let c: Complexity = serde_json::from_str("\"average\"").unwrap();
        assert_eq!(c, Complexity::Average);
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(DocKind::from_str("t4").is_err());
        assert!(IntakeStatus::from_str("closed").is_err());
        assert!(ChecklistKind::from_str("unknown").is_err());
    }

    #[test]
    fn unknown_has_no_checklist_slot() {
        assert_eq!(DocKind::Unknown.checklist_kind(), None);
        assert_eq!(DocKind::Receipt.checklist_kind(), Some(ChecklistKind::Receipt));
        assert_eq!(DocKind::from(ChecklistKind::Id), DocKind::Id);
    }

    #[test]
    fn checklist_status_derivation() {
        assert_eq!(ChecklistStatus::derive(0, 1), ChecklistStatus::Missing);
        assert_eq!(ChecklistStatus::derive(1, 2), ChecklistStatus::Missing);
        assert_eq!(ChecklistStatus::derive(2, 2), ChecklistStatus::Received);
    }

    #[test]
    fn declared_media_types() {
        assert_eq!(MediaType::parse_declared("application/pdf"), Some(MediaType::Pdf));
        assert_eq!(MediaType::parse_declared("IMAGE/PNG"), Some(MediaType::Png));
        assert_eq!(MediaType::parse_declared("image/jpg"), Some(MediaType::Jpeg));
        assert_eq!(
            MediaType::parse_declared("image/jpeg; charset=binary"),
            Some(MediaType::Jpeg)
        );
        assert_eq!(MediaType::parse_declared("image/tiff"), None);
        assert_eq!(MediaType::parse_declared(""), None);
    }
}
