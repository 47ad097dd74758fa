use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "TaxIntake";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// 10 MiB per uploaded document.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_COLLABORATOR_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_VISION_MODEL: &str = "qwen2.5vl:7b";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "taxintake=info,tower_http=info"
}

/// Get the application data directory
/// ~/TaxIntake/ on all platforms; falls back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub home: PathBuf,
    pub db_path: PathBuf,
    pub bucket_dir: PathBuf,
    pub bind: SocketAddr,
    pub max_upload_bytes: u64,
    pub collaborator_timeout_secs: u64,
    pub ollama_host: String,
    pub vision_model: String,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset or blank keys take
    /// the default; malformed values are logged and replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let home = get("TAXINTAKE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);
        let db_path = get("TAXINTAKE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("intake.db"));
        let bucket_dir = get("TAXINTAKE_BUCKET_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("bucket"));

        let default_bind: SocketAddr = ([127, 0, 0, 1], 8080).into();
        let bind = parse_or_default("TAXINTAKE_BIND", get("TAXINTAKE_BIND"), default_bind, |_| true);
        let max_upload_bytes = parse_or_default(
            "TAXINTAKE_MAX_UPLOAD_BYTES",
            get("TAXINTAKE_MAX_UPLOAD_BYTES"),
            DEFAULT_MAX_UPLOAD_BYTES,
            |v| *v > 0,
        );
        let collaborator_timeout_secs = parse_or_default(
            "TAXINTAKE_COLLABORATOR_TIMEOUT_SECS",
            get("TAXINTAKE_COLLABORATOR_TIMEOUT_SECS"),
            DEFAULT_COLLABORATOR_TIMEOUT_SECS,
            |v| *v > 0,
        );

        Self {
            home,
            db_path,
            bucket_dir,
            bind,
            max_upload_bytes,
            collaborator_timeout_secs,
            ollama_host: get("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            vision_model: get("TAXINTAKE_VISION_MODEL")
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
        }
    }
}

fn parse_or_default<T>(key: &str, raw: Option<String>, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            tracing::warn!(key, value = %raw, default = %default, "Ignoring invalid configuration value");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert!(config.home.ends_with("TaxIntake"));
        assert_eq!(config.db_path, config.home.join("intake.db"));
        assert_eq!(config.bucket_dir, config.home.join("bucket"));
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.collaborator_timeout_secs, 120);
        assert_eq!(config.ollama_host, DEFAULT_OLLAMA_HOST);
        assert_eq!(config.vision_model, DEFAULT_VISION_MODEL);
    }

    #[test]
    fn home_drives_derived_paths() {
        let config = config_from(&[("TAXINTAKE_HOME", "/srv/intake")]);
        assert_eq!(config.db_path, PathBuf::from("/srv/intake/intake.db"));
        assert_eq!(config.bucket_dir, PathBuf::from("/srv/intake/bucket"));
    }

    #[test]
    fn explicit_paths_override_home() {
        let config = config_from(&[
            ("TAXINTAKE_HOME", "/srv/intake"),
            ("TAXINTAKE_DB_PATH", "/var/db/tax.db"),
            ("TAXINTAKE_BUCKET_DIR", "/mnt/bucket"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/var/db/tax.db"));
        assert_eq!(config.bucket_dir, PathBuf::from("/mnt/bucket"));
    }

    #[test]
    fn numeric_overrides() {
        let config = config_from(&[
            ("TAXINTAKE_BIND", "0.0.0.0:9000"),
            ("TAXINTAKE_MAX_UPLOAD_BYTES", "2048"),
            ("TAXINTAKE_COLLABORATOR_TIMEOUT_SECS", " 30 "),
            ("OLLAMA_HOST", "http://gpu-box:11434"),
            ("TAXINTAKE_VISION_MODEL", "llava:13b"),
        ]);
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.max_upload_bytes, 2048);
        assert_eq!(config.collaborator_timeout_secs, 30);
        assert_eq!(config.ollama_host, "http://gpu-box:11434");
        assert_eq!(config.vision_model, "llava:13b");
    }

    #[test]
    fn malformed_values_fall_back() {
        let config = config_from(&[
            ("TAXINTAKE_BIND", "not-an-address"),
            ("TAXINTAKE_MAX_UPLOAD_BYTES", "ten megs"),
            ("TAXINTAKE_COLLABORATOR_TIMEOUT_SECS", "0"),
            ("OLLAMA_HOST", "   "),
        ]);
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.collaborator_timeout_secs, DEFAULT_COLLABORATOR_TIMEOUT_SECS);
        assert_eq!(config.ollama_host, DEFAULT_OLLAMA_HOST);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
