//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILEXPORT_CONFIG` (environment variable)
//! 2. `~/.config/mailexport/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailexport\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Command-line flags override everything read here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Export defaults.
    pub export: ExportConfig,
    /// Performance tuning.
    pub performance: PerformanceConfig,
    /// Where messages are read from.
    pub source: SourceConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override directory for the log file.
    pub log_dir: Option<PathBuf>,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Name of the subfolder that receives duplicate attachments.
    pub duplicates_subfolder: String,
    /// Digest used for duplicate detection.
    pub hash_algorithm: String,
    /// Maximum length of the subject folder segment.
    pub subject_sanitize_length: usize,
    /// Save attachments the inline heuristic would skip.
    pub include_inline: bool,
}

/// Performance tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Messages requested from the mail store per batch.
    pub batch_size: usize,
}

/// Message source settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Root directory of the EML mail store (acts as the inbox).
    pub mail_root: Option<PathBuf>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            duplicates_subfolder: "duplicates".to_string(),
            hash_algorithm: "sha256".to_string(),
            subject_sanitize_length: 80,
            include_inline: false,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { batch_size: 200 }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILEXPORT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailexport").join("config.toml"))
}

/// Return the directory that holds the log file.
pub fn log_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.log_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailexport")
}

/// Return the default log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    log_dir(config).join("mailexport.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "info");
        assert_eq!(cfg.export.duplicates_subfolder, "duplicates");
        assert_eq!(cfg.export.hash_algorithm, "sha256");
        assert_eq!(cfg.export.subject_sanitize_length, 80);
        assert!(!cfg.export.include_inline);
        assert_eq!(cfg.performance.batch_size, 200);
        assert!(cfg.source.mail_root.is_none());
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.export.hash_algorithm, cfg.export.hash_algorithm);
        assert_eq!(parsed.performance.batch_size, cfg.performance.batch_size);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[export]
hash_algorithm = "sha512"

[source]
mail_root = "/var/mail/archive"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.export.hash_algorithm, "sha512");
        assert_eq!(
            cfg.source.mail_root.as_deref(),
            Some(std::path::Path::new("/var/mail/archive"))
        );
        // Other fields use defaults
        assert_eq!(cfg.export.duplicates_subfolder, "duplicates");
        assert_eq!(cfg.performance.batch_size, 200);
    }

    #[test]
    fn test_log_file_path_honors_override() {
        let mut cfg = Config::default();
        cfg.general.log_dir = Some(PathBuf::from("/tmp/mailexport-logs"));
        assert_eq!(
            log_file_path(&cfg),
            PathBuf::from("/tmp/mailexport-logs/mailexport.log")
        );
    }
}
