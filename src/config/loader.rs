//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::MetaConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<MetaConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: MetaConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metad.toml");
        std::fs::write(
            &path,
            r#"
dir = "/tmp/metad-test/meta"
bind_address = "127.0.0.1:18089"
remote_hostname = "meta1:8091"

[profile]
cpu_sample_interval_ms = 50
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:18089");
        assert_eq!(config.remote_hostname, "meta1:8091");
        assert_eq!(config.profile.cpu_sample_interval_ms, 50);
        // Unset fields fall back to defaults.
        assert!(!config.https_enabled);
        assert!(config.readiness_timeout_secs.is_none());
    }

    #[test]
    fn invalid_config_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metad.toml");
        std::fs::write(&path, "bind_address = \"nope\"\n").unwrap();

        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/metad.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
