//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (addresses parseable, intervals > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: MetaConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::MetaConfig;

/// A single semantic violation found in a config.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("dir must not be empty")]
    EmptyDir,

    #[error("bind_address {0:?} is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("remote_hostname must not be empty")]
    EmptyRemoteHostname,

    #[error("profile.cpu_sample_interval_ms must be greater than zero")]
    ZeroSampleInterval,
}

/// Validate a config, collecting every violation.
pub fn validate_config(config: &MetaConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.dir.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyDir);
    }

    if config.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.bind_address.clone(),
        ));
    }

    if config.remote_hostname.is_empty() {
        errors.push(ValidationError::EmptyRemoteHostname);
    }

    if config.profile.cpu_sample_interval_ms == 0 {
        errors.push(ValidationError::ZeroSampleInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&MetaConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_violations() {
        let mut config = MetaConfig::default();
        config.dir = Default::default();
        config.bind_address = "not-an-address".to_string();
        config.remote_hostname = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rejects_zero_sample_interval() {
        let mut config = MetaConfig::default();
        config.profile.cpu_sample_interval_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::ZeroSampleInterval));
    }
}
