use std::collections::HashSet;
use std::net::SocketAddr;

use crate::ConfigResult;

/// Trait for configuration validation
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// General validation utilities
pub struct ValidationUtils;

impl ValidationUtils {
    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field_name: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    /// Validate that a timeout is reasonable
    pub fn validate_timeout_seconds(timeout_seconds: u64, field_name: &str) -> ConfigResult<()> {
        if timeout_seconds == 0 {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if timeout_seconds > 3600 {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be less than or equal to 3600"
            )));
        }
        Ok(())
    }

    /// Validate that a count is within (0, max]
    pub fn validate_count(count: usize, field_name: &str, max: usize) -> ConfigResult<()> {
        if count == 0 {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if count > max {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    /// Validate that an endpoint address carries a scheme, e.g. `tcp://host:2375`
    pub fn validate_endpoint(endpoint: &str, field_name: &str) -> ConfigResult<()> {
        Self::validate_not_empty(endpoint, field_name)?;
        match endpoint.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => Ok(()),
            _ => Err(crate::ConfigError::Validation(format!(
                "{field_name} must be an address with scheme, got '{endpoint}'"
            ))),
        }
    }

    pub fn validate_socket_addr(addr: &str, field_name: &str) -> ConfigResult<()> {
        addr.parse::<SocketAddr>().map(|_| ()).map_err(|e| {
            crate::ConfigError::Validation(format!("{field_name} '{addr}' is invalid: {e}"))
        })
    }

    pub fn validate_unique(values: &[String], field_name: &str) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for value in values {
            if !seen.insert(value.as_str()) {
                return Err(crate::ConfigError::Validation(format!(
                    "{field_name} contains duplicate entry '{value}'"
                )));
            }
        }
        Ok(())
    }
}
