use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

/// Endpoints of the reference deployment: four Docker daemons on the default bridge.
pub const DEFAULT_WORKERS: [&str; 4] = [
    "tcp://172.17.0.2:2375",
    "tcp://172.17.0.3:2375",
    "tcp://172.17.0.4:2375",
    "tcp://172.17.0.5:2375",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Static worker pool, one container-runtime endpoint per entry.
    pub workers: Vec<String>,
    /// Capacity of the dispatcher command channel.
    pub command_buffer: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS.iter().map(|w| w.to_string()).collect(),
            command_buffer: 256,
        }
    }
}

impl ConfigValidator for DispatcherConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if self.workers.is_empty() {
            return Err(crate::ConfigError::Validation(
                "dispatcher.workers cannot be empty".to_string(),
            ));
        }
        for worker in &self.workers {
            ValidationUtils::validate_endpoint(worker, "dispatcher.workers")?;
        }
        ValidationUtils::validate_unique(&self.workers, "dispatcher.workers")?;
        ValidationUtils::validate_count(self.command_buffer, "dispatcher.command_buffer", 65536)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub connect_timeout_seconds: u64,
    /// Docker Engine API version pin as `major.minor`; client default when unset.
    #[serde(default)]
    pub api_version: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 120,
            api_version: None,
        }
    }
}

impl RuntimeConfig {
    pub fn parsed_api_version(&self) -> Option<(usize, usize)> {
        let (major, minor) = self.api_version.as_deref()?.trim().split_once('.')?;
        Some((major.parse().ok()?, minor.parse().ok()?))
    }
}

impl ConfigValidator for RuntimeConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_timeout_seconds(
            self.connect_timeout_seconds,
            "runtime.connect_timeout_seconds",
        )?;
        if let Some(version) = &self.api_version {
            if self.parsed_api_version().is_none() {
                return Err(crate::ConfigError::Validation(format!(
                    "runtime.api_version must look like '1.43', got '{version}'"
                )));
            }
        }
        Ok(())
    }
}
