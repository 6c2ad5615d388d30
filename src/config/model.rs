use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Defaults read from the optional YAML configuration file.
/// Every field may be omitted; command line flags take precedence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Stop after this many probes. 0 probes until interrupted.
    pub count: u64,

    /// Seconds to sleep between probes.
    pub interval_seconds: f64,

    /// Per-probe deadline in seconds.
    pub timeout_seconds: f64,

    /// Print every phase duration instead of the total.
    pub timings: bool,

    /// Maximum response bytes read for HTTP(S) probes. 0 reads until close.
    pub max_response_bytes: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            count: 0,
            interval_seconds: 1.0,
            timeout_seconds: 1.0,
            timings: false,
            max_response_bytes: 65535,
        }
    }
}

impl FileConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read the file at `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e))?;
        log::info!("Using configuration file {}", path.display());
        Self::from_yaml(&yaml)
    }
}
