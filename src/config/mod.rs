pub mod app_config;
pub mod cli;
pub mod model;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}")]
    Read(String, #[source] std::io::Error),

    #[error("invalid configuration file")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid {0}: {1} seconds")]
    InvalidDuration(&'static str, f64),

    #[error("invalid DNS host {0}")]
    InvalidDnsHost(String),

    #[error("failed to set up TLS")]
    Tls(#[from] rustls::Error),
}
