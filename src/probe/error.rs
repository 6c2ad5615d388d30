use std::time::Duration;

use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

use super::result::FailureStage;

/// Infrastructure failures that abort a probe.
///
/// The `Display` text is what gets printed for the failed probe. A refused
/// connection is not in here; it is a normal `closed` measurement.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("DNS Lookup failed")]
    Dns(#[source] Option<ResolveError>),

    #[error("No IPv4 address for {0}")]
    Unresolvable(String),

    #[error("TCP connect timeout ({} seconds)", .0.as_secs_f64())]
    ConnectTimeout(Duration),

    #[error("SSL socket timeout ({} seconds)", .0.as_secs_f64())]
    TlsTimeout(Duration),

    #[error("SSL handshake failed: {0}")]
    TlsHandshake(#[source] std::io::Error),

    #[error("TCP socket timeout ({} seconds)", .0.as_secs_f64())]
    RequestTimeout(Duration),

    #[error("Request failed: {0}")]
    Request(#[source] std::io::Error),
}

impl ProbeError {
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::Dns(_) => FailureStage::Dns,
            Self::Unresolvable(_) => FailureStage::DnsUnresolvable,
            Self::ConnectTimeout(_) => FailureStage::ConnectTimeout,
            Self::TlsTimeout(_) => FailureStage::TlsTimeout,
            Self::TlsHandshake(_) => FailureStage::TlsHandshake,
            Self::RequestTimeout(_) => FailureStage::RequestTimeout,
            Self::Request(_) => FailureStage::Request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(ProbeError::Dns(None).to_string(), "DNS Lookup failed");
        assert_eq!(
            ProbeError::TlsTimeout(Duration::from_secs(1)).to_string(),
            "SSL socket timeout (1 seconds)"
        );
        assert_eq!(
            ProbeError::RequestTimeout(Duration::from_millis(500)).to_string(),
            "TCP socket timeout (0.5 seconds)"
        );
    }

    #[test]
    fn test_stages() {
        assert_eq!(ProbeError::Dns(None).stage(), FailureStage::Dns);
        assert_eq!(
            ProbeError::Unresolvable("host".into()).stage(),
            FailureStage::DnsUnresolvable
        );
        assert_eq!(
            ProbeError::ConnectTimeout(Duration::from_secs(1)).stage(),
            FailureStage::ConnectTimeout
        );
        assert_eq!(
            ProbeError::Request(std::io::ErrorKind::ConnectionReset.into()).stage(),
            FailureStage::Request
        );
    }
}
