use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default probe timeout (1 second).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default number of response bytes read for HTTP(S) probes.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 65535;

const DEFAULT_HTTP_PORT: u16 = 80;
const DEFAULT_HTTPS_PORT: u16 = 443;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("invalid url {0}: {1}")]
    InvalidUrl(String, String),

    #[error("missing host in {0}")]
    MissingHost(String),

    #[error("invalid port {0}")]
    InvalidPort(String),
}

/// A single service to probe.
///
/// Built by value and handed to the probe engine; the engine never keeps it
/// past the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    /// DNS name or literal IP address.
    pub host: String,
    pub port: u16,
    /// Request path, only set for HTTP(S) probes.
    pub path: Option<String>,
    pub use_tls: bool,
    /// Deadline for the whole connection budget of one probe.
    pub timeout: Duration,
    /// Maximum response bytes read. 0 reads until the peer closes.
    pub max_response_bytes: usize,
    /// Caller assigned probe index, informational only.
    pub sequence: u64,
}

impl ProbeTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: None,
            use_tls: false,
            timeout: DEFAULT_TIMEOUT,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            sequence: 0,
        }
    }

    /// Issue an HTTP GET for `path` once connected.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_response_bytes(mut self, max_response_bytes: usize) -> Self {
        self.max_response_bytes = max_response_bytes;
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Parse a destination given on the command line.
    ///
    /// Accepts `http://host[:port]/path`, `https://host[:port]/path` or
    /// `host[:port[:path]]`. The port defaults to 80, or 443 for https.
    pub fn parse(destination: &str) -> Result<Self, TargetError> {
        if destination.starts_with("http:") || destination.starts_with("https:") {
            return Self::parse_url(destination);
        }

        let mut parts = destination.splitn(3, ':');
        let host = parts.next().unwrap_or_default();
        if host.is_empty() {
            return Err(TargetError::MissingHost(destination.to_string()));
        }

        let port = match parts.next() {
            Some(port) => parse_port(port)?,
            None => DEFAULT_HTTP_PORT,
        };

        let mut target = Self::new(host, port);
        if let Some(path) = parts.next().filter(|p| !p.is_empty()) {
            target = target.with_path(path);
        }
        Ok(target)
    }

    fn parse_url(destination: &str) -> Result<Self, TargetError> {
        let url = Url::parse(destination)
            .map_err(|e| TargetError::InvalidUrl(destination.to_string(), e.to_string()))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TargetError::MissingHost(destination.to_string()))?;

        let use_tls = url.scheme() == "https";
        let port = url.port().unwrap_or(if use_tls {
            DEFAULT_HTTPS_PORT
        } else {
            DEFAULT_HTTP_PORT
        });

        let path = match url.path() {
            "" => "/",
            p => p,
        };

        Ok(Self::new(host, port).with_tls(use_tls).with_path(path))
    }
}

fn parse_port(port: &str) -> Result<u16, TargetError> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(TargetError::InvalidPort(port.to_string())),
        Ok(p) => Ok(p),
    }
}
