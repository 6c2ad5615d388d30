use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::target::ProbeTarget;

/// A timed sub-step of a probe, ordered by when it happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Dns,
    Connect,
    Tls,
    Request,
    All,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::Request => "request",
            Self::All => "all",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elapsed time per phase. Phases that were never finished are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseTimings(BTreeMap<Phase, Duration>);

impl PhaseTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        self.0.insert(phase, elapsed);
    }

    pub fn get(&self, phase: Phase) -> Option<Duration> {
        self.0.get(&phase).copied()
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.0.contains_key(&phase)
    }

    /// Recorded phases in temporal order.
    pub fn phases(&self) -> impl Iterator<Item = Phase> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Phase, Duration)> + '_ {
        self.0.iter().map(|(p, d)| (*p, *d))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// Stage at which a probe was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Dns,
    DnsUnresolvable,
    ConnectTimeout,
    TlsTimeout,
    TlsHandshake,
    RequestTimeout,
    Request,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::DnsUnresolvable => "dns-unresolvable",
            Self::ConnectTimeout => "connect-timeout",
            Self::TlsTimeout => "tls-timeout",
            Self::TlsHandshake => "tls-handshake",
            Self::RequestTimeout => "request-timeout",
            Self::Request => "request",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed measurement. A closed port is a success with `state: Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSuccess {
    pub ip: Ipv4Addr,
    pub state: ConnectionState,
    pub timings: PhaseTimings,
    /// Negotiated TLS version, e.g. `TLSv1.3`.
    pub tls_version: Option<String>,
    pub http_status: Option<u16>,
    pub response_length: Option<usize>,
    /// Response decoded lossily.
    pub response_body: Option<String>,
}

/// An aborted probe, with whatever phases finished before the abort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub stage: FailureStage,
    pub message: String,
    pub ip: Option<Ipv4Addr>,
    pub timings: PhaseTimings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success(ProbeSuccess),
    Failure(ProbeFailure),
}

impl ProbeOutcome {
    pub fn timings(&self) -> &PhaseTimings {
        match self {
            Self::Success(s) => &s.timings,
            Self::Failure(f) => &f.timings,
        }
    }
}

/// What the probe engine hands back: the target it was given and the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub target: ProbeTarget,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    /// True if the TCP connection was established.
    pub fn responding(&self) -> bool {
        matches!(
            &self.outcome,
            ProbeOutcome::Success(ProbeSuccess {
                state: ConnectionState::Open,
                ..
            })
        )
    }

    /// Duration of the whole attempt.
    pub fn latency(&self) -> Option<Duration> {
        self.outcome.timings().get(Phase::All)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(state: ConnectionState) -> ProbeOutcome {
        let mut timings = PhaseTimings::new();
        timings.record(Phase::All, Duration::from_millis(12));
        timings.record(Phase::Dns, Duration::from_millis(1));
        timings.record(Phase::Connect, Duration::from_millis(10));

        ProbeOutcome::Success(ProbeSuccess {
            ip: Ipv4Addr::LOCALHOST,
            state,
            timings,
            tls_version: None,
            http_status: None,
            response_length: None,
            response_body: None,
        })
    }

    #[test]
    fn test_phases_iterate_in_temporal_order() {
        let mut timings = PhaseTimings::new();
        timings.record(Phase::All, Duration::from_millis(5));
        timings.record(Phase::Request, Duration::from_millis(3));
        timings.record(Phase::Dns, Duration::from_millis(1));
        timings.record(Phase::Tls, Duration::from_millis(2));
        timings.record(Phase::Connect, Duration::from_millis(1));

        let phases: Vec<Phase> = timings.phases().collect();
        assert_eq!(
            phases,
            vec![Phase::Dns, Phase::Connect, Phase::Tls, Phase::Request, Phase::All]
        );
    }

    #[test]
    fn test_responding_follows_connection_state() {
        let target = ProbeTarget::new("localhost", 80);

        let open = ProbeResult {
            target: target.clone(),
            outcome: success(ConnectionState::Open),
        };
        assert!(open.responding());
        assert_eq!(open.latency(), Some(Duration::from_millis(12)));

        let closed = ProbeResult {
            target: target.clone(),
            outcome: success(ConnectionState::Closed),
        };
        assert!(!closed.responding());

        let failed = ProbeResult {
            target,
            outcome: ProbeOutcome::Failure(ProbeFailure {
                stage: FailureStage::Dns,
                message: "DNS Lookup failed".to_string(),
                ip: None,
                timings: PhaseTimings::new(),
            }),
        };
        assert!(!failed.responding());
        assert_eq!(failed.latency(), None);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(FailureStage::Dns.to_string(), "dns");
        assert_eq!(FailureStage::ConnectTimeout.to_string(), "connect-timeout");
        assert_eq!(FailureStage::DnsUnresolvable.to_string(), "dns-unresolvable");
        assert_eq!(Phase::Tls.to_string(), "tls");
    }
}
