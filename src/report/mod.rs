use std::fmt::Write;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::probe::prelude::*;
use crate::stats::{LatencyWindow, StatsAccumulator};

fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Tls => "ssl",
        other => other.as_str(),
    }
}

/// Line printed once the hostname resolves, before the first probe.
pub fn render_banner(target: &ProbeTarget, ip: Ipv4Addr) -> String {
    format!(
        "SERVICEPING {}:{} ({}:{}).",
        target.host, target.port, ip, target.port
    )
}

/// Render one probe result.
///
/// Returns `None` for a closed port, which prints nothing. With `timings`
/// every recorded phase is listed instead of the total time.
pub fn render_line(result: &ProbeResult, timings: bool) -> Option<String> {
    let success = match &result.outcome {
        ProbeOutcome::Failure(failure) => {
            return Some(format!(
                "{} for seq {}",
                failure.message, result.target.sequence
            ));
        }
        ProbeOutcome::Success(s) if s.state == ConnectionState::Closed => return None,
        ProbeOutcome::Success(s) => s,
    };

    let target = &result.target;
    let mut line = String::new();

    if let Some(length) = success.response_length.filter(|n| *n > 0) {
        let _ = write!(line, "{length} bytes ");
    }
    let _ = write!(
        line,
        "from {}:{} ({}:{}):",
        target.host, target.port, success.ip, target.port
    );

    let mut codes = Vec::new();
    if let Some(version) = &success.tls_version {
        codes.push(format!("ssl={version}"));
    }
    if let (Some(_), Some(code)) = (&target.path, success.http_status) {
        codes.push(format!("response={code}"));
    }
    line.push_str(&codes.join(":"));

    if timings {
        for (phase, elapsed) in success.timings.iter() {
            let _ = write!(line, " {}={:.2}ms", phase_label(phase), as_ms(elapsed));
        }
    } else {
        let total = success.timings.get(Phase::All).unwrap_or_default();
        let _ = write!(line, " time={:.2} ms", as_ms(total));
    }

    Some(line)
}

/// Counters for the closing statistics block.
#[derive(Debug, Clone)]
pub struct RunSummary {
    hostname: String,
    started: Instant,
    sent: u64,
    received: u64,
    min: Option<Duration>,
    max: Option<Duration>,
    window: LatencyWindow,
    stats: StatsAccumulator,
}

impl RunSummary {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            started: Instant::now(),
            sent: 0,
            received: 0,
            min: None,
            max: None,
            window: LatencyWindow::new(),
            stats: StatsAccumulator::new(),
        }
    }

    /// Count a probe. Only responding probes contribute latency samples.
    pub fn record(&mut self, result: &ProbeResult) {
        self.sent += 1;
        if !result.responding() {
            return;
        }
        self.received += 1;

        let Some(latency) = result.latency() else {
            return;
        };
        self.min = Some(self.min.map_or(latency, |m| m.min(latency)));
        self.max = Some(self.max.map_or(latency, |m| m.max(latency)));

        let ms = as_ms(latency);
        self.window.push(ms);
        self.stats.ingest(ms);
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn packet_loss(&self) -> f64 {
        if self.sent == 0 {
            return 100.0;
        }
        100.0 - (self.received as f64 / self.sent as f64) * 100.0
    }

    /// Streaming statistics over every responding probe of the run.
    pub fn stats(&self) -> &StatsAccumulator {
        &self.stats
    }

    pub fn render(&self) -> String {
        self.render_with_elapsed(self.started.elapsed())
    }

    fn render_with_elapsed(&self, elapsed: Duration) -> String {
        format!(
            "--- {} ping statistics ---\n\
             {} packets transmitted, {} received, {:.1}% packet loss, time {:.0}ms\n\
             rtt min/avg/max/dev = {:.2}/{:.2}/{:.2}/{:.2} ms",
            self.hostname,
            self.sent,
            self.received,
            self.packet_loss(),
            as_ms(elapsed),
            self.min.map(as_ms).unwrap_or_default(),
            self.window.mean(),
            self.max.map(as_ms).unwrap_or_default(),
            self.window.deviation(),
        )
    }
}
