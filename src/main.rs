use std::fmt::Write;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tokio::time::sleep;

pub mod config;
use config::{
    ConfigError,
    app_config::{load_config, setup_resolver},
    cli::Cli,
};
pub mod probe;
use probe::{
    probe::{probe_target, resolve_ipv4},
    tls::setup_tls_connector,
};
pub mod report;
use report::{RunSummary, render_banner, render_line};
pub mod stats;
pub mod target;
use target::{ProbeTarget, TargetError};

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Target(#[from] TargetError),
}

fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, "\n\nCaused by: {}", src);
        err = src;
    }
    s
}

/// Completes once `signal` fires. If the handler cannot be installed the run
/// continues without interruption support.
async fn interrupted(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        log::warn!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("serviceping: {}", report(&e));
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, RunError> {
    let config = load_config(&cli)?;
    let destination = ProbeTarget::parse(&cli.destination)?
        .with_timeout(config.timeout)
        .with_max_response_bytes(config.max_response_bytes);

    let resolver = setup_resolver(&config.dns_hosts)?;
    let connector = setup_tls_connector().map_err(ConfigError::from)?;

    let ip = match resolve_ipv4(&resolver, &destination.host, config.timeout).await {
        Ok(ip) => ip,
        Err(e) => {
            log::debug!("pre-flight lookup of {} failed: {e}", destination.host);
            eprintln!("serviceping: unknown host {}", destination.host);
            return Ok(ExitCode::from(1));
        }
    };
    println!("{}", render_banner(&destination, ip));

    let mut summary = RunSummary::new(destination.host.clone());
    let mut last_responding = false;

    let stop = interrupted(tokio::signal::ctrl_c());
    tokio::pin!(stop);

    loop {
        let target = destination.clone().with_sequence(summary.sent());

        let result = tokio::select! {
            result = probe_target(&resolver, &connector, target) => result,
            _ = &mut stop => break,
        };

        summary.record(&result);
        last_responding = result.responding();
        if let Some(line) = render_line(&result, config.timings) {
            println!("{line}");
        }

        if config.count > 0 && summary.sent() >= config.count {
            break;
        }

        tokio::select! {
            _ = sleep(config.interval) => {}
            _ = &mut stop => break,
        }
    }

    println!("{}", summary.render());
    log::info!(
        "{} responding probes, mean {:.3} ms, standard deviation {:.3} ms",
        summary.stats().count(),
        summary.stats().mean(),
        summary.stats().standard_deviation()
    );

    Ok(if last_responding {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_includes_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = RunError::Config(ConfigError::Read("serviceping.yml".into(), io));
        assert_eq!(
            report(&err),
            "failed to read serviceping.yml\n\nCaused by: no such file"
        );
    }

    #[test]
    fn test_report_target_error() {
        let err = RunError::from(TargetError::InvalidPort("http".into()));
        assert_eq!(report(&err), "invalid port http");
    }

    #[tokio::test]
    async fn test_interrupted_by_signal() {
        let fired = interrupted(std::future::ready(Ok(())));
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), fired)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_signal_handler_error_never_interrupts() {
        let failed = std::future::ready(Err(std::io::Error::other("no signal driver")));
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), interrupted(failed))
                .await
                .is_err()
        );
    }
}
