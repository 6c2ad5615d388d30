use std::env;
use std::net::IpAddr;
use std::time::Duration;

use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{
        LookupIpStrategy, NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig,
        ResolverOpts,
    },
    system_conf::read_system_conf,
};

use super::ConfigError;
use super::cli::Cli;
use super::model::FileConfig;

/// Effective settings for one run: file defaults overridden by the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub count: u64,
    pub interval: Duration,
    pub timeout: Duration,
    pub timings: bool,
    pub max_response_bytes: usize,
    /// Nameservers to query instead of the system configuration.
    pub dns_hosts: Vec<String>,
}

impl AppConfig {
    pub fn merge(cli: &Cli, file: FileConfig, dns_hosts: Vec<String>) -> Result<Self, ConfigError> {
        let interval = seconds("interval", cli.interval.unwrap_or(file.interval_seconds))?;
        let timeout = seconds("timeout", cli.timeout.unwrap_or(file.timeout_seconds))?;
        if timeout.is_zero() {
            return Err(ConfigError::InvalidDuration("timeout", 0.0));
        }

        Ok(Self {
            count: cli.count.unwrap_or(file.count),
            interval,
            timeout,
            timings: !cli.no_timings && (cli.timings || file.timings),
            max_response_bytes: cli.max_size.unwrap_or(file.max_response_bytes),
            dns_hosts,
        })
    }
}

fn seconds(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration(name, value))
}

/// Load the application configuration from the YAML file named on the command
/// line (or `CONFIG_FILE`), the `DNS_HOSTS` environment variable and the
/// command line flags.
pub fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let file = FileConfig::load(&cli.config)?;

    let dns_hosts: Vec<String> = env::var("DNS_HOSTS")
        .map(|hosts| {
            hosts
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if !dns_hosts.is_empty() {
        log::info!("Using DNS hosts: {:?}", dns_hosts);
    }

    AppConfig::merge(cli, file, dns_hosts)
}

/// Setup a DNS resolver.
///
/// Without `dns_hosts` the system configuration is used, falling back to the
/// resolver defaults if it cannot be read. Lookups are IPv4 only and nothing
/// is cached, so every probe performs a fresh resolution.
pub fn setup_resolver(dns_hosts: &[String]) -> Result<TokioAsyncResolver, ConfigError> {
    let (resolver_config, mut opts) = if dns_hosts.is_empty() {
        read_system_conf().unwrap_or_else(|e| {
            log::warn!("Cannot read system DNS configuration, using defaults: {e}");
            (ResolverConfig::default(), ResolverOpts::default())
        })
    } else {
        let mut name_servers = NameServerConfigGroup::new();

        for host in dns_hosts {
            let ip: IpAddr = host
                .parse()
                .map_err(|_| ConfigError::InvalidDnsHost(host.clone()))?;
            name_servers.push(NameServerConfig {
                socket_addr: (ip, 53).into(),
                protocol: Protocol::Tcp,
                tls_dns_name: None,
                trust_negative_responses: false,
                bind_addr: None,
            });
        }

        (
            ResolverConfig::from_parts(None, vec![], name_servers),
            ResolverOpts::default(),
        )
    };

    opts.attempts = 2;
    opts.cache_size = 0;
    opts.ip_strategy = LookupIpStrategy::Ipv4Only;

    Ok(TokioAsyncResolver::tokio(resolver_config, opts))
}
