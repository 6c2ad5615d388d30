use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{self, timeout_at};
use tokio_rustls::TlsConnector;
use trust_dns_resolver::TokioAsyncResolver;

use super::prelude::*;
use super::tls::protocol_name;

const READ_CHUNK: usize = 8192;
/// Largest buffer handed to a single bounded read.
const MAX_SINGLE_READ: usize = 65535;
/// Deadline budget ceiling, so that `Instant` arithmetic cannot overflow.
const MAX_DEADLINE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Everything observed so far; survives a failing stage.
#[derive(Default)]
struct Measurement {
    ip: Option<Ipv4Addr>,
    timings: PhaseTimings,
    open: bool,
    tls_version: Option<String>,
    response: Option<Vec<u8>>,
}

/// Probe a target once: resolve, connect, optionally handshake TLS and issue
/// an HTTP GET, timing every stage.
///
/// Never fails. Infrastructure problems (DNS, a stage deadline firing) come
/// back as `ProbeOutcome::Failure`; a refused connection is a
/// `ProbeOutcome::Success` with `ConnectionState::Closed`.
pub async fn probe_target(
    resolver: &TokioAsyncResolver,
    connector: &TlsConnector,
    target: ProbeTarget,
) -> ProbeResult {
    let started = Instant::now();
    let mut measurement = Measurement::default();

    let result = run_stages(resolver, connector, &target, &mut measurement).await;
    measurement.timings.record(Phase::All, started.elapsed());

    let outcome = match result {
        Ok(ip) => {
            let body = measurement
                .response
                .as_deref()
                .map(|data| String::from_utf8_lossy(data).into_owned());

            ProbeOutcome::Success(ProbeSuccess {
                ip,
                state: if measurement.open {
                    ConnectionState::Open
                } else {
                    ConnectionState::Closed
                },
                timings: measurement.timings,
                tls_version: measurement.tls_version,
                http_status: body.as_deref().and_then(parse_status_code),
                response_length: measurement.response.as_ref().map(Vec::len),
                response_body: body,
            })
        }
        Err(e) => {
            log::warn!(
                "probe {}:{} seq {} failed at {}: {e}",
                target.host,
                target.port,
                target.sequence,
                e.stage()
            );
            ProbeOutcome::Failure(ProbeFailure {
                stage: e.stage(),
                message: e.to_string(),
                ip: measurement.ip,
                timings: measurement.timings,
            })
        }
    };

    ProbeResult { target, outcome }
}

async fn run_stages(
    resolver: &TokioAsyncResolver,
    connector: &TlsConnector,
    target: &ProbeTarget,
    m: &mut Measurement,
) -> Result<Ipv4Addr, ProbeError> {
    // DNS
    let dns_started = Instant::now();
    let ip = resolve_ipv4(resolver, &target.host, target.timeout).await?;
    m.timings.record(Phase::Dns, dns_started.elapsed());
    m.ip = Some(ip);
    log::debug!("{} resolved to {ip}", target.host);

    // TCP connect. TLS and the request share what is left of this deadline.
    let connect_started = Instant::now();
    let deadline = time::Instant::from_std(connect_started + target.timeout.min(MAX_DEADLINE));
    let addr = SocketAddr::from((ip, target.port));
    let connected = timeout_at(deadline, TcpStream::connect(addr)).await;
    m.timings.record(Phase::Connect, connect_started.elapsed());

    let stream = match connected {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            log::debug!("{ip}:{} closed: {e}", target.port);
            return Ok(ip);
        }
        Err(_) => return Err(ProbeError::ConnectTimeout(target.timeout)),
    };
    m.open = true;

    if !target.use_tls {
        let mut stream = stream;
        if let Some(path) = &target.path {
            m.response = Some(exchange(&mut stream, target, path, deadline, &mut m.timings).await?);
        }
        return Ok(ip);
    }

    // TLS
    let tls_started = Instant::now();
    let server_name = ServerName::try_from(target.host.as_str())
        .map(|name| name.to_owned())
        .map_err(|e| ProbeError::TlsHandshake(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

    let mut stream = match timeout_at(deadline, connector.connect(server_name, stream)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(ProbeError::TlsHandshake(e)),
        Err(_) => return Err(ProbeError::TlsTimeout(target.timeout)),
    };
    m.timings.record(Phase::Tls, tls_started.elapsed());
    m.tls_version = stream.get_ref().1.protocol_version().map(protocol_name);
    log::debug!("{}:{} negotiated {:?}", target.host, target.port, m.tls_version);

    if let Some(path) = &target.path {
        m.response = Some(exchange(&mut stream, target, path, deadline, &mut m.timings).await?);
    }

    Ok(ip)
}

pub(crate) async fn resolve_ipv4(
    resolver: &TokioAsyncResolver,
    host: &str,
    limit: Duration,
) -> Result<Ipv4Addr, ProbeError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(ip);
    }

    let lookup = time::timeout(limit, resolver.lookup_ip(host))
        .await
        .map_err(|_| ProbeError::Dns(None))?
        .map_err(|e| ProbeError::Dns(Some(e)))?;

    lookup
        .iter()
        .find_map(|ip| match ip {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| ProbeError::Unresolvable(host.to_string()))
}

/// Send a minimal HTTP/1.0 GET and read the response within the deadline.
async fn exchange<S>(
    stream: &mut S,
    target: &ProbeTarget,
    path: &str,
    deadline: time::Instant,
    timings: &mut PhaseTimings,
) -> Result<Vec<u8>, ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let started = Instant::now();
    let request = format!("GET {path} HTTP/1.0\r\nHost: {}\r\n\r\n", target.host);

    let io = async {
        stream.write_all(request.as_bytes()).await?;
        stream.flush().await?;
        read_response(stream, target.max_response_bytes).await
    };

    let data = match timeout_at(deadline, io).await {
        Ok(Ok(data)) => data,
        Ok(Err(e)) => return Err(ProbeError::Request(e)),
        Err(_) => return Err(ProbeError::RequestTimeout(target.timeout)),
    };
    timings.record(Phase::Request, started.elapsed());
    log::debug!("{}:{}{path} returned {} bytes", target.host, target.port, data.len());

    Ok(data)
}

/// One read of up to `max` bytes, or everything until the peer closes when
/// `max` is 0. A single read never returns more than [`MAX_SINGLE_READ`].
async fn read_response<S>(stream: &mut S, max: usize) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    if max > 0 {
        let mut buf = vec![0u8; max.min(MAX_SINGLE_READ)];
        let n = stream.read(&mut buf).await?;
        buf.truncate(n);
        return Ok(buf);
    }

    let mut data = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => data.extend_from_slice(&chunk[..n]),
            // TLS peers that close without close_notify
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && !data.is_empty() => break,
            Err(e) => return Err(e),
        }
    }
    Ok(data)
}

/// Status code from the second token of the first response line.
fn parse_status_code(response: &str) -> Option<u16> {
    response
        .lines()
        .next()?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}
