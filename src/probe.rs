use std::fmt;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use tracing::debug;

pub const SSH_PORT: u16 = 22;
pub const RDP_PORT: u16 = 3389;

/// Service label attached to a reachable port. Only the two well-known ports
/// get a named service; everything else is a custom port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    TerminalLogin,
    RemoteDesktop,
    Custom,
}

impl Service {
    pub fn from_port(port: u16) -> Self {
        match port {
            SSH_PORT => Service::TerminalLogin,
            RDP_PORT => Service::RemoteDesktop,
            _ => Service::Custom,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Service::TerminalLogin => "SSH",
            Service::RemoteDesktop => "RDP",
            Service::Custom => "Custom Port",
        }
    }

    pub fn is_well_known(self) -> bool {
        self != Service::Custom
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The first port that accepted a connection during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reachable {
    pub port: u16,
    pub service: Service,
}

/// Try each port in order with a bounded TCP connect and return the first one that accepts.
///
/// - Name resolution counts against `connect_timeout`.
/// - The stream is dropped straight away; nothing is sent or read.
/// - `None` means nothing answered in this pass, which is the normal "keep waiting" result.
pub async fn probe_once(host: &str, ports: &[u16], connect_timeout: Duration) -> Option<Reachable> {
    for &port in ports {
        if probe_port(host, port, connect_timeout).await {
            return Some(Reachable {
                port,
                service: Service::from_port(port),
            });
        }
    }
    None
}

/// A single probe against `host:port`.
pub async fn probe_port(host: &str, port: u16, connect_timeout: Duration) -> bool {
    let start = Instant::now();
    match time::timeout(connect_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            debug!(host, port, latency_ms = millis(start.elapsed()), "port accepted connection");
            drop(stream);
            true
        }
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "connect failed");
            false
        }
        Err(_) => {
            debug!(host, port, timeout_ms = millis(connect_timeout), "connect timed out");
            false
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
