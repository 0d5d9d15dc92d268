use std::time::Duration;

use tracing::info;

use crate::error::{Result, WaitupError};
use crate::handoff::{self, ClientLookup};
use crate::probe::{RDP_PORT, SSH_PORT};
use crate::validate;

/// Remote desktop first, then SSH.
pub const DEFAULT_PORTS: [u16; 2] = [RDP_PORT, SSH_PORT];

/// Client availability, detected once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clients {
    pub terminal_login: ClientLookup,
    pub remote_desktop: ClientLookup,
}

impl Clients {
    pub fn none() -> Self {
        Self {
            terminal_login: ClientLookup::NotAvailable,
            remote_desktop: ClientLookup::NotAvailable,
        }
    }

    /// Detect only the clients whose service port is in `ports`.
    pub fn detect_for(ports: &[u16]) -> Self {
        let clients = Self {
            terminal_login: if ports.contains(&SSH_PORT) {
                handoff::detect_terminal_login()
            } else {
                ClientLookup::NotAvailable
            },
            remote_desktop: if ports.contains(&RDP_PORT) {
                handoff::detect_remote_desktop()
            } else {
                ClientLookup::NotAvailable
            },
        };
        info!(
            ssh = clients.terminal_login.is_available(),
            rdp = clients.remote_desktop.is_available(),
            "client detection"
        );
        clients
    }
}

/// Everything one run needs, built once from the command line.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub ports: Vec<u16>,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    pub quiet: bool,
    pub clients: Clients,
}

impl SessionConfig {
    /// Validate raw flag values. Timeout is checked before port, and both before the host,
    /// so flag mistakes are reported first.
    pub fn from_args(
        host: &str,
        port: Option<&str>,
        timeout: Option<&str>,
        quiet: bool,
    ) -> Result<Self> {
        let timeout = timeout.map(validate::parse_timeout).transpose()?;
        let port = port.map(validate::parse_port).transpose()?;
        if host.trim().is_empty() {
            return Err(WaitupError::Usage(
                "hostname or IP address required".to_string(),
            ));
        }

        let ports = match port {
            Some(p) => vec![p],
            None => DEFAULT_PORTS.to_vec(),
        };
        Ok(Self {
            host: host.to_string(),
            ports,
            timeout,
            quiet,
            clients: Clients::none(),
        })
    }

    pub fn with_clients(mut self, clients: Clients) -> Self {
        self.clients = clients;
        self
    }

    /// `SSH/RDP` for the default list, `port N` for an explicit one.
    pub fn target_description(&self) -> String {
        match self.ports.as_slice() {
            [port] => format!("port {port}"),
            _ => "SSH/RDP".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn defaults_to_rdp_then_ssh() {
        let cfg = SessionConfig::from_args("server1", None, None, false).unwrap();
        assert_eq!(cfg.ports, vec![3389, 22]);
        assert_eq!(cfg.timeout, None);
        assert_eq!(cfg.target_description(), "SSH/RDP");
    }

    #[test]
    fn explicit_port_replaces_defaults() {
        let cfg = SessionConfig::from_args("10.0.0.1", Some("443"), Some("5m"), true).unwrap();
        assert_eq!(cfg.ports, vec![443]);
        assert_eq!(cfg.timeout, Some(Duration::from_secs(300)));
        assert!(cfg.quiet);
        assert_eq!(cfg.target_description(), "port 443");
    }

    #[test]
    fn flag_errors_come_before_missing_host() {
        let err = SessionConfig::from_args("", Some("99999"), None, false).unwrap_err();
        assert!(matches!(
            err,
            WaitupError::Validation(ValidationError::InvalidPort { .. })
        ));
        let err = SessionConfig::from_args("", None, None, false).unwrap_err();
        assert!(matches!(err, WaitupError::Usage(_)));
    }
}
