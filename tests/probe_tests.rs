use std::time::Duration;

use tokio::net::TcpListener;
use waitup::config::DEFAULT_PORTS;
use waitup::probe::{probe_once, probe_port, Reachable, Service};

/// A loopback port with nothing listening on it.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}

#[tokio::test]
async fn open_port_is_reachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().unwrap().port();
    assert!(probe_port("127.0.0.1", port, Duration::from_secs(1)).await);
}

#[tokio::test]
async fn closed_port_is_not_reachable() {
    let port = closed_port().await;
    assert!(!probe_port("127.0.0.1", port, Duration::from_secs(1)).await);
}

#[tokio::test]
async fn first_open_port_in_order_wins() {
    let closed = closed_port().await;
    let a = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let b = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (pa, pb) = (a.local_addr().unwrap().port(), b.local_addr().unwrap().port());

    let hit = probe_once("127.0.0.1", &[closed, pb, pa], Duration::from_secs(1)).await;
    assert_eq!(
        hit,
        Some(Reachable {
            port: pb,
            service: Service::Custom
        })
    );
}

#[tokio::test]
async fn nothing_open_is_none() {
    let ports = [closed_port().await, closed_port().await];
    assert_eq!(probe_once("127.0.0.1", &ports, Duration::from_secs(1)).await, None);
}

#[tokio::test]
async fn unresolvable_host_is_not_reachable() {
    assert!(!probe_port("no-such-host.invalid", 22, Duration::from_secs(2)).await);
}

#[tokio::test]
async fn default_ports_find_remote_desktop_first() {
    let _rdp = match TcpListener::bind("127.0.0.1:3389").await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("skipping: cannot bind 127.0.0.1:3389: {e}");
            return;
        }
    };

    let hit = probe_once("127.0.0.1", &DEFAULT_PORTS, Duration::from_secs(1)).await;
    assert_eq!(
        hit,
        Some(Reachable {
            port: 3389,
            service: Service::RemoteDesktop
        })
    );
    assert_eq!(hit.unwrap().service.label(), "RDP");
}
