//! Discovery over loopback: the responder answers, silence times out.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use lanfire_discovery::{DiscoveryClient, DiscoveryConfig, DiscoveryError, DiscoveryResponder};
use tokio::net::UdpSocket;

fn client(timeout: Duration) -> DiscoveryClient {
    DiscoveryClient::new(DiscoveryConfig {
        timeout,
        ..DiscoveryConfig::default()
    })
}

#[tokio::test]
async fn test_responder_reports_routed_address() {
    let responder = DiscoveryResponder::bind("127.0.0.1:0", None).await.unwrap();
    let addr = responder.local_addr().unwrap();
    tokio::spawn(responder.run());

    let ip = client(Duration::from_secs(2)).locate_via(&[addr]).await.unwrap();
    assert!(ip.is_loopback());
}

#[tokio::test]
async fn test_responder_reports_advertised_address() {
    let advertised: IpAddr = "192.168.50.7".parse().unwrap();
    let responder = DiscoveryResponder::bind("127.0.0.1:0", Some(advertised))
        .await
        .unwrap();
    let addr = responder.local_addr().unwrap();
    tokio::spawn(responder.run());

    let ip = client(Duration::from_secs(2)).locate_via(&[addr]).await.unwrap();
    assert_eq!(ip, advertised);
}

#[tokio::test]
async fn test_no_reply_is_a_timeout_error() {
    // Bound but never answers.
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = silent.local_addr().unwrap();

    let result = client(Duration::from_millis(100)).locate_via(&[addr]).await;
    assert!(matches!(result, Err(DiscoveryError::Timeout(_))));
}

#[tokio::test]
async fn test_non_address_reply_is_invalid() {
    let fake = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = fake.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        let (_, peer) = fake.recv_from(&mut buf).await.unwrap();
        fake.send_to(b"definitely not an ip", peer).await.unwrap();
    });

    let result = client(Duration::from_secs(2)).locate_via(&[addr]).await;
    assert!(matches!(result, Err(DiscoveryError::InvalidReply(_))));
}

#[tokio::test]
async fn test_responder_ignores_foreign_datagrams() {
    let responder = DiscoveryResponder::bind("127.0.0.1:0", None).await.unwrap();
    let addr: SocketAddr = responder.local_addr().unwrap();
    tokio::spawn(responder.run());

    let stranger = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    stranger.send_to(b"hello?", addr).await.unwrap();
    let mut buf = [0u8; 64];
    let reply = tokio::time::timeout(Duration::from_millis(150), stranger.recv_from(&mut buf)).await;
    assert!(reply.is_err(), "responder must stay silent for unknown payloads");
}

#[tokio::test]
async fn test_responder_outlives_vanished_requesters() {
    let responder = DiscoveryResponder::bind("127.0.0.1:0", None).await.unwrap();
    let addr = responder.local_addr().unwrap();
    let task = tokio::spawn(responder.run());

    // Each requester is gone before its reply lands.
    for _ in 0..5 {
        let gone = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        gone.send_to(lanfire_discovery::DISCOVERY_TOKEN, addr).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let ip = client(Duration::from_secs(2)).locate_via(&[addr]).await.unwrap();
    assert!(ip.is_loopback());
    assert!(!task.is_finished());
}
