//! Loopback tests for the reliable and unreliable channels.

use std::time::Duration;

use lanfire_transport::{
    Connection, TcpConnection, TcpTransport, Transport, TransportError, UdpEndpoint, UdpLink,
};

// =========================================================================
// Reliable channel
// =========================================================================

#[tokio::test]
async fn test_client_learns_connection_id_on_connect() {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();

    let client = tokio::spawn(async move { TcpConnection::connect(addr).await.unwrap() });
    let server_side = transport.accept().await.unwrap();
    let client = client.await.unwrap();

    assert_eq!(client.id(), server_side.id());
}

#[tokio::test]
async fn test_frames_arrive_in_order() {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();

    let client = tokio::spawn(async move { TcpConnection::connect(addr).await.unwrap() });
    let server_side = transport.accept().await.unwrap();
    let client = client.await.unwrap();

    for i in 0..10u8 {
        client.send(&[i; 3]).await.unwrap();
    }
    for i in 0..10u8 {
        assert_eq!(server_side.recv().await.unwrap(), Some(vec![i; 3]));
    }
}

#[tokio::test]
async fn test_close_is_seen_as_clean_eof() {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();

    let client = tokio::spawn(async move { TcpConnection::connect(addr).await.unwrap() });
    let server_side = transport.accept().await.unwrap();
    let client = client.await.unwrap();

    client.close().await.unwrap();
    assert_eq!(server_side.recv().await.unwrap(), None);
}

#[tokio::test]
async fn test_each_connection_gets_a_distinct_id() {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();

    let a = tokio::spawn(async move { TcpConnection::connect(addr).await.unwrap() });
    let first = transport.accept().await.unwrap();
    let b = tokio::spawn(async move { TcpConnection::connect(addr).await.unwrap() });
    let second = transport.accept().await.unwrap();

    assert_ne!(first.id(), second.id());
    assert_eq!(a.await.unwrap().id(), first.id());
    assert_eq!(b.await.unwrap().id(), second.id());
}

// =========================================================================
// Unreliable channel
// =========================================================================

#[tokio::test]
async fn test_registered_link_exchanges_datagrams() {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let tcp_addr = transport.local_addr().unwrap();
    let endpoint = std::sync::Arc::new(UdpEndpoint::bind("127.0.0.1:0").await.unwrap());
    let udp_addr = endpoint.local_addr().unwrap();

    let client = tokio::spawn(async move { TcpConnection::connect(tcp_addr).await.unwrap() });
    let server_side = transport.accept().await.unwrap();
    let client = client.await.unwrap();

    // The endpoint must be receiving for the registration ack to happen.
    let rx = {
        let endpoint = std::sync::Arc::clone(&endpoint);
        tokio::spawn(async move { endpoint.recv().await.unwrap() })
    };

    endpoint.permit(server_side.id()).await;
    let link = UdpLink::connect(udp_addr, client.id()).await.unwrap();
    link.register(5, Duration::from_millis(200)).await.unwrap();
    assert!(endpoint.is_registered(server_side.id()).await);

    link.send(b"aim").await.unwrap();
    let datagram = rx.await.unwrap();
    assert_eq!(datagram.from, server_side.id());
    assert_eq!(datagram.payload, b"aim");

    assert!(endpoint.send_to(server_side.id(), b"state").await.unwrap());
    let got = tokio::time::timeout(Duration::from_secs(1), link.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got, b"state");
}

#[tokio::test]
async fn test_send_to_unregistered_peer_is_dropped() {
    let endpoint = UdpEndpoint::bind("127.0.0.1:0").await.unwrap();
    let sent = endpoint
        .send_to(lanfire_transport::ConnectionId::new(999), b"lost")
        .await
        .unwrap();
    assert!(!sent);
}

#[tokio::test]
async fn test_forget_removes_route() {
    let endpoint = std::sync::Arc::new(UdpEndpoint::bind("127.0.0.1:0").await.unwrap());
    let addr = endpoint.local_addr().unwrap();
    let id = lanfire_transport::ConnectionId::new(77);

    let rx = {
        let endpoint = std::sync::Arc::clone(&endpoint);
        tokio::spawn(async move { endpoint.recv().await })
    };
    endpoint.permit(id).await;
    let link = UdpLink::connect(addr, id).await.unwrap();
    link.register(5, Duration::from_millis(200)).await.unwrap();
    assert!(endpoint.is_registered(id).await);

    endpoint.forget(id).await;
    assert!(!endpoint.is_registered(id).await);
    rx.abort();
}

#[tokio::test]
async fn test_unpermitted_id_cannot_register() {
    let endpoint = std::sync::Arc::new(UdpEndpoint::bind("127.0.0.1:0").await.unwrap());
    let addr = endpoint.local_addr().unwrap();
    let rx = {
        let endpoint = std::sync::Arc::clone(&endpoint);
        tokio::spawn(async move { endpoint.recv().await })
    };

    let stranger = UdpLink::connect(addr, lanfire_transport::ConnectionId::new(404))
        .await
        .unwrap();
    let result = stranger.register(2, Duration::from_millis(100)).await;
    assert!(matches!(result, Err(TransportError::RegistrationTimeout)));
    assert!(!endpoint.is_registered(stranger.id()).await);
    rx.abort();
}

#[tokio::test]
async fn test_late_datagram_after_forget_stays_dropped() {
    let endpoint = std::sync::Arc::new(UdpEndpoint::bind("127.0.0.1:0").await.unwrap());
    let addr = endpoint.local_addr().unwrap();
    let rx = {
        let endpoint = std::sync::Arc::clone(&endpoint);
        tokio::spawn(async move { endpoint.recv().await.unwrap() })
    };

    let gone = lanfire_transport::ConnectionId::new(78);
    endpoint.permit(gone).await;
    let late = UdpLink::connect(addr, gone).await.unwrap();
    late.register(5, Duration::from_millis(200)).await.unwrap();
    endpoint.forget(gone).await;

    late.send(b"late aim").await.unwrap();
    let retry = late.register(1, Duration::from_millis(100)).await;
    assert!(matches!(retry, Err(TransportError::RegistrationTimeout)));

    // Datagrams on one socket are handled in order: once this link is
    // registered and heard, everything `late` sent has been handled.
    let live = lanfire_transport::ConnectionId::new(79);
    endpoint.permit(live).await;
    let link = UdpLink::connect(addr, live).await.unwrap();
    link.register(5, Duration::from_millis(200)).await.unwrap();
    link.send(b"aim").await.unwrap();

    let datagram = tokio::time::timeout(Duration::from_secs(1), rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(datagram.from, live);
    assert!(!endpoint.is_registered(gone).await);
}
