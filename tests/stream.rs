//! End-to-end streaming over a real TCP listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use wavcast::{
    AudioFormat, AudioSource, BroadcastHub, ServerConfig, Shutdown, SourceConfig, SourceExit,
    StreamServer,
};

const CHUNK: usize = 44_100;
const FRAME: usize = 176_400;

struct Harness {
    hub: Arc<BroadcastHub>,
    addr: SocketAddr,
    server: JoinHandle<wavcast::Result<()>>,
}

async fn start_server(config: ServerConfig) -> Harness {
    let hub = Arc::new(BroadcastHub::new(AudioFormat::cd_quality(), Shutdown::new()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = StreamServer::new(config, Arc::clone(&hub));
    let server = tokio::spawn(async move { server.serve(listener).await });

    Harness { hub, addr, server }
}

async fn connect(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /live HTTP/1.1\r\nHost: test\r\nUser-Agent: wavcast-test\r\n\r\n")
        .await
        .unwrap();
    stream
}

/// Read up to and including the blank line ending the response head
async fn read_head(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).await.unwrap();
        buf.push(byte[0]);
    }
    String::from_utf8(buf).unwrap()
}

async fn wait_for_subscribers(hub: &BroadcastHub, count: usize) {
    for _ in 0..200 {
        if hub.subscriber_count().await == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("subscriber count never reached {}", count);
}

#[tokio::test]
async fn test_client_receives_header_and_live_audio() {
    let harness = start_server(ServerConfig::default()).await;

    let (upstream, mut decoder) = tokio::io::duplex(64 * 1024);
    let mut source = AudioSource::new(
        Arc::clone(&harness.hub),
        SourceConfig::default().tick(Duration::from_millis(10)),
    );
    source.start(upstream);

    let mut client = connect(harness.addr).await;
    let head = read_head(&mut client).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: audio/wav\r\n"));
    assert!(!head.contains("Content-Length"));

    let mut wav = [0u8; 44];
    client.read_exact(&mut wav).await.unwrap();
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 36);
    assert_eq!(&wav[36..40], b"data");
    assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 0);

    wait_for_subscribers(&harness.hub, 1).await;

    // One second of audio from the "decoder", slice by slice
    for i in 0..4u8 {
        decoder.write_all(&vec![i + 1; CHUNK]).await.unwrap();
    }

    let mut frame = vec![0u8; FRAME];
    tokio::time::timeout(Duration::from_secs(5), client.read_exact(&mut frame))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame[0], 1);
    assert_eq!(frame[CHUNK], 2);
    assert_eq!(frame[FRAME - 1], 4);

    assert!(matches!(source.stop().await, Some(SourceExit::Shutdown)));
    harness.server.await.unwrap().unwrap();
    assert_eq!(harness.hub.subscriber_count().await, 0);

    // Server closed the connection on shutdown
    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_late_joiner_starts_from_now() {
    let harness = start_server(ServerConfig::default()).await;
    let hub = &harness.hub;

    let mut early = connect(harness.addr).await;
    read_head(&mut early).await;
    let mut wav = [0u8; 44];
    early.read_exact(&mut wav).await.unwrap();
    wait_for_subscribers(hub, 1).await;

    hub.append(&vec![1; CHUNK]).await;
    hub.append(&vec![2; CHUNK]).await;

    let mut late = connect(harness.addr).await;
    read_head(&mut late).await;
    late.read_exact(&mut wav).await.unwrap();
    wait_for_subscribers(hub, 2).await;

    hub.append(&vec![3; CHUNK]).await;
    hub.append(&vec![4; CHUNK]).await;

    // Early listener has a full second: slices 1..=4
    let mut frame = vec![0u8; FRAME];
    early.read_exact(&mut frame).await.unwrap();
    assert_eq!(frame[0], 1);
    assert_eq!(frame[FRAME - 1], 4);

    // Late listener needs two more slices; it never sees 1 or 2
    hub.append(&vec![5; CHUNK]).await;
    hub.append(&vec![6; CHUNK]).await;
    late.read_exact(&mut frame).await.unwrap();
    assert_eq!(frame[0], 3);
    assert_eq!(frame[FRAME - 1], 6);

    hub.stop();
    harness.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_disconnect_does_not_affect_others() {
    let harness = start_server(ServerConfig::default()).await;
    let hub = &harness.hub;

    let mut staying = connect(harness.addr).await;
    let leaving = connect(harness.addr).await;
    read_head(&mut staying).await;
    let mut wav = [0u8; 44];
    staying.read_exact(&mut wav).await.unwrap();
    wait_for_subscribers(hub, 2).await;

    drop(leaving);

    // Keep feeding while the dead session is torn down
    let mut frame = vec![0u8; FRAME];
    for round in 0..3u8 {
        for _ in 0..4 {
            hub.append(&vec![round; CHUNK]).await;
        }
        staying.read_exact(&mut frame).await.unwrap();
        assert!(frame.iter().all(|&b| b == round));
    }

    wait_for_subscribers(hub, 1).await;
    assert!(hub.is_running());

    hub.stop();
    harness.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_connection_limit() {
    let harness = start_server(ServerConfig::default().max_connections(1)).await;

    let mut first = connect(harness.addr).await;
    read_head(&mut first).await;
    wait_for_subscribers(&harness.hub, 1).await;

    let mut second = connect(harness.addr).await;
    let mut response = Vec::new();
    second.read_to_end(&mut response).await.unwrap();
    assert!(response.starts_with(b"HTTP/1.1 503 Service Unavailable\r\n"));

    assert_eq!(harness.hub.subscriber_count().await, 1);

    harness.hub.stop();
    harness.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_head_request_not_implemented() {
    let harness = start_server(ServerConfig::default()).await;

    let mut stream = TcpStream::connect(harness.addr).await.unwrap();
    stream.write_all(b"HEAD / HTTP/1.1\r\n\r\n").await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    assert!(response.starts_with(b"HTTP/1.1 501 Not Implemented\r\n"));
    assert_eq!(harness.hub.stats().await.total_subscriptions, 0);

    harness.hub.stop();
    harness.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_drains_idle_listeners() {
    let config = ServerConfig::default().drain_timeout(Duration::from_secs(1));
    let harness = start_server(config).await;

    let mut clients = Vec::new();
    for _ in 0..3 {
        let mut client = connect(harness.addr).await;
        read_head(&mut client).await;
        clients.push(client);
    }
    wait_for_subscribers(&harness.hub, 3).await;

    harness.hub.stop();
    tokio::time::timeout(Duration::from_millis(500), harness.server)
        .await
        .expect("server should stop within one poll interval of its listeners")
        .unwrap()
        .unwrap();

    assert_eq!(harness.hub.subscriber_count().await, 0);

    // Listening socket is released
    assert!(TcpStream::connect(harness.addr).await.is_err());
}

#[tokio::test]
async fn test_idle_departure_frees_connection_slot() {
    let harness = start_server(ServerConfig::default().max_connections(1)).await;

    let mut first = connect(harness.addr).await;
    read_head(&mut first).await;
    wait_for_subscribers(&harness.hub, 1).await;

    // Upstream delivers nothing but silence
    drop(first);
    for _ in 0..4 {
        harness.hub.append(&[]).await;
    }
    wait_for_subscribers(&harness.hub, 0).await;

    // The permit is released just after the unsubscribe
    let mut accepted = None;
    for _ in 0..50 {
        let mut second = connect(harness.addr).await;
        if read_head(&mut second).await.starts_with("HTTP/1.1 200 OK\r\n") {
            accepted = Some(second);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(accepted.is_some(), "next listener was never accepted");
    wait_for_subscribers(&harness.hub, 1).await;

    harness.hub.stop();
    harness.server.await.unwrap().unwrap();
}
