//! Integration tests for the live feed client against a local listener

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use wind_config::Credentials;
use wind_core::ConnectionState;
use wind_transport::{sample_channel, LiveClient, ReconnectPolicy};

fn test_credentials() -> Credentials {
    Credentials {
        api_key: "test-api-key".to_string(),
        application_key: "test-app-key".to_string(),
        mac_address: None,
    }
}

fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        max_attempts,
        delay: Duration::from_millis(20),
    }
}

async fn wait_for_state(
    rx: &mut watch::Receiver<ConnectionState>,
    target: ConnectionState,
) -> ConnectionState {
    timeout(Duration::from_secs(5), async {
        while *rx.borrow() != target {
            rx.changed().await.expect("state sender dropped");
        }
        target
    })
    .await
    .expect("timed out waiting for connection state")
}

#[tokio::test]
async fn test_handshake_then_data_delivery() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut client =
        LiveClient::new(addr.to_string(), &test_credentials(), fast_policy(5)).unwrap();
    let (sample_tx, mut sample_rx) = sample_channel(16);
    let (sub_tx, mut sub_rx) = mpsc::channel(4);
    let mut state = client.state();

    client.connect(sample_tx, sub_tx);

    let (socket, _) = listener.accept().await.unwrap();
    let (reader, mut writer) = socket.into_split();

    // The first frame from the client must be the subscribe handshake.
    let mut lines = BufReader::new(reader).lines();
    let handshake = lines.next_line().await.unwrap().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&handshake).unwrap();
    assert_eq!(parsed["command"], "subscribe");
    assert_eq!(parsed["apiKeys"][0], "test-api-key");

    wait_for_state(&mut state, ConnectionState::Connected).await;

    // Ack plus a mix of good, malformed, irrelevant, and windless frames.
    writer
        .write_all(
            concat!(
                r#"{"event":"subscribed","devices":["AA:BB:CC"]}"#,
                "\n",
                r#"{"event":"data","windspeedmph":10.0,"winddir":350,"dateutc":1700000000000}"#,
                "\n",
                "this is not json\n",
                r#"{"event":"ping"}"#,
                "\n",
                r#"{"event":"data","tempf":68.0}"#,
                "\n",
                r#"{"event":"data","windspeedmph":14.0,"winddir":10,"dateutc":1700000060000}"#,
                "\n",
            )
            .as_bytes(),
        )
        .await
        .unwrap();

    let devices = timeout(Duration::from_secs(5), sub_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(devices, vec!["AA:BB:CC".to_string()]);

    // Exactly the two valid data frames become samples, in order.
    let first = timeout(Duration::from_secs(5), sample_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.wind_speed, 10.0);
    assert_eq!(first.wind_direction, 350.0);

    let second = timeout(Duration::from_secs(5), sample_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.wind_speed, 14.0);

    client.disconnect();
    assert_eq!(*client.state().borrow(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_every_ack_is_delivered() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut client =
        LiveClient::new(addr.to_string(), &test_credentials(), fast_policy(5)).unwrap();
    let (sample_tx, mut sample_rx) = sample_channel(16);
    // Capacity 1: the second ack has to wait for the first to be read.
    let (sub_tx, mut sub_rx) = mpsc::channel(1);

    client.connect(sample_tx, sub_tx);

    let (socket, _) = listener.accept().await.unwrap();
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();
    lines.next_line().await.unwrap();

    writer
        .write_all(
            concat!(
                r#"{"event":"subscribed","devices":["AA:BB"]}"#,
                "\n",
                r#"{"event":"subscribed","devices":["CC:DD"]}"#,
                "\n",
                r#"{"event":"data","windspeedmph":6.0,"winddir":30}"#,
                "\n",
            )
            .as_bytes(),
        )
        .await
        .unwrap();

    // Both acks arrive in order, none dropped, and the stream keeps
    // flowing afterwards.
    let first = timeout(Duration::from_secs(5), sub_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, vec!["AA:BB".to_string()]);
    let second = timeout(Duration::from_secs(5), sub_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second, vec!["CC:DD".to_string()]);

    let sample = timeout(Duration::from_secs(5), sample_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sample.wind_speed, 6.0);

    client.disconnect();
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut client =
        LiveClient::new(addr.to_string(), &test_credentials(), fast_policy(5)).unwrap();
    let (sample_tx, _sample_rx) = sample_channel(16);
    let (sub_tx, _sub_rx) = mpsc::channel(4);

    client.connect(sample_tx.clone(), sub_tx.clone());
    client.connect(sample_tx, sub_tx);

    // One connection arrives, and only one.
    let (_socket, _) = timeout(Duration::from_secs(5), listener.accept())
        .await
        .unwrap()
        .unwrap();
    assert!(timeout(Duration::from_millis(200), listener.accept())
        .await
        .is_err());

    client.disconnect();
}

#[tokio::test]
async fn test_reconnect_exhaustion_parks_in_error() {
    // Bind then drop to get an address that refuses connections.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut client =
        LiveClient::new(addr.to_string(), &test_credentials(), fast_policy(3)).unwrap();
    let (sample_tx, _sample_rx) = sample_channel(16);
    let (sub_tx, _sub_rx) = mpsc::channel(4);
    let mut state = client.state();

    client.connect(sample_tx, sub_tx);

    wait_for_state(&mut state, ConnectionState::Error).await;

    // No further attempts once parked in Error.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(*state.borrow(), ConnectionState::Error);
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_session_drop_triggers_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut client =
        LiveClient::new(addr.to_string(), &test_credentials(), fast_policy(5)).unwrap();
    let (sample_tx, _sample_rx) = sample_channel(16);
    let (sub_tx, _sub_rx) = mpsc::channel(4);
    let mut state = client.state();

    client.connect(sample_tx, sub_tx);

    // Accept then immediately close; the client should come back.
    let (socket, _) = listener.accept().await.unwrap();
    wait_for_state(&mut state, ConnectionState::Connected).await;
    drop(socket);

    // A second accepted session starting with a fresh handshake proves
    // the reconnect happened.
    let (socket, _) = timeout(Duration::from_secs(5), listener.accept())
        .await
        .unwrap()
        .unwrap();
    let mut lines = BufReader::new(socket).lines();
    let handshake = timeout(Duration::from_secs(5), lines.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&handshake).unwrap();
    assert_eq!(parsed["command"], "subscribe");

    client.disconnect();
}
