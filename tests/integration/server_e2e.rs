//! End-to-end: real listener, WebSocket subscriber, HTTP endpoints

use feed_sim::config::{Config, RangeMs};
use feed_sim::feed::{FeedKind, PriceSnapshot, SourceKind, WireMessage};
use feed_sim::server::FeedServer;
use futures_util::{Stream, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

fn fast_config() -> Config {
    let mut config = Config::from_toml_str(include_str!("../../config.toml.example")).unwrap();
    config.dex.tick_ms = RangeMs::new(5, 15);
    config.dex.burst_mode = false;
    config.dex.p_drop = 0.0;
    config.dex.p_dup = 0.0;
    config.oracle.tick_ms = RangeMs::new(5, 15);
    config.oracle.p_drop = 0.0;
    config.oracle.p_dup = 0.0;
    config.oracle.deviation_bps = 0;
    config.server.cors_allow_origins = vec!["https://dash.example".to_string()];
    config
}

async fn start(kind: FeedKind) -> (SocketAddr, oneshot::Sender<()>, JoinHandle<anyhow::Result<()>>) {
    let server = FeedServer::bind(&fast_config(), kind, "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = server.local_addr();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(async move {
        let _ = stop_rx.await;
    }));
    (addr, stop_tx, handle)
}

async fn next_message<S>(ws: &mut S) -> WireMessage
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_dex_websocket_ack_then_ticks() {
    let (addr, stop, handle) = start(FeedKind::Dex).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/ticks")).await.unwrap();

    assert_eq!(next_message(&mut ws).await, WireMessage::subscribed("dex_ticks"));

    let mut last_seq = None;
    for _ in 0..5 {
        match next_message(&mut ws).await {
            WireMessage::Price(tick) => {
                assert_eq!(tick.source, SourceKind::Dex);
                assert_eq!(tick.pair, "ETH/USD");
                assert!(tick.injected_delay_ms <= 25);
                if let Some(prev) = last_seq {
                    assert_eq!(tick.sequence, prev + 1);
                }
                last_seq = Some(tick.sequence);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    drop(ws);
    stop.send(()).unwrap();
    tokio_test::assert_ok!(handle.await.unwrap());
}

#[tokio::test]
async fn test_dex_http_endpoints() {
    let (addr, stop, handle) = start(FeedKind::Dex).await;
    let client = reqwest::Client::new();

    let health = client.get(format!("http://{addr}/healthz")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.headers()["server"], "dex-sim");
    assert_eq!(health.headers()["access-control-allow-origin"], "https://dash.example");
    assert_eq!(health.text().await.unwrap(), "OK");

    // Wait for at least one tick to be broadcast
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snapshot: PriceSnapshot = client
        .get(format!("http://{addr}/prices/snapshot"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot.prices.len(), 1);
    assert!(snapshot.server_time > 0);

    let metrics = client
        .get(format!("http://{addr}/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("# TYPE price_ticks_generated counter"));
    assert!(metrics.contains("ws_frames_sent"));

    let missing = client
        .get(format!("http://{addr}/oracle/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    stop.send(()).unwrap();
    tokio_test::assert_ok!(handle.await.unwrap());
}

#[tokio::test]
async fn test_oracle_websocket_and_snapshot() {
    let (addr, stop, handle) = start(FeedKind::Oracle).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/prices")).await.unwrap();
    assert_eq!(
        next_message(&mut ws).await,
        WireMessage::subscribed("oracle_prices")
    );

    // Zero threshold: every candidate passes the gate
    match next_message(&mut ws).await {
        WireMessage::Price(tick) => assert_eq!(tick.source, SourceKind::Chainlink),
        other => panic!("unexpected {other:?}"),
    }

    let response = reqwest::get(format!("http://{addr}/oracle/snapshot")).await.unwrap();
    assert_eq!(response.headers()["server"], "oracle-sim");
    let snapshot: PriceSnapshot = response.json().await.unwrap();
    assert_eq!(snapshot.prices[0].source, SourceKind::Chainlink);

    drop(ws);
    stop.send(()).unwrap();
    tokio_test::assert_ok!(handle.await.unwrap());
}
