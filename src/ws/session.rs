//! Server side of one WebSocket subscriber

use super::ChannelSink;
use crate::feed::FeedService;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

/// Serve one upgraded connection until either side goes away.
///
/// Frames reach the socket through a bounded channel sink of `buffer`
/// slots, so a slow client loses frames instead of stalling the feed.
/// Inbound messages are read only to notice the close.
pub async fn run_session(socket: WebSocket, feed: Arc<FeedService>, buffer: usize) {
    let (mut sender, mut receiver) = socket.split();
    let (sink, mut frames) = ChannelSink::new(buffer);

    let id = match feed.register_subscriber(Arc::new(sink)) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(feed = %feed.kind(), error = %e, "Failed to acknowledge subscriber");
            return;
        }
    };

    tracing::info!(
        feed = %feed.kind(),
        subscriber = %id,
        total = feed.subscriber_count(),
        "WebSocket client connected"
    );

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(subscriber = %id, error = %e, "WebSocket read error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            _ = &mut writer => break,
        }
    }

    feed.unregister_subscriber(&id);
    writer.abort();

    tracing::info!(
        feed = %feed.kind(),
        subscriber = %id,
        total = feed.subscriber_count(),
        "WebSocket client disconnected"
    );
}
