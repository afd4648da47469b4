//! WebSocket error types

use thiserror::Error;

/// Transport errors of the feed consumer
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Gave up after {0} failed connection attempts")]
    RetriesExhausted(u32),
}

/// Failure to hand one frame to one subscriber
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeliveryError {
    #[error("subscriber buffer full")]
    Full,
    #[error("subscriber closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}
