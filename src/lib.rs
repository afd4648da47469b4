//! feed-sim: deterministic DEX and Oracle price feed simulator
//!
//! This library provides the core components for:
//! - Labeled, seed-derived random streams
//! - GBM and jump-diffusion price processes
//! - Oracle deviation/heartbeat publish gating
//! - Drop/duplicate fault injection
//! - WebSocket fan-out to independent subscribers
//! - HTTP surface (health, metrics, snapshot)
//! - A tap client for inspecting a running feed

pub mod cli;
pub mod config;
pub mod feed;
pub mod model;
pub mod rng;
pub mod server;
pub mod telemetry;
pub mod ws;
