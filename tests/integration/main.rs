//! Integration tests

mod feed_pipeline;
mod server_e2e;
