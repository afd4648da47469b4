//! HTTP and WebSocket surface of one feed
//!
//! Every feed listens on its own address and serves:
//! - `GET /healthz`
//! - `GET /metrics` (Prometheus text of the feed's counters)
//! - `GET /prices/snapshot` or `/oracle/snapshot`
//! - WebSocket upgrade on `/ws/ticks` or `/ws/prices`

use crate::config::Config;
use crate::feed::{FeedKind, FeedService, SchedulerSettings, TickScheduler};
use crate::telemetry::FeedCounters;
use crate::ws::run_session;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, SERVER};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    feed: Arc<FeedService>,
    server_name: HeaderValue,
    cors_origin: HeaderValue,
    subscriber_buffer: usize,
}

impl AppState {
    pub fn new(feed: Arc<FeedService>, cors_origin: &str, subscriber_buffer: usize) -> Self {
        let cors_origin = HeaderValue::from_str(cors_origin).unwrap_or_else(|_| {
            tracing::warn!(origin = cors_origin, "Invalid CORS origin, using *");
            HeaderValue::from_static("*")
        });
        Self {
            server_name: HeaderValue::from_static(feed.kind().server_name()),
            feed,
            cors_origin,
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }
}

/// Routes for the state's feed
pub fn router(state: AppState) -> Router {
    let kind = state.feed.kind();

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route(kind.snapshot_path(), get(snapshot))
        .route(kind.ws_path(), get(ws_upgrade))
        .layer(middleware::map_response_with_state(
            state.clone(),
            stamp_headers,
        ))
        .with_state(state)
}

async fn stamp_headers(State(state): State<AppState>, mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(SERVER, state.server_name.clone());
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, state.cors_origin.clone());
    response
}

async fn healthz() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.feed.counters().render(),
    )
}

async fn snapshot(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.feed.snapshot())
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let feed = state.feed.clone();
    let buffer = state.subscriber_buffer;
    ws.on_upgrade(move |socket| run_session(socket, feed, buffer))
}

/// A bound feed: listener, routes and the scheduler that will drive it
pub struct FeedServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    feed: Arc<FeedService>,
    router: Router,
    scheduler: TickScheduler,
}

impl FeedServer {
    /// Build the `kind` feed from `config` and bind it to `addr`
    pub async fn bind(config: &Config, kind: FeedKind, addr: SocketAddr) -> anyhow::Result<Self> {
        let counters = Arc::new(FeedCounters::new());
        let feed = Arc::new(FeedService::from_config(config, kind, counters)?);

        let subscriber_buffer = match kind {
            FeedKind::Dex => config.dex.subscriber_buffer,
            FeedKind::Oracle => config.oracle.subscriber_buffer,
        };
        let state = AppState::new(feed.clone(), config.server.cors_origin(), subscriber_buffer);

        let scheduler = TickScheduler::new(
            feed.clone(),
            SchedulerSettings::from_config(config, kind),
            config.server.seed,
        );

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            feed,
            router: router(state),
            scheduler,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn feed(&self) -> Arc<FeedService> {
        self.feed.clone()
    }

    /// Start ticking and serve until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let kind = self.feed.kind();
        tracing::info!(
            feed = %kind,
            addr = %self.local_addr,
            ws = kind.ws_path(),
            "Feed server listening"
        );

        let ticker = tokio::spawn(self.scheduler.run());

        let result = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;

        ticker.abort();
        tracing::info!(feed = %kind, "Feed server stopped");

        result.map_err(Into::into)
    }
}
