//! Status publisher: dashboard and JSON endpoint
//!
//! Handlers only read the latest published snapshot. They never touch the
//! bridge, so a slow or faulted bus cannot stall a request.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chargewatch_engine::{LinkStatus, PortSnapshot, SLOT_COUNT, SlotSnapshot, SlotState, SnapshotReader};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info};

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Debug, Clone)]
pub struct AppState {
    reader: SnapshotReader,
    notifications_enabled: bool,
}

impl AppState {
    pub fn new(reader: SnapshotReader, notifications_enabled: bool) -> Self {
        Self {
            reader,
            notifications_enabled,
        }
    }
}

/// One slot in the JSON status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    /// 1-based, as printed on the charger.
    pub slot: usize,
    pub state: SlotState,
    /// `true` when the red LED is lit. `None` before the first reading.
    pub charging_led: Option<bool>,
    /// `true` when the green LED is lit.
    pub full_led: Option<bool>,
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    /// When the last poll cycle finished, successful or not.
    pub timestamp: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub stale: bool,
    pub link: LinkStatus,
    pub port_raw: Option<u16>,
    pub slots: Vec<SlotStatus>,
    pub summary: String,
    pub notifications_enabled: bool,
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn from_snapshot(snapshot: &SlotSnapshot, notifications_enabled: bool) -> Self {
        let slots = (0..SLOT_COUNT)
            .map(|i| {
                let lit = snapshot.led_levels(i).map(|(charging, full)| (!charging, !full));
                SlotStatus {
                    slot: i + 1,
                    state: snapshot.states[i],
                    charging_led: lit.map(|(charging, _)| charging),
                    full_led: lit.map(|(_, full)| full),
                }
            })
            .collect();

        Self {
            timestamp: snapshot.checked_at,
            updated_at: snapshot.updated_at,
            stale: snapshot.stale,
            link: snapshot.link,
            port_raw: snapshot.port.map(PortSnapshot::raw),
            slots,
            summary: snapshot.summary(),
            notifications_enabled,
            error: snapshot.error.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/status", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// 503 while the charger cannot be read at all, 200 otherwise (stale
/// readings included).
async fn status_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.reader.get_snapshot();
    let body = StatusResponse::from_snapshot(&snapshot, state.notifications_enabled);
    let code = if snapshot.is_available() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(body)).into_response()
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Serve until `shutdown` fires or its sender is dropped.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!(%addr, "Status server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            if let Err(e) = shutdown.recv().await {
                debug!(error = %e, "Shutdown channel closed");
            }
        })
        .await
        .context("Status server failed")?;

    info!("Status server stopped");
    Ok(())
}
