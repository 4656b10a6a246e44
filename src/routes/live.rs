//! Live capture endpoint.
//!
//! GET /live
//! Upgrades to a WebSocket and streams one JSON record per captured frame.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;

use crate::capture::LiveSource;
use crate::config::AppState;
use crate::domain::{Record, StreamError};
use crate::error::{AppError, AppResult, CaptureError};
use crate::session::{pump, LiveSession, SessionState, SinkClosed};

/// Handle GET /live
///
/// Rejects origins outside the configured policy before looking at the
/// upgrade itself.
pub async fn handle_live(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> AppResult<Response> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());

    if !state.config().origin_policy.allows(origin) {
        return Err(AppError::Forbidden(format!(
            "Origin not allowed: {}",
            origin.unwrap_or_default()
        )));
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::warn!("WebSocket upgrade error: {}", rejection);
            return Ok(rejection.into_response());
        }
    };

    let session = LiveSession::new(state.config().capture_interface());

    Ok(ws
        .on_failed_upgrade(|e| tracing::warn!("WebSocket upgrade error: {}", e))
        .on_upgrade(move |socket| stream_capture(socket, session)))
}

/// Drive one live capture session until the source ends or the client leaves.
async fn stream_capture(mut socket: WebSocket, mut session: LiveSession) {
    session.transition(SessionState::Capturing);
    tracing::info!("Starting capture on device: {}", session.interface());

    let interface = session.interface().to_string();
    let opened = tokio::task::spawn_blocking(move || {
        tracing::info!("Available devices:");
        for iface in LiveSource::list_interfaces() {
            tracing::info!("  - {}", iface);
        }
        LiveSource::open(&interface)
    })
    .await
    .unwrap_or_else(|e| Err(CaptureError::ChannelCreation(e.to_string())));

    let mut source = match opened {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!("Error opening device {}: {}", session.interface(), e);
            send_device_error(&mut socket, session.interface()).await;
            session.transition(SessionState::Closed);
            return;
        }
    };

    tracing::info!("Successfully opened device: {}", source.interface_name());

    // Capacity 1: a slow client stalls the capture read rather than
    // queueing records here.
    let (tx, mut rx) = mpsc::channel::<Record>(1);
    let interface = session.interface().to_string();
    tokio::task::spawn_blocking(move || {
        let summary = pump(&mut source, |record| {
            tx.blocking_send(record).map_err(|_| SinkClosed)
        });
        tracing::info!(
            "[{}] capture loop ended after {} frames, {} records ({:?})",
            interface,
            summary.frames,
            summary.records,
            summary.end
        );
    });

    while let Some(record) = rx.recv().await {
        let text = match serde_json::to_string(&record) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to serialize record: {}", e);
                break;
            }
        };
        if let Err(e) = socket.send(Message::Text(text.into())).await {
            tracing::debug!("Error writing to WebSocket: {}", e);
            break;
        }
    }

    session.transition(SessionState::Draining);
    // Dropping the receiver makes the capture thread's next send fail,
    // which releases the device.
    drop(rx);
    let _ = socket.send(Message::Close(None)).await;
    session.transition(SessionState::Closed);
}

/// Send the single `{"error": ...}` message, then close the socket.
async fn send_device_error(socket: &mut WebSocket, interface: &str) {
    match serde_json::to_string(&StreamError::device_unavailable(interface)) {
        Ok(text) => {
            if let Err(e) = socket.send(Message::Text(text.into())).await {
                tracing::debug!("Error writing to WebSocket: {}", e);
            }
        }
        Err(e) => tracing::error!("Failed to serialize stream error: {}", e),
    }
    let _ = socket.send(Message::Close(None)).await;
}
