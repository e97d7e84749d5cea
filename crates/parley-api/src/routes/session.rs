//! # Dispute Session Route
//!
//! `GET /v1/disputes/{id}/session` upgrades to a WebSocket that streams the
//! dispute's bid events as JSON text frames, e.g.
//! `{"type":"BID_ACCEPTED","dispute_id":1,"bid_id":2}`.
//!
//! The socket is one-way: client frames other than close are ignored. A
//! client that reconnects must re-fetch the dispute, since events published
//! while it was away are not replayed.

use axum::extract::rejection::PathRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::extractors::extract_path;
use crate::session::SessionStream;
use crate::state::AppState;

/// Build the session router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/disputes/{id}/session", get(join_session))
}

/// GET /v1/disputes/{id}/session: join the dispute's realtime session.
#[utoipa::path(
    get,
    path = "/v1/disputes/{id}/session",
    params(("id" = i64, Path, description = "Dispute ID")),
    responses(
        (status = 101, description = "Switching to WebSocket; frames carry BidEvent JSON", body = crate::session::BidEvent),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
    ),
    tag = "sessions"
)]
pub async fn join_session(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let id = extract_path(path)?;
    let ledger = state.gateway.get_dispute(id).await?;
    // Subscribe before upgrading so events committed during the handshake are kept.
    let stream = state.sessions.subscribe(ledger.dispute.id);
    Ok(ws.on_upgrade(move |socket| forward_events(socket, stream)))
}

async fn forward_events(mut socket: WebSocket, mut stream: SessionStream) {
    tracing::info!(channel = %stream.channel(), "session participant connected");

    loop {
        tokio::select! {
            event = stream.next() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode session event");
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!(channel = %stream.channel(), "session participant disconnected");
}
