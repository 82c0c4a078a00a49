use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::{
    dto::sse::{AdminHandshake, Handshake, ServerEvent},
    error::ServiceError,
    state::{SharedState, SseHub},
};

/// Subscribe to the shared public SSE stream.
pub fn subscribe_public(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.public_sse().subscribe()
}

/// Subscribe to the operator-only SSE stream, claiming the admin token.
pub async fn subscribe_admin(
    state: &SharedState,
) -> Result<(broadcast::Receiver<ServerEvent>, String), ServiceError> {
    let token = claim_admin_token(state).await?;
    let receiver = state.admin_sse().subscribe();
    Ok((receiver, token))
}

/// Identifies the target SSE stream so teardown can run stream-specific
/// bookkeeping once the connection drops.
#[derive(Clone)]
pub enum StreamKind {
    /// Public display stream; teardown only logs.
    Public,
    /// Operator stream; carries the shared state so the admin token can be
    /// released after the forwarder task finishes.
    Admin(SharedState),
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // Forwarder task between the broadcast hub and the response channel; it
    // outlives the request context, so teardown happens here.
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                received = receiver.recv() => {
                    match received {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }
                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        // Skip lagged messages but keep the stream alive.
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }

        match kind {
            StreamKind::Public => tracing::info!("public SSE stream disconnected"),
            StreamKind::Admin(state) => {
                reset_admin_token(state).await;
                tracing::info!("admin SSE stream disconnected");
            }
        }
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Reserve the admin token for a new stream, generating one when none exists
/// and failing if another connection already holds it.
async fn claim_admin_token(state: &SharedState) -> Result<String, ServiceError> {
    let mut guard = state.admin_token().lock().await;
    match &mut *guard {
        slot @ None => {
            let token = Uuid::new_v4().simple().to_string();
            slot.replace(token.clone());
            Ok(token)
        }
        Some(_) => Err(ServiceError::Unauthorized(
            "another admin SSE stream is already active".into(),
        )),
    }
}

/// Clear the stored admin token so the next operator connection negotiates a
/// fresh credential.
async fn reset_admin_token(state: SharedState) {
    let mut guard = state.admin_token().lock().await;
    guard.take();
}

/// Send the connection handshake onto the public stream.
pub fn broadcast_public_handshake(state: &SharedState, hub: &SseHub) {
    let payload = Handshake {
        stream: "public".into(),
        game_id: state.game_id(),
        message: "subscribed to round updates".into(),
    };
    if let Ok(event) = ServerEvent::json(Some("handshake".to_string()), &payload) {
        hub.broadcast(event);
    }
}

/// Send the freshly claimed token onto the admin stream.
pub fn broadcast_admin_handshake(hub: &SseHub, token: &str) {
    let payload = AdminHandshake {
        token: token.to_string(),
    };
    if let Ok(event) = ServerEvent::json(Some("admin_token".to_string()), &payload) {
        hub.broadcast(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, clock::ManualClock},
        store::memory::MemoryStore,
    };

    fn test_state() -> SharedState {
        AppState::new(
            AppConfig::default(),
            Uuid::new_v4(),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::at(0)),
        )
    }

    #[tokio::test]
    async fn only_one_admin_stream_at_a_time() {
        let state = test_state();

        let (_receiver, token) = subscribe_admin(&state).await.unwrap();
        assert!(!token.is_empty());

        let err = subscribe_admin(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        // Releasing the token lets the next operator in.
        reset_admin_token(state.clone()).await;
        assert!(subscribe_admin(&state).await.is_ok());
    }
}
