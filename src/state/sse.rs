//! Broadcast hubs feeding the SSE render streams.

use tokio::sync::{Mutex, broadcast};

use crate::dto::sse::ServerEvent;

/// SSE sub-state carved out of [`super::AppState`]: one hub for every
/// connected display client and one for the operator console, plus the token
/// coordinating the single operator connection.
pub struct SseState {
    public: SseHub,
    admin: SseHub,
    admin_token: Mutex<Option<String>>,
}

impl SseState {
    /// Build both hubs with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            public: SseHub::new(capacity),
            admin: SseHub::new(capacity),
            admin_token: Mutex::new(None),
        }
    }

    /// Hub fanning events out to every connected client.
    pub fn public(&self) -> &SseHub {
        &self.public
    }

    /// Hub reserved for the operator console.
    pub fn admin(&self) -> &SseHub {
        &self.admin
    }

    /// Token slot guaranteeing a single operator stream at a time.
    pub fn admin_token(&self) -> &Mutex<Option<String>> {
        &self.admin_token
    }
}

/// Broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a hub backed by a Tokio broadcast channel.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a subscriber receiving all subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
