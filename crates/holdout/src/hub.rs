//! Fan-out of game events to connections.

use std::collections::HashMap;

use holdout_game::EventSink;
use holdout_protocol::{GameEvent, LobbyId, SessionId};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// A game event tagged with the lobby it belongs to.
#[derive(Debug, Clone)]
pub struct LobbyEvent {
    pub lobby_id: LobbyId,
    pub event: GameEvent,
}

/// [`EventSink`] that republishes every event on a broadcast channel.
///
/// Events only carry a session id, so the hub learns each session's lobby
/// from its `game_started` event and forgets it after `game_result`.
/// Connection tasks subscribe and keep the events for their own lobby.
pub struct EventHub {
    sender: broadcast::Sender<LobbyEvent>,
    routes: Mutex<HashMap<SessionId, LobbyId>>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            routes: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LobbyEvent> {
        self.sender.subscribe()
    }

    /// Drops the route of a session that was torn down before it finished.
    pub fn forget(&self, session_id: SessionId) {
        self.routes.lock().remove(&session_id);
    }

    fn route(&self, event: &GameEvent) -> Option<LobbyId> {
        let mut routes = self.routes.lock();
        match event {
            GameEvent::GameStarted { session, .. } => {
                routes.insert(session.id, session.lobby_id.clone());
                Some(session.lobby_id.clone())
            }
            GameEvent::GameResult(result) => routes.remove(&result.session.id),
            other => routes.get(&other.session_id()).cloned(),
        }
    }
}

impl EventSink for EventHub {
    fn emit(&self, event: GameEvent) {
        let Some(lobby_id) = self.route(&event) else {
            tracing::debug!(event = event.name(), session_id = %event.session_id(), "no route for event");
            return;
        };
        if !event.is_tick() {
            tracing::debug!(event = event.name(), %lobby_id, "broadcasting");
        }
        // No subscribers is fine.
        let _ = self.sender.send(LobbyEvent { lobby_id, event });
    }
}
