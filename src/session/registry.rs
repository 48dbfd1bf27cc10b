//! Connection registry - live connections and their subscription flags

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Outbound channel capacity per connection. A slow client lags and the
/// writer task skips the oldest messages rather than stalling the tick.
pub const OUTBOUND_BUFFER: usize = 64;

/// Per-connection bookkeeping. The transport owns the socket; the registry
/// only holds the outbound sender and the opt-in flags.
struct ConnectionEntry {
    outbound: broadcast::Sender<ServerMsg>,
    wants_game_data: bool,
    wants_project_data: bool,
}

/// Registry of live connections.
///
/// Mutation is serialized through the gateway task; the map is shared so
/// the health endpoint can read counts.
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Add a connection with all subscription flags off. Idempotent:
    /// re-registering an existing connection keeps its flags.
    pub fn register(&self, conn_id: Uuid, outbound: broadcast::Sender<ServerMsg>) {
        self.connections.entry(conn_id).or_insert(ConnectionEntry {
            outbound,
            wants_game_data: false,
            wants_project_data: false,
        });
    }

    /// Remove all trace of the connection. Returns false if it was
    /// already gone.
    pub fn unregister(&self, conn_id: Uuid) -> bool {
        self.connections.remove(&conn_id).is_some()
    }

    /// Flip the game data flag; unknown connections are a no-op since
    /// subscribe can race a disconnect.
    pub fn set_game_data(&self, conn_id: Uuid, enabled: bool) {
        if let Some(mut entry) = self.connections.get_mut(&conn_id) {
            entry.wants_game_data = enabled;
        }
    }

    pub fn set_project_data(&self, conn_id: Uuid, enabled: bool) {
        if let Some(mut entry) = self.connections.get_mut(&conn_id) {
            entry.wants_project_data = enabled;
        }
    }

    /// Current snapshot of game data subscribers, order unspecified.
    pub fn subscribed_to_game_data(&self) -> Vec<Uuid> {
        self.connections
            .iter()
            .filter(|e| e.wants_game_data)
            .map(|e| *e.key())
            .collect()
    }

    pub fn subscribed_to_project_data(&self) -> Vec<Uuid> {
        self.connections
            .iter()
            .filter(|e| e.wants_project_data)
            .map(|e| *e.key())
            .collect()
    }

    /// Push a message to one connection. Failures (connection gone, writer
    /// task dead) are logged and swallowed; the caller keeps going.
    pub fn send_to(&self, conn_id: Uuid, msg: ServerMsg) -> bool {
        match self.connections.get(&conn_id) {
            Some(entry) => match entry.outbound.send(msg) {
                Ok(_) => true,
                Err(_) => {
                    debug!(conn_id = %conn_id, "Outbound push failed, writer gone");
                    false
                }
            },
            None => {
                debug!(conn_id = %conn_id, "Push to unknown connection dropped");
                false
            }
        }
    }

    /// Fan a message out to every registered connection except `exclude`.
    pub fn broadcast_except(&self, exclude: Uuid, msg: &ServerMsg) {
        for entry in self.connections.iter() {
            if *entry.key() == exclude {
                continue;
            }
            if entry.outbound.send(msg.clone()).is_err() {
                debug!(conn_id = %entry.key(), "Fan-out push failed, writer gone");
            }
        }
    }

    pub fn contains(&self, conn_id: Uuid) -> bool {
        self.connections.contains_key(&conn_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
