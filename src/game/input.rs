//! Input router - applies inbound intents to the owning player

use tracing::debug;
use uuid::Uuid;

use crate::session::directory::PlayerDirectory;

use super::InputIntent;

/// Routes per-connection input to the corresponding player.
pub struct InputRouter;

impl InputRouter {
    /// Overwrite the player's current intent. Input for a connection with
    /// no player is dropped: it can arrive before login completes or after
    /// disconnect, neither is an error. No queuing, no rate limiting.
    pub fn apply(directory: &PlayerDirectory, conn_id: Uuid, intent: InputIntent) {
        if !directory.set_input(conn_id, intent) {
            debug!(conn_id = %conn_id, "Input for unknown player dropped");
        }
    }
}
