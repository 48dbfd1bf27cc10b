//! Player directory - maps connection identities to players

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::game::physics::{FIRE_COOLDOWN, SHIP_SIZE};
use crate::game::InputIntent;
use crate::util::time::unix_millis;

/// Authoritative player state, keyed by the owning connection's id.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub name: String,

    // Position and movement
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub heading: f32,
    pub vel_x: f32,
    pub vel_y: f32,

    // Transient render hints
    pub show_tail: bool,

    // Firing
    pub fire_cooldown: f32,

    // Input tracking
    pub input: InputIntent,

    pub joined_at: u64,
}

impl Player {
    pub fn new(id: Uuid, name: String, x: f32, y: f32, heading: f32) -> Self {
        Self {
            id,
            name,
            x,
            y,
            size: SHIP_SIZE,
            heading,
            vel_x: 0.0,
            vel_y: 0.0,
            show_tail: false,
            fire_cooldown: FIRE_COOLDOWN,
            input: InputIntent::default(),
            joined_at: unix_millis(),
        }
    }
}

/// Login errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("connection {0} already has a player")]
    DuplicateLogin(Uuid),
}

/// Directory of logged-in players, at most one per live connection.
///
/// All mutation happens on the gateway task; the map is shared so the
/// health endpoint can read counts.
pub struct PlayerDirectory {
    players: DashMap<Uuid, Player>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self {
            players: DashMap::new(),
        }
    }

    /// Create a player for `conn_id`. Any display name is accepted;
    /// a second login on the same connection is rejected and the
    /// original player is left untouched.
    pub fn login(
        &self,
        conn_id: Uuid,
        name: &str,
        spawn: (f32, f32, f32),
    ) -> Result<Player, LoginError> {
        match self.players.entry(conn_id) {
            Entry::Occupied(_) => Err(LoginError::DuplicateLogin(conn_id)),
            Entry::Vacant(slot) => {
                let (x, y, heading) = spawn;
                let player = Player::new(conn_id, name.to_string(), x, y, heading);
                slot.insert(player.clone());
                Ok(player)
            }
        }
    }

    pub fn get(&self, conn_id: Uuid) -> Option<Player> {
        self.players.get(&conn_id).map(|p| p.value().clone())
    }

    /// Remove and return the player so the caller can notify peers.
    /// Absent means nothing to announce (e.g. disconnect before login).
    pub fn remove(&self, conn_id: Uuid) -> Option<Player> {
        self.players.remove(&conn_id).map(|(_, p)| p)
    }

    /// Snapshot of all players for broadcast, order unspecified.
    pub fn all_players(&self) -> Vec<Player> {
        self.players.iter().map(|p| p.value().clone()).collect()
    }

    /// Overwrite a player's current input intent. Returns false if the
    /// connection has no player (dropped silently by the caller).
    pub fn set_input(&self, conn_id: Uuid, intent: InputIntent) -> bool {
        match self.players.get_mut(&conn_id) {
            Some(mut player) => {
                player.input = intent;
                true
            }
            None => false,
        }
    }

    /// Run `f` over every player, used by the simulation tick.
    pub fn for_each_mut(&self, mut f: impl FnMut(&mut Player)) {
        for mut entry in self.players.iter_mut() {
            f(entry.value_mut());
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for PlayerDirectory {
    fn default() -> Self {
        Self::new()
    }
}
