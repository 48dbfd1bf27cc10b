//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request login with a display name
    PlayerLoggingIn { name: String },

    /// Subscribe to the periodic world snapshot stream
    StartReceivingGameData,

    /// Unsubscribe from the snapshot stream
    StopReceivingGameData,

    /// Current input intent, latest write wins
    PlayerInput {
        left: bool,
        right: bool,
        up: bool,
        fire: bool,
    },

    /// Subscribe to the project selection side feed
    StartReceivingProjectSelectionData,

    /// Unsubscribe from the project selection feed
    StopReceivingProjectSelectionData,

    /// Request root access for the project feed
    RequestRoot { password: String },

    /// Give up root access
    RequestUnroot,

    /// Close a project to visitors (root only)
    LockProject { num: u32 },

    /// Reopen a project (root only)
    UnlockProject { num: u32 },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Private login acknowledgment
    YouLoggedIn { player: PlayerDto },

    /// Fan-out announcement to everyone else
    NewPlayerJoined { player: PlayerDto },

    /// Fan-out on disconnect, carries the last known player
    PlayerSignedOut { player: PlayerDto },

    /// Periodic world snapshot, ~60/s for subscribed connections
    GameData(GameDataDto),

    /// Project selection feed, sent on subscribe and on changes
    ProjectSelection(ProjectSelectionDto),

    /// Outcome of a root side-channel request
    RootMessage { message: RootMessageDto },

    /// Request-level error, connection stays usable
    Error { code: String, message: String },
}

/// Full world snapshot payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDataDto {
    pub players: Vec<PlayerDto>,
    pub asteroids: Vec<AsteroidDto>,
    pub bullets: Vec<BulletDto>,
    pub canvas_width: f32,
    pub canvas_height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: Uuid,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// Heading in radians, canvas coordinates (y grows downward)
    pub heading: f32,
    /// Hull polygon rotated by the current heading, relative to (x, y)
    pub vertices: Vec<[f32; 2]>,
    pub show_tail: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsteroidDto {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub min_size: f32,
    pub max_size: f32,
    /// Unrotated outline, the client applies `rotation`
    pub vertices: Vec<[f32; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletDto {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub vertices: Vec<[f32; 2]>,
}

/// Project selection side feed payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSelectionDto {
    pub is_root: bool,
    pub previews: Vec<ProjectPreviewDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPreviewDto {
    pub num: u32,
    pub name: String,
    pub is_open: bool,
}

/// Root side-channel outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootMessageDto {
    RootRequestAccepted,
    RootRequestDenied,
    Unrooted,
    ProjectLocked,
    ProjectUnlocked,
    PermissionDenied,
}
