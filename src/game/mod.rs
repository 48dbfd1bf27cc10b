//! Game simulation modules

pub mod input;
pub mod physics;
pub mod snapshot;
pub mod world;

pub use input::InputRouter;
pub use world::WorldState;

/// Current input intent for a player.
///
/// Not a queue: each application overwrites the previous intent and the
/// next simulation tick consumes whatever is current.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputIntent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub fire: bool,
}
