//! Session core: connection registry, player directory and the gateway
//! event loop that ties them to the world simulation.

pub mod directory;
pub mod gateway;
pub mod registry;

pub use directory::{LoginError, Player, PlayerDirectory};
pub use gateway::{GatewayHandle, SessionEvent, SessionGateway};
pub use registry::ConnectionRegistry;
