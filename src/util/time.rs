//! Time utilities for game simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Tick rate configuration
pub const GAME_TPS: u32 = 60; // simulation and broadcast rate
pub const TICK_DURATION: Duration = Duration::from_micros(1_000_000 / GAME_TPS as u64);

/// Fixed delta time for the simulation (in seconds).
///
/// The tick loop always advances by exactly one period regardless of how
/// late the timer fired, so the effective rate drifts lower under load
/// instead of catching up. Known limitation, kept on purpose.
pub fn tick_delta() -> f32 {
    1.0 / GAME_TPS as f32
}
