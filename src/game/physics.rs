//! Ship and bullet movement constraints

use crate::session::directory::Player;

/// Turn rate in radians per second
pub const TURN_RATE: f32 = 4.0;
/// Thrust acceleration in units per second squared
pub const THRUST_ACCEL: f32 = 260.0;
/// Per-tick velocity retention (drag)
pub const DRAG: f32 = 0.985;
/// Maximum ship speed
pub const MAX_SPEED: f32 = 350.0;
/// Ship hull radius
pub const SHIP_SIZE: f32 = 15.0;
/// Seconds between shots
pub const FIRE_COOLDOWN: f32 = 0.25;
/// Bullet travel speed
pub const BULLET_SPEED: f32 = 520.0;
/// Bullet lifetime in seconds
pub const BULLET_LIFETIME: f32 = 1.2;

/// Physics system for updating ships and resolving simple collisions.
/// Canvas coordinates: y grows downward, so turning left means a
/// decreasing heading.
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Integrate one ship by a fixed time step.
    pub fn update_ship(player: &mut Player, bounds: (f32, f32), dt: f32) {
        let input = player.input;

        let steer = (input.right as i32 - input.left as i32) as f32;
        player.heading =
            (player.heading + steer * TURN_RATE * dt).rem_euclid(std::f32::consts::TAU);

        if input.up {
            player.vel_x += player.heading.cos() * THRUST_ACCEL * dt;
            player.vel_y += player.heading.sin() * THRUST_ACCEL * dt;
        }
        player.show_tail = input.up;

        player.vel_x *= DRAG;
        player.vel_y *= DRAG;

        let speed = (player.vel_x * player.vel_x + player.vel_y * player.vel_y).sqrt();
        if speed > MAX_SPEED {
            let scale = MAX_SPEED / speed;
            player.vel_x *= scale;
            player.vel_y *= scale;
        }

        player.x = Self::wrap(player.x + player.vel_x * dt, bounds.0);
        player.y = Self::wrap(player.y + player.vel_y * dt, bounds.1);

        player.fire_cooldown = (player.fire_cooldown - dt).max(0.0);
    }

    /// Toroidal wrap of a coordinate into [0, max).
    pub fn wrap(value: f32, max: f32) -> f32 {
        value.rem_euclid(max)
    }

    /// Triangle hull for a ship, rotated by `heading`, relative to the
    /// ship's center.
    pub fn ship_vertices(size: f32, heading: f32) -> Vec<[f32; 2]> {
        const REAR_SPREAD: f32 = 2.5; // radians off the nose
        [heading, heading + REAR_SPREAD, heading - REAR_SPREAD]
            .iter()
            .map(|angle| [angle.cos() * size, angle.sin() * size])
            .collect()
    }

    /// Short line segment along a bullet's heading, relative to its center.
    pub fn bullet_vertices(heading: f32) -> Vec<[f32; 2]> {
        const HALF_LENGTH: f32 = 4.0;
        let dx = heading.cos() * HALF_LENGTH;
        let dy = heading.sin() * HALF_LENGTH;
        vec![[dx, dy], [-dx, -dy]]
    }

    /// Circle overlap test used for bullet/asteroid hits.
    pub fn circles_overlap(x1: f32, y1: f32, r1: f32, x2: f32, y2: f32, r2: f32) -> bool {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let combined = r1 + r2;
        dx * dx + dy * dy <= combined * combined
    }
}
