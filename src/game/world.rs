//! Authoritative world state: asteroids and bullets, plus the per-tick
//! integration of the live player set.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::session::directory::PlayerDirectory;
use crate::ws::protocol::GameDataDto;

use super::physics::{PhysicsSystem, BULLET_LIFETIME, BULLET_SPEED, FIRE_COOLDOWN};
use super::snapshot::SnapshotBuilder;

/// Asteroid population the world keeps topped up
pub const ASTEROID_TARGET: usize = 5;
/// Asteroids smaller than this despawn instead of splitting when hit
const ASTEROID_MIN_SPLIT: f32 = 24.0;
const ASTEROID_VERTEX_COUNT: usize = 10;

/// Drifting, spinning irregular polygon.
#[derive(Debug, Clone)]
pub struct Asteroid {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub rotation: f32,
    pub spin: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub vertices: Vec<[f32; 2]>,
}

impl Asteroid {
    fn generate(rng: &mut ChaCha8Rng, x: f32, y: f32, max_size: f32) -> Self {
        let min_size = max_size * 0.6;

        let mut vertices = Vec::with_capacity(ASTEROID_VERTEX_COUNT);
        for i in 0..ASTEROID_VERTEX_COUNT {
            let angle = i as f32 / ASTEROID_VERTEX_COUNT as f32 * std::f32::consts::TAU;
            let radius = rng.gen_range(min_size..max_size);
            vertices.push([angle.cos() * radius, angle.sin() * radius]);
        }

        let drift_angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let drift_speed = rng.gen_range(20.0..60.0);

        Self {
            id: Uuid::new_v4(),
            x,
            y,
            vel_x: drift_angle.cos() * drift_speed,
            vel_y: drift_angle.sin() * drift_speed,
            rotation: rng.gen_range(0.0..std::f32::consts::TAU),
            spin: rng.gen_range(-1.0..1.0),
            min_size,
            max_size,
            vertices,
        }
    }

    /// Collision radius, the mean of the outline bounds.
    pub fn radius(&self) -> f32 {
        (self.min_size + self.max_size) * 0.5
    }
}

/// Short-lived projectile fired by a player.
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: Uuid,
    pub shooter_id: Uuid,
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub age: f32,
}

/// The authoritative simulation state.
///
/// Owns asteroids and bullets; reads and writes players through the
/// directory. All randomness flows through a seeded RNG so a given seed
/// reproduces the same world.
pub struct WorldState {
    pub width: f32,
    pub height: f32,
    pub asteroids: Vec<Asteroid>,
    pub bullets: Vec<Bullet>,
    pub tick_count: u64,
    rng: ChaCha8Rng,
}

impl WorldState {
    pub fn new(width: f32, height: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let asteroids = (0..ASTEROID_TARGET)
            .map(|_| {
                let x = rng.gen_range(0.0..width);
                let y = rng.gen_range(0.0..height);
                let max_size = rng.gen_range(30.0..50.0);
                Asteroid::generate(&mut rng, x, y, max_size)
            })
            .collect();

        Self {
            width,
            height,
            asteroids,
            bullets: Vec::new(),
            tick_count: 0,
            rng,
        }
    }

    /// Fixed world dimensions, constant for the process lifetime.
    pub fn bounds(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Pick a spawn position and heading for a new player, away from the
    /// world edges.
    pub fn spawn_point(&mut self) -> (f32, f32, f32) {
        let x = self.rng.gen_range(self.width * 0.25..self.width * 0.75);
        let y = self.rng.gen_range(self.height * 0.25..self.height * 0.75);
        let heading = self.rng.gen_range(0.0..std::f32::consts::TAU);
        (x, y, heading)
    }

    /// Advance the simulation by one fixed step. Touches no
    /// connection/subscription bookkeeping and leaves every collection in
    /// a consistent state before returning.
    pub fn tick(&mut self, directory: &PlayerDirectory, dt: f32) {
        self.tick_count += 1;

        let fired = self.integrate_players(directory, dt);
        self.bullets.extend(fired);

        self.update_bullets(dt);
        self.update_asteroids(dt);
        self.resolve_collisions();
        self.replenish_asteroids();
    }

    /// Produce the immutable broadcast view. The DTO tree is fully owned,
    /// later mutations of live state cannot reach it.
    pub fn snapshot(&self, directory: &PlayerDirectory) -> GameDataDto {
        SnapshotBuilder::build(self, directory)
    }

    fn integrate_players(&mut self, directory: &PlayerDirectory, dt: f32) -> Vec<Bullet> {
        let bounds = self.bounds();
        let mut fired = Vec::new();

        directory.for_each_mut(|player| {
            PhysicsSystem::update_ship(player, bounds, dt);

            if player.input.fire && player.fire_cooldown <= 0.0 {
                let nose = player.size + 4.0;
                fired.push(Bullet {
                    id: Uuid::new_v4(),
                    shooter_id: player.id,
                    x: player.x + player.heading.cos() * nose,
                    y: player.y + player.heading.sin() * nose,
                    heading: player.heading,
                    age: 0.0,
                });
                player.fire_cooldown = FIRE_COOLDOWN;
            }
        });

        fired
    }

    fn update_bullets(&mut self, dt: f32) {
        let (width, height) = (self.width, self.height);
        let step = BULLET_SPEED * dt;
        for bullet in &mut self.bullets {
            bullet.age += dt;
            bullet.x = PhysicsSystem::wrap(bullet.x + bullet.heading.cos() * step, width);
            bullet.y = PhysicsSystem::wrap(bullet.y + bullet.heading.sin() * step, height);
        }
        self.bullets.retain(|b| b.age < BULLET_LIFETIME);
    }

    fn update_asteroids(&mut self, dt: f32) {
        let (width, height) = (self.width, self.height);
        for asteroid in &mut self.asteroids {
            asteroid.x = PhysicsSystem::wrap(asteroid.x + asteroid.vel_x * dt, width);
            asteroid.y = PhysicsSystem::wrap(asteroid.y + asteroid.vel_y * dt, height);
            asteroid.rotation =
                (asteroid.rotation + asteroid.spin * dt).rem_euclid(std::f32::consts::TAU);
        }
    }

    /// Bullet/asteroid hits: both despawn, large asteroids split in two.
    fn resolve_collisions(&mut self) {
        let mut survivors = Vec::with_capacity(self.asteroids.len());
        let mut children = Vec::new();

        for asteroid in self.asteroids.drain(..) {
            let hit = self.bullets.iter().position(|b| {
                let radius = asteroid.radius();
                PhysicsSystem::circles_overlap(b.x, b.y, 2.0, asteroid.x, asteroid.y, radius)
            });

            match hit {
                Some(bullet_idx) => {
                    self.bullets.swap_remove(bullet_idx);
                    if asteroid.max_size >= ASTEROID_MIN_SPLIT {
                        let child_size = asteroid.max_size * 0.6;
                        for _ in 0..2 {
                            children.push(Asteroid::generate(
                                &mut self.rng,
                                asteroid.x,
                                asteroid.y,
                                child_size,
                            ));
                        }
                    }
                }
                None => survivors.push(asteroid),
            }
        }

        survivors.extend(children);
        self.asteroids = survivors;
    }

    /// Top the field back up by spawning at the world edge.
    fn replenish_asteroids(&mut self) {
        while self.asteroids.len() < ASTEROID_TARGET {
            let max_size = self.rng.gen_range(30.0..50.0);
            let (x, y) = if self.rng.gen_bool(0.5) {
                (self.rng.gen_range(0.0..self.width), 0.0)
            } else {
                (0.0, self.rng.gen_range(0.0..self.height))
            };
            let asteroid = Asteroid::generate(&mut self.rng, x, y, max_size);
            self.asteroids.push(asteroid);
        }
    }
}
