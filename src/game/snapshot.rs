//! Snapshot building - deep-copied broadcast views of world state

use crate::session::directory::{Player, PlayerDirectory};
use crate::ws::protocol::{AsteroidDto, BulletDto, GameDataDto, PlayerDto};

use super::physics::PhysicsSystem;
use super::world::{Asteroid, Bullet, WorldState};

/// Builds the owned DTO tree sent to game data subscribers.
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn build(world: &WorldState, directory: &PlayerDirectory) -> GameDataDto {
        GameDataDto {
            players: directory
                .all_players()
                .iter()
                .map(Self::player_dto)
                .collect(),
            asteroids: world.asteroids.iter().map(Self::asteroid_dto).collect(),
            bullets: world.bullets.iter().map(Self::bullet_dto).collect(),
            canvas_width: world.width,
            canvas_height: world.height,
        }
    }

    pub fn player_dto(player: &Player) -> PlayerDto {
        PlayerDto {
            id: player.id,
            name: player.name.clone(),
            x: player.x,
            y: player.y,
            size: player.size,
            heading: player.heading,
            vertices: PhysicsSystem::ship_vertices(player.size, player.heading),
            show_tail: player.show_tail,
        }
    }

    fn asteroid_dto(asteroid: &Asteroid) -> AsteroidDto {
        AsteroidDto {
            id: asteroid.id,
            x: asteroid.x,
            y: asteroid.y,
            rotation: asteroid.rotation,
            min_size: asteroid.min_size,
            max_size: asteroid.max_size,
            vertices: asteroid.vertices.clone(),
        }
    }

    fn bullet_dto(bullet: &Bullet) -> BulletDto {
        BulletDto {
            id: bullet.id,
            x: bullet.x,
            y: bullet.y,
            heading: bullet.heading,
            vertices: PhysicsSystem::bullet_vertices(bullet.heading),
        }
    }
}
