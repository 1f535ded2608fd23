//! Arena layout: spawn points, boost pads and drop zones

use rand::Rng;

use crate::ws::protocol::{ArenaInfo, Vec3};

use super::tuning::{
    ARENA_HALF_EXTENT, ARENA_WALL_MARGIN, BOOST_PADS, SPAWN_DROP_HEIGHT, SPAWN_JITTER,
    SPAWN_POINTS,
};

/// Pick one of the fixed spawn points with a little horizontal jitter.
/// Vehicles start above the floor and parachute down.
pub fn random_spawn_position(rng: &mut impl Rng) -> Vec3 {
    let (x, z) = SPAWN_POINTS[rng.gen_range(0..SPAWN_POINTS.len())];
    Vec3::new(
        x + rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
        SPAWN_DROP_HEIGHT,
        z + rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
    )
}

/// Uniform landing point on the floor, away from the walls
pub fn random_drop_position(rng: &mut impl Rng) -> Vec3 {
    let limit = ARENA_HALF_EXTENT - ARENA_WALL_MARGIN;
    Vec3::new(rng.gen_range(-limit..=limit), 0.0, rng.gen_range(-limit..=limit))
}

pub fn boost_pads() -> Vec<Vec3> {
    BOOST_PADS.iter().map(|&(x, z)| Vec3::new(x, 0.0, z)).collect()
}

pub fn arena_info() -> ArenaInfo {
    ArenaInfo {
        half_extent: ARENA_HALF_EXTENT,
        wall_margin: ARENA_WALL_MARGIN,
        spawn_points: SPAWN_POINTS
            .iter()
            .map(|&(x, z)| Vec3::new(x, SPAWN_DROP_HEIGHT, z))
            .collect(),
        boost_pads: boost_pads(),
    }
}
