//! Mission Core - simulation core of a space-combat game
//!
//! Core modules:
//! - `mission`: Trigger/condition/action rule engine and the mission tick loop
//! - `sim`: Simulation-agnostic machinery (spacecraft, octree, object pools, collision)
//! - `settings`: Tunable simulation settings and difficulty
//! - `highscores`: Per-mission best scores and win/loss counters
//! - `persistence`: JSON file storage for settings and records

pub mod error;
pub mod highscores;
pub mod mission;
pub mod persistence;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, MissionError};
pub use highscores::MissionRecords;
pub use mission::{Mission, MissionState};
pub use settings::{Difficulty, QualityPreset, Settings};

use glam::Vec3;

/// Simulation configuration constants
pub mod consts {
    /// Default octree recursion limit
    pub const OCTREE_MAX_DEPTH: u32 = 5;
    /// Default octree leaf size (a node at or below this count is not split)
    pub const OCTREE_MAX_OBJECTS: usize = 4;

    /// Camera distance from the world origin that triggers a recenter
    pub const ORIGIN_RECENTER_DISTANCE: f32 = 5000.0;

    /// Time a spacecraft spends in the jump-out sequence before it departs (ms)
    pub const JUMP_OUT_DURATION: f32 = 1500.0;
    /// Time a spacecraft spends in the jump-in sequence before it is present (ms)
    pub const JUMP_IN_DURATION: f32 = 1000.0;

    /// Explosion lifetime (ms)
    pub const EXPLOSION_DURATION: f32 = 1200.0;
    /// Lifetime of a single missile trail segment (ms)
    pub const TRAIL_SEGMENT_DURATION: f32 = 600.0;
    /// Missile trail points are laid at this interval (ms)
    pub const TRAIL_SEGMENT_INTERVAL: f32 = 50.0;
    /// Debris particles spawned by a destruction explosion
    pub const EXPLOSION_PARTICLES: usize = 12;

    /// Collision damage per unit of closing speed (m/s)
    pub const COLLISION_DAMAGE_FACTOR: f32 = 0.5;
    /// Bounciness of spacecraft contacts
    pub const COLLISION_RESTITUTION: f32 = 0.3;
    /// Radius of the flash where a shot lands (m)
    pub const HIT_FLASH_RADIUS: f32 = 2.0;

    /// HUD message base duration (ms)
    pub const MESSAGE_BASE_DURATION: f32 = 2000.0;
    /// HUD message extra duration per character (ms)
    pub const MESSAGE_DURATION_PER_CHAR: f32 = 50.0;

    /// Score bonus for each hostile destroyed by the piloted spacecraft
    pub const KILL_BONUS: f32 = 100.0;
    /// Maximum bonus for hit ratio on mission completion
    pub const HIT_RATIO_BONUS: f32 = 1000.0;
    /// Maximum bonus for remaining hull integrity on mission completion
    pub const HULL_INTEGRITY_BONUS: f32 = 500.0;
}

/// Milliseconds to seconds
#[inline]
pub fn ms_to_secs(ms: f32) -> f32 {
    ms * 0.001
}

/// Axis-aligned bounds of a sphere
#[inline]
pub fn sphere_bounds(center: Vec3, radius: f32) -> (Vec3, Vec3) {
    let r = Vec3::splat(radius);
    (center - r, center + r)
}

/// Whether two axis-aligned boxes overlap (touching counts)
#[inline]
pub fn boxes_intersect(min_a: Vec3, max_a: Vec3, min_b: Vec3, max_b: Vec3) -> bool {
    min_a.cmple(max_b).all() && min_b.cmple(max_a).all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxes_intersect() {
        let (a_min, a_max) = sphere_bounds(Vec3::ZERO, 1.0);
        let (b_min, b_max) = sphere_bounds(Vec3::new(1.5, 0.0, 0.0), 1.0);
        assert!(boxes_intersect(a_min, a_max, b_min, b_max));

        let (c_min, c_max) = sphere_bounds(Vec3::new(0.0, 3.0, 0.0), 0.5);
        assert!(!boxes_intersect(a_min, a_max, c_min, c_max));
    }

    #[test]
    fn test_ms_to_secs() {
        assert!((ms_to_secs(1500.0) - 1.5).abs() < 1e-6);
    }
}
