//! Simulation machinery consumed by the mission tick
//!
//! Nothing here knows about triggers or objectives:
//! - Spacecraft, classes and teams
//! - Transient entities recycled through object pools
//! - Octree for scoping hit tests
//! - Sphere/segment collision
//! - The AI seam

pub mod ai;
pub mod collision;
pub mod entities;
pub mod environment;
pub mod octree;
pub mod pool;
pub mod spacecraft;

pub use ai::{ControlIntent, PursuitAi, SpacecraftAi};
pub use collision::{CollisionResult, segment_sphere_intersection, sphere_sphere_collision};
pub use entities::{Explosion, Missile, Particle, PoolSizes, Pools, Projectile, TrailSegment};
pub use environment::{Environment, EnvironmentDescriptor};
pub use octree::{Bounded, Octree};
pub use pool::{Acquired, Pool, SlotStatus};
pub use spacecraft::{
    ClassCatalog, CombatStats, CraftIndex, JumpState, JumpWay, Spacecraft, SpacecraftClass,
    SpacecraftCommand, Squad, Team,
};
