//! Transient simulated entities and the pools that recycle them
//!
//! Projectiles, missiles, explosions, particles and trail segments come and
//! go many times per second. They live in [`Pools`], which outlive any single
//! mission: the pools are prefilled before a mission starts and only their
//! slots cycle between locked and free afterwards.

use glam::Vec3;

use crate::ms_to_secs;
use crate::settings::Settings;

use super::pool::{Pool, SlotStatus};
use super::spacecraft::CraftIndex;

/// Points kept per trail segment before a new segment is started
pub const TRAIL_POINTS_PER_SEGMENT: usize = 16;

/// A visual debris/spark particle
#[derive(Debug, Clone, Default)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: f32,
    pub color: [f32; 4],
    /// ms
    pub time_left: f32,
    /// ms
    pub duration: f32,
}

impl Particle {
    pub fn reset(&mut self, position: Vec3, velocity: Vec3, size: f32, duration: f32) {
        self.position = position;
        self.velocity = velocity;
        self.size = size;
        self.color = [1.0, 0.8, 0.4, 1.0];
        self.time_left = duration;
        self.duration = duration;
    }

    /// 1 at spawn, 0 when expired
    pub fn life(&self) -> f32 {
        if self.duration <= 0.0 {
            0.0
        } else {
            (self.time_left / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn simulate(&mut self, dt: f32) -> SlotStatus {
        self.position += self.velocity * ms_to_secs(dt);
        self.velocity *= 0.98;
        self.time_left -= dt;
        self.color[3] = self.life();
        if self.time_left <= 0.0 {
            SlotStatus::Release
        } else {
            SlotStatus::Keep
        }
    }
}

/// A primary-weapon projectile
#[derive(Debug, Clone, Default)]
pub struct Projectile {
    pub origin: Option<CraftIndex>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub damage: f32,
    /// ms
    pub time_left: f32,
}

impl Projectile {
    pub fn reset(&mut self, origin: CraftIndex, position: Vec3, velocity: Vec3, damage: f32, lifetime: f32) {
        self.origin = Some(origin);
        self.position = position;
        self.velocity = velocity;
        self.damage = damage;
        self.time_left = lifetime;
    }

    /// Move for one step, returning the swept segment
    pub fn advance(&mut self, dt: f32) -> (Vec3, Vec3) {
        let start = self.position;
        self.position += self.velocity * ms_to_secs(dt);
        self.time_left -= dt;
        (start, self.position)
    }

    pub fn expired(&self) -> bool {
        self.time_left <= 0.0
    }
}

/// A homing missile
#[derive(Debug, Clone, Default)]
pub struct Missile {
    pub origin: Option<CraftIndex>,
    pub target: Option<CraftIndex>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub speed: f32,
    pub turn_rate: f32,
    pub damage: f32,
    pub radius: f32,
    /// ms
    pub time_left: f32,
    /// Trail segment currently being extended
    pub trail: Option<usize>,
    /// ms until the next trail point
    pub trail_timer: f32,
}

impl Missile {
    pub fn reset(
        &mut self,
        origin: CraftIndex,
        target: Option<CraftIndex>,
        position: Vec3,
        direction: Vec3,
        class: &super::spacecraft::MissileClass,
    ) {
        self.origin = Some(origin);
        self.target = target;
        self.position = position;
        self.speed = class.speed;
        self.velocity = direction.normalize_or_zero() * class.speed;
        self.turn_rate = class.turn_rate;
        self.damage = class.damage;
        self.radius = class.radius;
        self.time_left = class.lifetime;
        self.trail = None;
        self.trail_timer = 0.0;
    }

    /// Turn toward `aim` (if any) and move; returns the swept segment
    pub fn advance(&mut self, aim: Option<Vec3>, dt: f32) -> (Vec3, Vec3) {
        let dt_secs = ms_to_secs(dt);
        if let Some(aim) = aim {
            let heading = self.velocity.normalize_or_zero();
            let wanted = (aim - self.position).normalize_or_zero();
            if heading != Vec3::ZERO && wanted != Vec3::ZERO {
                let angle = heading.angle_between(wanted);
                let max_turn = self.turn_rate * dt_secs;
                let t = if angle <= max_turn || angle <= f32::EPSILON {
                    1.0
                } else {
                    max_turn / angle
                };
                let direction = heading.lerp(wanted, t).normalize_or_zero();
                if direction != Vec3::ZERO {
                    self.velocity = direction * self.speed;
                }
            }
        }
        let start = self.position;
        self.position += self.velocity * dt_secs;
        self.time_left -= dt;
        (start, self.position)
    }

    pub fn expired(&self) -> bool {
        self.time_left <= 0.0
    }
}

/// An explosion (hit flash or destruction)
#[derive(Debug, Clone, Default)]
pub struct Explosion {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    /// ms
    pub time_left: f32,
    /// ms
    pub duration: f32,
}

impl Explosion {
    pub fn reset(&mut self, position: Vec3, velocity: Vec3, radius: f32, duration: f32) {
        self.position = position;
        self.velocity = velocity;
        self.radius = radius;
        self.time_left = duration;
        self.duration = duration;
    }

    pub fn simulate(&mut self, dt: f32) -> SlotStatus {
        self.position += self.velocity * ms_to_secs(dt);
        self.time_left -= dt;
        if self.time_left <= 0.0 {
            SlotStatus::Release
        } else {
            SlotStatus::Keep
        }
    }
}

/// A piece of missile smoke trail
///
/// The point buffer keeps its capacity across reuse.
#[derive(Debug, Clone, Default)]
pub struct TrailSegment {
    pub points: Vec<Vec3>,
    /// Still being extended by a live missile
    pub growing: bool,
    /// ms, counts down once the segment stops growing
    pub time_left: f32,
}

impl TrailSegment {
    pub fn reset(&mut self, start: Vec3) {
        self.points.clear();
        self.points.reserve(TRAIL_POINTS_PER_SEGMENT);
        self.points.push(start);
        self.growing = true;
        self.time_left = crate::consts::TRAIL_SEGMENT_DURATION;
    }

    pub fn is_full(&self) -> bool {
        self.points.len() >= TRAIL_POINTS_PER_SEGMENT
    }

    pub fn simulate(&mut self, dt: f32) -> SlotStatus {
        if self.growing {
            return SlotStatus::Keep;
        }
        self.time_left -= dt;
        if self.time_left <= 0.0 {
            SlotStatus::Release
        } else {
            SlotStatus::Keep
        }
    }

    pub fn translate(&mut self, offset: Vec3) {
        for point in &mut self.points {
            *point += offset;
        }
    }
}

/// Prefill sizes per entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PoolSizes {
    pub particles: usize,
    pub projectiles: usize,
    pub missiles: usize,
    pub explosions: usize,
    pub trails: usize,
}

/// Process-wide pools of transient entities
#[derive(Debug, Clone)]
pub struct Pools {
    pub particles: Pool<Particle>,
    pub projectiles: Pool<Projectile>,
    pub missiles: Pool<Missile>,
    pub explosions: Pool<Explosion>,
    pub trails: Pool<TrailSegment>,
}

impl Default for Pools {
    fn default() -> Self {
        Self::new()
    }
}

impl Pools {
    pub fn new() -> Self {
        Self {
            particles: Pool::new("particles"),
            projectiles: Pool::new("projectiles"),
            missiles: Pool::new("missiles"),
            explosions: Pool::new("explosions"),
            trails: Pool::new("trails"),
        }
    }

    /// Grow every pool to the given capacities before a mission starts
    pub fn prefill(&mut self, sizes: &PoolSizes) {
        self.particles.prefill(sizes.particles);
        self.projectiles.prefill(sizes.projectiles);
        self.missiles.prefill(sizes.missiles);
        self.explosions.prefill(sizes.explosions);
        self.trails.prefill_with(sizes.trails, || TrailSegment {
            points: Vec::with_capacity(TRAIL_POINTS_PER_SEGMENT),
            ..TrailSegment::default()
        });
    }

    /// Prefill using the sizes implied by the settings' quality preset
    pub fn prefill_for(&mut self, settings: &Settings) {
        self.prefill(&settings.pool_sizes());
    }

    /// Free every slot of every pool
    pub fn release_all(&mut self) {
        self.particles.release_all();
        self.projectiles.release_all();
        self.missiles.release_all();
        self.explosions.release_all();
        self.trails.release_all();
    }

    /// Debug telemetry: locked/total per kind
    pub fn telemetry(&self) -> String {
        [
            self.particles.telemetry(),
            self.projectiles.telemetry(),
            self.missiles.telemetry(),
            self.explosions.telemetry(),
            self.trails.telemetry(),
        ]
        .join(", ")
    }

    /// Shift every live entity (world origin recentering)
    pub fn translate(&mut self, offset: Vec3) {
        self.particles.for_each_locked_mut(|_, p| {
            p.position += offset;
            SlotStatus::Keep
        });
        self.projectiles.for_each_locked_mut(|_, p| {
            p.position += offset;
            SlotStatus::Keep
        });
        self.missiles.for_each_locked_mut(|_, m| {
            m.position += offset;
            SlotStatus::Keep
        });
        self.explosions.for_each_locked_mut(|_, e| {
            e.position += offset;
            SlotStatus::Keep
        });
        self.trails.for_each_locked_mut(|_, t| {
            t.translate(offset);
            SlotStatus::Keep
        });
    }

    /// Spawn a destruction/hit explosion with debris particles
    pub fn spawn_explosion(&mut self, position: Vec3, velocity: Vec3, radius: f32, debris: usize) {
        let explosion = self.explosions.acquire();
        explosion
            .object
            .reset(position, velocity, radius, crate::consts::EXPLOSION_DURATION);

        // Spread debris evenly on a sphere (golden spiral) so the result is deterministic
        let golden = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
        for i in 0..debris {
            let y = 1.0 - (i as f32 + 0.5) / debris as f32 * 2.0;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden * i as f32;
            let direction = Vec3::new(theta.cos() * ring, y, theta.sin() * ring);
            let particle = self.particles.acquire();
            particle.object.reset(
                position,
                velocity + direction * radius * 2.0,
                radius * 0.1,
                crate::consts::EXPLOSION_DURATION * 0.75,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::spacecraft::MissileClass;

    #[test]
    fn test_particle_expires() {
        let mut particle = Particle::default();
        particle.reset(Vec3::ZERO, Vec3::X * 10.0, 1.0, 100.0);
        assert_eq!(particle.simulate(50.0), SlotStatus::Keep);
        assert!((particle.life() - 0.5).abs() < 1e-6);
        assert_eq!(particle.simulate(50.0), SlotStatus::Release);
    }

    #[test]
    fn test_missile_turns_toward_aim() {
        let mut missile = Missile::default();
        let class = MissileClass {
            turn_rate: 10.0,
            ..MissileClass::default()
        };
        missile.reset(CraftIndex(0), None, Vec3::ZERO, Vec3::X, &class);
        // Aim straight up; turn rate is high enough to align in one step
        missile.advance(Some(Vec3::new(0.0, 1000.0, 0.0)), 200.0);
        assert!(missile.velocity.normalize().y > 0.99);
        assert!((missile.velocity.length() - class.speed).abs() < 1e-2);
    }

    #[test]
    fn test_trail_keeps_buffer_capacity() {
        let mut pools = Pools::new();
        pools.prefill(&PoolSizes {
            particles: 0,
            projectiles: 0,
            missiles: 0,
            explosions: 0,
            trails: 1,
        });
        let trail = pools.trails.acquire();
        let index = trail.index;
        trail.object.reset(Vec3::ZERO);
        let capacity = trail.object.points.capacity();
        pools.trails.release(index);

        let again = pools.trails.acquire();
        again.object.reset(Vec3::ONE);
        assert_eq!(again.object.points, vec![Vec3::ONE]);
        assert_eq!(again.object.points.capacity(), capacity);
    }

    #[test]
    fn test_spawn_explosion_and_telemetry() {
        let mut pools = Pools::new();
        pools.prefill(&PoolSizes {
            particles: 8,
            projectiles: 4,
            missiles: 2,
            explosions: 2,
            trails: 2,
        });
        pools.spawn_explosion(Vec3::ZERO, Vec3::ZERO, 10.0, 4);
        assert_eq!(
            pools.telemetry(),
            "particles: 4/8, projectiles: 0/4, missiles: 0/2, explosions: 1/2, trails: 0/2"
        );
        pools.release_all();
        assert!(pools.telemetry().starts_with("particles: 0/8"));
    }

    #[test]
    fn test_translate_moves_live_entities() {
        let mut pools = Pools::new();
        pools.spawn_explosion(Vec3::ZERO, Vec3::ZERO, 10.0, 0);
        pools.translate(Vec3::new(-100.0, 0.0, 0.0));
        let (_, explosion) = pools.explosions.iter_locked().next().unwrap();
        assert_eq!(explosion.position, Vec3::new(-100.0, 0.0, 0.0));
    }
}
