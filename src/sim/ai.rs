//! AI seam
//!
//! Decision-making is external to the mission core: every tick the mission
//! asks a [`SpacecraftAi`] for a [`ControlIntent`] per non-piloted spacecraft
//! and reacts to what it gets back. [`PursuitAi`] is a basic implementation
//! used by the headless runner and the tests.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::spacecraft::{CraftIndex, Spacecraft};

/// What a spacecraft wants to do this tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlIntent {
    /// Desired acceleration direction, world space, length ≤ 1
    pub thrust: Vec3,
    /// Desired facing (zero keeps facing along velocity)
    pub facing: Vec3,
    /// Desired target
    pub target: Option<CraftIndex>,
    /// Fire the primary weapon along the facing
    pub fire: bool,
    /// Launch a missile at the target
    pub launch_missile: bool,
}

/// Controls non-piloted spacecraft
pub trait SpacecraftAi {
    /// Decide for spacecraft `me`; `crafts` is the whole arena including
    /// destroyed and departed spacecraft
    fn control(&mut self, me: CraftIndex, crafts: &[Spacecraft], dt: f32) -> ControlIntent;
}

/// Chase the nearest hostile and shoot when lined up
#[derive(Debug, Clone)]
pub struct PursuitAi {
    rng: Pcg32,
    /// Cosine of the maximum angle off the facing that still allows firing
    pub fire_cone: f32,
    /// Random thrust perturbation magnitude
    pub jitter: f32,
}

impl PursuitAi {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            fire_cone: 0.97,
            jitter: 0.1,
        }
    }

    fn pick_target(&self, me: &Spacecraft, crafts: &[Spacecraft]) -> Option<CraftIndex> {
        let valid = |index: CraftIndex| {
            crafts
                .get(index.0)
                .is_some_and(|c| c.is_present() && c.is_hostile_to(me))
        };
        if me.priority_targets {
            if let Some(&first) = me.target_list.iter().find(|&&i| valid(i)) {
                return Some(first);
            }
        }
        if let Some(current) = me.target() {
            if valid(current) {
                return Some(current);
            }
        }
        crafts
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_present() && c.is_hostile_to(me))
            .filter(|(_, c)| !std::ptr::eq(*c, me))
            .min_by(|(_, a), (_, b)| {
                let da = a.position.distance_squared(me.position);
                let db = b.position.distance_squared(me.position);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| CraftIndex(i))
    }
}

impl SpacecraftAi for PursuitAi {
    fn control(&mut self, me: CraftIndex, crafts: &[Spacecraft], _dt: f32) -> ControlIntent {
        let Some(craft) = crafts.get(me.0).filter(|c| c.is_present()) else {
            return ControlIntent::default();
        };

        // Distance orders take precedence over hunting
        if let Some(goal) = craft.distance_goal {
            if let Some(anchor) = crafts.get(goal.target.0).filter(|c| c.is_present()) {
                let offset = anchor.position - craft.position;
                let distance = offset.length();
                let thrust = match (goal.min, goal.max) {
                    (Some(min), _) if distance < min => -offset.normalize_or_zero(),
                    (_, Some(max)) if distance > max => offset.normalize_or_zero(),
                    // In the band: match the anchor's velocity
                    _ => (anchor.velocity - craft.velocity).normalize_or_zero(),
                };
                return ControlIntent {
                    thrust,
                    ..ControlIntent::default()
                };
            }
        }

        let Some(target_index) = self.pick_target(craft, crafts) else {
            // Nothing to chase: come to a stop
            return ControlIntent {
                thrust: -craft.velocity.normalize_or_zero(),
                ..ControlIntent::default()
            };
        };
        let target = &crafts[target_index.0];
        let offset = target.position - craft.position;
        let distance = offset.length();
        let direction = offset.normalize_or_zero();

        let desired_velocity = direction * craft.class.max_speed;
        let mut thrust = (desired_velocity - craft.velocity).normalize_or_zero();
        if self.jitter > 0.0 {
            let noise = Vec3::new(
                self.rng.random_range(-1.0..1.0),
                self.rng.random_range(-1.0..1.0),
                self.rng.random_range(-1.0..1.0),
            );
            thrust = (thrust + noise * self.jitter).clamp_length_max(1.0);
        }

        let aligned = craft.forward.dot(direction) >= self.fire_cone;
        let fire = craft
            .class
            .weapon
            .as_ref()
            .is_some_and(|w| distance <= w.range() && aligned && craft.weapon_cooldown <= 0.0);
        let launch_missile = craft.missiles > 0
            && craft.missile_cooldown <= 0.0
            && craft.class.missile.as_ref().is_some_and(|m| {
                distance <= m.speed * crate::ms_to_secs(m.lifetime) * 0.8
            });

        ControlIntent {
            thrust,
            facing: direction,
            target: Some(target_index),
            fire,
            launch_missile,
        }
    }
}
