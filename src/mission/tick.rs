//! Fixed-order mission tick
//!
//! Conditions see the state left by the previous tick: events run before
//! spacecraft, weapons and effects are simulated.

use std::ops::ControlFlow;

use glam::Vec3;

use crate::consts::{COLLISION_DAMAGE_FACTOR, COLLISION_RESTITUTION, HIT_FLASH_RADIUS, TRAIL_SEGMENT_INTERVAL};
use crate::sim::collision::resolve_sphere_contact;
use crate::sim::{
    Bounded, CraftIndex, JumpWay, Missile, Octree, Pool, Pools, SlotStatus, TrailSegment, segment_sphere_intersection,
    sphere_sphere_collision,
};

use super::objective::{ObjectiveRole, ObjectiveStatus};
use super::{Mission, MissionState};

/// Snapshot of a hit object for the per-tick octree
#[derive(Debug, Clone, Copy)]
pub(super) struct HitObject {
    index: CraftIndex,
    position: Vec3,
    radius: f32,
}

impl Bounded for HitObject {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}

/// A projectile or missile that struck a spacecraft this tick
#[derive(Debug, Clone, Copy)]
pub(super) struct Impact {
    target: CraftIndex,
    by: Option<CraftIndex>,
    damage: f32,
    point: Vec3,
    /// Primary-weapon hit (counts toward the hit ratio)
    projectile: bool,
}

impl Mission {
    /// Advance the mission by `dt` milliseconds
    pub fn tick(&mut self, dt: f32) {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("Ignoring tick with dt={}", dt);
            return;
        }
        self.ticks += 1;
        self.world.advance_clock(dt);

        // 1. Environment
        self.world.environment.simulate(dt);

        if self.authority {
            // 2. Delayed actions that came due
            for due in self.world.take_due_actions(dt) {
                if let Some(action) = self
                    .events
                    .get_mut(due.event)
                    .and_then(|e| e.actions.get_mut(due.action))
                {
                    action.execute(&mut self.world);
                }
            }
        }
        let consumed = self.world.notice_end();
        if self.authority {
            // 3. Events
            for (index, event) in self.events.iter_mut().enumerate() {
                event.simulate(index, &mut self.world, dt);
            }
        }
        // Every condition has now read what came before this phase
        self.world.retire_notices(consumed);

        // 4. Spacecraft
        self.control_spacecrafts(dt);
        self.simulate_spacecrafts(dt);

        // 5. Collisions between spacecraft
        self.resolve_collisions();

        // 6. Projectiles and missiles against the octree
        self.simulate_weapons(dt);

        // 7. Effects
        self.simulate_effects(dt);

        // 8. Keep coordinates near the origin
        self.recenter_origin();

        // 9. Mission state
        self.update_state();
    }

    fn control_spacecrafts(&mut self, dt: f32) {
        let mut intents = std::mem::take(&mut self.intents);
        intents.clear();
        let piloted = self.world.piloted();
        for &index in self.world.spacecrafts() {
            if !self.world.spacecraft(index).is_some_and(|c| c.is_present()) {
                continue;
            }
            let intent = if Some(index) == piloted && !self.autopilot {
                self.pilot_intent.clone()
            } else {
                self.ai
                    .as_mut()
                    .map(|ai| ai.control(index, self.world.arena(), dt))
            };
            if let Some(intent) = intent {
                intents.push((index, intent));
            }
        }

        for (index, intent) in &intents {
            if intent.target.is_some() {
                self.world.set_target(*index, intent.target);
            }
            if let Some(craft) = self.world.spacecraft_mut(*index) {
                craft.apply_intent(intent, dt);
            }
            if intent.fire {
                self.fire_weapon(*index);
            }
            if intent.launch_missile {
                self.launch_missile(*index);
            }
        }
        self.intents = intents;
    }

    fn fire_weapon(&mut self, index: CraftIndex) {
        let Some(craft) = self.world.spacecraft_mut(index) else {
            return;
        };
        let Some(weapon) = craft.class.weapon.clone() else {
            return;
        };
        if !craft.is_present() || craft.weapon_cooldown > 0.0 {
            return;
        }
        craft.weapon_cooldown = weapon.cooldown;
        craft.stats.shots_fired += 1;
        let origin = craft.position + craft.forward * (craft.radius() + 1.0);
        let velocity = craft.velocity + craft.forward * weapon.projectile_speed;

        let projectile = self.world.pools.projectiles.acquire();
        projectile
            .object
            .reset(index, origin, velocity, weapon.damage, weapon.projectile_lifetime);
    }

    fn launch_missile(&mut self, index: CraftIndex) {
        let Some(craft) = self.world.spacecraft_mut(index) else {
            return;
        };
        let Some(class) = craft.class.missile.clone() else {
            return;
        };
        if !craft.is_present() || craft.missiles == 0 || craft.missile_cooldown > 0.0 {
            return;
        }
        let Some(target) = craft.target() else {
            return;
        };
        craft.missiles -= 1;
        craft.missile_cooldown = class.cooldown;
        let origin = craft.position + craft.forward * (craft.radius() + class.radius + 1.0);
        let direction = craft.forward;
        log::debug!("{} launched a missile", craft.display_name());

        let missile = self.world.pools.missiles.acquire();
        missile.object.reset(index, Some(target), origin, direction, &class);
    }

    fn simulate_spacecrafts(&mut self, dt: f32) {
        let mut arrived = Vec::new();
        for i in 0..self.world.spacecrafts().len() {
            let index = self.world.spacecrafts()[i];
            let Some(craft) = self.world.spacecraft_mut(index) else {
                continue;
            };
            match craft.simulate(dt) {
                Some(JumpWay::In) => {
                    log::info!("{} jumped in", craft.display_name());
                    arrived.push(index);
                }
                Some(JumpWay::Out) => log::info!("{} jumped out", craft.display_name()),
                None => {}
            }
        }
        for index in arrived {
            self.world.add_hit_object(index);
        }
        self.world.prune_spacecrafts();
    }

    fn resolve_collisions(&mut self) {
        let hit_objects = self.world.hit_objects().to_vec();
        for (n, &a) in hit_objects.iter().enumerate() {
            for &b in &hit_objects[n + 1..] {
                let Some((first, second)) = self.world.spacecraft_pair_mut(a, b) else {
                    continue;
                };
                if !first.is_present() || !second.is_present() {
                    continue;
                }
                let contact = sphere_sphere_collision(first.position, first.radius(), second.position, second.radius());
                if !contact.hit {
                    continue;
                }
                let closing = resolve_sphere_contact(
                    &mut first.position,
                    &mut first.velocity,
                    &mut second.position,
                    &mut second.velocity,
                    &contact,
                    COLLISION_RESTITUTION,
                );
                if closing > 0.0 {
                    let damage = closing * COLLISION_DAMAGE_FACTOR;
                    self.world.apply_damage(a, damage, Some(b));
                    self.world.apply_damage(b, damage, Some(a));
                }
            }
        }
    }

    fn simulate_weapons(&mut self, dt: f32) {
        let mut objects = std::mem::take(&mut self.hit_scratch);
        let mut impacts = std::mem::take(&mut self.impacts);
        objects.clear();
        impacts.clear();

        let world = &mut self.world;
        objects.extend(world.hit_objects().iter().filter_map(|&index| {
            world
                .spacecraft(index)
                .filter(|c| c.is_present())
                .map(|c| HitObject {
                    index,
                    position: c.position,
                    radius: c.radius(),
                })
        }));

        {
            let octree = Octree::new(&objects, world.settings.octree_max_depth, world.settings.octree_max_objects);
            let Pools {
                projectiles,
                missiles,
                trails,
                ..
            } = &mut world.pools;

            projectiles.for_each_locked_mut(|_, projectile| {
                let (start, end) = projectile.advance(dt);
                if let Some((target, t)) = first_hit(&octree, start, end, 0.0, projectile.origin) {
                    impacts.push(Impact {
                        target,
                        by: projectile.origin,
                        damage: projectile.damage,
                        point: start.lerp(end, t),
                        projectile: true,
                    });
                    return SlotStatus::Release;
                }
                if projectile.expired() {
                    SlotStatus::Release
                } else {
                    SlotStatus::Keep
                }
            });

            missiles.for_each_locked_mut(|_, missile| {
                let aim = missile
                    .target
                    .and_then(|t| objects.iter().find(|o| o.index == t))
                    .map(|o| o.position);
                let (start, end) = missile.advance(aim, dt);
                extend_trail(trails, missile, dt);
                let hit = first_hit(&octree, start, end, missile.radius, missile.origin);
                if let Some((target, t)) = hit {
                    impacts.push(Impact {
                        target,
                        by: missile.origin,
                        damage: missile.damage,
                        point: start.lerp(end, t),
                        projectile: false,
                    });
                }
                if hit.is_some() || missile.expired() {
                    if let Some(segment) = missile.trail.take().and_then(|i| trails.get_mut(i)) {
                        segment.growing = false;
                    }
                    SlotStatus::Release
                } else {
                    SlotStatus::Keep
                }
            });
        }
        self.hit_scratch = objects;

        let piloted = self.world.piloted();
        for impact in impacts.drain(..) {
            let hostile = match (impact.by.and_then(|b| self.world.spacecraft(b)), self.world.spacecraft(impact.target)) {
                (Some(attacker), Some(victim)) => attacker.is_hostile_to(victim),
                _ => false,
            };
            let Some(outcome) = self.world.apply_damage(impact.target, impact.damage, impact.by) else {
                continue;
            };
            if impact.projectile && hostile && impact.by.is_some() && impact.by == piloted {
                if let Some(pilot) = piloted.and_then(|p| self.world.spacecraft_mut(p)) {
                    pilot.stats.hits += 1;
                }
            }
            if !outcome.destroyed {
                self.world.pools.spawn_explosion(impact.point, Vec3::ZERO, HIT_FLASH_RADIUS, 0);
            }
        }
        self.impacts = impacts;
    }

    fn simulate_effects(&mut self, dt: f32) {
        let pools = &mut self.world.pools;
        pools.explosions.for_each_locked_mut(|_, explosion| explosion.simulate(dt));
        pools.particles.for_each_locked_mut(|_, particle| particle.simulate(dt));
        pools.trails.for_each_locked_mut(|_, segment| segment.simulate(dt));
    }

    fn recenter_origin(&mut self) {
        let Some(camera) = self
            .camera
            .or_else(|| self.world.piloted_craft().filter(|c| c.is_present()).map(|c| c.position))
        else {
            return;
        };
        if camera.length() <= self.world.settings.origin_recenter_distance {
            return;
        }
        let offset = -camera;
        log::debug!("Recentering world origin by {:?}", offset);
        self.world.translate(offset);
        if let Some(camera) = &mut self.camera {
            *camera += offset;
        }
    }

    fn update_state(&mut self) {
        let statuses = self.objective_status.iter_mut().zip(self.objective_settled.iter_mut());
        for (objective, (status, settled)) in self.objectives.iter().zip(statuses) {
            if *settled {
                continue;
            }
            let evaluation = objective.evaluate(&mut self.events, &self.world);
            *status = evaluation.status;
            *settled = evaluation.settled;
        }

        if let Some(pilot) = self.world.piloted_craft() {
            if !pilot.is_alive() {
                self.world.set_state(MissionState::Defeat);
                return;
            }
        }

        match self.world.state() {
            MissionState::Battle => {
                let over = match self.world.piloted() {
                    Some(piloted) => self.world.hostile_count(piloted) == 0,
                    None => !self.world.has_mutual_hostiles(),
                };
                if over {
                    let outcome = if self.world.piloted().is_some() {
                        MissionState::Completed
                    } else {
                        MissionState::Ended
                    };
                    self.world.set_state(outcome);
                }
            }
            MissionState::InProgress => {
                let departed = self.world.piloted_craft().is_some_and(|c| c.has_departed());
                let failed = self
                    .objectives
                    .iter()
                    .zip(&self.objective_status)
                    .any(|(o, s)| *s == ObjectiveStatus::Failed && !(departed && o.role == ObjectiveRole::Lose));
                let settled = self
                    .objectives
                    .iter()
                    .zip(&self.objective_status)
                    .all(|(o, s)| *s == ObjectiveStatus::Completed || o.inactive);
                let any_completed = self.objective_status.contains(&ObjectiveStatus::Completed);
                if failed {
                    self.world.set_state(MissionState::Failed);
                } else if settled && any_completed {
                    self.world.set_state(MissionState::Completed);
                }
            }
            _ => {}
        }
    }
}

/// Nearest spacecraft the swept segment touches, skipping the shooter
fn first_hit(
    octree: &Octree<'_, HitObject>,
    start: Vec3,
    end: Vec3,
    reach: f32,
    shooter: Option<CraftIndex>,
) -> Option<(CraftIndex, f32)> {
    let pad = Vec3::splat(reach);
    let mut nearest: Option<(CraftIndex, f32)> = None;
    let _ = octree.execute_for_objects(start.min(end) - pad, start.max(end) + pad, |_, object| {
        if Some(object.index) != shooter {
            if let Some(t) = segment_sphere_intersection(start, end, object.position, object.radius + reach) {
                if nearest.is_none_or(|(_, best)| t < best) {
                    nearest = Some((object.index, t));
                }
            }
        }
        ControlFlow::Continue(())
    });
    nearest
}

/// Add a smoke point behind a missile, starting a new segment when the current one is full
fn extend_trail(trails: &mut Pool<TrailSegment>, missile: &mut Missile, dt: f32) {
    missile.trail_timer -= dt;
    if missile.trail_timer > 0.0 {
        return;
    }
    missile.trail_timer = TRAIL_SEGMENT_INTERVAL;
    match missile.trail.and_then(|i| trails.get_mut(i)) {
        Some(segment) if !segment.is_full() => {
            segment.points.push(missile.position);
            return;
        }
        Some(segment) => segment.growing = false,
        None => {}
    }
    let segment = trails.acquire();
    segment.object.reset(missile.position);
    missile.trail = Some(segment.index);
}
