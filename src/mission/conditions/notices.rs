//! Conditions reacting to hits and targeting
//!
//! Hits and target changes are read from the world's notice log. Each
//! condition keeps its own cursor (a notice sequence number) and a pending
//! flag, which is consumed only by evaluations with a positive `dt`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::mission::loader::LoadContext;
use crate::mission::subjects::{SubjectDescriptor, SubjectGroup};
use crate::mission::world::{MissionWorld, Notice};
use crate::sim::CraftIndex;

use super::parse_params;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ByParams {
    by: Option<SubjectDescriptor>,
}

fn parse_by(kind: &'static str, params: &Value, ctx: &LoadContext) -> Result<Option<SubjectGroup>, ConfigError> {
    let params: ByParams = parse_params(kind, params)?;
    params.by.map(|by| ctx.subjects(kind, &by)).transpose()
}

fn member(group: &SubjectGroup, world: &MissionWorld, craft: CraftIndex) -> bool {
    world.spacecraft(craft).is_some_and(|c| group.has(c))
}

/// Scan notices since the last call; return true if any matched
fn scan(cursor: &mut usize, world: &MissionWorld, mut matches: impl FnMut(&Notice) -> bool) -> bool {
    let found = world
        .notices_since(*cursor)
        .iter()
        .fold(false, |found, n| matches(n) || found);
    *cursor = world.notice_end();
    found
}

/// Pending-flag bookkeeping shared by edge-triggered conditions
#[derive(Debug, Clone, Default)]
struct Edge {
    cursor: usize,
    pending: bool,
}

impl Edge {
    fn update(&mut self, world: &MissionWorld, dt: f32, matches: impl FnMut(&Notice) -> bool) -> bool {
        if scan(&mut self.cursor, world, matches) {
            self.pending = true;
        }
        let satisfied = self.pending;
        if dt > 0.0 {
            self.pending = false;
        }
        satisfied
    }
}

/// A subject was hit (optionally by one of `by`) since the last tick
#[derive(Debug, Clone)]
pub struct HitCondition {
    subjects: SubjectGroup,
    by: Option<SubjectGroup>,
    edge: Edge,
}

impl HitCondition {
    pub fn new(subjects: SubjectGroup, params: &Value, ctx: &LoadContext) -> Result<Self, ConfigError> {
        Ok(Self {
            subjects,
            by: parse_by("hit", params, ctx)?,
            edge: Edge::default(),
        })
    }

    pub(super) fn subjects_mut(&mut self) -> &mut SubjectGroup {
        &mut self.subjects
    }

    pub(super) fn evaluate(&mut self, world: &MissionWorld, dt: f32) -> bool {
        let (subjects, by) = (&self.subjects, &self.by);
        self.edge.update(world, dt, |notice| match *notice {
            Notice::Hit { target, by: attacker } => {
                member(subjects, world, target)
                    && by
                        .as_ref()
                        .is_none_or(|group| attacker.is_some_and(|a| member(group, world, a)))
            }
            Notice::Targeted { .. } => false,
        })
    }
}

/// A subject became the target of a spacecraft (optionally one of `by`)
#[derive(Debug, Clone)]
pub struct GetsTargetedCondition {
    subjects: SubjectGroup,
    by: Option<SubjectGroup>,
    edge: Edge,
}

impl GetsTargetedCondition {
    pub fn new(subjects: SubjectGroup, params: &Value, ctx: &LoadContext) -> Result<Self, ConfigError> {
        Ok(Self {
            subjects,
            by: parse_by("getsTargeted", params, ctx)?,
            edge: Edge::default(),
        })
    }

    pub(super) fn subjects_mut(&mut self) -> &mut SubjectGroup {
        &mut self.subjects
    }

    pub(super) fn evaluate(&mut self, world: &MissionWorld, dt: f32) -> bool {
        let (subjects, by) = (&self.subjects, &self.by);
        self.edge.update(world, dt, |notice| match *notice {
            Notice::Targeted { target, by: source } => {
                member(subjects, world, target) && by.as_ref().is_none_or(|group| member(group, world, source))
            }
            Notice::Hit { .. } => false,
        })
    }
}

/// A subject is currently targeted by a present spacecraft (optionally one of `by`)
#[derive(Debug, Clone)]
pub struct IsTargetedCondition {
    subjects: SubjectGroup,
    by: Option<SubjectGroup>,
}

impl IsTargetedCondition {
    pub fn new(subjects: SubjectGroup, params: &Value, ctx: &LoadContext) -> Result<Self, ConfigError> {
        Ok(Self {
            subjects,
            by: parse_by("isTargeted", params, ctx)?,
        })
    }

    pub(super) fn subjects_mut(&mut self) -> &mut SubjectGroup {
        &mut self.subjects
    }

    pub(super) fn evaluate(&mut self, world: &MissionWorld) -> bool {
        world
            .spacecrafts()
            .iter()
            .filter_map(|&i| world.spacecraft(i))
            .filter(|c| c.is_present())
            .filter(|c| self.by.as_ref().is_none_or(|group| group.has(c)))
            .filter_map(|c| c.target())
            .any(|target| {
                world
                    .spacecraft(target)
                    .is_some_and(|t| t.is_present() && self.subjects.has(t))
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::tests::condition;
    use crate::mission::world::tests::sample_world;

    #[test]
    fn test_hit_is_edge_triggered() {
        let mut world = sample_world();
        let mut c = condition(&world, json!({"type": "hit", "subjects": {"spacecrafts": ["e1"]}})).unwrap();
        assert!(!c.is_satisfied(&world, 16.0));

        let e1 = world.find_spacecraft("e1").unwrap();
        let player = world.piloted();
        world.apply_damage(e1, 5.0, player);

        // A zero-dt query sees the hit without consuming it
        assert!(c.is_satisfied(&world, 0.0));
        assert!(c.is_satisfied(&world, 0.0));
        assert!(c.is_satisfied(&world, 16.0));
        assert!(!c.is_satisfied(&world, 16.0));
    }

    #[test]
    fn test_hit_filters_attacker() {
        let mut world = sample_world();
        let mut c = condition(
            &world,
            json!({"type": "hit", "subjects": {"teams": ["empire"]}, "params": {"by": {"squads": ["alpha"]}}}),
        )
        .unwrap();
        let e1 = world.find_spacecraft("e1").unwrap();
        let player = world.piloted();
        world.apply_damage(e1, 5.0, player);
        world.apply_damage(e1, 5.0, None);
        assert!(!c.is_satisfied(&world, 16.0));

        let alpha1 = world.find_spacecraft("alpha 1");
        world.apply_damage(e1, 5.0, alpha1);
        assert!(c.is_satisfied(&world, 16.0));
    }

    #[test]
    fn test_gets_targeted_and_is_targeted() {
        let mut world = sample_world();
        let mut gets = condition(&world, json!({"type": "getsTargeted", "subjects": {"spacecrafts": ["e2"]}})).unwrap();
        let mut is = condition(
            &world,
            json!({"type": "isTargeted", "subjects": {"spacecrafts": ["e2"]}, "params": {"by": {"spacecrafts": ["player"]}}}),
        )
        .unwrap();
        assert!(!gets.is_satisfied(&world, 16.0));
        assert!(!is.is_satisfied(&world, 16.0));

        let player = world.piloted().unwrap();
        let e2 = world.find_spacecraft("e2");
        world.set_target(player, e2);
        assert!(gets.is_satisfied(&world, 16.0));
        assert!(is.is_satisfied(&world, 16.0));
        // Edge consumed; level persists
        assert!(!gets.is_satisfied(&world, 16.0));
        assert!(is.is_satisfied(&world, 16.0));

        world.set_target(player, None);
        assert!(!is.is_satisfied(&world, 16.0));
    }
}
