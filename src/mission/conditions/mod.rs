//! Trigger conditions
//!
//! Every condition answers `is_satisfied(world, dt)` once per tick. Conditions
//! that can become impossible (a target that can no longer be destroyed, a
//! deadline that passed) latch that state and never report satisfied again.
//! Objective-capable conditions also render objective texts.

mod notices;
mod subject_state;
mod time;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::sim::CraftIndex;

use super::loader::LoadContext;
use super::objective::ObjectiveRole;
use super::subjects::SubjectDescriptor;
use super::world::{MissionState, MissionWorld};

pub use notices::{GetsTargetedCondition, HitCondition, IsTargetedCondition};
pub use subject_state::{
    AwayCondition, CountCondition, CountRelation, DestroyedCondition, DistanceCondition, IntegrityCondition,
    IntegrityMeasure, OnTeamCondition,
};
pub use time::{TimeCondition, TimeWhen};

/// Whether all or any subject has to match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Which {
    #[default]
    All,
    Any,
}

impl Which {
    /// Combine per-subject results; an empty set never matches
    pub fn matches(self, mut results: impl Iterator<Item = bool>) -> bool {
        let mut seen = false;
        match self {
            Which::All => results.all(|r| {
                seen = true;
                r
            }) && seen,
            Which::Any => results.any(|r| r),
        }
    }
}

/// `{type, subjects?, params?}` as written in mission files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subjects: SubjectDescriptor,
    #[serde(default)]
    pub params: Value,
}

/// Deserialize a params object; a missing object reads as `{}`
pub(crate) fn parse_params<T: DeserializeOwned>(kind: &'static str, params: &Value) -> Result<T, ConfigError> {
    let value = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params.clone()
    };
    serde_json::from_value(value).map_err(|e| ConfigError::params(kind, e))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MissionStateParams {
    mission_states: Vec<MissionState>,
}

/// The mission is in one of the listed states
#[derive(Debug, Clone)]
pub struct MissionStateCondition {
    states: Vec<MissionState>,
}

impl MissionStateCondition {
    pub fn new(params: &Value) -> Result<Self, ConfigError> {
        let params: MissionStateParams = parse_params("missionState", params)?;
        if params.mission_states.is_empty() {
            return Err(ConfigError::params("missionState", "missionStates is empty"));
        }
        Ok(Self {
            states: params.mission_states,
        })
    }

    fn evaluate(&self, world: &MissionWorld) -> bool {
        self.states.contains(&world.state())
    }
}

#[derive(Debug, Clone)]
pub enum ConditionKind {
    Destroyed(DestroyedCondition),
    Count(CountCondition),
    Time(TimeCondition),
    HullIntegrity(IntegrityCondition),
    ShieldIntegrity(IntegrityCondition),
    Distance(DistanceCondition),
    Hit(HitCondition),
    Away(AwayCondition),
    OnTeam(OnTeamCondition),
    MissionState(MissionStateCondition),
    GetsTargeted(GetsTargetedCondition),
    IsTargeted(IsTargetedCondition),
}

#[derive(Debug, Clone)]
pub struct Condition {
    kind: ConditionKind,
    last_satisfied: bool,
    impossible: bool,
}

impl Condition {
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            last_satisfied: false,
            impossible: false,
        }
    }

    pub fn from_descriptor(descriptor: &ConditionDescriptor, ctx: &LoadContext) -> Result<Self, ConfigError> {
        let subjects = || ctx.subjects("condition", &descriptor.subjects);
        let params = &descriptor.params;
        let kind = match descriptor.kind.as_str() {
            "destroyed" => ConditionKind::Destroyed(DestroyedCondition::new(subjects()?, params)?),
            "count" => ConditionKind::Count(CountCondition::new(subjects()?, params)?),
            "time" => ConditionKind::Time(TimeCondition::new(params, ctx)?),
            "hullIntegrity" => ConditionKind::HullIntegrity(IntegrityCondition::new(
                IntegrityMeasure::Hull,
                subjects()?,
                params,
            )?),
            "shieldIntegrity" => ConditionKind::ShieldIntegrity(IntegrityCondition::new(
                IntegrityMeasure::Shield,
                subjects()?,
                params,
            )?),
            "distance" => ConditionKind::Distance(DistanceCondition::new(subjects()?, params, ctx)?),
            "hit" => ConditionKind::Hit(HitCondition::new(subjects()?, params, ctx)?),
            "away" => ConditionKind::Away(AwayCondition::new(subjects()?, params)?),
            "onTeam" => ConditionKind::OnTeam(OnTeamCondition::new(subjects()?, params, ctx)?),
            "missionState" => ConditionKind::MissionState(MissionStateCondition::new(params)?),
            "getsTargeted" => ConditionKind::GetsTargeted(GetsTargetedCondition::new(subjects()?, params, ctx)?),
            "isTargeted" => ConditionKind::IsTargeted(IsTargetedCondition::new(subjects()?, params, ctx)?),
            other => return Err(ConfigError::UnknownConditionType(other.to_string())),
        };
        Ok(Self::new(kind))
    }

    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ConditionKind::Destroyed(_) => "destroyed",
            ConditionKind::Count(_) => "count",
            ConditionKind::Time(_) => "time",
            ConditionKind::HullIntegrity(_) => "hullIntegrity",
            ConditionKind::ShieldIntegrity(_) => "shieldIntegrity",
            ConditionKind::Distance(_) => "distance",
            ConditionKind::Hit(_) => "hit",
            ConditionKind::Away(_) => "away",
            ConditionKind::OnTeam(_) => "onTeam",
            ConditionKind::MissionState(_) => "missionState",
            ConditionKind::GetsTargeted(_) => "getsTargeted",
            ConditionKind::IsTargeted(_) => "isTargeted",
        }
    }

    /// Evaluate for this tick
    ///
    /// Edge-triggered conditions keep a pending event across calls with
    /// `dt == 0`, so querying between ticks does not consume it.
    pub fn is_satisfied(&mut self, world: &MissionWorld, dt: f32) -> bool {
        if self.impossible {
            self.last_satisfied = false;
            return false;
        }
        let satisfied = match &mut self.kind {
            ConditionKind::Destroyed(c) => c.evaluate(world),
            ConditionKind::Count(c) => c.evaluate(world),
            ConditionKind::Time(c) => c.evaluate(world, dt),
            ConditionKind::HullIntegrity(c) | ConditionKind::ShieldIntegrity(c) => c.evaluate(world),
            ConditionKind::Distance(c) => c.evaluate(world),
            ConditionKind::Hit(c) => c.evaluate(world, dt),
            ConditionKind::Away(c) => c.evaluate(world),
            ConditionKind::OnTeam(c) => c.evaluate(world),
            ConditionKind::MissionState(c) => c.evaluate(world),
            ConditionKind::GetsTargeted(c) => c.evaluate(world, dt),
            ConditionKind::IsTargeted(c) => c.evaluate(world),
        };
        self.last_satisfied = satisfied;
        // Latch after evaluating: a one-time condition still reports the tick it fires
        self.is_impossible(world);
        satisfied
    }

    /// Result of the latest evaluation
    pub fn last_satisfied(&self) -> bool {
        self.last_satisfied
    }

    pub fn can_be_impossible(&self) -> bool {
        match &self.kind {
            ConditionKind::Destroyed(_) => true,
            ConditionKind::Count(c) => c.can_be_impossible(),
            ConditionKind::Time(c) => c.can_be_impossible(),
            ConditionKind::HullIntegrity(c) => c.can_be_impossible(),
            ConditionKind::Distance(_) | ConditionKind::Away(_) => true,
            ConditionKind::ShieldIntegrity(_)
            | ConditionKind::Hit(_)
            | ConditionKind::OnTeam(_)
            | ConditionKind::MissionState(_)
            | ConditionKind::GetsTargeted(_)
            | ConditionKind::IsTargeted(_) => false,
        }
    }

    /// Whether the condition can never be satisfied again (latched)
    pub fn is_impossible(&mut self, world: &MissionWorld) -> bool {
        if self.impossible {
            return true;
        }
        if !self.can_be_impossible() {
            return false;
        }
        let impossible = match &mut self.kind {
            ConditionKind::Destroyed(c) => c.is_impossible(world),
            ConditionKind::Count(c) => c.is_impossible(world),
            ConditionKind::Time(c) => c.is_impossible(),
            ConditionKind::HullIntegrity(c) => c.is_impossible(world),
            ConditionKind::Distance(c) => c.is_impossible(world),
            ConditionKind::Away(c) => c.is_impossible(world),
            _ => false,
        };
        self.impossible = impossible;
        impossible
    }

    pub fn is_objective_capable(&self) -> bool {
        match &self.kind {
            ConditionKind::Destroyed(_)
            | ConditionKind::HullIntegrity(_)
            | ConditionKind::Distance(_)
            | ConditionKind::Away(_) => true,
            ConditionKind::Count(c) => c.relation() == CountRelation::Below,
            ConditionKind::Time(c) => c.is_objective_capable(),
            _ => false,
        }
    }

    /// Objective line for this condition under a Win or Lose action
    pub fn objective_text(&mut self, world: &MissionWorld, role: ObjectiveRole) -> Result<String, ConfigError> {
        let kind = self.type_name();
        match &mut self.kind {
            ConditionKind::Destroyed(c) => Ok(c.objective_text(world, role)),
            ConditionKind::Count(c) => c.objective_text(world, role),
            ConditionKind::Time(c) => c.objective_text(role),
            ConditionKind::HullIntegrity(c) => Ok(c.objective_text(world, role)),
            ConditionKind::Distance(c) => Ok(c.objective_text(world, role)),
            ConditionKind::Away(c) => Ok(c.objective_text(world, role)),
            _ => Err(ConfigError::NotObjective { kind }),
        }
    }

    /// Progress shown next to the objective, if the condition has any
    pub fn objective_state_text(&mut self, world: &MissionWorld) -> Option<String> {
        match &mut self.kind {
            ConditionKind::Destroyed(c) => Some(c.state_text(world)),
            ConditionKind::Count(c) => Some(c.state_text(world)),
            ConditionKind::Time(c) => c.state_text(),
            ConditionKind::HullIntegrity(c) => Some(c.state_text(world)),
            ConditionKind::Distance(c) => c.state_text(world),
            _ => None,
        }
    }

    /// Spacecraft the condition is about (destroy targets, escorts)
    pub fn subject_spacecrafts(&mut self, world: &MissionWorld) -> Vec<CraftIndex> {
        let subjects = match &mut self.kind {
            ConditionKind::Destroyed(c) => c.subjects_mut(),
            ConditionKind::Count(c) => c.subjects_mut(),
            ConditionKind::HullIntegrity(c) | ConditionKind::ShieldIntegrity(c) => c.subjects_mut(),
            ConditionKind::Distance(c) => c.subjects_mut(),
            ConditionKind::Hit(c) => c.subjects_mut(),
            ConditionKind::Away(c) => c.subjects_mut(),
            ConditionKind::OnTeam(c) => c.subjects_mut(),
            ConditionKind::GetsTargeted(c) => c.subjects_mut(),
            ConditionKind::IsTargeted(c) => c.subjects_mut(),
            ConditionKind::Time(_) | ConditionKind::MissionState(_) => return Vec::new(),
        };
        subjects.spacecrafts(world, false).to_vec()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::mission::world::tests::sample_world;

    pub(crate) fn condition(world: &MissionWorld, descriptor: Value) -> Result<Condition, ConfigError> {
        let descriptor: ConditionDescriptor = serde_json::from_value(descriptor).unwrap();
        let events = HashMap::from([("intro".to_string(), 0)]);
        let ctx = LoadContext::new(world, &events);
        Condition::from_descriptor(&descriptor, &ctx)
    }

    #[test]
    fn test_which_with_empty_subjects() {
        assert!(!Which::All.matches(std::iter::empty()));
        assert!(!Which::Any.matches(std::iter::empty()));
        assert!(Which::All.matches([true, true].into_iter()));
        assert!(!Which::All.matches([true, false].into_iter()));
        assert!(Which::Any.matches([false, true].into_iter()));
    }

    #[test]
    fn test_unknown_type_and_bad_params() {
        let world = sample_world();
        assert_eq!(
            condition(&world, json!({"type": "teleported"})).unwrap_err(),
            ConfigError::UnknownConditionType("teleported".into())
        );
        assert!(matches!(
            condition(&world, json!({"type": "count", "subjects": {"teams": ["empire"]}})),
            Err(ConfigError::InvalidParams { kind: "count", .. })
        ));
        assert!(matches!(
            condition(&world, json!({"type": "missionState", "params": {"missionStates": []}})),
            Err(ConfigError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_mission_state_condition() {
        let mut world = sample_world();
        let mut c = condition(
            &world,
            json!({"type": "missionState", "params": {"missionStates": ["completed", "failed"]}}),
        )
        .unwrap();
        assert!(!c.is_satisfied(&world, 16.0));
        world.set_state(MissionState::Completed);
        assert!(c.is_satisfied(&world, 16.0));
        assert!(!c.can_be_impossible());
        assert!(c.objective_text(&world, ObjectiveRole::Win).is_err());
    }

    #[test]
    fn test_impossible_condition_stays_unsatisfied() {
        let mut world = sample_world();
        let mut c = condition(
            &world,
            json!({"type": "away", "subjects": {"spacecrafts": ["e1"]}}),
        )
        .unwrap();
        assert!(!c.is_satisfied(&world, 16.0));
        let e1 = world.find_spacecraft("e1").unwrap();
        world.apply_damage(e1, 1000.0, None);
        assert!(c.is_impossible(&world));
        for _ in 0..5 {
            assert!(!c.is_satisfied(&world, 16.0));
        }
    }
}
