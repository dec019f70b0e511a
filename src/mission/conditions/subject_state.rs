//! Conditions on the current state of their subject spacecraft

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::mission::loader::LoadContext;
use crate::mission::objective::ObjectiveRole;
use crate::mission::subjects::SubjectGroup;
use crate::mission::world::MissionWorld;
use crate::sim::{CraftIndex, Spacecraft};

use super::{Which, parse_params};

fn subject_crafts<'w>(subjects: &mut SubjectGroup, world: &'w MissionWorld) -> Vec<&'w Spacecraft> {
    subjects
        .spacecrafts(world, false)
        .iter()
        .filter_map(|&i| world.spacecraft(i))
        .collect()
}

// === Destroyed ===

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DestroyedParams {
    count: Option<usize>,
}

/// All subjects (or at least `count` of them) have been destroyed
#[derive(Debug, Clone)]
pub struct DestroyedCondition {
    subjects: SubjectGroup,
    count: Option<usize>,
}

impl DestroyedCondition {
    pub fn new(subjects: SubjectGroup, params: &Value) -> Result<Self, ConfigError> {
        let params: DestroyedParams = parse_params("destroyed", params)?;
        if params.count == Some(0) {
            return Err(ConfigError::params("destroyed", "count must be positive"));
        }
        Ok(Self {
            subjects,
            count: params.count,
        })
    }

    pub(super) fn subjects_mut(&mut self) -> &mut SubjectGroup {
        &mut self.subjects
    }

    fn needed(&mut self, world: &MissionWorld) -> usize {
        let total = self.subjects.spacecrafts(world, false).len();
        self.count.map_or(total, |count| count.min(total))
    }

    fn destroyed(&mut self, world: &MissionWorld) -> usize {
        self.subjects.count_where(world, |c| !c.is_alive())
    }

    pub(super) fn evaluate(&mut self, world: &MissionWorld) -> bool {
        let needed = self.needed(world);
        needed > 0 && self.destroyed(world) >= needed
    }

    /// Too few destroyable subjects are left
    pub(super) fn is_impossible(&mut self, world: &MissionWorld) -> bool {
        let needed = self.needed(world);
        let destroyed = self.destroyed(world);
        let reachable = self.subjects.count_where(world, |c| c.is_alive() && !c.has_departed());
        destroyed + reachable < needed
    }

    pub(super) fn objective_text(&mut self, world: &MissionWorld, role: ObjectiveRole) -> String {
        let who = self.subjects.display_text(world);
        match (role, self.count) {
            (ObjectiveRole::Win, None) => format!("Destroy {}", who),
            (ObjectiveRole::Win, Some(count)) => format!("Destroy {} of {}", count, who),
            (ObjectiveRole::Lose, None) => format!("Do not let all of {} be destroyed", who),
            (ObjectiveRole::Lose, Some(1)) => format!("Protect {}", who),
            (ObjectiveRole::Lose, Some(count)) => format!("Do not let {} of {} be destroyed", count, who),
        }
    }

    pub(super) fn state_text(&mut self, world: &MissionWorld) -> String {
        let needed = self.needed(world);
        format!("{}/{}", self.destroyed(world).min(needed), needed)
    }
}

// === Count ===

/// How the live subject count compares to the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CountRelation {
    /// At most `count` remain
    #[default]
    Below,
    /// At least `count` remain
    Above,
    /// Exactly `count` remain
    Equals,
}

impl CountRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountRelation::Below => "below",
            CountRelation::Above => "above",
            CountRelation::Equals => "equals",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountParams {
    count: usize,
    #[serde(default)]
    relation: CountRelation,
}

/// The number of live subjects relates to a threshold
#[derive(Debug, Clone)]
pub struct CountCondition {
    subjects: SubjectGroup,
    count: usize,
    relation: CountRelation,
}

impl CountCondition {
    pub fn new(subjects: SubjectGroup, params: &Value) -> Result<Self, ConfigError> {
        let params: CountParams = parse_params("count", params)?;
        Ok(Self {
            subjects,
            count: params.count,
            relation: params.relation,
        })
    }

    pub fn relation(&self) -> CountRelation {
        self.relation
    }

    pub(super) fn subjects_mut(&mut self) -> &mut SubjectGroup {
        &mut self.subjects
    }

    pub(super) fn evaluate(&mut self, world: &MissionWorld) -> bool {
        let live = self.subjects.live_count(world);
        match self.relation {
            CountRelation::Below => live <= self.count,
            CountRelation::Above => live >= self.count,
            CountRelation::Equals => live == self.count,
        }
    }

    /// Live counts only go down, so reaching a higher count can become impossible
    pub(super) fn can_be_impossible(&self) -> bool {
        self.relation != CountRelation::Below
    }

    pub(super) fn is_impossible(&mut self, world: &MissionWorld) -> bool {
        self.relation != CountRelation::Below && self.subjects.live_count(world) < self.count
    }

    pub(super) fn objective_text(&mut self, world: &MissionWorld, role: ObjectiveRole) -> Result<String, ConfigError> {
        if self.relation != CountRelation::Below {
            return Err(ConfigError::UnsupportedObjectiveRelation(self.relation.as_str()));
        }
        let who = self.subjects.display_text(world);
        Ok(match role {
            ObjectiveRole::Win => format!("Reduce {} to {}", who, self.count),
            ObjectiveRole::Lose => format!("Keep more than {} of {} alive", self.count, who),
        })
    }

    pub(super) fn state_text(&mut self, world: &MissionWorld) -> String {
        format!("{} left", self.subjects.live_count(world))
    }
}

// === Hull / shield integrity ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityMeasure {
    Hull,
    Shield,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegrityParams {
    /// Percent
    min_integrity: Option<f32>,
    /// Percent
    max_integrity: Option<f32>,
    #[serde(default)]
    which: Which,
}

/// Subjects' hull or shield integrity (percent) lies within bounds
#[derive(Debug, Clone)]
pub struct IntegrityCondition {
    measure: IntegrityMeasure,
    subjects: SubjectGroup,
    min: Option<f32>,
    max: Option<f32>,
    which: Which,
}

impl IntegrityCondition {
    pub fn new(measure: IntegrityMeasure, subjects: SubjectGroup, params: &Value) -> Result<Self, ConfigError> {
        let kind = match measure {
            IntegrityMeasure::Hull => "hullIntegrity",
            IntegrityMeasure::Shield => "shieldIntegrity",
        };
        let params: IntegrityParams = parse_params(kind, params)?;
        if params.min_integrity.is_none() && params.max_integrity.is_none() {
            return Err(ConfigError::params(kind, "minIntegrity or maxIntegrity required"));
        }
        Ok(Self {
            measure,
            subjects,
            min: params.min_integrity,
            max: params.max_integrity,
            which: params.which,
        })
    }

    pub(super) fn subjects_mut(&mut self) -> &mut SubjectGroup {
        &mut self.subjects
    }

    fn percent(&self, craft: &Spacecraft) -> f32 {
        if !craft.is_alive() {
            return 0.0;
        }
        let value = match self.measure {
            IntegrityMeasure::Hull => craft.hull_integrity(),
            IntegrityMeasure::Shield => craft.shield_integrity(),
        };
        value * 100.0
    }

    fn in_range(&self, percent: f32) -> bool {
        self.min.is_none_or(|min| percent >= min) && self.max.is_none_or(|max| percent <= max)
    }

    pub(super) fn evaluate(&mut self, world: &MissionWorld) -> bool {
        let crafts = subject_crafts(&mut self.subjects, world);
        self.which
            .matches(crafts.iter().map(|c| self.in_range(self.percent(c))))
    }

    /// Hull does not regenerate; shields do
    pub(super) fn can_be_impossible(&self) -> bool {
        self.measure == IntegrityMeasure::Hull && self.min.is_some()
    }

    pub(super) fn is_impossible(&mut self, world: &MissionWorld) -> bool {
        let Some(min) = self.min.filter(|_| self.measure == IntegrityMeasure::Hull) else {
            return false;
        };
        let crafts = subject_crafts(&mut self.subjects, world);
        let below: Vec<bool> = crafts.iter().map(|c| self.percent(c) < min).collect();
        match self.which {
            Which::All => below.iter().any(|&b| b),
            Which::Any => !below.is_empty() && below.iter().all(|&b| b),
        }
    }

    pub(super) fn objective_text(&mut self, world: &MissionWorld, role: ObjectiveRole) -> String {
        let who = self.subjects.display_text(world);
        let part = match self.measure {
            IntegrityMeasure::Hull => "hull",
            IntegrityMeasure::Shield => "shield",
        };
        match (role, self.max, self.min) {
            (ObjectiveRole::Win, Some(max), _) => format!("Damage {} to {}% {}", who, max, part),
            (ObjectiveRole::Win, None, Some(min)) => format!("Keep {} above {}% {}", who, min, part),
            (ObjectiveRole::Lose, Some(max), _) => format!("Keep {} above {}% {}", who, max, part),
            (ObjectiveRole::Lose, None, Some(min)) => format!("Keep {} below {}% {}", who, min, part),
            (_, None, None) => who,
        }
    }

    pub(super) fn state_text(&mut self, world: &MissionWorld) -> String {
        let crafts = subject_crafts(&mut self.subjects, world);
        let lowest = crafts
            .iter()
            .map(|c| self.percent(c))
            .fold(None, |acc: Option<f32>, p| Some(acc.map_or(p, |a| a.min(p))));
        format!("{:.0}%", lowest.unwrap_or(0.0))
    }
}

// === Distance ===

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DistanceParams {
    target: String,
    min_distance: Option<f32>,
    max_distance: Option<f32>,
    #[serde(default)]
    which: Which,
}

/// Subjects are within a distance band of a target spacecraft
#[derive(Debug, Clone)]
pub struct DistanceCondition {
    subjects: SubjectGroup,
    target: CraftIndex,
    min: Option<f32>,
    max: Option<f32>,
    which: Which,
}

impl DistanceCondition {
    pub fn new(subjects: SubjectGroup, params: &Value, ctx: &LoadContext) -> Result<Self, ConfigError> {
        let params: DistanceParams = parse_params("distance", params)?;
        if params.min_distance.is_none() && params.max_distance.is_none() {
            return Err(ConfigError::params("distance", "minDistance or maxDistance required"));
        }
        Ok(Self {
            subjects,
            target: ctx.spacecraft(&params.target)?,
            min: params.min_distance,
            max: params.max_distance,
            which: params.which,
        })
    }

    pub(super) fn subjects_mut(&mut self) -> &mut SubjectGroup {
        &mut self.subjects
    }

    pub(super) fn evaluate(&mut self, world: &MissionWorld) -> bool {
        let Some(target) = world.spacecraft(self.target).filter(|c| c.is_present()) else {
            return false;
        };
        let crafts = subject_crafts(&mut self.subjects, world);
        self.which.matches(crafts.iter().map(|c| {
            let distance = c.position.distance(target.position);
            c.is_present()
                && self.min.is_none_or(|min| distance >= min)
                && self.max.is_none_or(|max| distance <= max)
        }))
    }

    /// The target or the required subjects can no longer take part
    pub(super) fn is_impossible(&mut self, world: &MissionWorld) -> bool {
        let gone = |c: &Spacecraft| !c.is_alive() || c.has_departed();
        if world.spacecraft(self.target).is_none_or(gone) {
            return true;
        }
        let crafts = subject_crafts(&mut self.subjects, world);
        match self.which {
            Which::All => crafts.iter().any(|c| gone(c)),
            Which::Any => crafts.iter().all(|c| gone(c)),
        }
    }

    pub(super) fn objective_text(&mut self, world: &MissionWorld, role: ObjectiveRole) -> String {
        let who = self.subjects.display_text(world);
        let target = world
            .spacecraft(self.target)
            .map_or_else(String::new, |c| c.display_name());
        match (role, self.max, self.min) {
            (ObjectiveRole::Win, Some(max), _) => format!("Bring {} within {} m of {}", who, max, target),
            (ObjectiveRole::Win, None, Some(min)) => format!("Move {} {} m away from {}", who, min, target),
            (ObjectiveRole::Lose, Some(max), _) => format!("Keep {} farther than {} m from {}", who, max, target),
            (ObjectiveRole::Lose, None, Some(min)) => format!("Keep {} within {} m of {}", who, min, target),
            (_, None, None) => who,
        }
    }

    /// Distance of the closest present subject
    pub(super) fn state_text(&mut self, world: &MissionWorld) -> Option<String> {
        let target = world.spacecraft(self.target)?.position;
        let crafts = subject_crafts(&mut self.subjects, world);
        crafts
            .iter()
            .filter(|c| c.is_present())
            .map(|c| c.position.distance(target))
            .min_by(|a, b| a.total_cmp(b))
            .map(|d| format!("{:.0} m", d))
    }
}

// === Away ===

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AwayParams {
    #[serde(default)]
    which: Which,
}

/// Subjects are outside the battle space
#[derive(Debug, Clone)]
pub struct AwayCondition {
    subjects: SubjectGroup,
    which: Which,
}

impl AwayCondition {
    pub fn new(subjects: SubjectGroup, params: &Value) -> Result<Self, ConfigError> {
        let params: AwayParams = parse_params("away", params)?;
        Ok(Self {
            subjects,
            which: params.which,
        })
    }

    pub(super) fn subjects_mut(&mut self) -> &mut SubjectGroup {
        &mut self.subjects
    }

    pub(super) fn evaluate(&mut self, world: &MissionWorld) -> bool {
        let crafts = subject_crafts(&mut self.subjects, world);
        self.which
            .matches(crafts.iter().map(|c| c.is_alive() && c.is_away()))
    }

    /// Destroyed spacecraft never get away
    pub(super) fn is_impossible(&mut self, world: &MissionWorld) -> bool {
        let crafts = subject_crafts(&mut self.subjects, world);
        match self.which {
            Which::All => crafts.iter().any(|c| !c.is_alive()),
            Which::Any => crafts.iter().all(|c| !c.is_alive()),
        }
    }

    pub(super) fn objective_text(&mut self, world: &MissionWorld, role: ObjectiveRole) -> String {
        let who = self.subjects.display_text(world);
        match role {
            ObjectiveRole::Win => format!("Get {} to jump out", who),
            ObjectiveRole::Lose => format!("Prevent {} from jumping out", who),
        }
    }
}

// === On team ===

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnTeamParams {
    team: String,
}

/// Every subject belongs to the given team
#[derive(Debug, Clone)]
pub struct OnTeamCondition {
    subjects: SubjectGroup,
    team: String,
}

impl OnTeamCondition {
    pub fn new(subjects: SubjectGroup, params: &Value, ctx: &LoadContext) -> Result<Self, ConfigError> {
        let params: OnTeamParams = parse_params("onTeam", params)?;
        ctx.team(&params.team)?;
        Ok(Self {
            subjects,
            team: params.team,
        })
    }

    pub(super) fn subjects_mut(&mut self) -> &mut SubjectGroup {
        &mut self.subjects
    }

    pub(super) fn evaluate(&mut self, world: &MissionWorld) -> bool {
        let crafts = subject_crafts(&mut self.subjects, world);
        Which::All.matches(
            crafts
                .iter()
                .map(|c| c.team.as_deref() == Some(self.team.as_str())),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::Condition;
    use super::super::tests::condition;
    use crate::error::ConfigError;
    use crate::mission::objective::ObjectiveRole;
    use crate::mission::world::MissionWorld;
    use crate::mission::world::tests::sample_world;

    fn destroy(world: &mut MissionWorld, id: &str) {
        let index = world.find_spacecraft(id).unwrap();
        world.apply_damage(index, 10_000.0, None);
    }

    fn check(c: &mut Condition, world: &MissionWorld) -> bool {
        c.is_satisfied(world, 16.0)
    }

    #[test]
    fn test_destroyed_all_and_count() {
        let mut world = sample_world();
        let mut all = condition(&world, json!({"type": "destroyed", "subjects": {"teams": ["empire"]}})).unwrap();
        let mut one = condition(
            &world,
            json!({"type": "destroyed", "subjects": {"teams": ["empire"]}, "params": {"count": 1}}),
        )
        .unwrap();
        assert!(!check(&mut all, &world));
        assert!(!check(&mut one, &world));
        assert_eq!(all.objective_state_text(&world).unwrap(), "0/2");

        destroy(&mut world, "e1");
        world.prune_spacecrafts();
        assert!(!check(&mut all, &world));
        assert!(check(&mut one, &world));
        assert_eq!(all.objective_state_text(&world).unwrap(), "1/2");

        destroy(&mut world, "e2");
        assert!(check(&mut all, &world));
        assert_eq!(
            all.objective_text(&world, ObjectiveRole::Win).unwrap(),
            "Destroy team Empire"
        );
    }

    #[test]
    fn test_destroyed_impossible_after_departure() {
        let mut world = sample_world();
        let mut c = condition(&world, json!({"type": "destroyed", "subjects": {"spacecrafts": ["e1"]}})).unwrap();
        assert!(!check(&mut c, &world));
        let e1 = world.find_spacecraft("e1").unwrap();
        world.dispatch_command(e1, &crate::sim::SpacecraftCommand::Jump(crate::sim::JumpWay::Out));
        world.spacecraft_mut(e1).unwrap().simulate(crate::consts::JUMP_OUT_DURATION);
        assert!(!check(&mut c, &world));
        assert!(c.is_impossible(&world));
    }

    #[test]
    fn test_count_relations() {
        let mut world = sample_world();
        let mut below = condition(
            &world,
            json!({"type": "count", "subjects": {"teams": ["empire"]}, "params": {"count": 1, "relation": "below"}}),
        )
        .unwrap();
        let mut above = condition(
            &world,
            json!({"type": "count", "subjects": {"teams": ["empire"]}, "params": {"count": 2, "relation": "above"}}),
        )
        .unwrap();
        let mut equals = condition(
            &world,
            json!({"type": "count", "subjects": {"teams": ["empire"]}, "params": {"count": 1, "relation": "equals"}}),
        )
        .unwrap();
        assert!(!check(&mut below, &world));
        assert!(check(&mut above, &world));
        assert!(!check(&mut equals, &world));

        destroy(&mut world, "e1");
        assert!(check(&mut below, &world));
        assert!(!check(&mut above, &world));
        assert!(above.is_impossible(&world));
        assert!(check(&mut equals, &world));

        assert!(below.is_objective_capable());
        assert!(!equals.is_objective_capable());
        assert_eq!(
            equals.objective_text(&world, ObjectiveRole::Win).unwrap_err(),
            ConfigError::UnsupportedObjectiveRelation("equals")
        );
    }

    #[test]
    fn test_hull_integrity_bounds() {
        let mut world = sample_world();
        let mut damaged = condition(
            &world,
            json!({"type": "hullIntegrity", "subjects": {"spacecrafts": ["e1"]}, "params": {"maxIntegrity": 50}}),
        )
        .unwrap();
        let mut healthy = condition(
            &world,
            json!({"type": "hullIntegrity", "subjects": {"spacecrafts": ["e1"]}, "params": {"minIntegrity": 80}}),
        )
        .unwrap();
        assert!(!check(&mut damaged, &world));
        assert!(check(&mut healthy, &world));

        // Interceptor hull is 60 without shield
        let e1 = world.find_spacecraft("e1").unwrap();
        world.apply_damage(e1, 36.0, None);
        assert!(check(&mut damaged, &world));
        assert!(!check(&mut healthy, &world));
        assert!(healthy.is_impossible(&world));
        assert_eq!(damaged.objective_state_text(&world).unwrap(), "40%");
    }

    #[test]
    fn test_shield_integrity_never_impossible() {
        let mut world = sample_world();
        let mut c = condition(
            &world,
            json!({"type": "shieldIntegrity", "subjects": {"spacecrafts": ["player"]}, "params": {"minIntegrity": 50}}),
        )
        .unwrap();
        assert!(check(&mut c, &world));
        let player = world.piloted().unwrap();
        world.apply_damage(player, 40.0, None);
        assert!(!check(&mut c, &world));
        assert!(!c.is_impossible(&world));
        assert!(!c.is_objective_capable());
    }

    #[test]
    fn test_distance_band() {
        let mut world = sample_world();
        let mut near = condition(
            &world,
            json!({"type": "distance", "subjects": {"spacecrafts": ["alpha 1"]}, "params": {"target": "player", "maxDistance": 150}}),
        )
        .unwrap();
        let mut far = condition(
            &world,
            json!({"type": "distance", "subjects": {"squads": ["alpha"]}, "params": {"target": "player", "minDistance": 150, "which": "any"}}),
        )
        .unwrap();
        assert!(check(&mut near, &world));
        assert!(check(&mut far, &world));
        assert_eq!(near.objective_state_text(&world).unwrap(), "100 m");

        assert_eq!(
            condition(
                &world,
                json!({"type": "distance", "subjects": {"spacecrafts": ["alpha 1"]}, "params": {"target": "ghost", "maxDistance": 1}}),
            )
            .unwrap_err(),
            ConfigError::UnknownSpacecraft("ghost".into())
        );

        destroy(&mut world, "player");
        assert!(!check(&mut near, &world));
        assert!(near.is_impossible(&world));
    }

    #[test]
    fn test_away_and_on_team() {
        let mut world = sample_world();
        let mut away = condition(&world, json!({"type": "away", "subjects": {"spacecrafts": ["alpha 2"]}})).unwrap();
        let mut on_team = condition(
            &world,
            json!({"type": "onTeam", "subjects": {"squads": ["alpha"]}, "params": {"team": "rebels"}}),
        )
        .unwrap();
        assert!(!check(&mut away, &world));
        assert!(check(&mut on_team, &world));

        let alpha2 = world.find_spacecraft("alpha 2").unwrap();
        world.dispatch_command(alpha2, &crate::sim::SpacecraftCommand::Jump(crate::sim::JumpWay::Out));
        world.spacecraft_mut(alpha2).unwrap().simulate(crate::consts::JUMP_OUT_DURATION);
        assert!(check(&mut away, &world));
        assert_eq!(
            away.objective_text(&world, ObjectiveRole::Win).unwrap(),
            "Get alpha 2 to jump out"
        );

        assert_eq!(
            condition(
                &world,
                json!({"type": "onTeam", "subjects": {"squads": ["alpha"]}, "params": {"team": "pirates"}}),
            )
            .unwrap_err(),
            ConfigError::UnknownTeam("pirates".into())
        );
    }
}
