//! Mission timer condition

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::mission::loader::LoadContext;
use crate::mission::objective::ObjectiveRole;
use crate::mission::world::MissionWorld;
use crate::ms_to_secs;

use super::parse_params;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeWhen {
    /// Until the time has elapsed
    Before,
    /// From the moment the time has elapsed on
    #[default]
    After,
    /// On the tick the time elapses, then never again
    Once,
    /// Every time another period elapses
    Repeat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeParams {
    /// ms
    time: f32,
    #[serde(default)]
    when: TimeWhen,
    max_count: Option<u32>,
    /// ms already on the clock when it starts
    #[serde(default)]
    start_offset: f32,
    /// Event whose first firing starts the clock (mission start otherwise)
    start: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TimeCondition {
    time: f32,
    when: TimeWhen,
    max_count: Option<u32>,
    start_offset: f32,
    start_event: Option<usize>,
    running: bool,
    /// ms on the clock (for REPEAT: since the last period boundary)
    elapsed: f32,
    count: u32,
    fired: bool,
}

impl TimeCondition {
    pub fn new(params: &Value, ctx: &LoadContext) -> Result<Self, ConfigError> {
        let params: TimeParams = parse_params("time", params)?;
        if !params.time.is_finite() || params.time < 0.0 {
            return Err(ConfigError::params("time", "time must be a non-negative number of ms"));
        }
        if params.when == TimeWhen::Repeat && params.time <= 0.0 {
            return Err(ConfigError::params("time", "repeat period must be positive"));
        }
        if !params.start_offset.is_finite() || params.start_offset < 0.0 {
            return Err(ConfigError::params("time", "startOffset must be a non-negative number of ms"));
        }
        if params.max_count == Some(0) {
            return Err(ConfigError::params("time", "maxCount must be positive"));
        }
        let start_event = params.start.as_deref().map(|name| ctx.event(name)).transpose()?;
        Ok(Self {
            time: params.time,
            when: params.when,
            max_count: params.max_count,
            start_offset: params.start_offset,
            start_event,
            running: false,
            elapsed: 0.0,
            count: 0,
            fired: false,
        })
    }

    /// Periods counted so far (REPEAT)
    pub fn count(&self) -> u32 {
        self.count
    }

    /// ms accumulated toward the next period
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub(super) fn evaluate(&mut self, world: &MissionWorld, dt: f32) -> bool {
        if !self.running {
            let started = self.start_event.is_none_or(|event| world.event_fire_count(event) > 0);
            if !started {
                return false;
            }
            self.running = true;
            self.elapsed = self.start_offset;
        }
        self.elapsed += dt;

        match self.when {
            TimeWhen::Before => self.elapsed < self.time,
            TimeWhen::After => self.elapsed >= self.time,
            TimeWhen::Once => {
                if !self.fired && self.elapsed >= self.time {
                    self.fired = true;
                    true
                } else {
                    false
                }
            }
            TimeWhen::Repeat => {
                // Count every boundary crossed, even several in one step
                let left = self.max_count.map_or(u32::MAX, |max| max.saturating_sub(self.count));
                if left == 0 || self.elapsed < self.time {
                    return false;
                }
                let periods = (self.elapsed / self.time).floor();
                let crossed = if periods < left as f32 { periods as u32 } else { left };
                self.count = self.count.saturating_add(crossed);
                self.elapsed = self.elapsed.rem_euclid(self.time);
                true
            }
        }
    }

    pub(super) fn can_be_impossible(&self) -> bool {
        match self.when {
            TimeWhen::Before | TimeWhen::Once => true,
            TimeWhen::After => false,
            TimeWhen::Repeat => self.max_count.is_some(),
        }
    }

    pub(super) fn is_impossible(&self) -> bool {
        match self.when {
            TimeWhen::Before => self.running && self.elapsed >= self.time,
            TimeWhen::Once => self.fired,
            TimeWhen::After => false,
            TimeWhen::Repeat => self.max_count.is_some_and(|max| self.count >= max),
        }
    }

    pub(super) fn is_objective_capable(&self) -> bool {
        matches!(self.when, TimeWhen::After | TimeWhen::Once)
    }

    pub(super) fn objective_text(&self, role: ObjectiveRole) -> Result<String, ConfigError> {
        if !self.is_objective_capable() {
            return Err(ConfigError::NotObjective { kind: "time" });
        }
        let secs = ms_to_secs(self.time);
        Ok(match role {
            ObjectiveRole::Win => format!("Survive for {:.0} seconds", secs),
            ObjectiveRole::Lose => format!("Finish within {:.0} seconds", secs),
        })
    }

    /// Seconds left on the clock
    pub(super) fn state_text(&self) -> Option<String> {
        if !self.running || self.fired || !self.is_objective_capable() {
            return None;
        }
        Some(format!("{:.0} s", ms_to_secs((self.time - self.elapsed).max(0.0))))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::super::{ConditionKind, tests::condition};
    use super::*;
    use crate::mission::world::tests::sample_world;

    fn time_state(c: &super::super::Condition) -> (u32, f32) {
        match c.kind() {
            ConditionKind::Time(t) => (t.count(), t.elapsed()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_repeat_counts_every_crossing() {
        let world = sample_world();
        let mut c = condition(&world, json!({"type": "time", "params": {"time": 1000, "when": "repeat"}})).unwrap();
        let mut seen = Vec::new();
        for _ in 0..3 {
            assert!(c.is_satisfied(&world, 1500.0));
            seen.push(time_state(&c));
        }
        // Two periods fit in the second step, so the count jumps by two there
        assert_eq!(seen, vec![(1, 500.0), (3, 0.0), (4, 500.0)]);
    }

    #[test]
    fn test_repeat_max_count_makes_impossible() {
        let world = sample_world();
        let mut c = condition(
            &world,
            json!({"type": "time", "params": {"time": 100, "when": "repeat", "maxCount": 2}}),
        )
        .unwrap();
        assert!(c.can_be_impossible());
        assert!(c.is_satisfied(&world, 100.0));
        assert!(!c.is_impossible(&world));
        assert!(c.is_satisfied(&world, 100.0));
        assert!(c.is_impossible(&world));
        assert!(!c.is_satisfied(&world, 100.0));
    }

    #[test]
    fn test_repeat_with_large_offset_settles() {
        let world = sample_world();
        let mut c = condition(
            &world,
            json!({"type": "time", "params": {"time": 1, "when": "repeat", "startOffset": 1e9}}),
        )
        .unwrap();
        assert!(c.is_satisfied(&world, 16.0));
        let (count, elapsed) = time_state(&c);
        assert!(count >= 999_000_000);
        assert!((0.0..1.0).contains(&elapsed));

        let mut bounded = condition(
            &world,
            json!({"type": "time", "params": {"time": 1, "when": "repeat", "maxCount": 3, "startOffset": 1e9}}),
        )
        .unwrap();
        assert!(bounded.is_satisfied(&world, 16.0));
        assert_eq!(time_state(&bounded), (3, 0.0));
        assert!(bounded.is_impossible(&world));
        assert!(!bounded.is_satisfied(&world, 16.0));
    }

    #[test]
    fn test_once_fires_exactly_once() {
        let world = sample_world();
        let mut c = condition(&world, json!({"type": "time", "params": {"time": 250, "when": "once"}})).unwrap();
        let fired: Vec<bool> = (0..6).map(|_| c.is_satisfied(&world, 100.0)).collect();
        assert_eq!(fired, vec![false, false, true, false, false, false]);
        assert!(c.is_impossible(&world));
    }

    #[test]
    fn test_before_and_after() {
        let world = sample_world();
        let mut before = condition(&world, json!({"type": "time", "params": {"time": 200, "when": "before"}})).unwrap();
        let mut after = condition(
            &world,
            json!({"type": "time", "params": {"time": 200, "when": "after", "startOffset": 100}}),
        )
        .unwrap();
        assert!(before.is_satisfied(&world, 100.0));
        assert!(after.is_satisfied(&world, 100.0));
        assert!(!before.is_satisfied(&world, 100.0));
        assert!(before.is_impossible(&world));
        assert!(!after.can_be_impossible());
    }

    #[test]
    fn test_clock_waits_for_start_event() {
        let mut world = sample_world();
        world.reset_event_fires(1);
        let mut c = condition(
            &world,
            json!({"type": "time", "params": {"time": 100, "when": "after", "start": "intro"}}),
        )
        .unwrap();
        assert!(!c.is_satisfied(&world, 500.0));
        world.record_event_fired(0);
        assert!(!c.is_satisfied(&world, 50.0));
        assert!(c.is_satisfied(&world, 50.0));
    }

    #[test]
    fn test_invalid_time_params() {
        let world = sample_world();
        assert!(condition(&world, json!({"type": "time", "params": {"time": 0, "when": "repeat"}})).is_err());
        assert!(condition(&world, json!({"type": "time", "params": {"time": 10, "startOffset": -5}})).is_err());
        assert_eq!(
            condition(&world, json!({"type": "time", "params": {"time": 10, "start": "outro"}})).unwrap_err(),
            ConfigError::UnknownEvent("outro".into())
        );
    }

    proptest! {
        #[test]
        fn prop_repeat_count_matches_total_time(steps in prop::collection::vec(1u32..3000, 1..40)) {
            let world = sample_world();
            let mut c = condition(&world, json!({"type": "time", "params": {"time": 1000, "when": "repeat"}})).unwrap();
            let mut total = 0u32;
            for step in steps {
                total += step;
                let before = time_state(&c).0;
                let satisfied = c.is_satisfied(&world, step as f32);
                let after = time_state(&c).0;
                prop_assert_eq!(satisfied, after > before);
            }
            prop_assert_eq!(time_state(&c).0, total / 1000);
        }
    }
}
