//! Triggers: when a mission event fires
//!
//! A trigger combines its conditions with ALL/ANY and turns the combined
//! value into a firing decision with one of six policies. One-shot triggers
//! walk ARMED → COUNTING_DOWN → FIRED and stop evaluating once committed.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Diagnostics};

use super::conditions::{Condition, ConditionDescriptor};
use super::loader::LoadContext;
use super::world::MissionWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionsRequired {
    #[default]
    All,
    Any,
}

/// Firing policy on the combined condition value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FireWhen {
    /// On the first tick, regardless of conditions
    MissionStarts,
    /// Every tick the value is true
    True,
    /// Every tick the value is false
    False,
    /// Whenever the value changes
    Change,
    #[default]
    ChangeToTrue,
    ChangeToFalse,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerDescriptor {
    pub conditions: Vec<ConditionDescriptor>,
    pub conditions_required: ConditionsRequired,
    pub fire_when: FireWhen,
    pub one_shot: bool,
    /// ms between the decision and the firing (one-shot only)
    pub delay: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OneShotState {
    Armed,
    CountingDown { remaining: f32 },
    Fired,
}

#[derive(Debug, Clone)]
pub struct Trigger {
    conditions: Vec<Condition>,
    required: ConditionsRequired,
    fire_when: FireWhen,
    one_shot: Option<OneShotState>,
    delay: f32,
    previous: bool,
    started: bool,
    /// Misconfigured triggers never fire
    disabled: bool,
}

impl Trigger {
    pub fn new(conditions: Vec<Condition>, required: ConditionsRequired, fire_when: FireWhen, one_shot: bool, delay: f32) -> Self {
        Self {
            conditions,
            required,
            fire_when,
            one_shot: one_shot.then_some(OneShotState::Armed),
            delay: delay.max(0.0),
            previous: false,
            started: false,
            disabled: false,
        }
    }

    /// A trigger that never fires
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::new(Vec::new(), ConditionsRequired::All, FireWhen::ChangeToTrue, true, 0.0)
        }
    }

    /// Build from a descriptor; any invalid condition disables the whole trigger
    pub fn from_descriptor(
        event: &str,
        descriptor: &TriggerDescriptor,
        ctx: &LoadContext,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let invalid = |reason| ConfigError::InvalidTrigger {
            event: event.to_string(),
            reason,
        };
        if descriptor.conditions.is_empty()
            && !(descriptor.fire_when == FireWhen::MissionStarts && descriptor.one_shot)
        {
            diagnostics.report(invalid("a trigger without conditions must be a one-shot missionStarts trigger"));
            return Self::disabled();
        }

        let mut conditions = Vec::with_capacity(descriptor.conditions.len());
        for condition in &descriptor.conditions {
            match Condition::from_descriptor(condition, ctx) {
                Ok(condition) => conditions.push(condition),
                Err(error) => {
                    diagnostics.report(error);
                    diagnostics.report(invalid("invalid condition"));
                    return Self::disabled();
                }
            }
        }

        let mut delay = descriptor.delay;
        if delay > 0.0 && !descriptor.one_shot {
            diagnostics.report(invalid("delay requires oneShot, ignoring it"));
            delay = 0.0;
        }
        Self::new(
            conditions,
            descriptor.conditions_required,
            descriptor.fire_when,
            descriptor.one_shot,
            delay,
        )
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn conditions_mut(&mut self) -> &mut [Condition] {
        &mut self.conditions
    }

    pub fn one_shot_state(&self) -> Option<OneShotState> {
        self.one_shot
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Advance one tick; returns true when the trigger fires
    pub fn simulate(&mut self, world: &MissionWorld, dt: f32) -> bool {
        if self.disabled {
            return false;
        }
        match self.one_shot {
            Some(OneShotState::Fired) => return false,
            Some(OneShotState::CountingDown { remaining }) => {
                let remaining = remaining - dt;
                if remaining <= 0.0 {
                    self.one_shot = Some(OneShotState::Fired);
                    return true;
                }
                self.one_shot = Some(OneShotState::CountingDown { remaining });
                return false;
            }
            Some(OneShotState::Armed) | None => {}
        }

        if !self.decide(world, dt) {
            return false;
        }
        match self.one_shot {
            Some(_) if self.delay > 0.0 => {
                self.one_shot = Some(OneShotState::CountingDown { remaining: self.delay });
                false
            }
            Some(_) => {
                self.one_shot = Some(OneShotState::Fired);
                true
            }
            None => true,
        }
    }

    fn decide(&mut self, world: &MissionWorld, dt: f32) -> bool {
        let first = !self.started;
        self.started = true;
        if self.fire_when == FireWhen::MissionStarts {
            return first;
        }

        // No short-circuit: timers must see every tick
        let mut all = true;
        let mut any = false;
        for condition in &mut self.conditions {
            let satisfied = condition.is_satisfied(world, dt);
            all &= satisfied;
            any |= satisfied;
        }
        let current = match self.required {
            ConditionsRequired::All => all,
            ConditionsRequired::Any => any,
        };
        let previous = std::mem::replace(&mut self.previous, current);

        match self.fire_when {
            FireWhen::MissionStarts => first,
            FireWhen::True => current,
            FireWhen::False => !current,
            FireWhen::Change => current != previous,
            FireWhen::ChangeToTrue => current && !previous,
            FireWhen::ChangeToFalse => !current && previous,
        }
    }

    /// Whether some condition combination could make firing impossible
    pub fn can_be_impossible(&self) -> bool {
        if self.disabled || self.conditions.is_empty() {
            return false;
        }
        match self.required {
            ConditionsRequired::All => self.conditions.iter().any(|c| c.can_be_impossible()),
            ConditionsRequired::Any => self.conditions.iter().all(|c| c.can_be_impossible()),
        }
    }

    /// The combined value can never become true again
    pub fn is_impossible(&mut self, world: &MissionWorld) -> bool {
        if self.disabled || self.conditions.is_empty() {
            return false;
        }
        match self.required {
            ConditionsRequired::All => self.conditions.iter_mut().any(|c| c.is_impossible(world)),
            ConditionsRequired::Any => self.conditions.iter_mut().all(|c| c.is_impossible(world)),
        }
    }
}
