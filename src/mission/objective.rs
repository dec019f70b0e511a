//! Mission objectives derived from Win and Lose actions
//!
//! Every objective-capable condition in the trigger of an event carrying a
//! Win or Lose action becomes an objective. Without any Win action, and with
//! no Lose trigger that can become impossible, the mission gets an implicit
//! "destroy all enemies" objective.

use serde::Serialize;

use crate::error::Diagnostics;

use super::event::MissionEvent;
use super::world::MissionWorld;

/// Which kind of action the objective comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectiveRole {
    Win,
    Lose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectiveStatus {
    #[default]
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSource {
    DestroyAllEnemies,
    Condition { event: usize, condition: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Objective {
    pub role: ObjectiveRole,
    pub source: ObjectiveSource,
    /// A Lose objective whose trigger can never become impossible; it can
    /// fail the mission but never completes
    pub inactive: bool,
}

/// Status of an objective after one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub status: ObjectiveStatus,
    /// The status can no longer change (the event fired or the goal became impossible)
    pub settled: bool,
}

impl Evaluation {
    fn open(status: ObjectiveStatus) -> Self {
        Self { status, settled: false }
    }

    fn settled(status: ObjectiveStatus) -> Self {
        Self { status, settled: true }
    }
}

/// Objective line for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveReport {
    pub text: String,
    pub state_text: Option<String>,
    pub status: ObjectiveStatus,
    pub role: ObjectiveRole,
}

/// Collect objectives from the loaded events
pub fn collect(events: &[MissionEvent]) -> Vec<Objective> {
    let mut objectives = Vec::new();
    for (event_index, event) in events.iter().enumerate() {
        let roles = [
            (event.has_win(), ObjectiveRole::Win),
            (event.has_lose(), ObjectiveRole::Lose),
        ];
        for (present, role) in roles {
            if !present {
                continue;
            }
            let inactive = role == ObjectiveRole::Lose && !event.trigger.can_be_impossible();
            for (condition_index, condition) in event.trigger.conditions().iter().enumerate() {
                if condition.is_objective_capable() {
                    objectives.push(Objective {
                        role,
                        source: ObjectiveSource::Condition {
                            event: event_index,
                            condition: condition_index,
                        },
                        inactive,
                    });
                }
            }
        }
    }

    let has_win = events.iter().any(MissionEvent::has_win);
    let lose_can_complete = events
        .iter()
        .any(|e| e.has_lose() && e.trigger.can_be_impossible());
    if !has_win && !lose_can_complete {
        objectives.push(Objective {
            role: ObjectiveRole::Win,
            source: ObjectiveSource::DestroyAllEnemies,
            inactive: false,
        });
    }
    objectives
}

impl Objective {
    /// Status from this tick's condition results
    pub fn evaluate(&self, events: &mut [MissionEvent], world: &MissionWorld) -> Evaluation {
        match self.source {
            ObjectiveSource::DestroyAllEnemies => {
                let cleared = match world.piloted() {
                    Some(piloted) => world.hostile_count(piloted) == 0,
                    None => !world.has_mutual_hostiles(),
                };
                // Hostiles may still jump in
                Evaluation::open(if cleared {
                    ObjectiveStatus::Completed
                } else {
                    ObjectiveStatus::InProgress
                })
            }
            ObjectiveSource::Condition { event, condition } => {
                let fired = world.event_fire_count(event) > 0;
                let Some(event) = events.get_mut(event) else {
                    return Evaluation::open(ObjectiveStatus::InProgress);
                };
                match self.role {
                    ObjectiveRole::Win => {
                        if fired {
                            return Evaluation::settled(ObjectiveStatus::Completed);
                        }
                        let Some(condition) = event.trigger.conditions_mut().get_mut(condition) else {
                            return Evaluation::open(ObjectiveStatus::InProgress);
                        };
                        if condition.is_impossible(world) {
                            Evaluation::settled(ObjectiveStatus::Failed)
                        } else if condition.last_satisfied() {
                            Evaluation::open(ObjectiveStatus::Completed)
                        } else {
                            Evaluation::open(ObjectiveStatus::InProgress)
                        }
                    }
                    ObjectiveRole::Lose => {
                        if fired {
                            Evaluation::settled(ObjectiveStatus::Failed)
                        } else if event.trigger.is_impossible(world) {
                            Evaluation::settled(ObjectiveStatus::Completed)
                        } else {
                            Evaluation::open(ObjectiveStatus::InProgress)
                        }
                    }
                }
            }
        }
    }

    /// Display text; unsupported conditions are reported and render empty
    pub fn report(
        &self,
        status: ObjectiveStatus,
        events: &mut [MissionEvent],
        world: &MissionWorld,
        diagnostics: &mut Diagnostics,
    ) -> ObjectiveReport {
        let (text, state_text) = match self.source {
            ObjectiveSource::DestroyAllEnemies => {
                let left = world.piloted().map(|p| world.hostile_count(p));
                ("Destroy all enemies".to_string(), left.map(|n| format!("{} left", n)))
            }
            ObjectiveSource::Condition { event, condition } => {
                match events
                    .get_mut(event)
                    .and_then(|e| e.trigger.conditions_mut().get_mut(condition))
                {
                    Some(condition) => {
                        let text = diagnostics
                            .ok(condition.objective_text(world, self.role))
                            .unwrap_or_default();
                        (text, condition.objective_state_text(world))
                    }
                    None => (String::new(), None),
                }
            }
        };
        ObjectiveReport {
            text,
            state_text,
            status,
            role: self.role,
        }
    }
}
