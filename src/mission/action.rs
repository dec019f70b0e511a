//! Actions executed when a mission event fires

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{MESSAGE_BASE_DURATION, MESSAGE_DURATION_PER_CHAR};
use crate::error::ConfigError;
use crate::sim::spacecraft::DistanceGoal;
use crate::sim::{CraftIndex, JumpWay, SpacecraftCommand};

use super::conditions::parse_params;
use super::loader::LoadContext;
use super::observer::{HudAction, HudMessage};
use super::subjects::{SubjectDescriptor, SubjectGroup};
use super::world::MissionWorld;

/// `{type, subjects?, delay?, params?}` as written in mission files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subjects: SubjectDescriptor,
    /// ms
    #[serde(default)]
    pub delay: f32,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageParams {
    text: String,
    duration: Option<f32>,
    #[serde(default)]
    permanent: bool,
    #[serde(default)]
    urgent: bool,
    color: Option<[f32; 4]>,
    source: Option<String>,
}

/// A HUD message; with subjects, shown only if the piloted spacecraft is one of them
#[derive(Debug, Clone)]
pub struct MessageAction {
    text: String,
    duration: f32,
    permanent: bool,
    urgent: bool,
    color: Option<[f32; 4]>,
    source: Option<CraftIndex>,
}

impl MessageAction {
    fn new(params: &Value, ctx: &LoadContext) -> Result<Self, ConfigError> {
        let params: MessageParams = parse_params("message", params)?;
        let duration = params.duration.unwrap_or_else(|| {
            MESSAGE_BASE_DURATION + params.text.chars().count() as f32 * MESSAGE_DURATION_PER_CHAR
        });
        let source = params.source.as_deref().map(|id| ctx.spacecraft(id)).transpose()?;
        Ok(Self {
            text: params.text,
            duration,
            permanent: params.permanent,
            urgent: params.urgent,
            color: params.color,
            source,
        })
    }

    fn message(&self) -> HudMessage {
        HudMessage {
            text: self.text.clone(),
            duration: self.duration,
            permanent: self.permanent,
            urgent: self.urgent,
            color: self.color,
            source: self.source,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum CommandParams {
    Jump {
        way: JumpWay,
    },
    Target {
        single: Option<String>,
        #[serde(default)]
        list: Vec<String>,
        #[serde(default)]
        priority: bool,
    },
    ReachDistance {
        target: String,
        min_distance: Option<f32>,
        max_distance: Option<f32>,
    },
}

fn resolve_command(params: &Value, ctx: &LoadContext) -> Result<SpacecraftCommand, ConfigError> {
    let params: CommandParams = parse_params("command", params)?;
    Ok(match params {
        CommandParams::Jump { way } => SpacecraftCommand::Jump(way),
        CommandParams::Target { single, list, priority } => SpacecraftCommand::Target {
            single: single.as_deref().map(|id| ctx.spacecraft(id)).transpose()?,
            list: list
                .iter()
                .map(|id| ctx.spacecraft(id))
                .collect::<Result<_, _>>()?,
            priority,
        },
        CommandParams::ReachDistance {
            target,
            min_distance,
            max_distance,
        } => {
            if min_distance.is_none() && max_distance.is_none() {
                return Err(ConfigError::params("command", "minDistance or maxDistance required"));
            }
            SpacecraftCommand::ReachDistance(DistanceGoal {
                target: ctx.spacecraft(&target)?,
                min: min_distance,
                max: max_distance,
            })
        }
    })
}

#[derive(Debug, Clone)]
pub enum ActionKind {
    /// Complete the mission (while objectives are pending)
    Win,
    /// Fail the mission, overriding a win
    Lose,
    Message(MessageAction),
    ClearMessages,
    /// Deliver a command to every subject
    Command(SpacecraftCommand),
    Hud(HudAction),
}

#[derive(Debug, Clone)]
pub struct Action {
    kind: ActionKind,
    /// ms
    delay: f32,
    subjects: SubjectGroup,
}

impl Action {
    pub fn new(kind: ActionKind, delay: f32, subjects: SubjectGroup) -> Self {
        Self {
            kind,
            delay: delay.max(0.0),
            subjects,
        }
    }

    pub fn from_descriptor(descriptor: &ActionDescriptor, ctx: &LoadContext) -> Result<Self, ConfigError> {
        let params = &descriptor.params;
        let kind = match descriptor.kind.as_str() {
            "win" => ActionKind::Win,
            "lose" => ActionKind::Lose,
            "message" => ActionKind::Message(MessageAction::new(params, ctx)?),
            "clearMessages" => ActionKind::ClearMessages,
            "command" => {
                if descriptor.subjects.is_empty() {
                    return Err(ConfigError::params("command", "a command needs subjects"));
                }
                ActionKind::Command(resolve_command(params, ctx)?)
            }
            "hud" => ActionKind::Hud(parse_params("hud", params)?),
            other => return Err(ConfigError::UnknownActionType(other.to_string())),
        };
        let subjects = if descriptor.subjects.is_empty() {
            SubjectGroup::default()
        } else {
            ctx.subjects("action", &descriptor.subjects)?
        };
        Ok(Self::new(kind, descriptor.delay, subjects))
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    pub fn is_win(&self) -> bool {
        matches!(self.kind, ActionKind::Win)
    }

    pub fn is_lose(&self) -> bool {
        matches!(self.kind, ActionKind::Lose)
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ActionKind::Win => "win",
            ActionKind::Lose => "lose",
            ActionKind::Message(_) => "message",
            ActionKind::ClearMessages => "clearMessages",
            ActionKind::Command(_) => "command",
            ActionKind::Hud(_) => "hud",
        }
    }

    pub fn execute(&mut self, world: &mut MissionWorld) {
        log::debug!("Executing {} action", self.type_name());
        match &self.kind {
            ActionKind::Win => world.win(),
            ActionKind::Lose => world.lose(),
            ActionKind::Message(message) => {
                let addressed = self.subjects.is_empty()
                    || world.piloted_craft().is_some_and(|pilot| self.subjects.has(pilot));
                if addressed {
                    world.observer_mut().queue_message(message.message());
                }
            }
            ActionKind::ClearMessages => world.observer_mut().clear_messages(),
            ActionKind::Command(command) => {
                // Address the subjects as they are now
                let recipients = self.subjects.spacecrafts(world, true).to_vec();
                for craft in recipients {
                    world.dispatch_command(craft, command);
                }
            }
            ActionKind::Hud(action) => world.observer_mut().hud_action(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::mission::observer::RecordingObserver;
    use crate::mission::observer::HudSectionState;
    use crate::mission::world::MissionState;
    use crate::mission::world::tests::sample_world;

    fn action(world: &MissionWorld, descriptor: Value) -> Result<Action, ConfigError> {
        let descriptor: ActionDescriptor = serde_json::from_value(descriptor).unwrap();
        let events = HashMap::new();
        let ctx = LoadContext::new(world, &events);
        Action::from_descriptor(&descriptor, &ctx)
    }

    fn observed(world: &mut MissionWorld) -> RecordingObserver {
        let observer = RecordingObserver::new();
        world.set_observer(Box::new(observer.clone()));
        observer
    }

    #[test]
    fn test_message_defaults_and_addressing() {
        let mut world = sample_world();
        let observer = observed(&mut world);
        let mut to_all = action(&world, json!({"type": "message", "params": {"text": "Hello", "source": "alpha 1"}})).unwrap();
        let mut to_enemy = action(
            &world,
            json!({"type": "message", "subjects": {"teams": ["empire"]}, "params": {"text": "Hi"}}),
        )
        .unwrap();
        to_all.execute(&mut world);
        to_enemy.execute(&mut world);

        let log = observer.log();
        assert_eq!(log.messages.len(), 1);
        let message = &log.messages[0];
        assert_eq!(message.text, "Hello");
        assert_eq!(message.duration, MESSAGE_BASE_DURATION + 5.0 * MESSAGE_DURATION_PER_CHAR);
        assert_eq!(message.source, world.find_spacecraft("alpha 1"));
    }

    #[test]
    fn test_command_reaches_subjects() {
        let mut world = sample_world();
        let observer = observed(&mut world);
        let mut jump = action(
            &world,
            json!({"type": "command", "subjects": {"squads": ["alpha"]}, "params": {"command": "jump", "way": "out"}}),
        )
        .unwrap();
        jump.execute(&mut world);
        assert_eq!(observer.log().commands.len(), 2);
        let alpha1 = world.find_spacecraft("alpha 1").unwrap();
        assert!(matches!(
            world.spacecraft(alpha1).unwrap().jump_state(),
            crate::sim::JumpState::JumpingOut { .. }
        ));
    }

    #[test]
    fn test_target_command_resolves_ids() {
        let mut world = sample_world();
        let mut target = action(
            &world,
            json!({"type": "command", "subjects": {"spacecrafts": ["alpha 1"]}, "params": {"command": "target", "list": ["e2", "e1"], "priority": true}}),
        )
        .unwrap();
        target.execute(&mut world);
        let alpha1 = world.find_spacecraft("alpha 1").unwrap();
        let craft = world.spacecraft(alpha1).unwrap();
        assert_eq!(craft.target(), world.find_spacecraft("e2"));
        assert!(craft.priority_targets);

        assert_eq!(
            action(
                &world,
                json!({"type": "command", "subjects": {"spacecrafts": ["alpha 1"]}, "params": {"command": "target", "single": "ghost"}}),
            )
            .unwrap_err(),
            ConfigError::UnknownSpacecraft("ghost".into())
        );
        assert!(action(&world, json!({"type": "command", "params": {"command": "jump", "way": "in"}})).is_err());
    }

    #[test]
    fn test_win_lose_hud_clear() {
        let mut world = sample_world();
        let observer = observed(&mut world);
        world.set_state(MissionState::InProgress);
        action(&world, json!({"type": "hud", "params": {"section": "radar", "state": "highlighted"}}))
            .unwrap()
            .execute(&mut world);
        action(&world, json!({"type": "clearMessages"})).unwrap().execute(&mut world);
        action(&world, json!({"type": "win"})).unwrap().execute(&mut world);
        assert_eq!(world.state(), MissionState::Completed);
        action(&world, json!({"type": "lose"})).unwrap().execute(&mut world);
        assert_eq!(world.state(), MissionState::Failed);

        let log = observer.log();
        assert_eq!(log.clears, 1);
        assert_eq!(
            log.hud_actions,
            vec![HudAction {
                section: "radar".into(),
                state: HudSectionState::Highlighted
            }]
        );
        assert!(matches!(
            action(&world, json!({"type": "explode"})),
            Err(ConfigError::UnknownActionType(_))
        ));
    }
}
