//! Mission events: a trigger and the actions it fires

use serde::{Deserialize, Serialize};

use crate::error::Diagnostics;

use super::action::{Action, ActionDescriptor};
use super::loader::LoadContext;
use super::trigger::{Trigger, TriggerDescriptor};
use super::world::{ActionRef, MissionWorld};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDescriptor {
    pub name: Option<String>,
    pub trigger: TriggerDescriptor,
    pub actions: Vec<ActionDescriptor>,
}

#[derive(Debug, Clone)]
pub struct MissionEvent {
    pub name: String,
    pub trigger: Trigger,
    pub actions: Vec<Action>,
}

impl MissionEvent {
    /// Build an event; invalid actions are reported and left out
    pub fn from_descriptor(
        name: String,
        descriptor: &EventDescriptor,
        ctx: &LoadContext,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let trigger = Trigger::from_descriptor(&name, &descriptor.trigger, ctx, diagnostics);
        let actions = descriptor
            .actions
            .iter()
            .filter_map(|action| diagnostics.ok(Action::from_descriptor(action, ctx)))
            .collect();
        Self { name, trigger, actions }
    }

    pub fn has_win(&self) -> bool {
        self.actions.iter().any(Action::is_win)
    }

    pub fn has_lose(&self) -> bool {
        self.actions.iter().any(Action::is_lose)
    }

    /// Evaluate the trigger; on firing, run immediate actions in order and
    /// queue delayed ones
    pub fn simulate(&mut self, index: usize, world: &mut MissionWorld, dt: f32) {
        if !self.trigger.simulate(world, dt) {
            return;
        }
        log::debug!("Event '{}' fired", self.name);
        world.record_event_fired(index);
        for (position, action) in self.actions.iter_mut().enumerate() {
            if action.delay() > 0.0 {
                let address = ActionRef {
                    event: index,
                    action: position,
                };
                world.enqueue(address, action.delay());
            } else {
                action.execute(world);
            }
        }
    }
}
