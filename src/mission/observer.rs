//! Outward notifications from a running mission
//!
//! HUD, audio and networking hook in here. The mission never waits on an
//! observer and ignores what it does with the notifications.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::sim::{CraftIndex, SpacecraftCommand};

use super::MissionState;

/// A message queued for display on the HUD
#[derive(Debug, Clone, PartialEq)]
pub struct HudMessage {
    pub text: String,
    /// ms
    pub duration: f32,
    /// Stays until cleared
    pub permanent: bool,
    /// Shown before queued non-urgent messages
    pub urgent: bool,
    pub color: Option<[f32; 4]>,
    /// Speaking spacecraft
    pub source: Option<CraftIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HudSectionState {
    Visible,
    Hidden,
    Highlighted,
}

/// Change to a HUD section requested by mission rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HudAction {
    pub section: String,
    pub state: HudSectionState,
}

/// Receives mission notifications; every method defaults to doing nothing
pub trait MissionObserver {
    fn queue_message(&mut self, _message: HudMessage) {}

    fn clear_messages(&mut self) {}

    fn hud_action(&mut self, _action: &HudAction) {}

    fn command_dispatched(&mut self, _craft: CraftIndex, _command: &SpacecraftCommand) {}

    fn state_changed(&mut self, _old: MissionState, _new: MissionState) {}
}

/// Observer that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl MissionObserver for NullObserver {}

/// Everything a [`RecordingObserver`] has seen
#[derive(Debug, Clone, Default)]
pub struct ObservedLog {
    pub messages: Vec<HudMessage>,
    pub clears: usize,
    pub hud_actions: Vec<HudAction>,
    pub commands: Vec<(CraftIndex, SpacecraftCommand)>,
    pub state_changes: Vec<(MissionState, MissionState)>,
}

/// Observer that records notifications into a shared log
///
/// Clone it before handing it to a mission; every clone writes to the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    log: Rc<RefCell<ObservedLog>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Ref<'_, ObservedLog> {
        self.log.borrow()
    }
}

impl MissionObserver for RecordingObserver {
    fn queue_message(&mut self, message: HudMessage) {
        self.log.borrow_mut().messages.push(message);
    }

    fn clear_messages(&mut self) {
        self.log.borrow_mut().clears += 1;
    }

    fn hud_action(&mut self, action: &HudAction) {
        self.log.borrow_mut().hud_actions.push(action.clone());
    }

    fn command_dispatched(&mut self, craft: CraftIndex, command: &SpacecraftCommand) {
        self.log.borrow_mut().commands.push((craft, command.clone()));
    }

    fn state_changed(&mut self, old: MissionState, new: MissionState) {
        self.log.borrow_mut().state_changes.push((old, new));
    }
}
