//! Mission rule engine and orchestration
//!
//! A [`Mission`] owns the [`MissionWorld`] (spacecraft, pools, action queue)
//! and the list of [`MissionEvent`]s. Each [`Mission::tick`] runs the fixed
//! phase order: environment, delayed actions, events, spacecraft, collisions,
//! weapons, effects, origin recentering, and finally the mission state.

pub mod action;
pub mod conditions;
pub mod descriptor;
pub mod event;
pub mod loader;
pub mod objective;
pub mod observer;
pub mod score;
pub mod subjects;
mod tick;
pub mod trigger;
pub mod world;

use glam::Vec3;

use crate::error::{Diagnostics, MissionError};
use crate::settings::Settings;
use crate::sim::{ClassCatalog, ControlIntent, CraftIndex, Pools, SpacecraftAi};

pub use descriptor::MissionDescriptor;
pub use event::MissionEvent;
pub use objective::{Objective, ObjectiveReport, ObjectiveRole, ObjectiveStatus};
pub use observer::{MissionObserver, NullObserver, RecordingObserver};
pub use score::{Performance, ScoreBreakdown};
pub use world::{MissionState, MissionWorld};

use objective::ObjectiveSource;
use tick::{HitObject, Impact};

pub struct Mission {
    name: String,
    title: Option<String>,
    world: MissionWorld,
    events: Vec<MissionEvent>,
    objectives: Vec<Objective>,
    objective_status: Vec<ObjectiveStatus>,
    /// Statuses that can no longer change are not re-evaluated
    objective_settled: Vec<bool>,
    diagnostics: Diagnostics,
    ai: Option<Box<dyn SpacecraftAi>>,
    pilot_intent: Option<ControlIntent>,
    /// Let the AI fly the piloted spacecraft as well
    autopilot: bool,
    /// Guests in a shared session leave events and delayed actions to the host
    authority: bool,
    camera: Option<Vec3>,
    reference_score: f32,
    ticks: u64,
    intents: Vec<(CraftIndex, ControlIntent)>,
    hit_scratch: Vec<HitObject>,
    impacts: Vec<Impact>,
}

impl Mission {
    /// Build a mission; the pools are prefilled for the settings' quality
    pub fn new(descriptor: &MissionDescriptor, catalog: &ClassCatalog, settings: Settings, mut pools: Pools) -> Self {
        pools.prefill_for(&settings);
        let loader::LoadedMission {
            mut world,
            events,
            diagnostics,
        } = loader::load(descriptor, catalog, settings, pools);

        let objectives = objective::collect(&events);
        let declared = events.iter().any(|e| e.has_win() || e.has_lose());
        let initial = if declared {
            MissionState::InProgress
        } else if !world.spacecrafts().is_empty() {
            MissionState::Battle
        } else {
            MissionState::None
        };
        world.set_state(initial);
        let reference_score = score::reference_score(&world);

        log::info!(
            "Mission '{}' ready: {} teams, {} objectives, state {}",
            descriptor.name,
            world.teams().len(),
            objectives.len(),
            initial
        );
        Self {
            name: descriptor.name.clone(),
            title: descriptor.title.clone(),
            objective_status: vec![ObjectiveStatus::InProgress; objectives.len()],
            objective_settled: vec![false; objectives.len()],
            objectives,
            world,
            events,
            diagnostics,
            ai: None,
            pilot_intent: None,
            autopilot: false,
            authority: true,
            camera: None,
            reference_score,
            ticks: 0,
            intents: Vec::new(),
            hit_scratch: Vec::new(),
            impacts: Vec::new(),
        }
    }

    /// Parse a descriptor and build the mission from it
    pub fn from_json(json: &str, catalog: &ClassCatalog, settings: Settings, pools: Pools) -> Result<Self, MissionError> {
        let descriptor = MissionDescriptor::from_json(json)?;
        Ok(Self::new(&descriptor, catalog, settings, pools))
    }

    /// Release every pooled entity and hand the pools back
    pub fn destroy(self) -> Pools {
        log::info!("Mission '{}' destroyed after {} ticks", self.name, self.ticks);
        let mut pools = self.world.into_pools();
        pools.release_all();
        pools
    }

    // === Collaborators ===

    pub fn set_observer(&mut self, observer: Box<dyn MissionObserver>) {
        self.world.set_observer(observer);
    }

    pub fn set_ai(&mut self, ai: Box<dyn SpacecraftAi>) {
        self.ai = Some(ai);
    }

    /// Control input for the piloted spacecraft, used every tick until replaced
    pub fn set_pilot_intent(&mut self, intent: Option<ControlIntent>) {
        self.pilot_intent = intent;
    }

    pub fn set_autopilot(&mut self, autopilot: bool) {
        self.autopilot = autopilot;
    }

    pub fn set_authority(&mut self, authority: bool) {
        self.authority = authority;
    }

    pub fn is_authoritative(&self) -> bool {
        self.authority
    }

    /// Camera position for origin recentering (defaults to the piloted spacecraft)
    pub fn set_camera_position(&mut self, position: Option<Vec3>) {
        self.camera = position;
    }

    pub fn camera_position(&self) -> Option<Vec3> {
        self.camera
    }

    // === Queries ===

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn state(&self) -> MissionState {
        self.world.state()
    }

    pub fn is_finished(&self) -> bool {
        self.world.state().is_over()
    }

    pub fn world(&self) -> &MissionWorld {
        &self.world
    }

    pub fn events(&self) -> &[MissionEvent] {
        &self.events
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    pub fn objective_status(&self) -> &[ObjectiveStatus] {
        &self.objective_status
    }

    /// Objective lines for the HUD; misused conditions are reported to the diagnostics
    pub fn objective_reports(&mut self) -> Vec<ObjectiveReport> {
        self.objectives
            .iter()
            .zip(&self.objective_status)
            .map(|(objective, &status)| objective.report(status, &mut self.events, &self.world, &mut self.diagnostics))
            .collect()
    }

    /// Spacecraft the HUD should mark as objective targets
    pub fn objective_targets(&mut self) -> Vec<CraftIndex> {
        let mut targets = Vec::new();
        for (objective, status) in self.objectives.iter().zip(&self.objective_status) {
            if objective.role != ObjectiveRole::Win || *status != ObjectiveStatus::InProgress {
                continue;
            }
            match objective.source {
                ObjectiveSource::DestroyAllEnemies => {
                    let Some(pilot) = self.world.piloted_craft() else {
                        continue;
                    };
                    targets.extend(self.world.spacecrafts().iter().copied().filter(|&i| {
                        self.world
                            .spacecraft(i)
                            .is_some_and(|c| c.is_present() && !std::ptr::eq(c, pilot) && c.is_hostile_to(pilot))
                    }));
                }
                ObjectiveSource::Condition { event, condition } => {
                    if let Some(condition) = self
                        .events
                        .get_mut(event)
                        .and_then(|e| e.trigger.conditions_mut().get_mut(condition))
                    {
                        targets.extend(condition.subject_spacecrafts(&self.world));
                    }
                }
            }
        }
        targets.sort();
        targets.dedup();
        targets
    }

    pub fn score(&self) -> ScoreBreakdown {
        let completed = self.world.state() == MissionState::Completed;
        match self.world.piloted_craft() {
            Some(pilot) => ScoreBreakdown::new(&pilot.stats, pilot.hull_integrity(), completed, self.reference_score),
            None => ScoreBreakdown::new(&Default::default(), 0.0, false, self.reference_score),
        }
    }

    /// Debug line: time, state, spacecraft and pool usage
    pub fn telemetry(&self) -> String {
        format!(
            "t={:.1}s state={} spacecraft={}/{} hit objects={} queued actions={} | {}",
            self.world.elapsed() / 1000.0,
            self.world.state(),
            self.world.spacecrafts().len(),
            self.world.arena().len(),
            self.world.hit_objects().len(),
            self.world.queued_actions(),
            self.world.pools.telemetry()
        )
    }
}
