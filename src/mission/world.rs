//! Mission world: everything conditions read and actions change
//!
//! The world owns the spacecraft arena, teams, the delayed-action queue, the
//! notice log that edge-triggered conditions consume, and the transient entity
//! pools. Mission events live outside of it so a trigger can evaluate against
//! `&MissionWorld` while its event is borrowed mutably.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::sim::spacecraft::DamageOutcome;
use crate::sim::{CraftIndex, Environment, Pools, Spacecraft, SpacecraftCommand, Team};

use super::observer::{MissionObserver, NullObserver};

/// Overall mission status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissionState {
    /// Nothing to fight over
    #[default]
    None,
    /// Free fight without declared objectives
    Battle,
    /// Declared objectives pending
    InProgress,
    Completed,
    Failed,
    /// The piloted spacecraft was destroyed
    Defeat,
    /// Battle without a piloted spacecraft ran out of hostilities
    Ended,
}

impl MissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionState::None => "none",
            MissionState::Battle => "battle",
            MissionState::InProgress => "inProgress",
            MissionState::Completed => "completed",
            MissionState::Failed => "failed",
            MissionState::Defeat => "defeat",
            MissionState::Ended => "ended",
        }
    }

    /// The mission reached an outcome
    pub fn is_over(&self) -> bool {
        matches!(
            self,
            MissionState::Completed | MissionState::Failed | MissionState::Defeat | MissionState::Ended
        )
    }
}

impl std::fmt::Display for MissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened to a spacecraft, kept for edge-triggered conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Hit {
        target: CraftIndex,
        /// None for environmental damage
        by: Option<CraftIndex>,
    },
    Targeted {
        target: CraftIndex,
        by: CraftIndex,
    },
}

/// Address of an action: event index and position in its action list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRef {
    pub event: usize,
    pub action: usize,
}

#[derive(Debug, Clone, Copy)]
struct QueuedAction {
    action: ActionRef,
    /// ms
    remaining: f32,
}

pub struct MissionWorld {
    /// Arena; never shrinks, so indices stay valid
    crafts: Vec<Spacecraft>,
    /// Spacecraft taking part (destroyed/departed pruned in single-actor mode)
    spacecrafts: Vec<CraftIndex>,
    /// Present spacecraft that projectiles and missiles can hit
    hit_objects: Vec<CraftIndex>,
    teams: Vec<Team>,
    piloted: Option<CraftIndex>,
    state: MissionState,
    notices: Vec<Notice>,
    /// Sequence number of `notices[0]`
    notice_base: usize,
    event_fires: Vec<u32>,
    queue: Vec<QueuedAction>,
    observer: Box<dyn MissionObserver>,
    pub settings: Settings,
    pub environment: Environment,
    pub pools: Pools,
    /// ms since mission start
    elapsed: f64,
}

impl MissionWorld {
    pub fn new(settings: Settings, environment: Environment, pools: Pools) -> Self {
        Self {
            crafts: Vec::new(),
            spacecrafts: Vec::new(),
            hit_objects: Vec::new(),
            teams: Vec::new(),
            piloted: None,
            state: MissionState::None,
            notices: Vec::new(),
            notice_base: 0,
            event_fires: Vec::new(),
            queue: Vec::new(),
            observer: Box::new(NullObserver),
            settings,
            environment,
            pools,
            elapsed: 0.0,
        }
    }

    // === Teams ===

    pub fn add_team(&mut self, team: Team) {
        if self.team(&team.id).is_none() {
            self.teams.push(team);
        }
    }

    pub fn team(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    // === Spacecraft ===

    pub fn add_spacecraft(&mut self, craft: Spacecraft) -> CraftIndex {
        let index = CraftIndex(self.crafts.len());
        if craft.piloted && self.piloted.is_none() {
            self.piloted = Some(index);
        }
        if craft.is_present() {
            self.hit_objects.push(index);
        }
        self.crafts.push(craft);
        self.spacecrafts.push(index);
        index
    }

    pub fn spacecraft(&self, index: CraftIndex) -> Option<&Spacecraft> {
        self.crafts.get(index.0)
    }

    pub fn spacecraft_mut(&mut self, index: CraftIndex) -> Option<&mut Spacecraft> {
        self.crafts.get_mut(index.0)
    }

    /// Two distinct spacecraft at once, in argument order
    pub fn spacecraft_pair_mut(&mut self, a: CraftIndex, b: CraftIndex) -> Option<(&mut Spacecraft, &mut Spacecraft)> {
        if a == b || a.0 >= self.crafts.len() || b.0 >= self.crafts.len() {
            return None;
        }
        if a.0 < b.0 {
            let (low, high) = self.crafts.split_at_mut(b.0);
            Some((&mut low[a.0], &mut high[0]))
        } else {
            let (low, high) = self.crafts.split_at_mut(a.0);
            Some((&mut high[0], &mut low[b.0]))
        }
    }

    /// Every spacecraft ever added, indexed by [`CraftIndex`]
    pub fn arena(&self) -> &[Spacecraft] {
        &self.crafts
    }

    pub fn spacecrafts(&self) -> &[CraftIndex] {
        &self.spacecrafts
    }

    pub fn hit_objects(&self) -> &[CraftIndex] {
        &self.hit_objects
    }

    pub fn piloted(&self) -> Option<CraftIndex> {
        self.piloted
    }

    pub fn piloted_craft(&self) -> Option<&Spacecraft> {
        self.piloted.and_then(|i| self.spacecraft(i))
    }

    /// Look up a spacecraft by id
    pub fn find_spacecraft(&self, id: &str) -> Option<CraftIndex> {
        self.crafts.iter().position(|c| c.id == id).map(CraftIndex)
    }

    /// Present spacecraft in the list that are hostile to `craft`
    pub fn hostile_count(&self, craft: CraftIndex) -> usize {
        let Some(me) = self.spacecraft(craft) else {
            return 0;
        };
        self.present()
            .filter(|(i, c)| *i != craft && c.is_hostile_to(me))
            .count()
    }

    /// Any two present spacecraft are hostile to each other
    pub fn has_mutual_hostiles(&self) -> bool {
        self.present()
            .any(|(i, a)| self.present().any(|(j, b)| i != j && a.is_hostile_to(b)))
    }

    fn present(&self) -> impl Iterator<Item = (CraftIndex, &Spacecraft)> {
        self.spacecrafts
            .iter()
            .filter_map(|&i| self.spacecraft(i).map(|c| (i, c)))
            .filter(|(_, c)| c.is_present())
    }

    /// Drop destroyed and departed spacecraft from the working lists
    pub fn prune_spacecrafts(&mut self) {
        let crafts = &self.crafts;
        self.hit_objects.retain(|i| crafts[i.0].is_present());
        if !self.settings.multi_actor {
            self.spacecrafts
                .retain(|i| crafts[i.0].is_alive() && !crafts[i.0].has_departed());
        }
    }

    /// A spacecraft finished jumping in
    pub fn add_hit_object(&mut self, index: CraftIndex) {
        if !self.hit_objects.contains(&index) {
            self.hit_objects.push(index);
        }
    }

    // === State ===

    pub fn state(&self) -> MissionState {
        self.state
    }

    pub fn set_state(&mut self, state: MissionState) {
        if self.state == state {
            return;
        }
        log::info!("Mission state: {} -> {}", self.state, state);
        self.observer.state_changed(self.state, state);
        self.state = state;
    }

    /// Accept a win; only meaningful while objectives are pending
    pub fn win(&mut self) {
        if self.state == MissionState::InProgress {
            self.set_state(MissionState::Completed);
        }
    }

    /// Accept a loss, also overriding a previous win
    pub fn lose(&mut self) {
        if self.piloted_craft().is_some_and(|c| c.has_departed()) {
            log::debug!("Ignoring loss: piloted spacecraft has departed");
            return;
        }
        if matches!(self.state, MissionState::InProgress | MissionState::Completed) {
            self.set_state(MissionState::Failed);
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn advance_clock(&mut self, dt: f32) {
        self.elapsed += dt as f64;
    }

    // === Notices ===

    /// Notices still retained
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Sequence number the next notice will get
    pub fn notice_end(&self) -> usize {
        self.notice_base + self.notices.len()
    }

    /// Retained notices numbered `cursor` or later
    pub fn notices_since(&self, cursor: usize) -> &[Notice] {
        let start = cursor.saturating_sub(self.notice_base).min(self.notices.len());
        &self.notices[start..]
    }

    /// Drop notices numbered below `before`
    pub fn retire_notices(&mut self, before: usize) {
        let count = before.saturating_sub(self.notice_base).min(self.notices.len());
        self.notices.drain(..count);
        self.notice_base += count;
    }

    // === Events and delayed actions ===

    pub fn reset_event_fires(&mut self, events: usize) {
        self.event_fires = vec![0; events];
    }

    pub fn record_event_fired(&mut self, event: usize) {
        if let Some(count) = self.event_fires.get_mut(event) {
            *count += 1;
        }
    }

    /// How many times an event's trigger has fired
    pub fn event_fire_count(&self, event: usize) -> u32 {
        self.event_fires.get(event).copied().unwrap_or(0)
    }

    pub fn enqueue(&mut self, action: ActionRef, delay: f32) {
        self.queue.push(QueuedAction {
            action,
            remaining: delay,
        });
    }

    pub fn queued_actions(&self) -> usize {
        self.queue.len()
    }

    /// Count down queued actions, removing and returning the due ones in queue order
    pub fn take_due_actions(&mut self, dt: f32) -> Vec<ActionRef> {
        let mut due = Vec::new();
        self.queue.retain_mut(|queued| {
            queued.remaining -= dt;
            if queued.remaining <= 0.0 {
                due.push(queued.action);
                false
            } else {
                true
            }
        });
        due
    }

    // === Outward notifications ===

    pub fn set_observer(&mut self, observer: Box<dyn MissionObserver>) {
        self.observer = observer;
    }

    pub fn observer_mut(&mut self) -> &mut dyn MissionObserver {
        self.observer.as_mut()
    }

    // === Interactions ===

    /// Change a spacecraft's target, noting it for targeting conditions
    pub fn set_target(&mut self, craft: CraftIndex, target: Option<CraftIndex>) {
        let changed = self
            .spacecraft_mut(craft)
            .is_some_and(|c| c.set_target(target));
        if let (true, Some(target)) = (changed, target) {
            self.notices.push(Notice::Targeted { target, by: craft });
        }
    }

    /// Deliver a command to a spacecraft
    pub fn dispatch_command(&mut self, craft: CraftIndex, command: &SpacecraftCommand) {
        let Some(spacecraft) = self.crafts.get_mut(craft.0) else {
            return;
        };
        log::debug!("Command for {}: {:?}", spacecraft.display_name(), command);
        if let Some(target) = spacecraft.execute_command(command) {
            self.notices.push(Notice::Targeted { target, by: craft });
        }
        self.observer.command_dispatched(craft, command);
    }

    /// Damage a spacecraft, spawning an explosion if it is destroyed
    ///
    /// The piloted spacecraft takes damage scaled by difficulty and ignores
    /// teammates unless friendly fire is on. Returns None when nothing was applied.
    pub fn apply_damage(&mut self, target: CraftIndex, amount: f32, by: Option<CraftIndex>) -> Option<DamageOutcome> {
        let hostile = match (by.and_then(|b| self.spacecraft(b)), self.spacecraft(target)) {
            (Some(attacker), Some(victim)) => attacker.is_hostile_to(victim),
            _ => true,
        };
        let difficulty = self.settings.difficulty;
        let victim = self.crafts.get_mut(target.0)?;
        if !victim.is_alive() {
            return None;
        }
        let mut amount = amount;
        if victim.piloted {
            if by.is_some() && !hostile && !difficulty.friendly_fire() {
                return None;
            }
            amount *= difficulty.damage_taken_multiplier();
        }
        let (position, velocity, radius) = (victim.position, victim.velocity, victim.radius());
        let outcome = victim.damage(amount);
        self.notices.push(Notice::Hit { target, by });

        if by.is_some() && by == self.piloted && hostile {
            if let Some(pilot) = by.and_then(|b| self.crafts.get_mut(b.0)) {
                pilot.stats.damage_dealt += outcome.shield_damage + outcome.hull_damage;
                if outcome.destroyed {
                    pilot.stats.kills += 1;
                }
            }
        }
        if outcome.destroyed {
            log::info!("{} destroyed", self.crafts[target.0].display_name());
            let debris = self.settings.explosion_particles();
            self.pools.spawn_explosion(position, velocity, radius, debris);
        }
        Some(outcome)
    }

    /// Shift the whole scene by `offset`
    pub fn translate(&mut self, offset: Vec3) {
        for craft in &mut self.crafts {
            craft.translate(offset);
        }
        self.pools.translate(offset);
        self.environment.translate(offset);
    }

    /// Tear down, handing the pools back for the next mission
    pub fn into_pools(self) -> Pools {
        self.pools
    }
}
