//! Spacecraft, classes and teams
//!
//! Spacecraft live in an arena owned by the mission world and are referred
//! to by [`CraftIndex`]. Destroyed spacecraft are never removed from the
//! arena, so an index stays valid for the whole mission.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::{JUMP_IN_DURATION, JUMP_OUT_DURATION};
use crate::error::ConfigError;
use crate::ms_to_secs;

use super::ai::ControlIntent;

/// Stable handle of a spacecraft in the mission arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CraftIndex(pub usize);

/// Primary weapon of a class
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeaponClass {
    pub damage: f32,
    /// m/s
    pub projectile_speed: f32,
    /// ms between shots
    pub cooldown: f32,
    /// ms a projectile lives
    pub projectile_lifetime: f32,
}

impl Default for WeaponClass {
    fn default() -> Self {
        Self {
            damage: 10.0,
            projectile_speed: 800.0,
            cooldown: 250.0,
            projectile_lifetime: 1500.0,
        }
    }
}

impl WeaponClass {
    /// Distance a projectile covers over its lifetime
    pub fn range(&self) -> f32 {
        self.projectile_speed * ms_to_secs(self.projectile_lifetime)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissileClass {
    pub damage: f32,
    /// m/s
    pub speed: f32,
    /// rad/s
    pub turn_rate: f32,
    /// ms
    pub lifetime: f32,
    /// ms between launches
    pub cooldown: f32,
    /// Proximity fuse radius
    pub radius: f32,
}

impl Default for MissileClass {
    fn default() -> Self {
        Self {
            damage: 60.0,
            speed: 300.0,
            turn_rate: 2.0,
            lifetime: 8000.0,
            cooldown: 2000.0,
            radius: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShieldClass {
    pub capacity: f32,
    /// Shield points per second
    pub recharge_rate: f32,
    /// ms after a hit before recharge starts
    pub recharge_delay: f32,
}

impl Default for ShieldClass {
    fn default() -> Self {
        Self {
            capacity: 50.0,
            recharge_rate: 10.0,
            recharge_delay: 2000.0,
        }
    }
}

/// Named equipment variant of a class
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Loadout {
    pub missiles: u32,
    /// Shield is fitted only when the class has one and this is true
    pub shield: bool,
}

/// Static description of a spacecraft type, provided by the asset layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpacecraftClass {
    pub name: String,
    pub hull: f32,
    pub radius: f32,
    /// m/s
    pub max_speed: f32,
    /// m/s²
    pub acceleration: f32,
    pub shield: Option<ShieldClass>,
    pub weapon: Option<WeaponClass>,
    pub missile: Option<MissileClass>,
    pub loadouts: HashMap<String, Loadout>,
    pub default_loadout: Option<String>,
}

impl Default for SpacecraftClass {
    fn default() -> Self {
        Self {
            name: "generic".to_string(),
            hull: 100.0,
            radius: 10.0,
            max_speed: 100.0,
            acceleration: 60.0,
            shield: None,
            weapon: Some(WeaponClass::default()),
            missile: None,
            loadouts: HashMap::new(),
            default_loadout: None,
        }
    }
}

impl SpacecraftClass {
    /// Resolve a loadout by name, falling back to the class default
    pub fn loadout(&self, name: Option<&str>) -> Result<Loadout, ConfigError> {
        let Some(name) = name.or(self.default_loadout.as_deref()) else {
            return Ok(Loadout {
                missiles: 0,
                shield: self.shield.is_some(),
            });
        };
        self.loadouts
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownLoadout {
                class: self.name.clone(),
                loadout: name.to_string(),
            })
    }
}

/// Spacecraft classes available to a mission, keyed by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassCatalog {
    pub classes: HashMap<String, SpacecraftClass>,
}

impl ClassCatalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut catalog: Self = serde_json::from_str(json)?;
        for (name, class) in &mut catalog.classes {
            class.name = name.clone();
        }
        Ok(catalog)
    }

    /// A small catalog covering fighters and a capital ship
    pub fn with_defaults() -> Self {
        let mut classes = HashMap::new();
        let mut fighter_loadouts = HashMap::new();
        fighter_loadouts.insert(
            "strike".to_string(),
            Loadout {
                missiles: 4,
                shield: true,
            },
        );
        fighter_loadouts.insert(
            "light".to_string(),
            Loadout {
                missiles: 0,
                shield: false,
            },
        );
        classes.insert(
            "fighter".to_string(),
            SpacecraftClass {
                name: "fighter".to_string(),
                hull: 100.0,
                radius: 8.0,
                max_speed: 150.0,
                acceleration: 80.0,
                shield: Some(ShieldClass::default()),
                weapon: Some(WeaponClass::default()),
                missile: Some(MissileClass::default()),
                loadouts: fighter_loadouts,
                default_loadout: Some("strike".to_string()),
            },
        );
        classes.insert(
            "interceptor".to_string(),
            SpacecraftClass {
                name: "interceptor".to_string(),
                hull: 60.0,
                radius: 6.0,
                max_speed: 220.0,
                acceleration: 120.0,
                shield: None,
                weapon: Some(WeaponClass {
                    damage: 6.0,
                    cooldown: 150.0,
                    ..WeaponClass::default()
                }),
                missile: None,
                loadouts: HashMap::new(),
                default_loadout: None,
            },
        );
        classes.insert(
            "frigate".to_string(),
            SpacecraftClass {
                name: "frigate".to_string(),
                hull: 2000.0,
                radius: 60.0,
                max_speed: 30.0,
                acceleration: 5.0,
                shield: Some(ShieldClass {
                    capacity: 500.0,
                    recharge_rate: 25.0,
                    recharge_delay: 4000.0,
                }),
                weapon: Some(WeaponClass {
                    damage: 25.0,
                    projectile_speed: 600.0,
                    cooldown: 600.0,
                    projectile_lifetime: 3000.0,
                }),
                missile: None,
                loadouts: HashMap::new(),
                default_loadout: None,
            },
        );
        Self { classes }
    }

    pub fn get(&self, name: &str) -> Result<&SpacecraftClass, ConfigError> {
        self.classes
            .get(name)
            .ok_or_else(|| ConfigError::UnknownClass(name.to_string()))
    }
}

/// A team (faction) spacecraft can belong to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub color: [f32; 4],
}

impl Team {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Squad membership, e.g. "alpha" #2
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squad {
    pub name: String,
    pub index: u32,
}

impl std::fmt::Display for Squad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.index)
    }
}

/// Where a spacecraft is in the jump sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JumpState {
    /// In the battle space
    Present,
    /// Leaving; departs when the timer runs out (ms)
    JumpingOut { remaining: f32 },
    /// Not in the battle space
    Away,
    /// Arriving; becomes present when the timer runs out (ms)
    JumpingIn { remaining: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JumpWay {
    In,
    Out,
}

/// Order that the AI should try to keep a distance band to a spacecraft
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceGoal {
    pub target: CraftIndex,
    pub min: Option<f32>,
    pub max: Option<f32>,
}

/// A resolved command delivered to a spacecraft
#[derive(Debug, Clone, PartialEq)]
pub enum SpacecraftCommand {
    Jump(JumpWay),
    Target {
        single: Option<CraftIndex>,
        list: Vec<CraftIndex>,
        priority: bool,
    },
    ReachDistance(DistanceGoal),
}

/// Counters the score is computed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub damage_dealt: f32,
    pub kills: u32,
    pub shots_fired: u32,
    pub hits: u32,
}

impl CombatStats {
    pub fn hit_ratio(&self) -> f32 {
        if self.shots_fired == 0 {
            0.0
        } else {
            self.hits as f32 / self.shots_fired as f32
        }
    }
}

/// Result of applying damage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub shield_damage: f32,
    pub hull_damage: f32,
    /// The hit reduced the hull to zero
    pub destroyed: bool,
}

/// A spacecraft taking part in a mission
#[derive(Debug, Clone)]
pub struct Spacecraft {
    pub id: String,
    pub name: Option<String>,
    pub squad: Option<Squad>,
    pub team: Option<String>,
    pub class: SpacecraftClass,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Unit facing vector
    pub forward: Vec3,
    pub piloted: bool,
    hull: f32,
    shield: f32,
    shield_fitted: bool,
    shield_wait: f32,
    alive: bool,
    jump: JumpState,
    departed: bool,
    target: Option<CraftIndex>,
    pub target_list: Vec<CraftIndex>,
    pub priority_targets: bool,
    pub distance_goal: Option<DistanceGoal>,
    pub missiles: u32,
    pub weapon_cooldown: f32,
    pub missile_cooldown: f32,
    pub stats: CombatStats,
}

impl Spacecraft {
    pub fn new(id: impl Into<String>, class: SpacecraftClass, loadout: &Loadout) -> Self {
        let shield_fitted = loadout.shield && class.shield.is_some();
        let shield = if shield_fitted {
            class.shield.as_ref().map_or(0.0, |s| s.capacity)
        } else {
            0.0
        };
        Self {
            id: id.into(),
            name: None,
            squad: None,
            team: None,
            hull: class.hull,
            class,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            piloted: false,
            shield,
            shield_fitted,
            shield_wait: 0.0,
            alive: true,
            jump: JumpState::Present,
            departed: false,
            target: None,
            target_list: Vec::new(),
            priority_targets: false,
            distance_goal: None,
            missiles: loadout.missiles,
            weapon_cooldown: 0.0,
            missile_cooldown: 0.0,
            stats: CombatStats::default(),
        }
    }

    /// Name shown in the HUD and objective texts
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            name.clone()
        } else if let Some(squad) = &self.squad {
            squad.to_string()
        } else {
            self.id.clone()
        }
    }

    pub fn radius(&self) -> f32 {
        self.class.radius
    }

    pub fn hull(&self) -> f32 {
        self.hull
    }

    pub fn shield(&self) -> f32 {
        self.shield
    }

    pub fn has_shield(&self) -> bool {
        self.shield_fitted
    }

    /// Hull integrity in 0..=1
    pub fn hull_integrity(&self) -> f32 {
        if self.class.hull <= 0.0 {
            0.0
        } else {
            (self.hull / self.class.hull).clamp(0.0, 1.0)
        }
    }

    /// Shield integrity in 0..=1 (0 when no shield is fitted)
    pub fn shield_integrity(&self) -> f32 {
        match (&self.class.shield, self.shield_fitted) {
            (Some(class), true) if class.capacity > 0.0 => (self.shield / class.capacity).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Departed via jump (a spacecraft still jumping out is not away yet)
    pub fn is_away(&self) -> bool {
        matches!(self.jump, JumpState::Away | JumpState::JumpingIn { .. })
    }

    /// Alive and in the battle space
    pub fn is_present(&self) -> bool {
        self.alive && !self.is_away()
    }

    /// Left the battle space by jumping out (a spacecraft that starts away has not)
    pub fn has_departed(&self) -> bool {
        self.departed
    }

    pub fn jump_state(&self) -> JumpState {
        self.jump
    }

    /// Start the mission outside the battle space
    pub fn set_away(&mut self) {
        self.jump = JumpState::Away;
    }

    pub fn target(&self) -> Option<CraftIndex> {
        self.target
    }

    /// Change target; returns true if it actually changed
    pub fn set_target(&mut self, target: Option<CraftIndex>) -> bool {
        if self.target == target {
            return false;
        }
        self.target = target;
        true
    }

    /// Two spacecraft are friendly only when both are on the same team
    pub fn is_hostile_to(&self, other: &Spacecraft) -> bool {
        match (&self.team, &other.team) {
            (Some(a), Some(b)) => a != b,
            _ => true,
        }
    }

    /// Apply damage, shield first
    pub fn damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.alive || amount <= 0.0 {
            return DamageOutcome {
                shield_damage: 0.0,
                hull_damage: 0.0,
                destroyed: false,
            };
        }
        let shield_damage = if self.shield_fitted {
            amount.min(self.shield)
        } else {
            0.0
        };
        self.shield -= shield_damage;
        if let Some(class) = &self.class.shield {
            self.shield_wait = class.recharge_delay;
        }
        let hull_damage = (amount - shield_damage).min(self.hull);
        self.hull -= hull_damage;
        let destroyed = self.hull <= 0.0;
        if destroyed {
            self.alive = false;
            self.velocity = Vec3::ZERO;
        }
        DamageOutcome {
            shield_damage,
            hull_damage,
            destroyed,
        }
    }

    /// Carry out a command; returns the target if it changed
    pub fn execute_command(&mut self, command: &SpacecraftCommand) -> Option<CraftIndex> {
        match command {
            SpacecraftCommand::Jump(JumpWay::Out) => {
                if self.jump == JumpState::Present && self.alive {
                    self.jump = JumpState::JumpingOut {
                        remaining: JUMP_OUT_DURATION,
                    };
                }
                None
            }
            SpacecraftCommand::Jump(JumpWay::In) => {
                if self.jump == JumpState::Away && self.alive {
                    self.jump = JumpState::JumpingIn {
                        remaining: JUMP_IN_DURATION,
                    };
                }
                None
            }
            SpacecraftCommand::Target {
                single,
                list,
                priority,
            } => {
                self.target_list = list.clone();
                self.priority_targets = *priority;
                let next = single.or_else(|| list.first().copied());
                if next.is_some() && self.set_target(next) {
                    next
                } else {
                    None
                }
            }
            SpacecraftCommand::ReachDistance(goal) => {
                self.distance_goal = Some(*goal);
                None
            }
        }
    }

    /// Steer according to an AI or pilot intent
    pub fn apply_intent(&mut self, intent: &ControlIntent, dt: f32) {
        if !self.is_present() {
            return;
        }
        let dt_secs = ms_to_secs(dt);
        let thrust = intent.thrust.clamp_length_max(1.0);
        self.velocity += thrust * self.class.acceleration * dt_secs;
        self.velocity = self.velocity.clamp_length_max(self.class.max_speed);
        if let Some(facing) = intent.facing.try_normalize() {
            self.forward = facing;
        } else if let Some(facing) = self.velocity.try_normalize() {
            self.forward = facing;
        }
    }

    /// Advance timers and integrate motion.
    ///
    /// Returns the jump transition that completed this step, if any.
    pub fn simulate(&mut self, dt: f32) -> Option<JumpWay> {
        if !self.alive {
            return None;
        }
        self.weapon_cooldown = (self.weapon_cooldown - dt).max(0.0);
        self.missile_cooldown = (self.missile_cooldown - dt).max(0.0);

        if let (Some(class), true) = (&self.class.shield, self.shield_fitted) {
            if self.shield_wait > 0.0 {
                self.shield_wait = (self.shield_wait - dt).max(0.0);
            } else {
                self.shield = (self.shield + class.recharge_rate * ms_to_secs(dt)).min(class.capacity);
            }
        }

        let mut completed = None;
        self.jump = match self.jump {
            JumpState::JumpingOut { remaining } if remaining - dt <= 0.0 => {
                completed = Some(JumpWay::Out);
                self.departed = true;
                JumpState::Away
            }
            JumpState::JumpingOut { remaining } => JumpState::JumpingOut {
                remaining: remaining - dt,
            },
            JumpState::JumpingIn { remaining } if remaining - dt <= 0.0 => {
                completed = Some(JumpWay::In);
                self.departed = false;
                JumpState::Present
            }
            JumpState::JumpingIn { remaining } => JumpState::JumpingIn {
                remaining: remaining - dt,
            },
            other => other,
        };

        if self.is_present() {
            self.position += self.velocity * ms_to_secs(dt);
        }
        completed
    }

    /// Move by `offset` (world origin recentering)
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }
}
