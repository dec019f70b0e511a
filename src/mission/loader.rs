//! Building a mission world and its events from a descriptor
//!
//! Loading never fails on a configuration problem: each one is reported to
//! [`Diagnostics`] and the offending construct is dropped, disabled, or
//! replaced by a default.

use std::collections::HashMap;

use crate::error::{ConfigError, Diagnostics};
use crate::settings::Settings;
use crate::sim::{ClassCatalog, CraftIndex, Environment, Pools, Spacecraft, SpacecraftClass, Team};

use super::descriptor::{EnvironmentRef, MissionDescriptor, SpacecraftDescriptor, expand_spacecrafts, parse_squad};
use super::event::MissionEvent;
use super::subjects::{SubjectDescriptor, SubjectGroup};
use super::world::MissionWorld;

/// Name lookups available while conditions and actions are constructed
pub struct LoadContext<'a> {
    world: &'a MissionWorld,
    events: &'a HashMap<String, usize>,
}

impl<'a> LoadContext<'a> {
    pub fn new(world: &'a MissionWorld, events: &'a HashMap<String, usize>) -> Self {
        Self { world, events }
    }

    /// Subject group for a condition or action; must name something that exists
    pub fn subjects(&self, kind: &'static str, descriptor: &SubjectDescriptor) -> Result<SubjectGroup, ConfigError> {
        if descriptor.is_empty() {
            return Err(ConfigError::params(kind, "no subjects given"));
        }
        for id in &descriptor.spacecrafts {
            self.spacecraft(id)?;
        }
        SubjectGroup::validated(descriptor.clone(), self.world)
    }

    pub fn spacecraft(&self, id: &str) -> Result<CraftIndex, ConfigError> {
        self.world
            .find_spacecraft(id)
            .ok_or_else(|| ConfigError::UnknownSpacecraft(id.to_string()))
    }

    pub fn team(&self, id: &str) -> Result<&Team, ConfigError> {
        self.world
            .team(id)
            .ok_or_else(|| ConfigError::UnknownTeam(id.to_string()))
    }

    pub fn event(&self, name: &str) -> Result<usize, ConfigError> {
        self.events
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownEvent(name.to_string()))
    }
}

/// A freshly built mission, before the state machine takes over
pub struct LoadedMission {
    pub world: MissionWorld,
    pub events: Vec<MissionEvent>,
    pub diagnostics: Diagnostics,
}

pub fn load(descriptor: &MissionDescriptor, catalog: &ClassCatalog, settings: Settings, pools: Pools) -> LoadedMission {
    let mut diagnostics = Diagnostics::new();
    let environment = match &descriptor.environment {
        EnvironmentRef::Named(name) => Environment::named(name.as_str()),
        EnvironmentRef::Inline(inline) => Environment::new(inline.clone()),
    };
    let mut world = MissionWorld::new(settings, environment, pools);

    for team in &descriptor.teams {
        world.add_team(team.team());
    }
    let implicit_teams = descriptor.teams.is_empty();

    let crafts = expand_spacecrafts(&descriptor.spacecrafts, &mut diagnostics);
    for (n, craft) in crafts.iter().enumerate() {
        let spacecraft = build_spacecraft(n, craft, catalog, &mut world, implicit_teams, &mut diagnostics);
        world.add_spacecraft(spacecraft);
    }

    // Names first, so time conditions can refer to any event
    let mut names = Vec::with_capacity(descriptor.events.len());
    let mut lookup = HashMap::new();
    for (i, event) in descriptor.events.iter().enumerate() {
        let name = event.name.clone().unwrap_or_else(|| format!("event {}", i));
        if lookup.contains_key(&name) {
            diagnostics.report(ConfigError::DuplicateEvent(name.clone()));
        } else {
            lookup.insert(name.clone(), i);
        }
        names.push(name);
    }
    world.reset_event_fires(descriptor.events.len());

    let ctx = LoadContext::new(&world, &lookup);
    let events = descriptor
        .events
        .iter()
        .zip(names)
        .map(|(event, name)| MissionEvent::from_descriptor(name, event, &ctx, &mut diagnostics))
        .collect();

    log::info!(
        "Loaded mission '{}': {} spacecraft, {} events, {} config problems",
        descriptor.name,
        world.arena().len(),
        descriptor.events.len(),
        diagnostics.len()
    );
    LoadedMission {
        world,
        events,
        diagnostics,
    }
}

fn build_spacecraft(
    n: usize,
    descriptor: &SpacecraftDescriptor,
    catalog: &ClassCatalog,
    world: &mut MissionWorld,
    implicit_teams: bool,
    diagnostics: &mut Diagnostics,
) -> Spacecraft {
    let class = diagnostics.recover(catalog.get(&descriptor.class).cloned(), || SpacecraftClass {
        name: descriptor.class.clone(),
        ..SpacecraftClass::default()
    });
    let loadout = diagnostics.recover(class.loadout(descriptor.loadout.as_deref()), || {
        class.loadout(None).unwrap_or_default()
    });
    let id = descriptor
        .label()
        .unwrap_or_else(|| format!("spacecraft {}", n));

    let mut craft = Spacecraft::new(id, class, &loadout);
    craft.name = descriptor.name.clone();
    craft.squad = descriptor.squad.as_deref().map(parse_squad);
    craft.position = descriptor.position.unwrap_or_default();
    craft.velocity = descriptor.velocity;
    if let Some(facing) = craft.velocity.try_normalize() {
        craft.forward = facing;
    }

    if let Some(team) = &descriptor.team {
        if world.team(team).is_some() {
            craft.team = Some(team.clone());
        } else if implicit_teams {
            world.add_team(Team::new(team.as_str()));
            craft.team = Some(team.clone());
        } else {
            diagnostics.report(ConfigError::UnknownTeam(team.clone()));
        }
    }

    if descriptor.piloted {
        if world.piloted().is_some() {
            diagnostics.report(ConfigError::MultiplePiloted(craft.id.clone()));
        } else {
            craft.piloted = true;
        }
    }
    if descriptor.away {
        craft.set_away();
    }
    craft
}
