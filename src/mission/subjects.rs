//! Declarative spacecraft references
//!
//! A subject group names spacecraft by id, squad or team (OR-combined) and
//! resolves that description against the mission's spacecraft list on first
//! use. The resolved list is cached; `reload` re-resolves it, which drops
//! spacecraft that have left the list since (destroyed or departed).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::{CraftIndex, Spacecraft};

use super::world::MissionWorld;

/// `{spacecrafts?, squads?, teams?}` as written in mission files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectDescriptor {
    pub spacecrafts: Vec<String>,
    pub squads: Vec<String>,
    pub teams: Vec<String>,
}

impl SubjectDescriptor {
    pub fn is_empty(&self) -> bool {
        self.spacecrafts.is_empty() && self.squads.is_empty() && self.teams.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubjectGroup {
    descriptor: SubjectDescriptor,
    cache: Option<Vec<CraftIndex>>,
}

impl SubjectGroup {
    pub fn new(descriptor: SubjectDescriptor) -> Self {
        Self {
            descriptor,
            cache: None,
        }
    }

    /// Check that every referenced team exists
    pub fn validated(descriptor: SubjectDescriptor, world: &MissionWorld) -> Result<Self, ConfigError> {
        if let Some(team) = descriptor.teams.iter().find(|t| world.team(t).is_none()) {
            return Err(ConfigError::UnknownTeam(team.clone()));
        }
        Ok(Self::new(descriptor))
    }

    pub fn is_empty(&self) -> bool {
        self.descriptor.is_empty()
    }

    /// Whether `craft` is described by this group
    pub fn has(&self, craft: &Spacecraft) -> bool {
        self.descriptor.spacecrafts.iter().any(|id| *id == craft.id)
            || craft
                .squad
                .as_ref()
                .is_some_and(|s| self.descriptor.squads.iter().any(|name| *name == s.name))
            || craft
                .team
                .as_ref()
                .is_some_and(|t| self.descriptor.teams.iter().any(|team| team == t))
    }

    /// The spacecraft in the group, resolved on first use
    pub fn spacecrafts(&mut self, world: &MissionWorld, reload: bool) -> &[CraftIndex] {
        if reload || self.cache.is_none() {
            let resolved = world
                .spacecrafts()
                .iter()
                .copied()
                .filter(|&index| world.spacecraft(index).is_some_and(|c| self.has(c)))
                .collect();
            self.cache = Some(resolved);
        }
        self.cache.as_deref().unwrap_or_default()
    }

    /// Subjects not destroyed and not departed
    pub fn live_count(&mut self, world: &MissionWorld) -> usize {
        self.count_where(world, |c| c.is_alive() && !c.has_departed())
    }

    pub fn count_where(&mut self, world: &MissionWorld, predicate: impl Fn(&Spacecraft) -> bool) -> usize {
        self.spacecrafts(world, false)
            .iter()
            .filter_map(|&i| world.spacecraft(i))
            .filter(|c| predicate(c))
            .count()
    }

    /// Human-readable rendering for objectives and HUD texts
    pub fn display_text(&mut self, world: &MissionWorld) -> String {
        let mut parts: Vec<String> = Vec::new();
        // Whole teams and squads read better than long member lists
        for team in &self.descriptor.teams {
            let name = world.team(team).map_or(team.as_str(), |t| t.name.as_str());
            parts.push(format!("team {}", name));
        }
        for squad in &self.descriptor.squads {
            parts.push(format!("squad {}", squad));
        }
        let ids = self.descriptor.spacecrafts.clone();
        for id in ids {
            let name = world
                .find_spacecraft(&id)
                .and_then(|i| world.spacecraft(i))
                .map_or(id, |c| c.display_name());
            parts.push(name);
        }
        parts.join(", ")
    }
}
