//! Mission descriptor: the JSON shape of a mission file
//!
//! A spacecraft entry with a `count` describes several spacecraft at once;
//! [`expand_spacecrafts`] turns those into one descriptor per spacecraft
//! before the mission is built.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Diagnostics, MissionError};
use crate::sim::{EnvironmentDescriptor, Squad, Team};

use super::event::EventDescriptor;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissionDescriptor {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub environment: EnvironmentRef,
    pub teams: Vec<TeamDescriptor>,
    pub spacecrafts: Vec<SpacecraftEntry>,
    pub events: Vec<EventDescriptor>,
}

impl MissionDescriptor {
    pub fn from_json(json: &str) -> Result<Self, MissionError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Environment by name (resolved by the asset layer) or inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvironmentRef {
    Named(String),
    Inline(EnvironmentDescriptor),
}

impl Default for EnvironmentRef {
    fn default() -> Self {
        EnvironmentRef::Named(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TeamDescriptor {
    Id(String),
    Full {
        id: String,
        name: Option<String>,
        color: Option<[f32; 4]>,
    },
}

impl TeamDescriptor {
    pub fn team(&self) -> Team {
        match self {
            TeamDescriptor::Id(id) => Team::new(id.as_str()),
            TeamDescriptor::Full { id, name, color } => {
                let mut team = Team::new(id.as_str());
                if let Some(name) = name {
                    team.name = name.clone();
                }
                if let Some(color) = color {
                    team.color = *color;
                }
                team
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormationKind {
    /// Leader in front, the rest alternating left and right behind
    #[default]
    Wedge,
    /// Side by side
    Line,
    /// One behind the other
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formation {
    #[serde(rename = "type", default)]
    pub kind: FormationKind,
    #[serde(default = "Formation::default_spacing")]
    pub spacing: Vec3,
}

impl Formation {
    fn default_spacing() -> Vec3 {
        Vec3::new(30.0, 0.0, 30.0)
    }

    /// Offset of the `index`th member from the formation anchor
    pub fn offset(&self, index: usize) -> Vec3 {
        let i = index as f32;
        match self.kind {
            FormationKind::Wedge => {
                if index == 0 {
                    return Vec3::ZERO;
                }
                let row = index.div_ceil(2) as f32;
                let side = if index % 2 == 1 { -1.0 } else { 1.0 };
                Vec3::new(side * self.spacing.x * row, self.spacing.y * row, self.spacing.z * row)
            }
            FormationKind::Line => Vec3::new(self.spacing.x * i, 0.0, 0.0),
            FormationKind::Column => Vec3::new(0.0, 0.0, self.spacing.z * i),
        }
    }
}

/// One spacecraft
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacecraftDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// "alpha 2" or just "alpha"
    #[serde(default)]
    pub squad: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    pub class: String,
    #[serde(default)]
    pub loadout: Option<String>,
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub velocity: Vec3,
    #[serde(default)]
    pub formation: Option<Formation>,
    #[serde(default)]
    pub piloted: bool,
    /// Starts outside the battle space, waiting for a jump-in command
    #[serde(default)]
    pub away: bool,
}

impl SpacecraftDescriptor {
    /// Identifier used by subject references: explicit id, squad, name
    pub fn label(&self) -> Option<String> {
        self.id.clone().or_else(|| self.squad.clone()).or_else(|| self.name.clone())
    }
}

/// Several similar spacecraft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSpacecraftDescriptor {
    pub count: usize,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub loadouts: Vec<String>,
    #[serde(default)]
    pub positions: Vec<Vec3>,
    /// Squad name; members get indices 1..=count
    #[serde(default)]
    pub squad: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    pub class: String,
    #[serde(default)]
    pub loadout: Option<String>,
    /// Formation anchor
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub velocity: Vec3,
    #[serde(default)]
    pub formation: Option<Formation>,
    #[serde(default)]
    pub piloted_index: Option<usize>,
    #[serde(default)]
    pub away: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpacecraftEntry {
    Multi(MultiSpacecraftDescriptor),
    Single(SpacecraftDescriptor),
}

/// Parse "alpha 2" into a squad; a bare name is member 1
pub fn parse_squad(text: &str) -> Squad {
    if let Some((name, index)) = text.trim().rsplit_once(' ') {
        if let Ok(index) = index.parse() {
            return Squad {
                name: name.trim().to_string(),
                index,
            };
        }
    }
    Squad {
        name: text.trim().to_string(),
        index: 1,
    }
}

/// One descriptor per spacecraft, with positions resolved
pub fn expand_spacecrafts(entries: &[SpacecraftEntry], diagnostics: &mut Diagnostics) -> Vec<SpacecraftDescriptor> {
    let mut expanded = Vec::new();
    for entry in entries {
        match entry {
            SpacecraftEntry::Single(single) => {
                let mut craft = single.clone();
                if let Some(formation) = craft.formation.take() {
                    match craft.position {
                        Some(_) => diagnostics.report(ConfigError::PositionOverridesFormation(
                            craft.label().unwrap_or_default(),
                        )),
                        None => {
                            let index = craft.squad.as_deref().map_or(0, |s| parse_squad(s).index as usize);
                            craft.position = Some(formation.offset(index.saturating_sub(1)));
                        }
                    }
                }
                expanded.push(craft);
            }
            SpacecraftEntry::Multi(multi) => {
                if multi.formation.is_some() && !multi.positions.is_empty() {
                    let label = multi.squad.clone().unwrap_or_else(|| multi.class.clone());
                    diagnostics.report(ConfigError::PositionOverridesFormation(label));
                }
                for i in 0..multi.count {
                    let position = multi.positions.get(i).copied().unwrap_or_else(|| {
                        multi.position + multi.formation.map_or(Vec3::ZERO, |f| f.offset(i))
                    });
                    expanded.push(SpacecraftDescriptor {
                        id: None,
                        name: multi.names.get(i).cloned(),
                        squad: multi.squad.as_ref().map(|s| format!("{} {}", s, i + 1)),
                        team: multi.team.clone(),
                        class: multi.class.clone(),
                        loadout: multi.loadouts.get(i).cloned().or_else(|| multi.loadout.clone()),
                        position: Some(position),
                        velocity: multi.velocity,
                        formation: None,
                        piloted: multi.piloted_index == Some(i),
                        away: multi.away,
                    });
                }
            }
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_squad() {
        assert_eq!(
            parse_squad("alpha 2"),
            Squad {
                name: "alpha".into(),
                index: 2
            }
        );
        assert_eq!(parse_squad("red leader").index, 1);
        assert_eq!(parse_squad("red leader").name, "red leader");
    }

    #[test]
    fn test_multi_entry_expands_per_index() {
        let json = r#"[
            {"count": 3, "class": "fighter", "squad": "alpha", "team": "rebels",
             "names": ["Wedge"], "loadouts": ["light"], "loadout": "strike",
             "position": [0, 0, 100], "formation": {"type": "wedge", "spacing": [10, 0, 20]},
             "pilotedIndex": 1},
            {"class": "frigate", "id": "tantive", "team": "rebels", "position": [5, 5, 5]}
        ]"#;
        let entries: Vec<SpacecraftEntry> = serde_json::from_str(json).unwrap();
        let mut diagnostics = Diagnostics::new();
        let crafts = expand_spacecrafts(&entries, &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert_eq!(crafts.len(), 4);

        assert_eq!(crafts[0].name.as_deref(), Some("Wedge"));
        assert_eq!(crafts[1].name, None);
        assert_eq!(crafts[0].loadout.as_deref(), Some("light"));
        assert_eq!(crafts[2].loadout.as_deref(), Some("strike"));
        assert_eq!(crafts[2].squad.as_deref(), Some("alpha 3"));
        assert!(crafts[1].piloted && !crafts[0].piloted);

        assert_eq!(crafts[0].position, Some(Vec3::new(0.0, 0.0, 100.0)));
        assert_eq!(crafts[1].position, Some(Vec3::new(-10.0, 0.0, 120.0)));
        assert_eq!(crafts[2].position, Some(Vec3::new(10.0, 0.0, 120.0)));
        assert_eq!(crafts[3].id.as_deref(), Some("tantive"));
    }

    #[test]
    fn test_explicit_positions_override_formation() {
        let json = r#"[{"count": 2, "class": "fighter", "positions": [[1, 2, 3]],
                        "formation": {"type": "line"}}]"#;
        let entries: Vec<SpacecraftEntry> = serde_json::from_str(json).unwrap();
        let mut diagnostics = Diagnostics::new();
        let crafts = expand_spacecrafts(&entries, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(crafts[0].position, Some(Vec3::new(1.0, 2.0, 3.0)));
        // No explicit position for the second: formation applies
        assert_eq!(crafts[1].position, Some(Vec3::new(30.0, 0.0, 0.0)));
    }

    #[test]
    fn test_single_with_position_and_formation_warns() {
        let json = r#"[{"class": "fighter", "id": "x", "position": [0, 0, 0], "formation": {}}]"#;
        let entries: Vec<SpacecraftEntry> = serde_json::from_str(json).unwrap();
        let mut diagnostics = Diagnostics::new();
        let crafts = expand_spacecrafts(&entries, &mut diagnostics);
        assert_eq!(
            diagnostics.reports(),
            &[ConfigError::PositionOverridesFormation("x".into())]
        );
        assert_eq!(crafts[0].position, Some(Vec3::ZERO));
    }

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = MissionDescriptor::from_json(r#"{"name": "empty"}"#).unwrap();
        assert_eq!(descriptor.environment, EnvironmentRef::Named(String::new()));
        assert!(descriptor.events.is_empty());
        assert!(MissionDescriptor::from_json("{").is_err());

        let teams: Vec<TeamDescriptor> =
            serde_json::from_str(r#"["rebels", {"id": "empire", "name": "Galactic Empire"}]"#).unwrap();
        assert_eq!(teams[0].team().name, "rebels");
        assert_eq!(teams[1].team().name, "Galactic Empire");
    }
}
