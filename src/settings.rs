//! Simulation settings and difficulty
//!
//! Persisted separately from mission records as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{OCTREE_MAX_DEPTH, OCTREE_MAX_OBJECTS, ORIGIN_RECENTER_DISTANCE};
use crate::error::MissionError;
use crate::persistence;
use crate::sim::PoolSizes;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Debris particles per destruction explosion
    pub fn explosion_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 4,
            QualityPreset::Medium => crate::consts::EXPLOSION_PARTICLES,
            QualityPreset::High => 24,
        }
    }

    /// Pool capacities to prefill before a mission starts
    pub fn pool_sizes(&self) -> PoolSizes {
        match self {
            QualityPreset::Low => PoolSizes {
                particles: 100,
                projectiles: 128,
                missiles: 16,
                explosions: 16,
                trails: 32,
            },
            QualityPreset::Medium => PoolSizes {
                particles: 500,
                projectiles: 256,
                missiles: 32,
                explosions: 32,
                trails: 96,
            },
            QualityPreset::High => PoolSizes {
                particles: 2000,
                projectiles: 512,
                missiles: 64,
                explosions: 64,
                trails: 256,
            },
        }
    }
}

/// Difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Multiplier on damage the piloted spacecraft takes
    pub fn damage_taken_multiplier(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.5,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
        }
    }

    /// Whether teammates' fire damages the piloted spacecraft
    pub fn friendly_fire(&self) -> bool {
        matches!(self, Difficulty::Hard)
    }
}

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset (drives pool sizes)
    pub quality: QualityPreset,
    pub difficulty: Difficulty,

    // === Spatial index ===
    pub octree_max_depth: u32,
    pub octree_max_objects: usize,

    /// Camera distance from the origin that triggers a world recenter
    pub origin_recenter_distance: f32,

    /// Keep destroyed spacecraft in the spacecraft list (stable indices across participants)
    pub multi_actor: bool,

    /// Particle effects (debris on explosions)
    pub particles: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            difficulty: Difficulty::Normal,
            octree_max_depth: OCTREE_MAX_DEPTH,
            octree_max_objects: OCTREE_MAX_OBJECTS,
            origin_recenter_distance: ORIGIN_RECENTER_DISTANCE,
            multi_actor: false,
            particles: true,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    pub fn pool_sizes(&self) -> PoolSizes {
        let mut sizes = self.quality.pool_sizes();
        if !self.particles {
            sizes.particles = 0;
        }
        sizes
    }

    /// Debris particles per explosion (0 with particles off)
    pub fn explosion_particles(&self) -> usize {
        if self.particles {
            self.quality.explosion_particles()
        } else {
            0
        }
    }

    /// Load settings from a JSON file; missing or unreadable files yield defaults
    pub fn load(path: &Path) -> Self {
        match persistence::read_json::<Settings>(path) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring settings file: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), MissionError> {
        persistence::write_json(path, self)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parse() {
        assert_eq!(QualityPreset::parse("MED"), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::parse("ultra"), None);
        assert_eq!(Difficulty::parse("Hard"), Some(Difficulty::Hard));
    }

    #[test]
    fn test_particles_off_disables_particle_pool() {
        let mut settings = Settings::from_preset(QualityPreset::High);
        assert_eq!(settings.pool_sizes().particles, 2000);
        settings.particles = false;
        assert_eq!(settings.pool_sizes().particles, 0);
        assert_eq!(settings.explosion_particles(), 0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"difficulty":"hard"}"#).unwrap();
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.octree_max_depth, OCTREE_MAX_DEPTH);
        assert!(settings.difficulty.friendly_fire());
    }
}
