//! Piloted spacecraft score and performance tier

use serde::{Deserialize, Serialize};

use crate::consts::{HIT_RATIO_BONUS, HULL_INTEGRITY_BONUS, KILL_BONUS};
use crate::sim::CombatStats;

use super::world::MissionWorld;

/// Performance tier, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Performance {
    Perfect,
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Performance {
    /// Tier for a score/reference ratio
    pub fn from_ratio(ratio: f32) -> Self {
        if ratio >= 0.95 {
            Performance::Perfect
        } else if ratio >= 0.75 {
            Performance::Excellent
        } else if ratio >= 0.5 {
            Performance::Good
        } else if ratio >= 0.25 {
            Performance::Fair
        } else {
            Performance::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Performance::Perfect => "perfect",
            Performance::Excellent => "excellent",
            Performance::Good => "good",
            Performance::Fair => "fair",
            Performance::Poor => "poor",
        }
    }
}

impl std::fmt::Display for Performance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub damage: f32,
    pub kill_bonus: f32,
    pub hit_ratio_bonus: f32,
    pub hull_bonus: f32,
    pub reference: f32,
}

impl ScoreBreakdown {
    /// Score from the piloted spacecraft's counters; the end bonuses only
    /// count for a completed mission
    pub fn new(stats: &CombatStats, hull_integrity: f32, completed: bool, reference: f32) -> Self {
        let (hit_ratio_bonus, hull_bonus) = if completed {
            (
                stats.hit_ratio() * HIT_RATIO_BONUS,
                hull_integrity.clamp(0.0, 1.0) * HULL_INTEGRITY_BONUS,
            )
        } else {
            (0.0, 0.0)
        };
        Self {
            damage: stats.damage_dealt,
            kill_bonus: stats.kills as f32 * KILL_BONUS,
            hit_ratio_bonus,
            hull_bonus,
            reference,
        }
    }

    pub fn total(&self) -> u64 {
        (self.damage + self.kill_bonus + self.hit_ratio_bonus + self.hull_bonus).round() as u64
    }

    pub fn performance(&self) -> Performance {
        if self.reference <= 0.0 {
            return if self.hit_ratio_bonus + self.hull_bonus > 0.0 {
                Performance::Perfect
            } else {
                Performance::Poor
            };
        }
        Performance::from_ratio(self.total() as f32 / self.reference)
    }
}

/// Best achievable score: every hostile destroyed by the piloted spacecraft
/// without a miss or a scratch
pub fn reference_score(world: &MissionWorld) -> f32 {
    let Some(piloted) = world.piloted() else {
        return 0.0;
    };
    let Some(pilot) = world.spacecraft(piloted) else {
        return 0.0;
    };
    let hostiles = world
        .arena()
        .iter()
        .enumerate()
        .filter(|(i, c)| *i != piloted.0 && c.is_alive() && c.is_hostile_to(pilot));
    let mut reference = HIT_RATIO_BONUS + HULL_INTEGRITY_BONUS;
    for (_, craft) in hostiles {
        reference += craft.hull() + craft.shield() + KILL_BONUS;
    }
    reference
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::world::tests::sample_world;

    #[test]
    fn test_performance_tiers() {
        assert_eq!(Performance::from_ratio(1.2), Performance::Perfect);
        assert_eq!(Performance::from_ratio(0.8), Performance::Excellent);
        assert_eq!(Performance::from_ratio(0.5), Performance::Good);
        assert_eq!(Performance::from_ratio(0.3), Performance::Fair);
        assert_eq!(Performance::from_ratio(0.0), Performance::Poor);
        assert!(Performance::Perfect < Performance::Poor);
    }

    #[test]
    fn test_flawless_run_is_perfect() {
        let world = sample_world();
        let reference = reference_score(&world);
        // Two interceptors: 60 hull, no shield
        assert_eq!(reference, 2.0 * (60.0 + KILL_BONUS) + HIT_RATIO_BONUS + HULL_INTEGRITY_BONUS);

        let stats = CombatStats {
            damage_dealt: 120.0,
            kills: 2,
            shots_fired: 20,
            hits: 20,
        };
        let score = ScoreBreakdown::new(&stats, 1.0, true, reference);
        assert_eq!(score.total() as f32, reference);
        assert_eq!(score.performance(), Performance::Perfect);

        // Same counters without completing: no end bonuses
        let unfinished = ScoreBreakdown::new(&stats, 1.0, false, reference);
        assert_eq!(unfinished.total(), 320);
        assert_eq!(unfinished.performance(), Performance::Poor);
    }
}
