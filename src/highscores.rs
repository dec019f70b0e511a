//! Per-mission records
//!
//! Best score, best performance and win/loss counters, keyed by mission
//! name and difficulty. Persisted as JSON next to the settings file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MissionError;
use crate::mission::{MissionState, Performance, ScoreBreakdown};
use crate::persistence;
use crate::settings::Difficulty;

/// Records for one mission at one difficulty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissionRecord {
    pub best_score: u64,
    pub best_performance: Option<Performance>,
    pub wins: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionRecords {
    pub records: BTreeMap<String, MissionRecord>,
}

impl MissionRecords {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(mission: &str, difficulty: Difficulty) -> String {
        format!("{}/{}", mission, difficulty.as_str())
    }

    pub fn get(&self, mission: &str, difficulty: Difficulty) -> Option<&MissionRecord> {
        self.records.get(&Self::key(mission, difficulty))
    }

    /// Record the outcome of a finished mission
    ///
    /// Only completed missions can set a best score. Returns true if they did.
    pub fn record_result(
        &mut self,
        mission: &str,
        difficulty: Difficulty,
        state: MissionState,
        score: &ScoreBreakdown,
    ) -> bool {
        let record = self.records.entry(Self::key(mission, difficulty)).or_default();
        match state {
            MissionState::Completed => record.wins += 1,
            MissionState::Failed | MissionState::Defeat => {
                record.losses += 1;
                return false;
            }
            _ => return false,
        }

        let total = score.total();
        let performance = score.performance();
        if record.best_performance.is_none_or(|best| performance < best) {
            record.best_performance = Some(performance);
        }
        if total > record.best_score {
            log::info!("New best score for {}: {}", mission, total);
            record.best_score = total;
            true
        } else {
            false
        }
    }

    /// Load records; missing or unreadable files start fresh
    pub fn load(path: &Path) -> Self {
        match persistence::read_json::<MissionRecords>(path) {
            Ok(Some(records)) => {
                log::info!("Loaded records for {} missions", records.records.len());
                records
            }
            Ok(None) => {
                log::info!("No mission records found, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::warn!("Ignoring mission records: {}", e);
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), MissionError> {
        persistence::write_json(path, self)?;
        log::info!("Mission records saved ({} entries)", self.records.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::CombatStats;

    fn score(damage: f32, completed: bool) -> ScoreBreakdown {
        let stats = CombatStats {
            damage_dealt: damage,
            kills: 1,
            shots_fired: 10,
            hits: 5,
        };
        ScoreBreakdown::new(&stats, 1.0, completed, 2000.0)
    }

    #[test]
    fn test_best_score_only_from_wins() {
        let mut records = MissionRecords::new();
        assert!(records.record_result("m1", Difficulty::Normal, MissionState::Completed, &score(100.0, true)));
        assert!(!records.record_result("m1", Difficulty::Normal, MissionState::Completed, &score(50.0, true)));
        assert!(!records.record_result("m1", Difficulty::Normal, MissionState::Defeat, &score(900.0, false)));

        let record = records.get("m1", Difficulty::Normal).unwrap();
        assert_eq!(record.wins, 2);
        assert_eq!(record.losses, 1);
        // 100 + 100 kill + 500 hit ratio + 500 hull
        assert_eq!(record.best_score, 1200);
        assert_eq!(record.best_performance, Some(Performance::Good));
        assert!(records.get("m1", Difficulty::Hard).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("mission-records-{}", std::process::id()));
        let path = dir.join("records.json");
        let mut records = MissionRecords::new();
        records.record_result("m1", Difficulty::Easy, MissionState::Completed, &score(10.0, true));
        records.save(&path).unwrap();

        let loaded = MissionRecords::load(&path);
        assert_eq!(loaded, records);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_starts_fresh() {
        let path = std::env::temp_dir().join("mission-records-does-not-exist.json");
        assert!(MissionRecords::load(&path).records.is_empty());
    }
}
