//! Headless mission runner
//!
//! Loads a mission, lets the pursuit AI fly every spacecraft (the piloted one
//! included) and ticks until the mission finishes or the tick limit is hit.

#[cfg(not(target_arch = "wasm32"))]
mod runner {
    use std::path::{Path, PathBuf};

    use clap::Parser;
    use mission_core::sim::{ClassCatalog, Pools, PursuitAi};
    use mission_core::{Difficulty, Mission, MissionError, MissionRecords, QualityPreset, Settings};

    const SETTINGS_FILE: &str = "mission-core/settings.json";
    const RECORDS_FILE: &str = "mission-core/records.json";

    /// Run a mission headless with AI pilots
    #[derive(Parser, Debug)]
    #[command(name = "mission-core", version, about, long_about = None)]
    pub struct Options {
        /// Mission descriptor (JSON)
        #[arg(value_name = "MISSION")]
        mission: PathBuf,

        /// Spacecraft class catalog (JSON); built-in classes otherwise
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Tick limit
        #[arg(long, default_value_t = 36_000)]
        ticks: u64,

        /// Tick length in ms
        #[arg(long, default_value_t = 1000.0 / 60.0)]
        dt: f32,

        /// easy, normal or hard (overrides the settings file)
        #[arg(long, value_parser = parse_difficulty)]
        difficulty: Option<Difficulty>,

        /// low, medium or high (overrides the settings file)
        #[arg(long, value_parser = parse_quality)]
        quality: Option<QualityPreset>,
    }

    fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
        Difficulty::parse(s).ok_or_else(|| format!("unknown difficulty '{}'", s))
    }

    fn parse_quality(s: &str) -> Result<QualityPreset, String> {
        QualityPreset::parse(s).ok_or_else(|| format!("unknown quality '{}'", s))
    }

    fn read(path: &Path) -> Result<String, MissionError> {
        std::fs::read_to_string(path).map_err(|source| MissionError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn run(options: &Options) -> Result<(), MissionError> {
        let mut settings = Settings::load(Path::new(SETTINGS_FILE));
        if let Some(difficulty) = options.difficulty {
            settings.difficulty = difficulty;
        }
        if let Some(quality) = options.quality {
            settings.quality = quality;
        }
        let catalog = match &options.catalog {
            Some(path) => ClassCatalog::from_json(&read(path)?)?,
            None => ClassCatalog::with_defaults(),
        };
        let difficulty = settings.difficulty;
        let mut mission = Mission::from_json(&read(&options.mission)?, &catalog, settings, Pools::new())?;
        mission.set_ai(Box::new(PursuitAi::new(0x5eed)));
        mission.set_autopilot(true);

        for objective in mission.objective_reports() {
            println!("Objective: {}", objective.text);
        }
        for _ in 0..options.ticks {
            mission.tick(options.dt);
            if mission.is_finished() {
                break;
            }
        }

        let score = mission.score();
        println!("Mission: {}", mission.title().unwrap_or(mission.name()));
        println!("State: {} after {} ticks", mission.state(), mission.ticks());
        println!("Score: {} ({})", score.total(), score.performance());
        println!("{}", mission.telemetry());

        if mission.is_finished() {
            let path = Path::new(RECORDS_FILE);
            let mut records = MissionRecords::load(path);
            if records.record_result(mission.name(), difficulty, mission.state(), &score) {
                println!("New best score!");
            }
            records.save(path)?;
        }
        mission.destroy();
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_options_parse() {
            let options = Options::try_parse_from([
                "mission-core",
                "m.json",
                "--ticks",
                "10",
                "--difficulty",
                "Hard",
                "--quality",
                "low",
            ])
            .unwrap();
            assert_eq!(options.mission, PathBuf::from("m.json"));
            assert_eq!(options.ticks, 10);
            assert_eq!(options.difficulty, Some(Difficulty::Hard));
            assert_eq!(options.quality, Some(QualityPreset::Low));
            assert!(options.catalog.is_none());
        }

        #[test]
        fn test_options_reject_unknown_difficulty() {
            assert!(Options::try_parse_from(["mission-core", "m.json", "--difficulty", "brutal"]).is_err());
            assert!(Options::try_parse_from(["mission-core"]).is_err());
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    env_logger::init();
    let options = runner::Options::parse();
    if let Err(e) = runner::run(&options) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is embedded by the host page; there is no standalone entry point
}
