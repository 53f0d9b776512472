//! Terminal runner: wires the real collaborators together and drives one
//! session end to end. The mobile shell owns the production surface; this
//! exists to exercise the stack locally.
//!
//! Usage: `stillpoint [exercise-id] [cycles]`, e.g. `stillpoint box 3`.
//! `STILLPOINT_DATA_DIR` overrides where the session log and settings live.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::info;

use stillpoint::{
    breathing_exercises, AudioCues, AudioEngineHandle, Database, EntitlementGate, Mood, Phase,
    SelectOutcome, SessionSequencer, SessionStore, SettingsStore, SubscriptionTier, TierGate,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let exercise_id = args.get(1).map(String::as_str).unwrap_or("box");
    let cycles: Option<u32> = args.get(2).and_then(|raw| raw.parse().ok());

    let data_dir = PathBuf::from(
        std::env::var("STILLPOINT_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
    );
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let database = Database::new(data_dir.join("stillpoint.sqlite3"))?;
    let settings = SettingsStore::new(data_dir.join("settings.json"))?;

    let sequencer = SessionSequencer::new(
        Arc::new(AudioEngineHandle::new()) as Arc<dyn AudioCues>,
        Arc::new(database) as Arc<dyn SessionStore>,
        Arc::new(TierGate::new(SubscriptionTier::Plus)) as Arc<dyn EntitlementGate>,
        settings.sound(),
        "local".to_string(),
    );

    info!("Stillpoint starting up...");

    match sequencer
        .select_breathing(exercise_id, cycles, Some(Mood::Tense))
        .await?
    {
        SelectOutcome::UpgradeRequired => {
            println!("'{exercise_id}' needs Stillpoint Plus.");
            return Ok(());
        }
        SelectOutcome::Ready(snapshot) => {
            let name = breathing_exercises()
                .iter()
                .find(|exercise| exercise.id == exercise_id)
                .map(|exercise| exercise.name)
                .unwrap_or(exercise_id);
            println!(
                "{name}: {} cycles, about {:.0}s",
                snapshot.total_cycles, snapshot.total_seconds_remaining
            );
        }
    }

    sequencer.start().await?;

    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let Some(snapshot) = sequencer.snapshot().await else {
            break;
        };
        print!(
            "\r{:<9} cycle {}/{}  {:>5.1}s left  ",
            snapshot.phase.to_string(),
            snapshot.current_cycle,
            snapshot.total_cycles,
            snapshot.total_seconds_remaining
        );
        use std::io::Write;
        let _ = std::io::stdout().flush();

        if !snapshot.is_running && snapshot.phase == Phase::Rest {
            println!();
            break;
        }
    }

    match sequencer.complete(Some(Mood::Rested)).await {
        Ok(Some(record)) => {
            println!(
                "Logged {} ({}s, {} cycles).",
                record.exercise_id, record.duration_seconds, record.cycles_completed
            );
            if let Some(stats) = sequencer.stats().await {
                println!(
                    "{} sessions, {} day streak.",
                    stats.total_sessions, stats.current_streak_days
                );
            }
        }
        Ok(None) => println!("Nothing to log."),
        Err(err) => println!("Session finished but could not be logged: {err:#}"),
    }

    Ok(())
}
