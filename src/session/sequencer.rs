//! The session sequencer: owns the active `SessionState`, drives it from a
//! periodic tick task, and coordinates the audio, entitlement and
//! persistence collaborators around it.

use std::{
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::plan::{self, PhasePlan};
use super::state::{Phase, SessionState, TickOutcome};
use crate::access::EntitlementGate;
use crate::audio::{AudioCues, ChimeKind};
use crate::db::SessionStore;
use crate::models::{Mood, SessionRecord};
use crate::settings::SoundSettings;
use crate::stats::SessionStats;

/// How long the ambient bed takes to fade after the end chime.
const AUDIO_FADE: Duration = Duration::from_secs(2);

/// View of the active session for the shell to render.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub kind: crate::models::SessionKind,
    pub exercise_id: String,
    pub phase: Phase,
    pub current_cycle: u32,
    pub total_cycles: u32,
    pub phase_seconds_remaining: f64,
    pub total_seconds_remaining: f64,
    pub progress: f64,
    pub is_running: bool,
    pub is_paused: bool,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            kind: state.plan.kind,
            exercise_id: state.exercise_id.clone(),
            phase: state.phase,
            current_cycle: state.cycle,
            total_cycles: state.plan.total_cycles,
            phase_seconds_remaining: state.phase_remaining.max(0.0),
            total_seconds_remaining: state.total_remaining,
            progress: state.progress,
            is_running: state.running,
            is_paused: state.paused,
        }
    }
}

/// Result of selecting a catalog entry. Denial is an expected outcome the
/// shell turns into an upgrade prompt, not an error.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum SelectOutcome {
    Ready(SessionSnapshot),
    UpgradeRequired,
}

struct TickTask {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct SessionSequencer {
    state: Arc<Mutex<Option<SessionState>>>,
    ticker: Arc<Mutex<Option<TickTask>>>,
    audio: Arc<dyn AudioCues>,
    store: Arc<dyn SessionStore>,
    gate: Arc<dyn EntitlementGate>,
    sound: Arc<RwLock<SoundSettings>>,
    stats: Arc<Mutex<Option<SessionStats>>>,
    user_id: String,
}

impl SessionSequencer {
    pub fn new(
        audio: Arc<dyn AudioCues>,
        store: Arc<dyn SessionStore>,
        gate: Arc<dyn EntitlementGate>,
        sound: SoundSettings,
        user_id: String,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(None)),
            ticker: Arc::new(Mutex::new(None)),
            audio,
            store,
            gate,
            sound: Arc::new(RwLock::new(sound)),
            stats: Arc::new(Mutex::new(None)),
            user_id,
        }
    }

    pub fn update_sound(&self, sound: SoundSettings) {
        *self.sound.write().unwrap() = sound;
    }

    /// Select a breathing exercise. Checks entitlement once, here; a denied
    /// selection leaves no state behind.
    pub async fn select_breathing(
        &self,
        exercise_id: &str,
        cycles: Option<u32>,
        mood_before: Option<Mood>,
    ) -> Result<SelectOutcome> {
        let Some(exercise) = plan::find_breathing(exercise_id) else {
            bail!("unknown breathing exercise '{exercise_id}'");
        };
        if !self.gate.can_access(exercise.id) {
            info!("'{}' is locked behind the premium tier", exercise.id);
            return Ok(SelectOutcome::UpgradeRequired);
        }

        let plan = PhasePlan::breathing(
            exercise.pattern,
            cycles.unwrap_or(exercise.default_cycles),
        );
        let snapshot = self
            .install(SessionState::new(plan, exercise.id.to_string(), mood_before))
            .await;
        Ok(SelectOutcome::Ready(snapshot))
    }

    /// Select a timed meditation. Same gate, same machine, coarser tick.
    pub async fn select_meditation(
        &self,
        preset_id: &str,
        mood_before: Option<Mood>,
    ) -> Result<SelectOutcome> {
        let Some(preset) = plan::find_meditation(preset_id) else {
            bail!("unknown meditation preset '{preset_id}'");
        };
        if !self.gate.can_access(preset.id) {
            info!("'{}' is locked behind the premium tier", preset.id);
            return Ok(SelectOutcome::UpgradeRequired);
        }

        let snapshot = self
            .install(SessionState::new(
                PhasePlan::meditation(preset.minutes),
                preset.id.to_string(),
                mood_before,
            ))
            .await;
        Ok(SelectOutcome::Ready(snapshot))
    }

    async fn install(&self, state: SessionState) -> SessionSnapshot {
        self.cancel_ticker().await;
        let snapshot = SessionSnapshot::from(&state);
        let mut guard = self.state.lock().await;
        if guard.replace(state).is_some() {
            // The previous session was abandoned without cancel; silence it.
            self.audio.stop_all();
        }
        snapshot
    }

    /// Start, or resume after a pause. The first start of a session records
    /// the wall-clock anchors and fires the start cues; a resume only picks
    /// the audio and ticker back up.
    pub async fn start(&self) -> Result<()> {
        let (first_start, interval) = {
            let mut guard = self.state.lock().await;
            let Some(state) = guard.as_mut() else {
                bail!("no session selected");
            };
            if state.is_terminal() || state.running {
                return Ok(());
            }
            let first_start = state.started_anchor.is_none();
            if first_start {
                state.started_at = Some(Utc::now());
                state.started_anchor = Some(Instant::now());
            }
            state.running = true;
            state.paused = false;
            (first_start, state.plan.tick_interval())
        };

        let sound = self.sound.read().unwrap().clone();
        if first_start {
            if sound.chimes_enabled {
                self.audio.play_chime(ChimeKind::SessionStart);
            }
            if let Some(ambient) = sound.ambient {
                self.audio.start_ambient(ambient, sound.ambient_volume);
            }
        } else {
            self.audio.resume_all();
        }

        self.spawn_ticker(interval).await;
        Ok(())
    }

    /// Idempotent; pausing an already-paused or idle sequencer does nothing.
    pub async fn pause(&self) {
        self.cancel_ticker().await;
        let paused_now = {
            let mut guard = self.state.lock().await;
            match guard.as_mut() {
                Some(state) if state.running => {
                    state.running = false;
                    state.paused = true;
                    true
                }
                _ => false,
            }
        };
        if paused_now {
            self.audio.pause_all();
        }
    }

    pub async fn resume(&self) -> Result<()> {
        self.start().await
    }

    /// Abandon the session. Nothing is logged; an abandoned session leaves
    /// no record.
    pub async fn cancel(&self) {
        self.cancel_ticker().await;
        let had_session = self.state.lock().await.take().is_some();
        if had_session {
            self.audio.stop_all();
            info!("session cancelled, nothing logged");
        }
    }

    /// Finish the session and persist it. A no-op when no session is
    /// active. On a store failure the error is surfaced and the in-memory
    /// session is already gone; there is no retry.
    pub async fn complete(&self, mood_after: Option<Mood>) -> Result<Option<SessionRecord>> {
        self.cancel_ticker().await;
        let Some(state) = self.state.lock().await.take() else {
            return Ok(None);
        };

        let sound = self.sound.read().unwrap().clone();
        if sound.chimes_enabled {
            self.audio.play_chime(ChimeKind::SessionEnd);
        }
        self.audio.fade_out_all(AUDIO_FADE);

        // Anchored to the true start instant, capped at the plan's nominal
        // length so lingering at terminal rest does not inflate the record.
        let nominal = u64::from(state.plan.nominal_total_seconds());
        let duration_seconds = match state.started_anchor {
            Some(anchor) => (anchor.elapsed().as_secs_f64().round() as u64).min(nominal),
            None => nominal,
        };

        let now = Utc::now();
        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: self.user_id.clone(),
            kind: state.plan.kind,
            exercise_id: state.exercise_id.clone(),
            started_at: state.started_at.unwrap_or(now),
            duration_seconds,
            cycles_completed: state.cycles_completed(),
            mood_before: state.mood_before,
            mood_after,
            created_at: now,
        };

        self.store
            .log_session(&record)
            .await
            .context("failed to log completed session")?;

        if let Err(err) = self.refresh_stats().await {
            warn!("failed to refresh session stats: {err:#}");
        }

        Ok(Some(record))
    }

    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        self.state.lock().await.as_ref().map(SessionSnapshot::from)
    }

    /// Stats as of the last refresh; `None` before the first one.
    pub async fn stats(&self) -> Option<SessionStats> {
        self.stats.lock().await.clone()
    }

    pub async fn refresh_stats(&self) -> Result<SessionStats> {
        let stats = self.store.total_stats(&self.user_id).await?;
        *self.stats.lock().await = Some(stats.clone());
        Ok(stats)
    }

    async fn spawn_ticker(&self, interval: Duration) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(task) = ticker_guard.take() {
            task.cancel.cancel();
            task.handle.abort();
        }

        let state = Arc::clone(&self.state);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let dt = interval.as_secs_f64();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so a full
            // interval elapses before the first mutation.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // A tick that raced the cancellation must not land.
                        if token.is_cancelled() {
                            break;
                        }
                        let (outcome, phase) = {
                            let mut guard = state.lock().await;
                            let Some(session) = guard.as_mut() else { break };
                            (session.tick(dt), session.phase)
                        };
                        match outcome {
                            TickOutcome::Finished => {
                                info!("session reached terminal rest");
                                break;
                            }
                            TickOutcome::Advanced => debug!("phase advanced to {phase}"),
                            TickOutcome::Idle => break,
                            TickOutcome::Running => {}
                        }
                    }
                    _ = token.cancelled() => break,
                }
            }
        });

        *ticker_guard = Some(TickTask { handle, cancel });
    }

    async fn cancel_ticker(&self) {
        if let Some(task) = self.ticker.lock().await.take() {
            task.cancel.cancel();
            task.handle.abort();
        }
    }
}
