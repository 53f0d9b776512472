//! Session configuration: breathing patterns, the per-cycle phase plan the
//! state machine runs, and the preset catalog the app ships.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::state::Phase;
use crate::models::SessionKind;

/// Tick cadence for breathing sessions; fine enough to animate the lung
/// fill between whole seconds.
pub const BREATHING_TICK: Duration = Duration::from_millis(100);
/// Tick cadence for meditation sessions; minute-level display only.
pub const MEDITATION_TICK: Duration = Duration::from_secs(1);

/// Per-phase durations of a breathing technique. A zero value means the
/// phase is skipped entirely, not run at zero length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreathingPattern {
    pub inhale_seconds: u32,
    pub hold_in_seconds: u32,
    pub exhale_seconds: u32,
    pub hold_out_seconds: u32,
}

impl BreathingPattern {
    pub const fn new(inhale: u32, hold_in: u32, exhale: u32, hold_out: u32) -> Self {
        Self {
            inhale_seconds: inhale,
            hold_in_seconds: hold_in,
            exhale_seconds: exhale,
            hold_out_seconds: hold_out,
        }
    }

    pub fn cycle_seconds(&self) -> u32 {
        self.inhale_seconds + self.hold_in_seconds + self.exhale_seconds + self.hold_out_seconds
    }
}

/// One entry of a cycle: a phase and how long it runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSegment {
    pub phase: Phase,
    pub seconds: u32,
}

/// The generic interval-sequencer configuration: an ordered segment list
/// repeated for a number of cycles at a fixed tick cadence. Breathing and
/// meditation sessions are two instances of the same plan shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhasePlan {
    pub kind: SessionKind,
    pub segments: Vec<PhaseSegment>,
    pub total_cycles: u32,
    pub tick_millis: u64,
}

impl PhasePlan {
    /// Build a breathing plan. Zero-duration phases are dropped here, so the
    /// machine never enters them.
    pub fn breathing(pattern: BreathingPattern, cycles: u32) -> Self {
        let candidates = [
            (Phase::Inhale, pattern.inhale_seconds),
            (Phase::HoldIn, pattern.hold_in_seconds),
            (Phase::Exhale, pattern.exhale_seconds),
            (Phase::HoldOut, pattern.hold_out_seconds),
        ];
        let segments = candidates
            .into_iter()
            .filter(|(_, seconds)| *seconds > 0)
            .map(|(phase, seconds)| PhaseSegment { phase, seconds })
            .collect();

        Self {
            kind: SessionKind::Breathing,
            segments,
            total_cycles: cycles,
            tick_millis: BREATHING_TICK.as_millis() as u64,
        }
    }

    /// Build a meditation plan: one open-sit segment per minute, so the
    /// cycle counter doubles as a minute counter.
    pub fn meditation(minutes: u32) -> Self {
        Self {
            kind: SessionKind::Meditation,
            segments: vec![PhaseSegment {
                phase: Phase::Still,
                seconds: 60,
            }],
            total_cycles: minutes,
            tick_millis: MEDITATION_TICK.as_millis() as u64,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn cycle_seconds(&self) -> u32 {
        self.segments.iter().map(|segment| segment.seconds).sum()
    }

    pub fn nominal_total_seconds(&self) -> u32 {
        self.cycle_seconds() * self.total_cycles
    }
}

/// A named breathing technique from the catalog.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreathingExercise {
    pub id: &'static str,
    pub name: &'static str,
    pub pattern: BreathingPattern,
    pub default_cycles: u32,
    pub premium: bool,
}

/// A timed open meditation from the catalog.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeditationPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub minutes: u32,
    pub premium: bool,
}

const BREATHING_EXERCISES: &[BreathingExercise] = &[
    BreathingExercise {
        id: "box",
        name: "Box Breathing",
        pattern: BreathingPattern::new(4, 4, 4, 4),
        default_cycles: 10,
        premium: false,
    },
    BreathingExercise {
        id: "478",
        name: "4-7-8 Wind Down",
        pattern: BreathingPattern::new(4, 7, 8, 0),
        default_cycles: 6,
        premium: false,
    },
    BreathingExercise {
        id: "coherent",
        name: "Coherent Calm",
        pattern: BreathingPattern::new(5, 0, 5, 0),
        default_cycles: 12,
        premium: false,
    },
    BreathingExercise {
        id: "deep-sleep",
        name: "Deep Sleep",
        pattern: BreathingPattern::new(4, 2, 6, 2),
        default_cycles: 8,
        premium: true,
    },
    BreathingExercise {
        id: "cooling",
        name: "Cooling Breath",
        pattern: BreathingPattern::new(4, 0, 6, 2),
        default_cycles: 12,
        premium: true,
    },
];

const MEDITATION_PRESETS: &[MeditationPreset] = &[
    MeditationPreset {
        id: "settle",
        name: "Quick Settle",
        minutes: 5,
        premium: false,
    },
    MeditationPreset {
        id: "body-scan",
        name: "Body Scan",
        minutes: 10,
        premium: false,
    },
    MeditationPreset {
        id: "deep-rest",
        name: "Deep Rest",
        minutes: 20,
        premium: true,
    },
];

pub fn breathing_exercises() -> &'static [BreathingExercise] {
    BREATHING_EXERCISES
}

pub fn meditation_presets() -> &'static [MeditationPreset] {
    MEDITATION_PRESETS
}

pub fn find_breathing(id: &str) -> Option<&'static BreathingExercise> {
    BREATHING_EXERCISES.iter().find(|exercise| exercise.id == id)
}

pub fn find_meditation(id: &str) -> Option<&'static MeditationPreset> {
    MEDITATION_PRESETS.iter().find(|preset| preset.id == id)
}

/// Premium flag for any catalog id, breathing or meditation. `None` for an
/// unknown id.
pub fn is_premium(id: &str) -> Option<bool> {
    find_breathing(id)
        .map(|exercise| exercise.premium)
        .or_else(|| find_meditation(id).map(|preset| preset.premium))
}
