//! The phase state machine behind a guided session.
//!
//! A `SessionState` walks its plan's segments one countdown at a time. All
//! transitions live here so the machine can be driven synchronously in
//! tests; the sequencer only supplies the tick cadence.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::PhasePlan;
use crate::models::Mood;

/// Lower bound of the visual lung-fill band.
pub const PROGRESS_EMPTY: f64 = 0.6;
/// Upper bound of the visual lung-fill band.
pub const PROGRESS_FULL: f64 = 1.0;

/// The stages of a cycle plus the meditation open sit (`Still`) and the
/// terminal state (`Rest`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Inhale,
    HoldIn,
    Exhale,
    HoldOut,
    Still,
    Rest,
}

impl Phase {
    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Inhale => "Inhale",
            Phase::HoldIn => "Hold",
            Phase::Exhale => "Exhale",
            Phase::HoldOut => "Hold out",
            Phase::Still => "Still",
            Phase::Rest => "Rest",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// What a single tick did to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running (idle, paused, or already at terminal rest).
    Idle,
    /// Countdown decremented within the current phase.
    Running,
    /// The countdown expired and the machine entered the next phase, in the
    /// same logical step.
    Advanced,
    /// The last cycle finished; the machine is now at terminal rest.
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub plan: PhasePlan,
    pub exercise_id: String,
    pub phase: Phase,
    /// 1-based while a session has cycles; 0 only for a degenerate plan
    /// that is terminal at construction.
    pub cycle: u32,
    pub segment_index: usize,
    pub phase_remaining: f64,
    pub total_remaining: f64,
    pub progress: f64,
    pub running: bool,
    pub paused: bool,
    pub mood_before: Option<Mood>,
    pub started_at: Option<DateTime<Utc>>,
    /// Monotonic anchor paired with `started_at`; elapsed duration is
    /// measured against this, not against tick counts.
    #[serde(skip)]
    pub started_anchor: Option<Instant>,
}

impl SessionState {
    /// Fresh state: cycle 1, first segment, full countdowns, not running.
    /// A plan with no segments or zero cycles is terminal immediately.
    pub fn new(plan: PhasePlan, exercise_id: String, mood_before: Option<Mood>) -> Self {
        let mut state = Self {
            phase: Phase::Rest,
            cycle: 0,
            segment_index: 0,
            phase_remaining: 0.0,
            total_remaining: 0.0,
            progress: PROGRESS_EMPTY,
            running: false,
            paused: false,
            mood_before,
            started_at: None,
            started_anchor: None,
            exercise_id,
            plan,
        };

        if !state.plan.segments.is_empty() && state.plan.total_cycles > 0 {
            state.cycle = 1;
            state.total_remaining = f64::from(state.plan.nominal_total_seconds());
            state.enter_segment(0);
        }
        state
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Rest
    }

    /// Full cycles completed so far; a session interrupted mid-cycle does
    /// not count the partial one.
    pub fn cycles_completed(&self) -> u32 {
        if self.is_terminal() {
            self.plan.total_cycles
        } else {
            self.cycle.saturating_sub(1)
        }
    }

    fn current_segment_seconds(&self) -> u32 {
        self.plan
            .segments
            .get(self.segment_index)
            .map(|segment| segment.seconds)
            .unwrap_or(0)
    }

    /// Advance the countdown by `dt` seconds. When the phase countdown
    /// reaches zero the transition happens in this same step, so the
    /// remaining value is never observed negative.
    pub fn tick(&mut self, dt: f64) -> TickOutcome {
        if !self.running || self.is_terminal() {
            return TickOutcome::Idle;
        }

        self.total_remaining = (self.total_remaining - dt).max(0.0);
        self.phase_remaining -= dt;

        if self.phase_remaining > 0.0 {
            self.progress =
                phase_progress(self.phase, self.current_segment_seconds(), self.phase_remaining);
            TickOutcome::Running
        } else {
            self.advance()
        }
    }

    fn advance(&mut self) -> TickOutcome {
        if self.segment_index + 1 < self.plan.segments.len() {
            self.enter_segment(self.segment_index + 1);
            TickOutcome::Advanced
        } else if self.cycle >= self.plan.total_cycles {
            self.finish();
            TickOutcome::Finished
        } else {
            self.cycle += 1;
            self.enter_segment(0);
            TickOutcome::Advanced
        }
    }

    fn enter_segment(&mut self, index: usize) {
        let segment = self.plan.segments[index];
        self.segment_index = index;
        self.phase = segment.phase;
        self.phase_remaining = f64::from(segment.seconds);
        self.progress = phase_progress(segment.phase, segment.seconds, self.phase_remaining);
    }

    /// Silent automatic completion: terminal rest, countdowns zeroed. No
    /// persistence happens here; that waits for an explicit `complete`.
    fn finish(&mut self) {
        self.phase = Phase::Rest;
        self.phase_remaining = 0.0;
        self.total_remaining = 0.0;
        self.progress = PROGRESS_EMPTY;
        self.running = false;
        self.paused = false;
    }
}

/// Map a phase and its countdown position onto the visual fill band.
/// Inhale ramps up, exhale ramps down, holds pin at the band edges. A
/// zero-duration segment would have no defined fraction and falls back to
/// the band midpoint; plans never produce one.
fn phase_progress(phase: Phase, segment_seconds: u32, remaining: f64) -> f64 {
    if segment_seconds == 0 {
        return 0.5;
    }
    let elapsed = (1.0 - remaining / f64::from(segment_seconds)).clamp(0.0, 1.0);
    match phase {
        Phase::Inhale => PROGRESS_EMPTY + (PROGRESS_FULL - PROGRESS_EMPTY) * elapsed,
        Phase::HoldIn | Phase::Still => PROGRESS_FULL,
        Phase::Exhale => PROGRESS_FULL - (PROGRESS_FULL - PROGRESS_EMPTY) * elapsed,
        Phase::HoldOut | Phase::Rest => PROGRESS_EMPTY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::plan::{BreathingPattern, PhasePlan};

    fn breathing_state(pattern: BreathingPattern, cycles: u32) -> SessionState {
        let mut state = SessionState::new(
            PhasePlan::breathing(pattern, cycles),
            "test".to_string(),
            None,
        );
        state.running = true;
        state
    }

    /// Drive the machine one second at a time, recording each phase entered.
    fn run_to_rest(state: &mut SessionState, max_ticks: u32) -> Vec<Phase> {
        let mut visited = vec![state.phase];
        for _ in 0..max_ticks {
            match state.tick(1.0) {
                TickOutcome::Advanced => visited.push(state.phase),
                TickOutcome::Finished => {
                    visited.push(state.phase);
                    break;
                }
                TickOutcome::Running => {}
                TickOutcome::Idle => break,
            }
        }
        visited
    }

    #[test]
    fn full_pattern_visits_phases_in_order_for_every_cycle() {
        let mut state = breathing_state(BreathingPattern::new(4, 2, 6, 2), 2);
        let visited = run_to_rest(&mut state, 60);

        assert_eq!(
            visited,
            vec![
                Phase::Inhale,
                Phase::HoldIn,
                Phase::Exhale,
                Phase::HoldOut,
                Phase::Inhale,
                Phase::HoldIn,
                Phase::Exhale,
                Phase::HoldOut,
                Phase::Rest,
            ]
        );
        assert!(!state.running);
        assert_eq!(state.cycles_completed(), 2);
    }

    #[test]
    fn zero_hold_in_goes_straight_to_exhale() {
        let mut state = breathing_state(BreathingPattern::new(4, 0, 6, 2), 1);
        let visited = run_to_rest(&mut state, 30);
        assert!(!visited.contains(&Phase::HoldIn));
        assert_eq!(
            visited,
            vec![Phase::Inhale, Phase::Exhale, Phase::HoldOut, Phase::Rest]
        );
    }

    #[test]
    fn zero_hold_out_ends_the_cycle_after_exhale() {
        let mut state = breathing_state(BreathingPattern::new(4, 2, 6, 0), 2);
        let visited = run_to_rest(&mut state, 60);
        assert!(!visited.contains(&Phase::HoldOut));
        assert_eq!(
            visited,
            vec![
                Phase::Inhale,
                Phase::HoldIn,
                Phase::Exhale,
                Phase::Inhale,
                Phase::HoldIn,
                Phase::Exhale,
                Phase::Rest,
            ]
        );
    }

    #[test]
    fn progress_stays_inside_the_band_for_a_full_session() {
        let mut state = breathing_state(BreathingPattern::new(3, 1, 5, 1), 3);
        for _ in 0..400 {
            state.tick(0.1);
            assert!(
                state.progress >= PROGRESS_EMPTY - 1e-9 && state.progress <= PROGRESS_FULL + 1e-9,
                "progress {} left the band in phase {:?}",
                state.progress,
                state.phase
            );
            if state.is_terminal() {
                break;
            }
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn worked_example_matches_the_timeline() {
        // {inhale=4, holdIn=2, exhale=6, holdOut=2} x 2, whole-second ticks.
        let mut state = breathing_state(BreathingPattern::new(4, 2, 6, 2), 2);
        assert_eq!(state.total_remaining, 28.0);

        for _ in 0..4 {
            state.tick(1.0);
        }
        // t=4s: hold-in, lungs full.
        assert_eq!(state.phase, Phase::HoldIn);
        assert!((state.phase_remaining - 2.0).abs() < 1e-9);
        assert!((state.progress - PROGRESS_FULL).abs() < 1e-9);

        for _ in 0..6 {
            state.tick(1.0);
        }
        // t=10s: partway through the exhale, deflating.
        assert_eq!(state.phase, Phase::Exhale);
        assert!(state.progress > PROGRESS_EMPTY && state.progress < PROGRESS_FULL);
        let before = state.progress;
        state.tick(1.0);
        assert!(state.progress < before);
    }

    #[test]
    fn session_auto_finishes_without_an_explicit_call() {
        let mut state = breathing_state(BreathingPattern::new(1, 0, 1, 0), 2);
        let mut finished = false;
        for _ in 0..10 {
            if state.tick(1.0) == TickOutcome::Finished {
                finished = true;
                break;
            }
        }
        assert!(finished);
        assert_eq!(state.phase, Phase::Rest);
        assert!(!state.running);
        assert_eq!(state.phase_remaining, 0.0);
        assert_eq!(state.total_remaining, 0.0);
    }

    #[test]
    fn terminal_rest_ignores_further_ticks() {
        let mut state = breathing_state(BreathingPattern::new(1, 0, 1, 0), 1);
        while state.tick(1.0) != TickOutcome::Finished {}
        state.running = true; // even a forced flag cannot revive it
        assert_eq!(state.tick(1.0), TickOutcome::Idle);
        assert_eq!(state.phase, Phase::Rest);
    }

    #[test]
    fn paused_state_does_not_move() {
        let mut state = breathing_state(BreathingPattern::new(4, 2, 6, 2), 2);
        state.tick(1.0);
        let (phase, remaining, cycle) = (state.phase, state.phase_remaining, state.cycle);

        state.running = false;
        state.paused = true;
        assert_eq!(state.tick(1.0), TickOutcome::Idle);
        assert_eq!(state.phase, phase);
        assert_eq!(state.phase_remaining, remaining);
        assert_eq!(state.cycle, cycle);
    }

    #[test]
    fn fractional_ticks_cross_phase_boundaries_in_the_same_step() {
        let mut state = breathing_state(BreathingPattern::new(1, 1, 1, 1), 1);
        for _ in 0..9 {
            state.tick(0.1);
            assert_eq!(state.phase, Phase::Inhale);
        }
        // The tenth 100 ms tick lands on zero and transitions immediately.
        assert_eq!(state.tick(0.1), TickOutcome::Advanced);
        assert_eq!(state.phase, Phase::HoldIn);
        assert!(state.phase_remaining > 0.0);
    }

    #[test]
    fn zero_cycles_is_terminal_at_construction() {
        let state = SessionState::new(
            PhasePlan::breathing(BreathingPattern::new(4, 4, 4, 4), 0),
            "test".to_string(),
            None,
        );
        assert!(state.is_terminal());
        assert!(!state.running);
        assert_eq!(state.total_remaining, 0.0);
        assert_eq!(state.cycles_completed(), 0);
    }

    #[test]
    fn all_zero_pattern_is_terminal_at_construction() {
        let state = SessionState::new(
            PhasePlan::breathing(BreathingPattern::new(0, 0, 0, 0), 5),
            "test".to_string(),
            None,
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn meditation_counts_minutes_through_the_same_machine() {
        let mut state = SessionState::new(PhasePlan::meditation(2), "settle".to_string(), None);
        state.running = true;

        for _ in 0..59 {
            assert_eq!(state.tick(1.0), TickOutcome::Running);
        }
        assert_eq!(state.tick(1.0), TickOutcome::Advanced);
        assert_eq!(state.cycle, 2);
        assert_eq!(state.phase, Phase::Still);
        assert!((state.progress - PROGRESS_FULL).abs() < 1e-9);

        for _ in 0..59 {
            state.tick(1.0);
        }
        assert_eq!(state.tick(1.0), TickOutcome::Finished);
        assert_eq!(state.cycles_completed(), 2);
    }

    #[test]
    fn cycles_completed_ignores_the_partial_cycle() {
        let mut state = breathing_state(BreathingPattern::new(4, 2, 6, 2), 3);
        for _ in 0..15 {
            state.tick(1.0); // into cycle 2
        }
        assert_eq!(state.cycle, 2);
        assert_eq!(state.cycles_completed(), 1);
    }
}
