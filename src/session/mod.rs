pub mod plan;
pub mod sequencer;
pub mod state;

pub use plan::{BreathingExercise, BreathingPattern, MeditationPreset, PhasePlan};
pub use sequencer::{SelectOutcome, SessionSequencer, SessionSnapshot};
pub use state::{Phase, SessionState, TickOutcome};
