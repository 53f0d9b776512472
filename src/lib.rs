pub mod access;
pub mod audio;
pub mod db;
pub mod models;
pub mod session;
pub mod settings;
pub mod stats;

pub use access::{EntitlementGate, SubscriptionTier, TierGate};
pub use audio::{ambient::AmbientSound, AudioCues, AudioEngineHandle, ChimeKind};
pub use db::{Database, SessionStore};
pub use models::{Mood, SessionKind, SessionRecord};
pub use session::{
    plan::{breathing_exercises, meditation_presets, BreathingPattern, PhasePlan},
    Phase, SelectOutcome, SessionSequencer, SessionSnapshot, SessionState,
};
pub use settings::{SettingsStore, SoundSettings};
pub use stats::SessionStats;
