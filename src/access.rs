//! Entitlement gate: whether the user's subscription tier may start a given
//! catalog entry. Consulted once, at selection time; denial is an expected
//! outcome, not a fault.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::session::plan;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionTier {
    Free,
    Plus,
}

pub trait EntitlementGate: Send + Sync {
    fn can_access(&self, exercise_id: &str) -> bool;
}

/// Gate backed by the current subscription tier. Premium catalog entries
/// need `Plus`; unknown ids are denied outright.
pub struct TierGate {
    tier: RwLock<SubscriptionTier>,
}

impl TierGate {
    pub fn new(tier: SubscriptionTier) -> Self {
        Self {
            tier: RwLock::new(tier),
        }
    }

    pub fn tier(&self) -> SubscriptionTier {
        *self.tier.read().unwrap()
    }

    /// Called by the billing layer when the subscription changes.
    pub fn set_tier(&self, tier: SubscriptionTier) {
        *self.tier.write().unwrap() = tier;
    }
}

impl EntitlementGate for TierGate {
    fn can_access(&self, exercise_id: &str) -> bool {
        match plan::is_premium(exercise_id) {
            Some(false) => true,
            Some(true) => self.tier() == SubscriptionTier::Plus,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_reaches_only_free_content() {
        let gate = TierGate::new(SubscriptionTier::Free);
        assert!(gate.can_access("box"));
        assert!(gate.can_access("settle"));
        assert!(!gate.can_access("deep-sleep"));
        assert!(!gate.can_access("deep-rest"));
    }

    #[test]
    fn plus_tier_reaches_everything_in_the_catalog() {
        let gate = TierGate::new(SubscriptionTier::Plus);
        assert!(gate.can_access("deep-sleep"));
        assert!(gate.can_access("box"));
    }

    #[test]
    fn unknown_ids_are_denied() {
        let gate = TierGate::new(SubscriptionTier::Plus);
        assert!(!gate.can_access("not-a-real-exercise"));
    }

    #[test]
    fn upgrading_mid_run_unlocks_premium() {
        let gate = TierGate::new(SubscriptionTier::Free);
        assert!(!gate.can_access("cooling"));
        gate.set_tier(SubscriptionTier::Plus);
        assert!(gate.can_access("cooling"));
    }
}
