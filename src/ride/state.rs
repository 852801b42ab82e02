//! Ride request state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Represents the lifecycle state of a ride request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RideState {
    /// Collecting pickup and destination.
    #[default]
    Idle,
    /// Waiting for the options provider.
    Searching,
    /// Options received, nothing selected yet.
    OptionsAvailable,
    /// An option is selected.
    Selected,
    /// Waiting for the confirmation provider.
    Confirming,
    /// Ride confirmed.
    Confirmed,
}

impl RideState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Idle -> Searching
    /// - Searching -> OptionsAvailable | Idle
    /// - OptionsAvailable -> Selected | Searching
    /// - Selected -> Selected | Searching | Confirming
    /// - Confirming -> Confirmed | Selected
    ///
    /// Reset to `Idle` is always allowed and is not a transition.
    pub fn can_transition_to(&self, target: RideState) -> bool {
        use RideState::*;
        matches!(
            (*self, target),
            (Idle, Searching)
                | (Searching, OptionsAvailable)
                | (Searching, Idle)
                | (OptionsAvailable, Selected)
                | (OptionsAvailable, Searching)
                | (Selected, Selected)
                | (Selected, Searching)
                | (Selected, Confirming)
                | (Confirming, Confirmed)
                | (Confirming, Selected)
        )
    }

    /// Check if pickup and destination can still be edited.
    pub fn accepts_input(&self) -> bool {
        matches!(self, RideState::Idle)
    }

    /// Check if a provider call is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, RideState::Searching | RideState::Confirming)
    }

    /// Check if this state carries a selection.
    pub fn has_selection(&self) -> bool {
        matches!(
            self,
            RideState::Selected | RideState::Confirming | RideState::Confirmed
        )
    }

    /// Lowercase, hyphenated name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            RideState::Idle => "idle",
            RideState::Searching => "searching",
            RideState::OptionsAvailable => "options-available",
            RideState::Selected => "selected",
            RideState::Confirming => "confirming",
            RideState::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for RideState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use RideState::*;
        let path = [Idle, Searching, OptionsAvailable, Selected, Confirming, Confirmed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn test_rollback_transitions() {
        assert!(RideState::Searching.can_transition_to(RideState::Idle));
        assert!(RideState::Confirming.can_transition_to(RideState::Selected));
    }

    #[test]
    fn test_invalid_transitions() {
        use RideState::*;
        assert!(!Idle.can_transition_to(Selected));
        assert!(!Searching.can_transition_to(Searching));
        assert!(!Confirming.can_transition_to(Confirming));
        assert!(!Confirmed.can_transition_to(Searching));
        assert!(!OptionsAvailable.can_transition_to(Confirming));
    }

    #[test]
    fn test_accepts_input() {
        assert!(RideState::Idle.accepts_input());
        assert!(!RideState::Searching.accepts_input());
        assert!(!RideState::Confirmed.accepts_input());
    }

    #[test]
    fn test_in_flight() {
        assert!(RideState::Searching.is_in_flight());
        assert!(RideState::Confirming.is_in_flight());
        assert!(!RideState::Selected.is_in_flight());
    }

    #[test]
    fn test_display() {
        assert_eq!(RideState::OptionsAvailable.to_string(), "options-available");
        assert_eq!(RideState::default(), RideState::Idle);
    }
}
