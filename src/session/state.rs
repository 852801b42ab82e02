//! Session state machine.

use super::Identity;
use crate::provider::SessionEvent;

/// Represents the authentication state of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nobody is signed in. Initial state until a session is restored.
    #[default]
    SignedOut,
    /// A user is signed in.
    SignedIn(Identity),
}

/// Effect a state change has on the ride flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideFlowChange {
    /// Keep the current ride machine (if any).
    Keep,
    /// Replace the ride machine with a fresh one.
    Start,
    /// Discard the ride machine.
    Discard,
}

impl SessionState {
    /// Compute the state following `event`.
    ///
    /// An event carrying an identity signs that user in; any other event
    /// signs out.
    pub fn apply(&self, event: &SessionEvent) -> SessionState {
        match &event.identity {
            Some(identity) => SessionState::SignedIn(identity.clone()),
            None => SessionState::SignedOut,
        }
    }

    /// What moving from `self` to `next` means for the ride flow.
    ///
    /// - SignedOut -> SignedIn: start
    /// - SignedIn(a) -> SignedIn(b), different user: start
    /// - SignedIn(a) -> SignedIn(a'), same user: keep
    /// - SignedIn -> SignedOut: discard
    /// - SignedOut -> SignedOut: keep
    pub fn ride_flow_change(&self, next: &SessionState) -> RideFlowChange {
        match (self, next) {
            (SessionState::SignedIn(current), SessionState::SignedIn(incoming)) => {
                if current.same_user(incoming) {
                    RideFlowChange::Keep
                } else {
                    RideFlowChange::Start
                }
            }
            (SessionState::SignedOut, SessionState::SignedIn(_)) => RideFlowChange::Start,
            (SessionState::SignedIn(_), SessionState::SignedOut) => RideFlowChange::Discard,
            (SessionState::SignedOut, SessionState::SignedOut) => RideFlowChange::Keep,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::SignedIn(identity) => Some(identity),
            SessionState::SignedOut => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionState::SignedIn(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SessionEventKind;

    fn rider(id: &str) -> Identity {
        Identity::new(id)
    }

    #[test]
    fn test_default_is_signed_out() {
        let state = SessionState::default();
        assert!(!state.is_signed_in());
        assert!(state.identity().is_none());
    }

    #[test]
    fn test_event_with_identity_signs_in() {
        let next = SessionState::SignedOut.apply(&SessionEvent::signed_in(rider("u-1")));
        assert_eq!(next, SessionState::SignedIn(rider("u-1")));
    }

    #[test]
    fn test_event_without_identity_signs_out() {
        let state = SessionState::SignedIn(rider("u-1"));
        // Event kind does not matter, only the identity.
        let event = SessionEvent::new(SessionEventKind::TokenRefreshed, None);
        assert_eq!(state.apply(&event), SessionState::SignedOut);
    }

    #[test]
    fn test_sign_out_is_idempotent() {
        let state = SessionState::SignedOut;
        let next = state.apply(&SessionEvent::signed_out());
        assert_eq!(next, SessionState::SignedOut);
        assert_eq!(state.ride_flow_change(&next), RideFlowChange::Keep);
    }

    #[test]
    fn test_ride_flow_changes() {
        let out = SessionState::SignedOut;
        let a = SessionState::SignedIn(rider("u-1"));
        let a_updated = SessionState::SignedIn(rider("u-1").with_email("new@example.com"));
        let b = SessionState::SignedIn(rider("u-2"));

        assert_eq!(out.ride_flow_change(&a), RideFlowChange::Start);
        assert_eq!(a.ride_flow_change(&a_updated), RideFlowChange::Keep);
        assert_eq!(a.ride_flow_change(&b), RideFlowChange::Start);
        assert_eq!(a.ride_flow_change(&out), RideFlowChange::Discard);
    }
}
