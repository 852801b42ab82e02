//! External collaborator capabilities.
//!
//! The core talks to three collaborators, each behind an object-safe async
//! trait so any implementation (or test double) can be substituted:
//!
//! - [`IdentityProvider`] - session lookup, change notifications, sign-in/out
//! - [`RideOptionsProvider`] - ride options for a pickup/destination pair
//! - [`ConfirmationProvider`] - booking of a selected option
//!
//! In-process implementations live in [`simulated`].

mod identity;
mod ride;
pub mod simulated;

pub use identity::{
    FederatedProvider, IdentityProvider, SessionEvent, SessionEventKind, SessionHandler,
    SignInConfig, Subscription,
};
pub use ride::{ConfirmationProvider, RideOptionsProvider, RideServices};
pub use simulated::{InMemoryIdentityProvider, SimulatedRideService};
