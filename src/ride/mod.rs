//! Ride request lifecycle.
//!
//! This module provides the ride request aggregate, its state machine and the
//! asynchronous machine that drives it against the ride providers.

mod machine;
mod option;
mod request;
mod state;

pub use machine::RideRequestMachine;
pub use option::{ConfirmationReceipt, Fare, RideOption, RideOptionId, RideTier, UnknownTier};
pub use request::{Generation, Outcome, RideRequest};
pub use state::RideState;
