//! Session management module.
//!
//! This module tracks the authenticated identity and gates the ride flow on
//! it: a ride request machine exists only while a user is signed in.

mod controller;
mod identity;
mod state;

pub use controller::SessionController;
pub use identity::{Identity, UserId};
pub use state::{RideFlowChange, SessionState};
