//! # ride-request
//!
//! Client-side core of a ride-hailing app for a single rider session.
//!
//! A [`SessionController`] tracks the signed-in rider and owns a
//! [`RideRequestMachine`] for as long as someone is signed in. The machine
//! drives one ride request through its lifecycle against pluggable
//! asynchronous providers and guarantees that stale provider results never
//! land on a request that has since been reset or re-searched.
//!
//! ## Features
//!
//! - **Lifecycle state machine**: idle, searching, options-available,
//!   selected, confirming, confirmed
//! - **No double submission**: reentrant search/confirm calls are rejected
//! - **Staleness guard**: provider results are stamped with a generation
//! - **Snapshots**: immutable state copies plus `watch` change notifications
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ride_request::{
//!     Identity, InMemoryIdentityProvider, RideOptionId, RideServices, SessionController,
//!     SimulatedRideService,
//! };
//!
//! #[tokio::main]
//! async fn main() -> ride_request::Result<()> {
//!     ride_request::logging::try_init().ok();
//!
//!     let identity = Arc::new(InMemoryIdentityProvider::with_session(Identity::new("rider-1")));
//!     let rides = RideServices::from_shared(Arc::new(SimulatedRideService::default()));
//!     let controller = SessionController::init(identity, rides);
//!     controller.restore_session().await?;
//!
//!     if let Some(ride) = controller.ride() {
//!         ride.set_pickup("Downtown")?;
//!         ride.set_destination("Airport")?;
//!         ride.search().await?;
//!         ride.select(RideOptionId::new(1))?;
//!         ride.confirm().await?;
//!         println!("{:?}", ride.snapshot()?.receipt());
//!     }
//!
//!     controller.sign_out().await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod ride;
pub mod session;

// Re-export commonly used types
pub use error::{ProviderError, Result, RideRequestError};
pub use provider::{
    ConfirmationProvider, IdentityProvider, InMemoryIdentityProvider, RideOptionsProvider,
    RideServices, SessionEvent, SessionEventKind, SignInConfig, SimulatedRideService,
};
pub use ride::{
    ConfirmationReceipt, Fare, Generation, Outcome, RideOption, RideOptionId, RideRequest,
    RideRequestMachine, RideState, RideTier,
};
pub use session::{Identity, SessionController, SessionState, UserId};
