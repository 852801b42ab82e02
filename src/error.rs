//! Error types for ride-request.

use thiserror::Error;

use crate::ride::{RideOptionId, RideState};

/// Main error type for ride-request operations.
#[derive(Error, Debug)]
pub enum RideRequestError {
    /// Caller input was malformed (blank pickup or destination).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation is not allowed in the current ride state.
    #[error("cannot {operation} while ride request is {state}")]
    InvalidState {
        operation: &'static str,
        state: RideState,
    },

    /// Option id is not part of the current options list.
    #[error("ride option not found: {0}")]
    NotFound(RideOptionId),

    /// The session that owned this ride request has ended.
    #[error("ride request is no longer active: the session has ended")]
    SessionEnded,

    /// An asynchronous collaborator failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

/// Failure reported by an external collaborator.
///
/// The cause is opaque to the core; only the message and the optional
/// underlying error travel with it.
#[derive(Error, Debug)]
#[error("provider error: {message}")]
pub struct ProviderError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Create a provider error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Human readable failure description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Convenience Result type for ride-request operations.
pub type Result<T> = std::result::Result<T, RideRequestError>;
