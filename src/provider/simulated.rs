//! In-process collaborators for demos and tests.
//!
//! [`SimulatedRideService`] answers with a fixed catalog after a fixed delay.
//! [`InMemoryIdentityProvider`] keeps a single session in memory and notifies
//! subscribers synchronously.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{
    ConfirmationProvider, IdentityProvider, RideOptionsProvider, SessionEvent, SessionHandler,
    SignInConfig, Subscription,
};
use crate::error::ProviderError;
use crate::ride::{ConfirmationReceipt, Fare, RideOption, RideOptionId, RideTier};
use crate::session::Identity;

/// Latency of the simulated search and confirmation calls.
pub const DEFAULT_SIMULATED_DELAY: Duration = Duration::from_millis(1000);

/// The catalog offered for every search.
pub fn default_catalog() -> Vec<RideOption> {
    vec![
        RideOption::new(1, RideTier::Economy, Fare::from_major(10)),
        RideOption::new(2, RideTier::Premium, Fare::from_major(15)),
        RideOption::new(3, RideTier::Luxury, Fare::from_major(25)),
    ]
}

/// Ride options and confirmation backed by a fixed catalog.
#[derive(Debug)]
pub struct SimulatedRideService {
    catalog: Vec<RideOption>,
    search_delay: Duration,
    confirm_delay: Duration,
    bookings: AtomicU64,
}

impl SimulatedRideService {
    /// Create a service using the default catalog.
    pub fn new(search_delay: Duration, confirm_delay: Duration) -> Self {
        Self {
            catalog: default_catalog(),
            search_delay,
            confirm_delay,
            bookings: AtomicU64::new(0),
        }
    }

    /// Replace the catalog.
    pub fn with_catalog(mut self, catalog: Vec<RideOption>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Number of confirmed bookings so far.
    pub fn booking_count(&self) -> u64 {
        self.bookings.load(Ordering::Relaxed)
    }
}

impl Default for SimulatedRideService {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATED_DELAY, DEFAULT_SIMULATED_DELAY)
    }
}

async fn simulate_latency(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl RideOptionsProvider for SimulatedRideService {
    async fn fetch_options(
        &self,
        pickup: &str,
        destination: &str,
    ) -> Result<Vec<RideOption>, ProviderError> {
        debug!("Simulated search '{}' -> '{}'", pickup, destination);
        simulate_latency(self.search_delay).await;
        Ok(self.catalog.clone())
    }
}

#[async_trait]
impl ConfirmationProvider for SimulatedRideService {
    async fn confirm_option(
        &self,
        option_id: RideOptionId,
    ) -> Result<ConfirmationReceipt, ProviderError> {
        simulate_latency(self.confirm_delay).await;

        if !self.catalog.iter().any(|option| option.id == option_id) {
            return Err(ProviderError::new(format!(
                "ride option {} is not offered",
                option_id
            )));
        }

        let booking = self.bookings.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(ConfirmationReceipt {
            option_id,
            reference: format!("ride-{:08x}", booking),
        })
    }
}

/// Identity provider holding one session in memory.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    current: RwLock<Option<Identity>>,
    handlers: Arc<RwLock<Vec<(u64, SessionHandler)>>>,
    next_handler: AtomicU64,
    auto_sign_in: Option<Identity>,
    last_sign_in_config: RwLock<Option<SignInConfig>>,
}

impl InMemoryIdentityProvider {
    /// Create a provider with nobody signed in.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with an already established session.
    pub fn with_session(identity: Identity) -> Self {
        Self {
            current: RwLock::new(Some(identity)),
            ..Self::default()
        }
    }

    /// Complete every sign-in flow as `identity`.
    pub fn auto_sign_in(mut self, identity: Identity) -> Self {
        self.auto_sign_in = Some(identity);
        self
    }

    /// Finish a sign-in flow out-of-band.
    pub fn complete_sign_in(&self, identity: Identity) {
        self.set_current(Some(identity.clone()));
        self.notify(SessionEvent::signed_in(identity));
    }

    /// Drop the session as if the refresh token expired.
    pub fn expire_session(&self) {
        self.set_current(None);
        self.notify(SessionEvent::signed_out());
    }

    /// Deliver an arbitrary event to all subscribers.
    pub fn notify(&self, event: SessionEvent) {
        // Handlers run outside the lock so they may call back into the provider.
        let handlers: Vec<SessionHandler> = match self.handlers.read() {
            Ok(handlers) => handlers.iter().map(|(_, h)| h.clone()).collect(),
            Err(_) => return,
        };
        debug!("Delivering {:?} to {} subscriber(s)", event.kind, handlers.len());
        for handler in handlers {
            handler(event.clone());
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }

    /// The configuration of the most recent sign-in flow.
    pub fn last_sign_in_config(&self) -> Option<SignInConfig> {
        self.last_sign_in_config
            .read()
            .ok()
            .and_then(|config| config.clone())
    }

    fn set_current(&self, identity: Option<Identity>) {
        if let Ok(mut current) = self.current.write() {
            *current = identity;
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn current_session(&self) -> Result<Option<Identity>, ProviderError> {
        self.current
            .read()
            .map(|current| current.clone())
            .map_err(|_| ProviderError::new("identity store poisoned"))
    }

    fn subscribe(&self, handler: SessionHandler) -> Subscription {
        let id = self.next_handler.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.push((id, handler));
        }

        let handlers = Arc::clone(&self.handlers);
        Subscription::new(move || {
            if let Ok(mut handlers) = handlers.write() {
                handlers.retain(|(handler_id, _)| *handler_id != id);
            }
        })
    }

    async fn invalidate_session(&self) -> Result<(), ProviderError> {
        let had_session = self
            .current
            .write()
            .map(|mut current| current.take().is_some())
            .map_err(|_| ProviderError::new("identity store poisoned"))?;

        if had_session {
            self.notify(SessionEvent::signed_out());
        }
        Ok(())
    }

    async fn present_sign_in(&self, config: &SignInConfig) -> Result<(), ProviderError> {
        if let Ok(mut last) = self.last_sign_in_config.write() {
            *last = Some(config.clone());
        }

        if let Some(identity) = self.auto_sign_in.clone() {
            self.complete_sign_in(identity);
        }
        Ok(())
    }
}
