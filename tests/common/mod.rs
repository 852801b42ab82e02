//! Gated provider doubles shared by the integration tests.
//!
//! Every provider call is parked until the test answers it through the
//! matching `Pending*` value, which makes interleavings deterministic.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use ride_request::provider::{SessionHandler, Subscription};
use ride_request::{
    ConfirmationProvider, ConfirmationReceipt, Fare, Identity, IdentityProvider,
    InMemoryIdentityProvider, ProviderError, RideOption, RideOptionId, RideOptionsProvider,
    RideRequestMachine, RideServices, RideTier, SignInConfig,
};

/// A parked `fetch_options` call.
pub struct PendingFetch {
    pub pickup: String,
    pub destination: String,
    respond: oneshot::Sender<Result<Vec<RideOption>, ProviderError>>,
}

impl PendingFetch {
    pub fn succeed(self, options: Vec<RideOption>) {
        let _ = self.respond.send(Ok(options));
    }

    pub fn fail(self, message: &str) {
        let _ = self.respond.send(Err(ProviderError::new(message)));
    }
}

/// A parked `confirm_option` call.
pub struct PendingConfirm {
    pub option_id: RideOptionId,
    respond: oneshot::Sender<Result<ConfirmationReceipt, ProviderError>>,
}

impl PendingConfirm {
    pub fn succeed(self, reference: &str) {
        let receipt = ConfirmationReceipt {
            option_id: self.option_id,
            reference: reference.to_string(),
        };
        let _ = self.respond.send(Ok(receipt));
    }

    pub fn fail(self, message: &str) {
        let _ = self.respond.send(Err(ProviderError::new(message)));
    }
}

pub struct GatedRideService {
    fetches: mpsc::UnboundedSender<PendingFetch>,
    confirms: mpsc::UnboundedSender<PendingConfirm>,
}

#[async_trait]
impl RideOptionsProvider for GatedRideService {
    async fn fetch_options(
        &self,
        pickup: &str,
        destination: &str,
    ) -> Result<Vec<RideOption>, ProviderError> {
        let (respond, answer) = oneshot::channel();
        self.fetches
            .send(PendingFetch {
                pickup: pickup.to_string(),
                destination: destination.to_string(),
                respond,
            })
            .map_err(|_| ProviderError::new("test dropped the fetch queue"))?;
        answer
            .await
            .unwrap_or_else(|_| Err(ProviderError::new("fetch never answered")))
    }
}

#[async_trait]
impl ConfirmationProvider for GatedRideService {
    async fn confirm_option(
        &self,
        option_id: RideOptionId,
    ) -> Result<ConfirmationReceipt, ProviderError> {
        let (respond, answer) = oneshot::channel();
        self.confirms
            .send(PendingConfirm { option_id, respond })
            .map_err(|_| ProviderError::new("test dropped the confirm queue"))?;
        answer
            .await
            .unwrap_or_else(|_| Err(ProviderError::new("confirm never answered")))
    }
}

/// Receiving ends of a [`GatedRideService`].
pub struct Gates {
    pub fetches: mpsc::UnboundedReceiver<PendingFetch>,
    pub confirms: mpsc::UnboundedReceiver<PendingConfirm>,
}

impl Gates {
    pub async fn next_fetch(&mut self) -> PendingFetch {
        self.fetches.recv().await.expect("fetch queue closed")
    }

    pub async fn next_confirm(&mut self) -> PendingConfirm {
        self.confirms.recv().await.expect("confirm queue closed")
    }
}

pub fn gated_services() -> (RideServices, Gates) {
    let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
    let (confirm_tx, confirm_rx) = mpsc::unbounded_channel();
    let service = Arc::new(GatedRideService {
        fetches: fetch_tx,
        confirms: confirm_tx,
    });
    (
        RideServices::from_shared(service),
        Gates {
            fetches: fetch_rx,
            confirms: confirm_rx,
        },
    )
}

pub fn gated_machine() -> (RideRequestMachine, Gates) {
    let (services, gates) = gated_services();
    (RideRequestMachine::new(services), gates)
}

pub fn economy_only() -> Vec<RideOption> {
    vec![RideOption::new(1, RideTier::Economy, Fare::from_major(10))]
}

pub fn catalog() -> Vec<RideOption> {
    vec![
        RideOption::new(1, RideTier::Economy, Fare::from_major(10)),
        RideOption::new(2, RideTier::Premium, Fare::from_major(15)),
        RideOption::new(3, RideTier::Luxury, Fare::from_major(25)),
    ]
}

/// Identity provider whose session lookup and invalidation can be made to
/// fail. Everything else is delegated to an [`InMemoryIdentityProvider`].
#[derive(Default)]
pub struct FlakyIdentityProvider {
    pub sessions: InMemoryIdentityProvider,
    fail_lookup: AtomicBool,
    fail_invalidate: AtomicBool,
}

impl FlakyIdentityProvider {
    pub fn with_session(identity: Identity) -> Self {
        Self {
            sessions: InMemoryIdentityProvider::with_session(identity),
            ..Self::default()
        }
    }

    pub fn fail_lookup(&self, fail: bool) {
        self.fail_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn fail_invalidate(&self, fail: bool) {
        self.fail_invalidate.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for FlakyIdentityProvider {
    async fn current_session(&self) -> Result<Option<Identity>, ProviderError> {
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(ProviderError::new("identity service unavailable"));
        }
        self.sessions.current_session().await
    }

    fn subscribe(&self, handler: SessionHandler) -> Subscription {
        self.sessions.subscribe(handler)
    }

    async fn invalidate_session(&self) -> Result<(), ProviderError> {
        if self.fail_invalidate.load(Ordering::SeqCst) {
            return Err(ProviderError::new("token revocation failed"));
        }
        self.sessions.invalidate_session().await
    }

    async fn present_sign_in(&self, config: &SignInConfig) -> Result<(), ProviderError> {
        self.sessions.present_sign_in(config).await
    }
}
