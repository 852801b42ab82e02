//! Session controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::RideFlowChange;
use super::{Identity, SessionState};
use crate::error::RideRequestError;
use crate::provider::{
    IdentityProvider, RideServices, SessionEvent, SessionHandler, SignInConfig, Subscription,
};
use crate::ride::RideRequestMachine;
use crate::Result;

/// Owns the signed-in identity and the ride flow that depends on it.
///
/// Created with [`SessionController::init`], which subscribes to the identity
/// provider exactly once; [`SessionController::teardown`] (or drop)
/// unsubscribes. A [`RideRequestMachine`] exists only while signed in and is
/// replaced by a fresh one whenever a user signs in. Handles to a replaced or
/// discarded machine are retired and reject further operations.
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    provider: Arc<dyn IdentityProvider>,
    services: RideServices,
    slot: RwLock<SessionSlot>,
    changes: watch::Sender<SessionState>,
    subscription: Mutex<Option<Subscription>>,
    active: AtomicBool,
}

#[derive(Default)]
struct SessionSlot {
    state: SessionState,
    ride: Option<RideRequestMachine>,
    /// Bumped on every applied state change; lets a slow restore detect that
    /// a newer notification already arrived.
    epoch: u64,
}

impl SessionController {
    /// Create the controller and subscribe to session changes.
    ///
    /// Starts signed out; call [`restore_session`](Self::restore_session) to
    /// pick up an existing session.
    pub fn init(provider: Arc<dyn IdentityProvider>, services: RideServices) -> Self {
        let (changes, _) = watch::channel(SessionState::SignedOut);
        let inner = Arc::new(ControllerInner {
            provider,
            services,
            slot: RwLock::new(SessionSlot::default()),
            changes,
            subscription: Mutex::new(None),
            active: AtomicBool::new(true),
        });

        let weak: Weak<ControllerInner> = Arc::downgrade(&inner);
        let handler: SessionHandler = Arc::new(move |event: SessionEvent| {
            if let Some(inner) = weak.upgrade() {
                if let Err(e) = inner.handle_event(event) {
                    warn!("Failed to apply session change: {}", e);
                }
            }
        });

        let subscription = inner.provider.subscribe(handler);
        if let Ok(mut slot) = inner.subscription.lock() {
            *slot = Some(subscription);
        }
        debug!("Subscribed to session changes");

        Self { inner }
    }

    /// Look up an existing session with the identity provider.
    ///
    /// `Ok(None)` means nobody is signed in. If a session change notification
    /// is applied while the lookup is pending, the lookup result is dropped
    /// and the current identity is returned instead.
    pub async fn restore_session(&self) -> Result<Option<Identity>> {
        let epoch = self.inner.read_slot()?.epoch;

        let restored = match self.inner.provider.current_session().await {
            Ok(restored) => restored,
            Err(e) => {
                warn!("Session restore failed: {}", e);
                return Err(e.into());
            }
        };

        let mut slot = self.inner.write_slot()?;
        if slot.epoch != epoch {
            debug!("Session changed during restore, keeping newer state");
            return Ok(slot.state.identity().cloned());
        }

        match restored {
            Some(identity) => {
                self.inner
                    .enter(&mut slot, SessionState::SignedIn(identity.clone()));
                Ok(Some(identity))
            }
            None => {
                debug!("No session to restore");
                Ok(None)
            }
        }
    }

    /// Apply a session change notification.
    ///
    /// This is what the provider subscription calls; it is public so callers
    /// with their own notification channel can forward events.
    pub fn on_session_changed(&self, event: SessionEvent) -> Result<()> {
        self.inner.handle_event(event)
    }

    /// Launch the provider's sign-in flow.
    ///
    /// The outcome arrives later through the subscription.
    pub async fn present_sign_in(&self, config: &SignInConfig) -> Result<()> {
        debug!(
            "Presenting sign-in ({} federated provider(s))",
            config.federated_providers.len()
        );
        self.inner
            .provider
            .present_sign_in(config)
            .await
            .map_err(RideRequestError::from)
    }

    /// Sign out.
    ///
    /// The local state changes first and does not wait for the provider. A
    /// failed invalidation is logged, not returned.
    pub async fn sign_out(&self) -> Result<()> {
        {
            let mut slot = self.inner.write_slot()?;
            self.inner.enter(&mut slot, SessionState::SignedOut);
        }

        if let Err(e) = self.inner.provider.invalidate_session().await {
            warn!("Session invalidation failed: {}", e);
        }
        Ok(())
    }

    /// Unsubscribe from the provider and end the local session.
    ///
    /// The controller moves to [`SessionState::SignedOut`] and retires the
    /// ride flow. The provider session itself is left alone. Safe to call
    /// more than once; only the first call unsubscribes.
    pub fn teardown(&self) {
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return;
        }

        let subscription = match self.inner.subscription.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            debug!("Unsubscribed from session changes");
        }

        let mut slot = match self.inner.slot.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.inner.enter(&mut slot, SessionState::SignedOut);
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        self.inner.changes.borrow().clone()
    }

    /// Get the signed-in identity, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.inner.changes.borrow().identity().cloned()
    }

    pub fn is_signed_in(&self) -> bool {
        self.inner.changes.borrow().is_signed_in()
    }

    /// Handle to the live ride machine. `None` while signed out.
    pub fn ride(&self) -> Option<RideRequestMachine> {
        self.inner
            .slot
            .read()
            .ok()
            .and_then(|slot| slot.ride.clone())
    }

    /// Subscribe to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.changes.subscribe()
    }

    /// Check if the controller still listens to the provider.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl ControllerInner {
    fn handle_event(&self, event: SessionEvent) -> Result<()> {
        if !self.active.load(Ordering::SeqCst) {
            debug!("Ignoring {:?} after teardown", event.kind);
            return Ok(());
        }

        let mut slot = self.write_slot()?;
        let next = slot.state.apply(&event);
        debug!("Session event {:?}", event.kind);
        self.enter(&mut slot, next);
        Ok(())
    }

    /// Move to `next`, starting or discarding the ride flow as needed.
    fn enter(&self, slot: &mut SessionSlot, next: SessionState) {
        match slot.state.ride_flow_change(&next) {
            RideFlowChange::Keep => {}
            RideFlowChange::Start => {
                discard(slot.ride.take());
                slot.ride = Some(RideRequestMachine::new(self.services.clone()));
                if let Some(identity) = next.identity() {
                    info!("Signed in as {}", identity.label());
                }
            }
            RideFlowChange::Discard => {
                discard(slot.ride.take());
                info!("Signed out");
            }
        }

        slot.state = next;
        slot.epoch += 1;

        let state = &slot.state;
        self.changes.send_if_modified(|published| {
            if *published == *state {
                false
            } else {
                *published = state.clone();
                true
            }
        });
    }

    fn read_slot(&self) -> Result<std::sync::RwLockReadGuard<'_, SessionSlot>> {
        self.slot.read().map_err(|_| RideRequestError::LockPoisoned)
    }

    fn write_slot(&self) -> Result<std::sync::RwLockWriteGuard<'_, SessionSlot>> {
        self.slot.write().map_err(|_| RideRequestError::LockPoisoned)
    }
}

/// Retire a ride machine that is being dropped so outstanding handles stop
/// working and results still in flight for it are discarded.
fn discard(ride: Option<RideRequestMachine>) {
    if let Some(ride) = ride {
        if let Err(e) = ride.retire() {
            warn!("Failed to retire discarded ride request: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{InMemoryIdentityProvider, SimulatedRideService};
    use std::time::Duration;

    fn services() -> RideServices {
        RideServices::from_shared(Arc::new(SimulatedRideService::new(
            Duration::ZERO,
            Duration::ZERO,
        )))
    }

    fn rider() -> Identity {
        Identity::new("user-1").with_email("rider@example.com")
    }

    #[tokio::test]
    async fn test_restore_existing_session() {
        let provider = Arc::new(InMemoryIdentityProvider::with_session(rider()));
        let controller = SessionController::init(provider, services());

        assert!(!controller.is_signed_in());
        let restored = controller.restore_session().await.unwrap();

        assert_eq!(restored, Some(rider()));
        assert!(controller.is_signed_in());
        assert!(controller.ride().is_some());
    }

    #[tokio::test]
    async fn test_restore_without_session() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let controller = SessionController::init(provider, services());

        assert_eq!(controller.restore_session().await.unwrap(), None);
        assert_eq!(controller.state(), SessionState::SignedOut);
        assert!(controller.ride().is_none());
    }

    #[test]
    fn test_token_refresh_keeps_ride() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let controller = SessionController::init(provider.clone(), services());

        provider.complete_sign_in(rider());
        let ride = controller.ride().unwrap();
        ride.set_pickup("Downtown").unwrap();

        provider.notify(SessionEvent::token_refreshed(
            rider().with_display_name("Rider"),
        ));

        let same = controller.ride().unwrap();
        assert_eq!(same.snapshot().unwrap().pickup(), "Downtown");
        assert_eq!(controller.identity().unwrap().label(), "Rider");
    }

    #[test]
    fn test_different_user_gets_fresh_ride() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let controller = SessionController::init(provider.clone(), services());

        provider.complete_sign_in(rider());
        controller.ride().unwrap().set_pickup("Downtown").unwrap();

        provider.complete_sign_in(Identity::new("user-2"));
        assert_eq!(controller.ride().unwrap().snapshot().unwrap().pickup(), "");
    }

    #[test]
    fn test_teardown_unsubscribes_once() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let controller = SessionController::init(provider.clone(), services());
        assert_eq!(provider.subscriber_count(), 1);

        controller.teardown();
        controller.teardown();
        assert_eq!(provider.subscriber_count(), 0);
        assert!(!controller.is_active());

        // Deliveries after teardown have nowhere to go.
        provider.complete_sign_in(rider());
        assert!(!controller.is_signed_in());
        assert_eq!(controller.state(), SessionState::SignedOut);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        drop(SessionController::init(provider.clone(), services()));
        assert_eq!(provider.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_teardown_signs_out_locally() {
        let provider = Arc::new(InMemoryIdentityProvider::with_session(rider()));
        let controller = SessionController::init(provider.clone(), services());
        controller.restore_session().await.unwrap();
        let ride = controller.ride().unwrap();

        controller.teardown();

        assert_eq!(controller.state(), SessionState::SignedOut);
        assert!(controller.ride().is_none());
        assert!(ride.is_retired());
        // The provider session survives a local teardown.
        assert_eq!(provider.current_session().await.unwrap(), Some(rider()));
    }

    #[test]
    fn test_switching_user_retires_previous_ride() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let controller = SessionController::init(provider.clone(), services());

        provider.complete_sign_in(rider());
        let first = controller.ride().unwrap();
        provider.complete_sign_in(Identity::new("user-2"));

        assert!(first.is_retired());
        assert!(matches!(
            first.set_pickup("Downtown"),
            Err(RideRequestError::SessionEnded)
        ));
        assert!(!controller.ride().unwrap().is_retired());
    }
}
