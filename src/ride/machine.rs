//! Asynchronous driver for a single ride request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Outcome, RideOptionId, RideRequest, RideState};
use crate::error::RideRequestError;
use crate::provider::RideServices;
use crate::Result;

/// Owns one [`RideRequest`] and drives it through its lifecycle.
///
/// Handles are cheap to clone and all refer to the same request. Every
/// mutation takes the request lock, applies one transition and publishes the
/// new snapshot to subscribers. The lock is never held across a provider call.
///
/// A machine is retired when the session that created it ends. Every later
/// operation on any handle fails with [`RideRequestError::SessionEnded`] and
/// provider results still in flight settle as [`Outcome::Superseded`].
#[derive(Clone)]
pub struct RideRequestMachine {
    inner: Arc<MachineInner>,
}

struct MachineInner {
    request: RwLock<RideRequest>,
    changes: watch::Sender<RideRequest>,
    services: RideServices,
    /// Only written while holding the request write lock.
    retired: AtomicBool,
}

impl RideRequestMachine {
    /// Create a machine holding a fresh idle request.
    pub fn new(services: RideServices) -> Self {
        let (changes, _) = watch::channel(RideRequest::new());
        Self {
            inner: Arc::new(MachineInner {
                request: RwLock::new(RideRequest::new()),
                changes,
                services,
                retired: AtomicBool::new(false),
            }),
        }
    }

    /// Get an immutable copy of the current request.
    pub fn snapshot(&self) -> Result<RideRequest> {
        let request = self
            .inner
            .request
            .read()
            .map_err(|_| RideRequestError::LockPoisoned)?;
        Ok(request.clone())
    }

    /// Get the current state.
    pub fn state(&self) -> RideState {
        self.inner.changes.borrow().state()
    }

    /// Check if the owning session has ended.
    pub fn is_retired(&self) -> bool {
        self.inner.retired.load(Ordering::SeqCst)
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<RideRequest> {
        self.inner.changes.subscribe()
    }

    /// Set the pickup location. Only allowed while idle.
    pub fn set_pickup(&self, text: impl Into<String>) -> Result<()> {
        self.mutate(|request| request.set_pickup(text))
    }

    /// Set the destination. Only allowed while idle.
    pub fn set_destination(&self, text: impl Into<String>) -> Result<()> {
        self.mutate(|request| request.set_destination(text))
    }

    /// Search for ride options.
    ///
    /// Clears any previous options and selection before the provider is
    /// called. On provider failure the request returns to idle with its
    /// locations intact.
    pub async fn search(&self) -> Result<Outcome> {
        let ticket = self.mutate(|request| request.begin_search())?;
        debug!(
            "Searching rides from '{}' to '{}' ({})",
            ticket.pickup, ticket.destination, ticket.generation
        );

        let result = self
            .inner
            .services
            .options
            .fetch_options(&ticket.pickup, &ticket.destination)
            .await;

        let settled = self.settle(|request| request.complete_search(ticket.generation, result));
        match &settled {
            Ok(Outcome::Applied) => {
                debug!("Search {} returned options", ticket.generation)
            }
            Ok(Outcome::Superseded) => {
                debug!("Discarding stale search result from {}", ticket.generation)
            }
            Err(e) => warn!("Search {} failed: {}", ticket.generation, e),
        }
        settled
    }

    /// Select one of the current options.
    pub fn select(&self, option_id: RideOptionId) -> Result<()> {
        self.mutate(|request| request.select(option_id))?;
        debug!("Selected ride option {}", option_id);
        Ok(())
    }

    /// Confirm the selected option.
    ///
    /// On provider failure the request returns to selected with the same
    /// selection so the call can be retried.
    pub async fn confirm(&self) -> Result<Outcome> {
        let ticket = self.mutate(|request| request.begin_confirm())?;
        debug!(
            "Confirming ride option {} ({})",
            ticket.option_id, ticket.generation
        );

        let result = self
            .inner
            .services
            .confirmation
            .confirm_option(ticket.option_id)
            .await;

        let settled = self.settle(|request| request.complete_confirm(ticket.generation, result));
        match &settled {
            Ok(Outcome::Applied) => info!("Ride option {} confirmed", ticket.option_id),
            Ok(Outcome::Superseded) => {
                debug!("Discarding stale confirmation from {}", ticket.generation)
            }
            Err(e) => warn!("Confirmation of option {} failed: {}", ticket.option_id, e),
        }
        settled
    }

    /// Replace the request with a fresh idle one.
    ///
    /// Allowed from any state. Results of provider calls still in flight are
    /// discarded when they settle.
    pub fn reset(&self) -> Result<()> {
        self.mutate(|request| {
            request.reset();
            Ok(())
        })?;
        debug!("Ride request reset");
        Ok(())
    }

    /// End this ride request for good.
    ///
    /// Resets the request so nothing in flight can land, then rejects every
    /// further operation. Called by the session controller on sign-out.
    pub(crate) fn retire(&self) -> Result<()> {
        let mut request = self.write_request()?;
        if self.inner.retired.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        request.reset();
        self.publish(&request);
        debug!("Ride request retired");
        Ok(())
    }

    /// Apply one transition under the lock and publish the result.
    fn mutate<T>(&self, f: impl FnOnce(&mut RideRequest) -> Result<T>) -> Result<T> {
        self.with_request(|request, retired| {
            if retired {
                Err(RideRequestError::SessionEnded)
            } else {
                f(request)
            }
        })
    }

    /// Apply a settled provider result. A retired machine discards it.
    fn settle(&self, f: impl FnOnce(&mut RideRequest) -> Result<Outcome>) -> Result<Outcome> {
        self.with_request(|request, retired| {
            if retired {
                Ok(Outcome::Superseded)
            } else {
                f(request)
            }
        })
    }

    /// Failed transitions may still have changed the request (rollbacks), so
    /// publication compares snapshots instead of looking at the result.
    fn with_request<T>(&self, f: impl FnOnce(&mut RideRequest, bool) -> Result<T>) -> Result<T> {
        let mut request = self.write_request()?;
        let retired = self.inner.retired.load(Ordering::SeqCst);

        let result = f(&mut *request, retired);
        debug_assert!(request.invariants_hold(), "{:?}", *request);

        self.publish(&request);
        result
    }

    fn write_request(&self) -> Result<RwLockWriteGuard<'_, RideRequest>> {
        self.inner
            .request
            .write()
            .map_err(|_| RideRequestError::LockPoisoned)
    }

    fn publish(&self, request: &RideRequest) {
        self.inner.changes.send_if_modified(|published| {
            if *published == *request {
                false
            } else {
                *published = request.clone();
                true
            }
        });
    }
}

impl std::fmt::Debug for RideRequestMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RideRequestMachine")
            .field("state", &self.state())
            .field("retired", &self.is_retired())
            .finish_non_exhaustive()
    }
}
