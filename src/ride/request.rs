//! The ride request aggregate and its transition rules.

use std::collections::HashSet;
use std::fmt;

use super::{ConfirmationReceipt, RideOption, RideOptionId, RideState};
use crate::error::{ProviderError, RideRequestError};
use crate::Result;

/// Staleness counter stamped on every provider call.
///
/// Bumped on every reset and every started search. A provider result is
/// applied only if the generation it was stamped with is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    /// The generation following this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// How a settled provider call affected the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The result was applied to the request.
    Applied,
    /// The request was reset or re-searched in the meantime; the result was
    /// discarded.
    Superseded,
}

/// Inputs captured when a search starts.
#[derive(Debug, Clone)]
pub(crate) struct SearchTicket {
    pub pickup: String,
    pub destination: String,
    pub generation: Generation,
}

/// Inputs captured when a confirmation starts.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConfirmTicket {
    pub option_id: RideOptionId,
    pub generation: Generation,
}

/// A single ride request.
///
/// Values handed out by the machine are snapshots; all mutation goes through
/// [`RideRequestMachine`](super::RideRequestMachine).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RideRequest {
    pickup: String,
    destination: String,
    options: Vec<RideOption>,
    selected: Option<RideOptionId>,
    state: RideState,
    receipt: Option<ConfirmationReceipt>,
    generation: Generation,
}

impl RideRequest {
    /// Create a fresh idle request.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pickup(&self) -> &str {
        &self.pickup
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Options in provider response order.
    pub fn options(&self) -> &[RideOption] {
        &self.options
    }

    /// The selected option, resolved against the current options.
    pub fn selected(&self) -> Option<&RideOption> {
        let id = self.selected?;
        self.options.iter().find(|option| option.id == id)
    }

    pub fn selected_id(&self) -> Option<RideOptionId> {
        self.selected
    }

    pub fn state(&self) -> RideState {
        self.state
    }

    /// Receipt of the confirmed ride.
    pub fn receipt(&self) -> Option<&ConfirmationReceipt> {
        self.receipt.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Check the structural invariants of the request.
    ///
    /// - a selection exists only in selected/confirming/confirmed and always
    ///   refers to an element of `options`
    /// - options are empty while idle or searching
    /// - a receipt exists only once confirmed
    pub fn invariants_hold(&self) -> bool {
        let selection_ok = match self.selected {
            Some(id) => {
                self.state.has_selection() && self.options.iter().any(|o| o.id == id)
            }
            None => !self.state.has_selection(),
        };
        let options_ok = match self.state {
            RideState::Idle | RideState::Searching => self.options.is_empty(),
            _ => true,
        };
        let receipt_ok = self.receipt.is_some() == (self.state == RideState::Confirmed);

        selection_ok && options_ok && receipt_ok
    }

    pub(crate) fn set_pickup(&mut self, text: impl Into<String>) -> Result<()> {
        self.require_input("set pickup")?;
        self.pickup = text.into();
        Ok(())
    }

    pub(crate) fn set_destination(&mut self, text: impl Into<String>) -> Result<()> {
        self.require_input("set destination")?;
        self.destination = text.into();
        Ok(())
    }

    /// Start a search: clear previous results, enter `Searching` and bump the
    /// generation.
    pub(crate) fn begin_search(&mut self) -> Result<SearchTicket> {
        self.require_transition(RideState::Searching, "search")?;

        if self.pickup.trim().is_empty() {
            return Err(RideRequestError::Validation(
                "pickup location is required".into(),
            ));
        }
        if self.destination.trim().is_empty() {
            return Err(RideRequestError::Validation(
                "destination is required".into(),
            ));
        }

        self.options.clear();
        self.selected = None;
        self.state = RideState::Searching;
        self.generation = self.generation.next();

        Ok(SearchTicket {
            pickup: self.pickup.clone(),
            destination: self.destination.clone(),
            generation: self.generation,
        })
    }

    /// Apply the settled result of a search stamped with `generation`.
    pub(crate) fn complete_search(
        &mut self,
        generation: Generation,
        result: std::result::Result<Vec<RideOption>, ProviderError>,
    ) -> Result<Outcome> {
        if self.is_stale(generation, RideState::Searching) {
            return Ok(Outcome::Superseded);
        }

        let options = match result.and_then(ensure_unique_ids) {
            Ok(options) => options,
            Err(err) => {
                self.state = RideState::Idle;
                return Err(err.into());
            }
        };

        self.options = options;
        self.state = RideState::OptionsAvailable;
        Ok(Outcome::Applied)
    }

    /// Select (or re-select) one of the current options.
    pub(crate) fn select(&mut self, id: RideOptionId) -> Result<()> {
        // Confirming -> Selected is a rollback, not a selection.
        if !matches!(
            self.state,
            RideState::OptionsAvailable | RideState::Selected
        ) {
            return Err(RideRequestError::InvalidState {
                operation: "select",
                state: self.state,
            });
        }

        if !self.options.iter().any(|option| option.id == id) {
            return Err(RideRequestError::NotFound(id));
        }

        self.selected = Some(id);
        self.state = RideState::Selected;
        Ok(())
    }

    /// Start confirming the current selection.
    pub(crate) fn begin_confirm(&mut self) -> Result<ConfirmTicket> {
        self.require_transition(RideState::Confirming, "confirm")?;

        let option_id = self.selected.ok_or(RideRequestError::InvalidState {
            operation: "confirm",
            state: self.state,
        })?;

        self.state = RideState::Confirming;
        Ok(ConfirmTicket {
            option_id,
            generation: self.generation,
        })
    }

    /// Apply the settled result of a confirmation stamped with `generation`.
    pub(crate) fn complete_confirm(
        &mut self,
        generation: Generation,
        result: std::result::Result<ConfirmationReceipt, ProviderError>,
    ) -> Result<Outcome> {
        if self.is_stale(generation, RideState::Confirming) {
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(receipt) => {
                self.receipt = Some(receipt);
                self.state = RideState::Confirmed;
                Ok(Outcome::Applied)
            }
            Err(err) => {
                self.state = RideState::Selected;
                Err(err.into())
            }
        }
    }

    /// Replace this request with a fresh idle one in a new generation.
    pub(crate) fn reset(&mut self) {
        *self = Self {
            generation: self.generation.next(),
            ..Self::default()
        };
    }

    fn is_stale(&self, generation: Generation, expected: RideState) -> bool {
        generation != self.generation || self.state != expected
    }

    fn require_input(&self, operation: &'static str) -> Result<()> {
        if self.state.accepts_input() {
            Ok(())
        } else {
            Err(RideRequestError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn require_transition(&self, target: RideState, operation: &'static str) -> Result<()> {
        if self.state.can_transition_to(target) {
            Ok(())
        } else {
            Err(RideRequestError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

fn ensure_unique_ids(
    options: Vec<RideOption>,
) -> std::result::Result<Vec<RideOption>, ProviderError> {
    let mut seen = HashSet::with_capacity(options.len());
    match options.iter().find(|option| !seen.insert(option.id)) {
        Some(duplicate) => Err(ProviderError::new(format!(
            "duplicate ride option id {} in provider response",
            duplicate.id
        ))),
        None => Ok(options),
    }
}
