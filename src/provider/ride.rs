//! Ride options and confirmation capabilities.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::ride::{ConfirmationReceipt, RideOption, RideOptionId};

/// Source of ride options for a pickup/destination pair.
#[async_trait]
pub trait RideOptionsProvider: Send + Sync {
    /// Fetch the available options, in display order.
    async fn fetch_options(
        &self,
        pickup: &str,
        destination: &str,
    ) -> Result<Vec<RideOption>, ProviderError>;
}

/// Books a previously offered ride option.
#[async_trait]
pub trait ConfirmationProvider: Send + Sync {
    /// Confirm the option with the given id.
    async fn confirm_option(
        &self,
        option_id: RideOptionId,
    ) -> Result<ConfirmationReceipt, ProviderError>;
}

/// The pair of providers a ride request machine is built from.
#[derive(Clone)]
pub struct RideServices {
    pub options: Arc<dyn RideOptionsProvider>,
    pub confirmation: Arc<dyn ConfirmationProvider>,
}

impl RideServices {
    pub fn new(
        options: Arc<dyn RideOptionsProvider>,
        confirmation: Arc<dyn ConfirmationProvider>,
    ) -> Self {
        Self {
            options,
            confirmation,
        }
    }

    /// Use one value for both capabilities.
    pub fn from_shared<P>(provider: Arc<P>) -> Self
    where
        P: RideOptionsProvider + ConfirmationProvider + 'static,
    {
        Self {
            options: provider.clone(),
            confirmation: provider,
        }
    }
}

impl std::fmt::Debug for RideServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RideServices").finish_non_exhaustive()
    }
}
