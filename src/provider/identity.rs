//! Identity provider capability.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::session::Identity;

/// Kind of session change reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    /// Initial session state delivered right after subscribing.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A session change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub identity: Option<Identity>,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, identity: Option<Identity>) -> Self {
        Self { kind, identity }
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self::new(SessionEventKind::SignedIn, Some(identity))
    }

    pub fn signed_out() -> Self {
        Self::new(SessionEventKind::SignedOut, None)
    }

    pub fn token_refreshed(identity: Identity) -> Self {
        Self::new(SessionEventKind::TokenRefreshed, Some(identity))
    }
}

/// Callback invoked for every session change.
pub type SessionHandler = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Handle returned by [`IdentityProvider::subscribe`].
///
/// The unsubscribe action runs at most once: either through
/// [`Subscription::unsubscribe`] or when the handle is dropped.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    /// Wrap the provider-specific unsubscribe action.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Stop delivery. Returns `false` if already unsubscribed.
    pub fn unsubscribe(&self) -> bool {
        let cancel = match self.cancel.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match cancel {
            Some(cancel) => {
                cancel();
                true
            }
            None => false,
        }
    }

    /// Check if the subscription is still live.
    pub fn is_active(&self) -> bool {
        self.cancel
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Third-party sign-in providers offered by the sign-in flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FederatedProvider {
    Google,
    Facebook,
    Apple,
    Github,
}

impl FederatedProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            FederatedProvider::Google => "google",
            FederatedProvider::Facebook => "facebook",
            FederatedProvider::Apple => "apple",
            FederatedProvider::Github => "github",
        }
    }
}

impl fmt::Display for FederatedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FederatedProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(FederatedProvider::Google),
            "facebook" => Ok(FederatedProvider::Facebook),
            "apple" => Ok(FederatedProvider::Apple),
            "github" => Ok(FederatedProvider::Github),
            _ => Err(s.to_string()),
        }
    }
}

/// Options for the provider's sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInConfig {
    pub federated_providers: BTreeSet<FederatedProvider>,
    /// Offer an emailed one-time sign-in link.
    pub allow_passwordless_link: bool,
    /// Show only the passwordless link view.
    pub restrict_to_passwordless_view: bool,
    /// Show links to the other sign-in views.
    pub show_auxiliary_links: bool,
}

impl Default for SignInConfig {
    fn default() -> Self {
        Self {
            federated_providers: [
                FederatedProvider::Google,
                FederatedProvider::Facebook,
                FederatedProvider::Apple,
            ]
            .into_iter()
            .collect(),
            allow_passwordless_link: true,
            restrict_to_passwordless_view: true,
            show_auxiliary_links: false,
        }
    }
}

/// Authenticated-identity capability consumed by the session controller.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up an existing session. `Ok(None)` means nobody is signed in.
    async fn current_session(&self) -> Result<Option<Identity>, ProviderError>;

    /// Register a handler for out-of-band session changes.
    fn subscribe(&self, handler: SessionHandler) -> Subscription;

    /// Invalidate the current session.
    async fn invalidate_session(&self) -> Result<(), ProviderError>;

    /// Launch the sign-in flow. The outcome is reported through the
    /// subscription channel.
    async fn present_sign_in(&self, config: &SignInConfig) -> Result<(), ProviderError>;
}
