//! Ride options and confirmation receipts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a ride option, unique within one options list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RideOptionId(u64);

impl RideOptionId {
    /// Create an option id from its raw value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RideOptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Service tier of a ride option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideTier {
    Economy,
    Premium,
    Luxury,
}

impl RideTier {
    /// All tiers, cheapest first.
    pub const ALL: [RideTier; 3] = [RideTier::Economy, RideTier::Premium, RideTier::Luxury];

    /// Lowercase name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            RideTier::Economy => "economy",
            RideTier::Premium => "premium",
            RideTier::Luxury => "luxury",
        }
    }
}

impl fmt::Display for RideTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RideTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RideTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

/// Returned when a tier name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTier(pub String);

impl fmt::Display for UnknownTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown ride tier: '{}'", self.0)
    }
}

impl std::error::Error for UnknownTier {}

/// Non-negative fare, stored in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fare(u64);

impl Fare {
    /// Create a fare from minor units (cents).
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Create a fare from whole currency units.
    pub const fn from_major(major: u64) -> Self {
        Self(major * 100)
    }

    /// Fare in minor units.
    pub fn minor_units(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// A ride option as returned by the options provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideOption {
    pub id: RideOptionId,
    pub tier: RideTier,
    pub fare: Fare,
}

impl RideOption {
    pub fn new(id: u64, tier: RideTier, fare: Fare) -> Self {
        Self {
            id: RideOptionId::new(id),
            tier,
            fare,
        }
    }
}

/// Proof that a ride option was confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationReceipt {
    /// The option that was confirmed.
    pub option_id: RideOptionId,
    /// Provider-issued booking reference.
    pub reference: String,
}
