//! Serializable value types shared across scheduler components.

use std::fmt;
use std::str::FromStr;

use ::serde::{Deserialize, Serialize};

/// Job identifier, assigned when a job is built.
pub type JobId = uuid::Uuid;

/// Priority tier of a job. Ordering follows dispatch preference, so
/// `High > Normal > Low`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background work such as periodic full resyncs.
    Low,
    /// Default tier.
    #[default]
    Normal,
    /// User-initiated syncs that should take the next free slot.
    High,
}

impl Priority {
    /// All tiers in dispatch order.
    pub const DISPATCH_ORDER: [Self; 3] = [Self::High, Self::Normal, Self::Low];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority `{other}`")),
        }
    }
}

/// Kind of exchange data fetched by one step of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    /// Executed trades / fills.
    Trades,
    /// Order history.
    Orders,
    /// Deposits into the exchange account.
    Deposits,
    /// Withdrawals out of the exchange account.
    Withdrawals,
}

impl SyncType {
    /// Every sync type, in the order a full sync runs them.
    pub const ALL: [Self; 4] = [Self::Trades, Self::Orders, Self::Deposits, Self::Withdrawals];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trades => "trades",
            Self::Orders => "orders",
            Self::Deposits => "deposits",
            Self::Withdrawals => "withdrawals",
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trades" => Ok(Self::Trades),
            "orders" => Ok(Self::Orders),
            "deposits" => Ok(Self::Deposits),
            "withdrawals" => Ok(Self::Withdrawals),
            other => Err(format!("unknown sync type `{other}`")),
        }
    }
}
