use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MythicLinkError;

/// Category of real-time events a subscription receives.
///
/// The set is closed: every kind maps to exactly one query shape, and
/// [`SubscriptionKind::All`] falls back to the task-output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionKind {
    /// Output lines produced by tasks.
    TaskOutput,
    /// Agent callbacks checking in.
    Callback,
    /// File transfer progress (uploads, downloads, screenshots).
    File,
    /// Operation alerts.
    Alert,
    /// Catch-all. Currently delivers task output only.
    All,
}

impl SubscriptionKind {
    /// Every kind, in declaration order.
    pub const ALL: [SubscriptionKind; 5] = [
        SubscriptionKind::TaskOutput,
        SubscriptionKind::Callback,
        SubscriptionKind::File,
        SubscriptionKind::Alert,
        SubscriptionKind::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionKind::TaskOutput => "task_output",
            SubscriptionKind::Callback => "callback",
            SubscriptionKind::File => "file",
            SubscriptionKind::Alert => "alert",
            SubscriptionKind::All => "all",
        }
    }
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown names are an error rather than a silent fallback to the
/// task-output shape. [`SubscriptionKind::All`] is the explicit catch-all.
impl FromStr for SubscriptionKind {
    type Err = MythicLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "task_output" => Ok(SubscriptionKind::TaskOutput),
            "callback" => Ok(SubscriptionKind::Callback),
            "file" => Ok(SubscriptionKind::File),
            "alert" => Ok(SubscriptionKind::Alert),
            "all" => Ok(SubscriptionKind::All),
            "" => Err(MythicLinkError::ConfigurationError(
                "subscription type cannot be empty".to_string(),
            )),
            other => Err(MythicLinkError::ConfigurationError(format!(
                "unknown subscription type '{}'",
                other
            ))),
        }
    }
}
