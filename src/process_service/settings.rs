//! Process service settings
//!
//! Holds the tunables of the driver process lifecycle

use serde_with::DurationMilliSeconds;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Service Settings Struct
///
/// Timing configuration for starting and stopping the driver process.
/// Every duration is (de)serialized as a number of milliseconds.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceSettings {
    /// How long to wait for the driver to accept connections after spawning
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub start_timeout: Duration,

    /// Delay between two readiness checks during startup
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub poll_interval: Duration,

    /// How long to wait for the killed driver to be reaped
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub stop_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            start_timeout: Duration::from_millis(35_000),
            poll_interval: Duration::from_millis(500),
            stop_timeout: Duration::from_secs(60),
        }
    }
}
