//! Per-phase deadlines for lifecycle handlers.

use super::{ResourceError, ResourceResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Lifecycle phase a handler runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Create => write!(f, "create"),
            Phase::Read => write!(f, "read"),
            Phase::Update => write!(f, "update"),
            Phase::Delete => write!(f, "delete"),
        }
    }
}

/// Maximum wall-clock time per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceTimeouts {
    #[serde(with = "humantime_serde")]
    pub create: Duration,
    #[serde(with = "humantime_serde")]
    pub read: Duration,
    #[serde(with = "humantime_serde")]
    pub update: Duration,
    #[serde(with = "humantime_serde")]
    pub delete: Duration,
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

impl ResourceTimeouts {
    /// The same deadline for every phase.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }

    pub fn for_phase(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Create => self.create,
            Phase::Read => self.read,
            Phase::Update => self.update,
            Phase::Delete => self.delete,
        }
    }
}

/// Run `operation` under the phase deadline and the stop token.
///
/// The operation future is dropped as soon as the deadline passes or the
/// stop token fires.
pub async fn run_with_timeout<T, F>(
    phase: Phase,
    timeouts: &ResourceTimeouts,
    stop: &CancellationToken,
    operation: F,
) -> ResourceResult<T>
where
    F: Future<Output = ResourceResult<T>>,
{
    let timeout = timeouts.for_phase(phase);

    tokio::select! {
        biased;
        _ = stop.cancelled() => Err(ResourceError::Cancelled { phase }),
        result = tokio::time::timeout(timeout, operation) => match result {
            Ok(result) => result,
            Err(_) => Err(ResourceError::Timeout { phase, timeout }),
        },
    }
}
