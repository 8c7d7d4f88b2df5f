//! Path-discovery loop: configuration, events and results.

use crate::error::TraceError;
use crate::probe::ReachedVia;
use serde::Serialize;
use std::net::IpAddr;
use std::time::Duration;

pub mod engine;

pub use engine::run_trace;

/// Configuration for a discovery run.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Target TCP port for connect probing (default: 443)
    pub port: u16,
    /// Per-attempt receive timeout (default: 3 s)
    pub probe_timeout: Duration,
    /// TTL the loop starts at (default: 1)
    pub first_ttl: u8,
    /// Cap on consecutive timeout retries at one TTL; `None` retries
    /// forever, matching the classic behavior (default: None)
    pub max_retries: Option<u32>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            port: 443,
            probe_timeout: Duration::from_secs(3),
            first_ttl: 1,
            max_retries: None,
        }
    }
}

impl TraceConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), TraceError> {
        if self.first_ttl < 1 {
            return Err(TraceError::Config("first_ttl must be at least 1".into()));
        }
        if self.probe_timeout.is_zero() {
            return Err(TraceError::Config(
                "probe_timeout must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// One discovered intermediate hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hop {
    /// TTL at which the hop answered
    pub ttl: u8,
    /// Router that sent the Time Exceeded error
    pub router: IpAddr,
}

/// Result of a completed discovery run.
#[derive(Debug, Clone, Serialize)]
pub struct TraceSummary {
    /// Intermediate hops in discovery order (retried duplicates kept)
    pub hops: Vec<Hop>,
    /// Final TTL, i.e. the hop distance to the destination
    pub hop_count: u8,
    /// How the destination confirmed it was reached
    pub reached_via: ReachedVia,
}

/// Progress events emitted while the loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// An intermediate router answered; the TTL will advance
    Hop {
        /// TTL of the answering hop
        ttl: u8,
        /// The answering router
        router: IpAddr,
    },
    /// The receive timed out; the same TTL will be retried
    Retry {
        /// TTL being retried
        ttl: u8,
    },
    /// The destination was reached and the loop is done
    Reached {
        /// Final TTL (hop distance)
        ttl: u8,
        /// How the destination answered
        via: ReachedVia,
    },
}
