//! The TTL-increment discovery loop.

use crate::error::TraceError;
use crate::probe::{ProbeDisposition, ProbeOutcome, Prober, ReachedVia};
use crate::trace::{Hop, TraceConfig, TraceEvent, TraceSummary};

/// Drive `prober` through increasing TTLs until the destination
/// answers.
///
/// A timeout retries the same TTL (unbounded unless
/// [`TraceConfig::max_retries`] caps it); an intermediate hop advances
/// the TTL; any probe error aborts the run. `on_event` is called for
/// every classified step so callers can report progress in real time.
pub fn run_trace<P: Prober>(
    prober: &mut P,
    config: &TraceConfig,
    mut on_event: impl FnMut(&TraceEvent),
) -> Result<TraceSummary, TraceError> {
    config.validate()?;

    let mut hops = Vec::new();
    let mut ttl = config.first_ttl;
    let mut retries: u32 = 0;

    loop {
        match prober.probe(ttl)? {
            ProbeDisposition::Reached(via) => {
                on_event(&TraceEvent::Reached { ttl, via });
                return Ok(TraceSummary {
                    hops,
                    hop_count: ttl,
                    reached_via: via,
                });
            }
            ProbeDisposition::AwaitReply => {}
        }

        match prober.recv_outcome(config.probe_timeout)? {
            ProbeOutcome::Timeout => {
                retries += 1;
                if let Some(cap) = config.max_retries {
                    if retries > cap {
                        return Err(TraceError::RetriesExhausted { ttl });
                    }
                }
                on_event(&TraceEvent::Retry { ttl });
            }
            ProbeOutcome::IntermediateHop(router) => {
                hops.push(Hop { ttl, router });
                on_event(&TraceEvent::Hop { ttl, router });
                retries = 0;
                ttl = ttl.checked_add(1).ok_or(TraceError::TtlExhausted)?;
            }
            ProbeOutcome::DestinationReached => {
                on_event(&TraceEvent::Reached {
                    ttl,
                    via: ReachedVia::Reply,
                });
                return Ok(TraceSummary {
                    hops,
                    hop_count: ttl,
                    reached_via: ReachedVia::Reply,
                });
            }
        }
    }
}
