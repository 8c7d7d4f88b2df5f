//! hopscan - hop-distance discovery via ICMP echo and TCP connect
//! probing.
//!
//! Probes are sent with increasing TTL / hop-limit values; each
//! router that drops an expired packet answers with ICMP Time
//! Exceeded, and the TTL at which the destination itself answers is
//! its hop distance. Two independent strategies are provided:
//! [`IcmpProbe`] (echo requests) and [`TcpProbe`] (connect attempts
//! whose expired SYNs are classified through a companion ICMP
//! socket).

pub mod checksum;
pub mod error;
pub mod probe;
pub mod trace;

pub use checksum::internet_checksum;
pub use error::TraceError;
pub use probe::icmp::IcmpProbe;
pub use probe::tcp::TcpProbe;
pub use probe::{resolve_host, AddressFamily, ProbeDisposition, ProbeOutcome, Prober, ReachedVia};
pub use trace::{run_trace, Hop, TraceConfig, TraceEvent, TraceSummary};
