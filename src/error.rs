//! Error types for probing and path discovery.

use thiserror::Error;

/// Errors that can occur while probing or running a discovery loop.
///
/// A receive timeout is deliberately *not* represented here: it is a
/// first-class [`ProbeOutcome`](crate::probe::ProbeOutcome) that tells
/// the caller to retry the same TTL.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Raw or stream socket creation failed (usually a privilege issue)
    #[error("Failed to create socket: {0}")]
    Socket(String),

    /// Hostname could not be resolved to an address of the requested family
    #[error("Failed to resolve host: {0}")]
    Resolution(String),

    /// Setting the TTL / hop-limit socket option failed
    #[error("Failed to set hop limit: {0}")]
    SocketOption(String),

    /// Transmitting a probe failed
    #[error("Failed to send probe: {0}")]
    Send(String),

    /// Reading a response failed (timeouts excluded)
    #[error("Failed to receive response: {0}")]
    Receive(String),

    /// Inbound datagram is too short to carry an IP header plus ICMP header
    #[error("Received invalid packet ({len} bytes)")]
    MalformedPacket {
        /// Length of the undersized datagram
        len: usize,
    },

    /// A probe was used before its peer address was resolved
    #[error("Peer address not resolved")]
    NotResolved,

    /// IPv6 response classification is not supported
    #[error("IPv6 response classification is not supported")]
    Ipv6NotSupported,

    /// The configured per-TTL retry cap was exhausted
    #[error("Gave up after repeated timeouts at TTL {ttl}")]
    RetriesExhausted {
        /// TTL at which probing stalled
        ttl: u8,
    },

    /// The destination did not respond within the maximum TTL of 255
    #[error("Destination not reached within 255 hops")]
    TtlExhausted,

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    Config(String),
}
