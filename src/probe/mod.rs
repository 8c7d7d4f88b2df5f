//! Probe primitives shared by the ICMP and TCP strategies.

use crate::error::TraceError;
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Socket};
use std::fmt;
use std::net::{IpAddr, ToSocketAddrs};
use std::time::Duration;

pub mod icmp;
pub mod tcp;

/// Address family a probe session operates in.
///
/// The family is selected once at probe construction and carries every
/// family-specific capability: socket domain, ICMP protocol number,
/// echo message type, checksum responsibility and the hop-limit socket
/// option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressFamily {
    /// IPv4 addressing
    V4,
    /// IPv6 addressing (send path only; response classification is
    /// not supported for this family)
    V6,
}

impl AddressFamily {
    /// Socket domain for this family.
    pub(crate) fn domain(self) -> Domain {
        match self {
            AddressFamily::V4 => Domain::IPV4,
            AddressFamily::V6 => Domain::IPV6,
        }
    }

    /// Raw-socket protocol carrying ICMP for this family.
    pub(crate) fn icmp_protocol(self) -> Protocol {
        match self {
            AddressFamily::V4 => Protocol::ICMPV4,
            AddressFamily::V6 => Protocol::ICMPV6,
        }
    }

    /// ICMP echo-request message type (8 for IPv4, 128 for IPv6).
    #[must_use]
    pub fn echo_type(self) -> u8 {
        match self {
            AddressFamily::V4 => 8,
            AddressFamily::V6 => 128,
        }
    }

    /// Whether the sender must embed the ICMP checksum itself.
    ///
    /// For ICMPv6 the kernel computes the checksum over the
    /// pseudo-header, so the field is left zero on send.
    #[must_use]
    pub fn computes_checksum(self) -> bool {
        matches!(self, AddressFamily::V4)
    }

    /// Set the per-packet hop limit on `socket` (IP_TTL or
    /// IPV6_UNICAST_HOPS).
    pub(crate) fn set_hop_limit(self, socket: &Socket, ttl: u8) -> std::io::Result<()> {
        match self {
            AddressFamily::V4 => socket.set_ttl_v4(u32::from(ttl)),
            AddressFamily::V6 => socket.set_unicast_hops_v6(u32::from(ttl)),
        }
    }

    /// Whether `ip` belongs to this family.
    #[must_use]
    pub fn matches(self, ip: IpAddr) -> bool {
        match self {
            AddressFamily::V4 => ip.is_ipv4(),
            AddressFamily::V6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Classified outcome of one receive attempt.
///
/// Produced per probe, consumed immediately by the discovery loop and
/// never persisted. `Timeout` is an outcome, not an error: the caller
/// retries the same TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A router along the path answered with ICMP Time Exceeded
    IntermediateHop(IpAddr),
    /// The destination itself answered
    DestinationReached,
    /// Nothing arrived within the receive timeout
    Timeout,
}

/// How the destination was confirmed reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReachedVia {
    /// An ICMP reply from the destination
    Reply,
    /// A TCP connection was established
    Connected,
    /// The destination's TCP stack actively refused the connection,
    /// which only happens once the SYN arrived at the final host
    ConnectionRefused,
}

/// Result of issuing one probe at a given TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeDisposition {
    /// Probe is in flight; classify it via a receive step
    AwaitReply,
    /// The attempt itself proved the destination was reached
    /// (TCP connect succeeded or was refused by the target)
    Reached(ReachedVia),
}

/// A probing strategy the discovery loop can drive.
///
/// Implemented by [`icmp::IcmpProbe`] and [`tcp::TcpProbe`]; the
/// engine tests substitute a scripted mock behind this seam.
pub trait Prober {
    /// Issue one probe with the given hop limit.
    fn probe(&mut self, ttl: u8) -> Result<ProbeDisposition, TraceError>;

    /// Wait up to `timeout` for a response and classify it.
    fn recv_outcome(&mut self, timeout: Duration) -> Result<ProbeOutcome, TraceError>;
}

/// Resolve `host` to an address of the requested family.
///
/// Literal addresses short-circuit; everything else is delegated to
/// the system resolver (getaddrinfo) and the first address of the
/// matching family wins.
pub fn resolve_host(host: &str, family: AddressFamily) -> Result<IpAddr, TraceError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        if family.matches(ip) {
            return Ok(ip);
        }
        return Err(TraceError::Resolution(format!(
            "{host} is not an {family} address"
        )));
    }

    let addrs = (host, 0u16)
        .to_socket_addrs()
        .map_err(|e| TraceError::Resolution(format!("{host}: {e}")))?;

    addrs
        .map(|addr| addr.ip())
        .find(|ip| family.matches(*ip))
        .ok_or_else(|| TraceError::Resolution(format!("no {family} address found for {host}")))
}
