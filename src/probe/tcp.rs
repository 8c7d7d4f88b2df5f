//! TCP connect probing with ICMP-based hop classification.

use crate::error::TraceError;
use crate::probe::icmp::IcmpProbe;
use crate::probe::{AddressFamily, ProbeDisposition, ProbeOutcome, Prober, ReachedVia};
use socket2::{Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// A TCP connect probing session.
///
/// Each attempt opens a fresh stream socket, sets the hop limit and
/// issues a blocking connect. A refused connection counts as reaching
/// the target: only the final host's TCP stack sends a RST. When the
/// hop limit expires in transit the resulting ICMP error arrives on a
/// raw ICMP socket, so classification is delegated to an internally
/// owned [`IcmpProbe`].
pub struct TcpProbe {
    family: AddressFamily,
    peer: Option<SocketAddr>,
    icmp: IcmpProbe,
}

impl TcpProbe {
    /// Create a TCP probing session for the given family.
    ///
    /// Fails if the companion raw ICMP socket cannot be opened.
    pub fn new(family: AddressFamily) -> Result<Self, TraceError> {
        Ok(TcpProbe {
            family,
            peer: None,
            icmp: IcmpProbe::new(family)?,
        })
    }

    /// Resolve and store the peer address and target port.
    ///
    /// Local-port binding is not implemented; the kernel picks an
    /// ephemeral port per attempt.
    pub fn resolve(&mut self, host: &str, port: u16) -> Result<SocketAddr, TraceError> {
        let ip = crate::probe::resolve_host(host, self.family)?;
        let peer = SocketAddr::new(ip, port);
        self.peer = Some(peer);
        Ok(peer)
    }

    /// Intermediate routers recorded by the companion ICMP socket.
    #[must_use]
    pub fn routers(&self) -> &[IpAddr] {
        self.icmp.routers()
    }

    /// Open a fresh stream socket and attempt a connection with the
    /// given hop limit.
    pub fn attempt_connect(&mut self, ttl: u8) -> Result<ProbeDisposition, TraceError> {
        let peer = self.peer.ok_or(TraceError::NotResolved)?;

        let socket = Socket::new(self.family.domain(), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| TraceError::Socket(e.to_string()))?;
        self.family
            .set_hop_limit(&socket, ttl)
            .map_err(|e| TraceError::SocketOption(e.to_string()))?;

        // The socket is dropped (closed) on every path; when the SYN
        // expired in transit the ICMP error is read separately.
        Ok(classify_connect(socket.connect(&peer.into())))
    }
}

impl Prober for TcpProbe {
    fn probe(&mut self, ttl: u8) -> Result<ProbeDisposition, TraceError> {
        self.attempt_connect(ttl)
    }

    fn recv_outcome(&mut self, timeout: Duration) -> Result<ProbeOutcome, TraceError> {
        self.icmp.recv_outcome(timeout)
    }
}

/// Classify the result of a connect attempt.
fn classify_connect(result: io::Result<()>) -> ProbeDisposition {
    match result {
        Ok(()) => ProbeDisposition::Reached(ReachedVia::Connected),
        Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
            ProbeDisposition::Reached(ReachedVia::ConnectionRefused)
        }
        Err(_) => ProbeDisposition::AwaitReply,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_connect_reaches_target() {
        assert_eq!(
            classify_connect(Ok(())),
            ProbeDisposition::Reached(ReachedVia::Connected)
        );
    }

    #[test]
    fn refused_connect_also_reaches_target() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(
            classify_connect(Err(refused)),
            ProbeDisposition::Reached(ReachedVia::ConnectionRefused)
        );
    }

    #[test]
    fn other_connect_failures_await_icmp_classification() {
        let errors = [
            io::Error::from(io::ErrorKind::TimedOut),
            io::Error::from(io::ErrorKind::ConnectionReset),
            io::Error::other("no route to host"),
        ];
        for error in errors {
            assert_eq!(classify_connect(Err(error)), ProbeDisposition::AwaitReply);
        }
    }
}
