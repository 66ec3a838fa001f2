//! Raw ICMP probe exchange.

use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, trace};

use crate::error::ProbeError;
use crate::packet::{self, ProbeOutcome};

const RECV_BUFFER_SIZE: usize = 1500;

/// Sends probes for one hop limit and collects what comes back.
pub trait Transport {
    /// Runs `attempts` sequential send/receive rounds with the given hop limit.
    ///
    /// Returns one outcome per attempt, in order. `Err` only when the socket
    /// itself cannot be created or configured. Replies are not matched to
    /// requests, so an attempt may read a reply to an earlier attempt.
    fn exchange(
        &self,
        destination: Ipv4Addr,
        probe: &[u8],
        hop_limit: u8,
        attempts: u32,
    ) -> Result<Vec<ProbeOutcome>, ProbeError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn exchange(
        &self,
        destination: Ipv4Addr,
        probe: &[u8],
        hop_limit: u8,
        attempts: u32,
    ) -> Result<Vec<ProbeOutcome>, ProbeError> {
        (**self).exchange(destination, probe, hop_limit, attempts)
    }
}

/// `Transport` over a raw IPv4 ICMP socket. Needs elevated privileges.
#[derive(Debug, Clone)]
pub struct RawIcmpTransport {
    max_wait: Duration,
}

impl RawIcmpTransport {
    pub fn new(max_wait: Duration) -> Self {
        Self { max_wait }
    }

    fn open(&self, hop_limit: u8) -> Result<Socket, ProbeError> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)).map_err(
            |source| ProbeError::Transport {
                action: "create",
                source,
            },
        )?;
        socket
            .set_ttl(u32::from(hop_limit))
            .map_err(|source| ProbeError::Transport {
                action: "set TTL on",
                source,
            })?;
        Ok(socket)
    }

    fn attempt(&self, socket: &Socket, destination: &SockAddr, probe: &[u8]) -> ProbeOutcome {
        // Fresh deadline per attempt.
        if let Err(source) = socket.set_read_timeout(Some(self.max_wait)) {
            return ProbeOutcome::Error(ProbeError::Transport {
                action: "set read timeout on",
                source,
            });
        }

        let start = Instant::now();
        match socket.send_to(probe, destination) {
            Ok(written) if written == probe.len() => {}
            Ok(written) => {
                return ProbeOutcome::Error(ProbeError::ShortWrite {
                    written,
                    expected: probe.len(),
                });
            }
            Err(e) => return ProbeOutcome::Error(ProbeError::Send(e)),
        }

        let mut recv_buf = [MaybeUninit::<u8>::uninit(); RECV_BUFFER_SIZE];
        let (bytes_read, from) = match socket.recv_from(&mut recv_buf) {
            Ok(received) => received,
            Err(e) => return ProbeOutcome::Error(ProbeError::from_recv(e, self.max_wait)),
        };
        let rtt = start.elapsed();

        let responder = match from.as_socket() {
            Some(addr) => addr.ip(),
            None => {
                return ProbeOutcome::Error(ProbeError::Parse(
                    "reply sender is not an IP address".into(),
                ));
            }
        };

        // SAFETY: recv_from initialised the first `bytes_read` bytes.
        let datagram: &[u8] =
            unsafe { std::slice::from_raw_parts(recv_buf.as_ptr() as *const u8, bytes_read) };
        trace!(bytes = bytes_read, from = %responder, "received datagram");

        packet::classify(datagram, rtt, responder)
    }
}

impl Transport for RawIcmpTransport {
    fn exchange(
        &self,
        destination: Ipv4Addr,
        probe: &[u8],
        hop_limit: u8,
        attempts: u32,
    ) -> Result<Vec<ProbeOutcome>, ProbeError> {
        // Dropped, and so closed, on every return path.
        let socket = self.open(hop_limit)?;
        let destination = SockAddr::from(SocketAddr::new(IpAddr::V4(destination), 0));

        let outcomes = (0..attempts)
            .map(|attempt| {
                let outcome = self.attempt(&socket, &destination, probe);
                debug!(ttl = hop_limit, attempt, outcome = ?outcome, "probe attempt");
                outcome
            })
            .collect();
        Ok(outcomes)
    }
}
