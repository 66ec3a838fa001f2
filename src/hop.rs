//! Per-hop probing and outcome reduction.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tracing::warn;

use crate::error::ProbeError;
use crate::packet::ProbeOutcome;
use crate::transport::Transport;

/// Dominant classification of one hop.
#[derive(Debug)]
pub enum HopVerdict {
    EchoReply,
    TimeExceeded,
    Error(ProbeError),
}

impl HopVerdict {
    fn rank(&self) -> u8 {
        match self {
            HopVerdict::EchoReply => 2,
            HopVerdict::TimeExceeded => 1,
            HopVerdict::Error(_) => 0,
        }
    }

    pub fn is_reached(&self) -> bool {
        matches!(self, HopVerdict::EchoReply)
    }
}

/// Everything observed for one hop limit.
#[derive(Debug)]
pub struct HopResult {
    pub hop_limit: u8,
    pub durations: Vec<Duration>,
    pub responders: Vec<IpAddr>,
    pub verdict: HopVerdict,
}

impl HopResult {
    pub fn failed(hop_limit: u8, cause: ProbeError) -> Self {
        Self {
            hop_limit,
            durations: Vec::new(),
            responders: Vec::new(),
            verdict: HopVerdict::Error(cause),
        }
    }

    /// Folds attempt outcomes with precedence EchoReply > TimeExceeded > Error.
    ///
    /// Replies keep attempt order. With no reply at all the verdict carries the
    /// first error observed.
    pub fn reduce(hop_limit: u8, outcomes: Vec<ProbeOutcome>) -> Self {
        let mut durations = Vec::with_capacity(outcomes.len());
        let mut responders = Vec::with_capacity(outcomes.len());
        let mut verdict: Option<HopVerdict> = None;

        for outcome in outcomes {
            if let Some(reply) = outcome.reply() {
                durations.push(reply.rtt);
                responders.push(reply.responder);
            }
            let candidate = match outcome {
                ProbeOutcome::EchoReply(_) => HopVerdict::EchoReply,
                ProbeOutcome::TimeExceeded(_) => HopVerdict::TimeExceeded,
                ProbeOutcome::Error(e) => HopVerdict::Error(e),
            };
            verdict = match verdict {
                Some(current) if current.rank() >= candidate.rank() => Some(current),
                _ => Some(candidate),
            };
        }

        let verdict = verdict.unwrap_or_else(|| {
            HopVerdict::Error(ProbeError::Parse("exchange produced no attempts".into()))
        });
        Self {
            hop_limit,
            durations,
            responders,
            verdict,
        }
    }
}

/// Probes one hop limit with a fixed number of attempts.
pub struct HopProber<T> {
    transport: T,
    probe: Vec<u8>,
    attempts: u32,
}

impl<T: Transport> HopProber<T> {
    pub fn new(transport: T, probe: Vec<u8>, attempts: u32) -> Self {
        Self {
            transport,
            probe,
            attempts,
        }
    }

    pub fn probe_hop(&self, destination: Ipv4Addr, hop_limit: u8) -> HopResult {
        match self
            .transport
            .exchange(destination, &self.probe, hop_limit, self.attempts)
        {
            Ok(outcomes) => {
                let result = HopResult::reduce(hop_limit, outcomes);
                if let HopVerdict::Error(e) = &result.verdict {
                    warn!(ttl = hop_limit, error = %e, "no usable reply for hop");
                }
                result
            }
            Err(e) => {
                warn!(ttl = hop_limit, error = %e, "probe exchange failed");
                HopResult::failed(hop_limit, e)
            }
        }
    }
}
