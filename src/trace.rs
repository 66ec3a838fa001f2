//! Hop-limit sweep.

use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::config::TraceConfig;
use crate::error::TraceError;
use crate::hop::{HopProber, HopResult};
use crate::packet;
use crate::presenter::{AddressPresenter, NameService};
use crate::report;
use crate::transport::Transport;

/// Sweep progress. `Sweeping` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Sweeping(u8),
    Reached,
    Exhausted,
    Cancelled,
}

impl SweepState {
    /// Next state after probing hop `hop_limit`.
    fn advance(hop_limit: u8, reached: bool, max_ttl: u8) -> Self {
        if reached {
            SweepState::Reached
        } else if hop_limit >= max_ttl {
            SweepState::Exhausted
        } else {
            SweepState::Sweeping(hop_limit + 1)
        }
    }
}

/// A hop result together with its presented responder summary.
#[derive(Debug)]
pub struct HopRecord {
    pub result: HopResult,
    pub presented: String,
}

/// Everything a finished trace produced.
#[derive(Debug)]
pub struct TraceOutcome {
    pub destination: Ipv4Addr,
    pub hops: Vec<HopRecord>,
    pub state: SweepState,
}

pub struct Tracer<T, N> {
    config: TraceConfig,
    transport: T,
    presenter: AddressPresenter<N>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<T: Transport, N: NameService> Tracer<T, N> {
    pub fn new(config: TraceConfig, transport: T, names: N) -> Self {
        Self {
            config,
            transport,
            presenter: AddressPresenter::new(names),
            cancel: None,
        }
    }

    /// Stops the sweep before the next hop once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// IPv4 literal, or the first IPv4 address the name service returns.
    pub fn resolve_destination(&self, host: &str) -> Result<Ipv4Addr, TraceError> {
        if let Ok(addr) = host.parse::<Ipv4Addr>() {
            return Ok(addr);
        }
        let addrs = self
            .presenter
            .names()
            .lookup_host(host)
            .map_err(|e| TraceError::Resolution {
                host: host.to_string(),
                reason: e.to_string(),
            })?;
        addrs
            .into_iter()
            .find_map(|addr| match addr {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .ok_or_else(|| TraceError::Resolution {
                host: host.to_string(),
                reason: "no IPv4 address".into(),
            })
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Traces the route to `host`, writing one line per hop to `out`.
    pub fn trace<W: Write>(&self, host: &str, out: &mut W) -> Result<TraceOutcome, TraceError> {
        self.config.validate()?;
        let destination = self.resolve_destination(host)?;
        let probe = packet::build_echo_request(self.config.payload_size)?;
        let prober = HopProber::new(&self.transport, probe, self.config.attempts);

        info!(%host, %destination, max_ttl = self.config.max_ttl, "starting trace");
        writeln!(
            out,
            "Tracing route to {} ({}) with MaxTTL = {}",
            host, destination, self.config.max_ttl
        )?;

        let mut hops = Vec::new();
        let mut state = SweepState::Sweeping(1);
        while let SweepState::Sweeping(hop_limit) = state {
            if self.cancelled() {
                state = SweepState::Cancelled;
                break;
            }

            let result = prober.probe_hop(destination, hop_limit);
            let presented = self.presenter.present(&result.responders);
            let record = HopRecord { result, presented };
            writeln!(out, "{}", report::hop_line(&record))?;

            state = SweepState::advance(
                hop_limit,
                record.result.verdict.is_reached(),
                self.config.max_ttl,
            );
            hops.push(record);
        }

        debug!(?state, hops = hops.len(), "trace finished");
        match state {
            SweepState::Reached => writeln!(out, "Ended trace: reached {destination}")?,
            SweepState::Cancelled => writeln!(out, "Ended trace: cancelled")?,
            _ => writeln!(
                out,
                "Ended trace: {destination} not reached within {} hops",
                self.config.max_ttl
            )?,
        }

        Ok(TraceOutcome {
            destination,
            hops,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        assert_eq!(SweepState::advance(1, false, 64), SweepState::Sweeping(2));
        assert_eq!(SweepState::advance(5, true, 64), SweepState::Reached);
        assert_eq!(SweepState::advance(64, false, 64), SweepState::Exhausted);
        assert_eq!(SweepState::advance(64, true, 64), SweepState::Reached);
        assert_eq!(SweepState::advance(255, false, 255), SweepState::Exhausted);
    }
}
