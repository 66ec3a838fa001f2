//! Error types for probing and tracing.

use std::io;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors scoped to a single hop. None of these stop the sweep.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to encode echo request: {0}")]
    Encoding(String),

    #[error("failed to {action} raw ICMP socket: {source}")]
    Transport {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to send probe: {0}")]
    Send(#[source] io::Error),

    #[error("short write: sent {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("failed to receive reply: {0}")]
    Receive(#[source] io::Error),

    #[error("malformed reply: {0}")]
    Parse(String),

    #[error("unexpected ICMP type {icmp_type} (code {code}) from {responder}")]
    UnexpectedType {
        icmp_type: u8,
        code: u8,
        responder: IpAddr,
    },
}

impl ProbeError {
    /// Maps a receive error, folding the would-block/timed-out kinds into `Timeout`.
    pub fn from_recv(err: io::Error, waited: Duration) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ProbeError::Timeout(waited),
            _ => ProbeError::Receive(err),
        }
    }
}

/// Errors that abort a whole trace.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to resolve {host}: {reason}")]
    Resolution { host: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recv_timeout_mapping() {
        let wait = Duration::from_secs(4);
        let err = ProbeError::from_recv(io::Error::from(io::ErrorKind::WouldBlock), wait);
        assert!(matches!(err, ProbeError::Timeout(d) if d == wait));

        let err = ProbeError::from_recv(io::Error::from(io::ErrorKind::TimedOut), wait);
        assert!(matches!(err, ProbeError::Timeout(_)));

        let err = ProbeError::from_recv(io::Error::from(io::ErrorKind::PermissionDenied), wait);
        assert!(matches!(err, ProbeError::Receive(_)));
    }

    #[test]
    fn test_unexpected_type_message() {
        let err = ProbeError::UnexpectedType {
            icmp_type: 3,
            code: 1,
            responder: "10.0.0.1".parse().unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected ICMP type 3 (code 1) from 10.0.0.1"
        );
    }
}
