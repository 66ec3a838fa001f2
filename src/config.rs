use std::time::Duration;

use crate::error::TraceError;
use crate::packet::MAX_PAYLOAD_SIZE;

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_MAX_TTL: u8 = 64;
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(4);
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;

/// Immutable settings for one trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceConfig {
    /// Probes sent per hop limit.
    pub attempts: u32,
    /// Last hop limit probed before giving up.
    pub max_ttl: u8,
    /// Read deadline for each attempt.
    pub max_wait: Duration,
    /// Echo payload size in bytes (excluding the 8 byte ICMP header).
    pub payload_size: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            max_ttl: DEFAULT_MAX_TTL,
            max_wait: DEFAULT_MAX_WAIT,
            payload_size: DEFAULT_PAYLOAD_SIZE,
        }
    }
}

impl TraceConfig {
    pub fn validate(&self) -> Result<(), TraceError> {
        if self.attempts == 0 {
            return Err(TraceError::InvalidConfig(
                "attempts per hop must be at least 1".into(),
            ));
        }
        if self.max_ttl == 0 {
            return Err(TraceError::InvalidConfig(
                "max TTL must be between 1 and 255".into(),
            ));
        }
        if self.max_wait.is_zero() {
            return Err(TraceError::InvalidConfig(
                "wait time must be greater than zero".into(),
            ));
        }
        if self.payload_size > MAX_PAYLOAD_SIZE {
            return Err(TraceError::InvalidConfig(format!(
                "packet size {} exceeds {} bytes",
                self.payload_size, MAX_PAYLOAD_SIZE
            )));
        }
        Ok(())
    }
}
