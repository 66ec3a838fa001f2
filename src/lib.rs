//! ICMP Echo traceroute: probe each hop limit from 1 upward until the
//! destination answers with an Echo Reply or the TTL bound runs out.

pub mod config;
pub mod error;
pub mod hop;
pub mod packet;
pub mod presenter;
pub mod report;
pub mod trace;
pub mod transport;

pub use config::TraceConfig;
pub use error::{ProbeError, TraceError};
pub use presenter::{NameService, NumericNameService, SystemNameService};
pub use trace::{SweepState, TraceOutcome, Tracer};
pub use transport::{RawIcmpTransport, Transport};
