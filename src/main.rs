use anyhow::{Context, Result};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use icmp_tracer::config::{
    DEFAULT_ATTEMPTS, DEFAULT_MAX_TTL, DEFAULT_MAX_WAIT, DEFAULT_PAYLOAD_SIZE,
};
use icmp_tracer::report::summary_table;
use icmp_tracer::{
    NameService, NumericNameService, RawIcmpTransport, SystemNameService, TraceConfig,
    TraceError, TraceOutcome, Tracer,
};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Trace the route to a host with ICMP Echo probes."
)]
struct CliArgs {
    /// Target hostname or IPv4 address
    target: String,

    /// Maximum number of hops (TTL)
    #[clap(short, long, default_value_t = DEFAULT_MAX_TTL)]
    max_hops: u8,

    /// Probes sent per hop
    #[clap(short, long, default_value_t = DEFAULT_ATTEMPTS)]
    queries: u32,

    /// Seconds to wait for each reply
    #[clap(short, long, default_value_t = DEFAULT_MAX_WAIT.as_secs())]
    wait: u64,

    /// Echo payload size in bytes
    #[clap(short = 's', long, default_value_t = DEFAULT_PAYLOAD_SIZE)]
    packet_size: usize,

    /// Do not resolve responder addresses to hostnames
    #[clap(short = 'n', long)]
    numeric: bool,

    /// Print a table of all hops after the trace
    #[clap(long)]
    summary: bool,

    /// Enable debug logging
    #[clap(short, long)]
    verbose: bool,
}

impl CliArgs {
    fn to_config(&self) -> TraceConfig {
        TraceConfig {
            attempts: self.queries,
            max_ttl: self.max_hops,
            max_wait: Duration::from_secs(self.wait),
            payload_size: self.packet_size,
        }
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }

    let result = if args.numeric {
        run(&args, NumericNameService, cancel)
    } else {
        run(&args, SystemNameService, cancel)
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<TraceError>() {
                Some(TraceError::Resolution { .. }) => {
                    println!("Invalid address {}", args.target);
                    tracing::debug!(error = %e, "resolution failed");
                }
                _ => eprintln!("Error tracing {}: {:?}", args.target, e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run<N: NameService>(
    args: &CliArgs,
    names: N,
    cancel: Arc<AtomicBool>,
) -> Result<TraceOutcome> {
    let config = args.to_config();

    let transport = RawIcmpTransport::new(config.max_wait);
    let tracer = Tracer::new(config, transport, names).with_cancel(cancel);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = tracer.trace(&args.target, &mut out)?;

    if args.summary {
        writeln!(out, "{}", summary_table(&outcome)).context("Failed to print summary table")?;
    }
    out.flush().context("Failed to flush output")?;
    Ok(outcome)
}
