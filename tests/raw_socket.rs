//! Exercises the real raw-socket transport. Needs CAP_NET_RAW, so these are
//! ignored by default: `cargo test -- --ignored` as root.

use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use icmp_tracer::hop::{HopResult, HopVerdict};
use icmp_tracer::packet::{ProbeOutcome, build_echo_request};
use icmp_tracer::transport::{RawIcmpTransport, Transport};

#[test]
#[ignore]
fn loopback_exchange_reaches_destination() {
    let transport = RawIcmpTransport::new(Duration::from_secs(2));
    let probe = build_echo_request(56).expect("echo request");

    let outcomes = transport
        .exchange(Ipv4Addr::LOCALHOST, &probe, 1, 3)
        .expect("raw socket");
    assert_eq!(outcomes.len(), 3);
    for outcome in &outcomes {
        if let Some(reply) = outcome.reply() {
            assert_eq!(reply.responder, IpAddr::V4(Ipv4Addr::LOCALHOST));
        }
    }
    // The raw socket also sees its own outgoing requests on loopback.
    assert!(
        outcomes
            .iter()
            .any(|outcome| matches!(outcome, ProbeOutcome::EchoReply(_)))
    );

    let result = HopResult::reduce(1, outcomes);
    assert!(matches!(result.verdict, HopVerdict::EchoReply));
    assert!(!result.durations.is_empty());
    assert_eq!(result.durations.len(), result.responders.len());
}

#[test]
#[ignore]
fn silent_destination_bounds_every_attempt() {
    let wait = Duration::from_millis(300);
    let transport = RawIcmpTransport::new(wait);
    let probe = build_echo_request(56).expect("echo request");
    // TEST-NET-1 is unassigned, so each attempt ends in a timeout or send error.
    let target = std::env::var("ICMP_TRACER_SILENT_TARGET")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or_else(|| Ipv4Addr::new(192, 0, 2, 1));

    let start = Instant::now();
    let outcomes = transport.exchange(target, &probe, 64, 3).expect("raw socket");
    let elapsed = start.elapsed();

    assert_eq!(outcomes.len(), 3);
    assert!(elapsed < wait * 3 + Duration::from_secs(1));
}
