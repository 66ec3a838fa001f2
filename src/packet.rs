//! Echo Request construction and reply classification.

use std::net::IpAddr;
use std::time::Duration;

use pnet::packet::Packet;
use pnet::packet::icmp::echo_request::{self as icmp_echo_request, MutableEchoRequestPacket};
use pnet::packet::icmp::{IcmpPacket, IcmpTypes, checksum};
use pnet::packet::ipv4::Ipv4Packet;

use crate::error::ProbeError;

pub const ICMP_HEADER_SIZE: usize = 8;
const IPV4_HEADER_SIZE: usize = 20;
/// Largest echo payload that still fits in one IPv4 datagram.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize - IPV4_HEADER_SIZE - ICMP_HEADER_SIZE;

const FILLER: &[u8; 4] = b"DATA";
const SEQUENCE: u16 = 1;

/// ICMP identifier for this process.
pub fn identifier() -> u16 {
    (std::process::id() & 0xFFFF) as u16
}

/// `size` bytes of the repeating filler, last repetition truncated.
pub fn echo_payload(size: usize) -> Vec<u8> {
    FILLER.iter().copied().cycle().take(size).collect()
}

/// Builds the wire bytes of an Echo Request carrying `payload_size` bytes of filler.
pub fn build_echo_request(payload_size: usize) -> Result<Vec<u8>, ProbeError> {
    if payload_size > MAX_PAYLOAD_SIZE {
        return Err(ProbeError::Encoding(format!(
            "payload of {payload_size} bytes does not fit in an IPv4 datagram"
        )));
    }

    let mut buf = vec![0u8; ICMP_HEADER_SIZE + payload_size];
    let mut echo = MutableEchoRequestPacket::new(&mut buf)
        .ok_or_else(|| ProbeError::Encoding("buffer too small for echo header".into()))?;
    echo.set_icmp_type(IcmpTypes::EchoRequest);
    echo.set_icmp_code(icmp_echo_request::IcmpCodes::NoCode);
    echo.set_identifier(identifier());
    echo.set_sequence_number(SEQUENCE);
    echo.set_payload(&echo_payload(payload_size));

    let cksum = IcmpPacket::new(echo.packet())
        .map(|icmp| checksum(&icmp))
        .ok_or_else(|| ProbeError::Encoding("failed to view echo as ICMP".into()))?;
    echo.set_checksum(cksum);

    Ok(buf)
}

/// Round-trip time and sender of one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub rtt: Duration,
    pub responder: IpAddr,
}

/// Result of one probe attempt.
#[derive(Debug)]
pub enum ProbeOutcome {
    EchoReply(Reply),
    TimeExceeded(Reply),
    Error(ProbeError),
}

impl ProbeOutcome {
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            ProbeOutcome::EchoReply(reply) | ProbeOutcome::TimeExceeded(reply) => Some(reply),
            ProbeOutcome::Error(_) => None,
        }
    }
}

/// Reads the ICMP type and code out of a raw-socket datagram (IPv4 header included).
pub fn parse_reply(datagram: &[u8]) -> Result<(u8, u8), ProbeError> {
    let ipv4 = Ipv4Packet::new(datagram).ok_or_else(|| {
        ProbeError::Parse(format!("{} bytes is too short for IPv4", datagram.len()))
    })?;
    if ipv4.get_version() != 4 {
        return Err(ProbeError::Parse(format!(
            "IP version {} is not 4",
            ipv4.get_version()
        )));
    }
    let header_len = ipv4.get_header_length() as usize * 4;
    if header_len < IPV4_HEADER_SIZE {
        return Err(ProbeError::Parse(format!(
            "IPv4 header length {header_len} is invalid"
        )));
    }
    let icmp = datagram
        .get(header_len..)
        .and_then(IcmpPacket::new)
        .ok_or_else(|| ProbeError::Parse("truncated ICMP header".into()))?;
    Ok((icmp.get_icmp_type().0, icmp.get_icmp_code().0))
}

/// Classifies a received datagram into a probe outcome.
pub fn classify(datagram: &[u8], rtt: Duration, responder: IpAddr) -> ProbeOutcome {
    let (icmp_type, code) = match parse_reply(datagram) {
        Ok(header) => header,
        Err(e) => return ProbeOutcome::Error(e),
    };
    let reply = Reply { rtt, responder };
    if icmp_type == IcmpTypes::EchoReply.0 {
        ProbeOutcome::EchoReply(reply)
    } else if icmp_type == IcmpTypes::TimeExceeded.0 {
        ProbeOutcome::TimeExceeded(reply)
    } else {
        ProbeOutcome::Error(ProbeError::UnexpectedType {
            icmp_type,
            code,
            responder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::packet::icmp::echo_request::EchoRequestPacket;

    fn ipv4_datagram(icmp_type: u8, code: u8) -> Vec<u8> {
        let total_len = IPV4_HEADER_SIZE + ICMP_HEADER_SIZE;
        let mut datagram = vec![0u8; total_len];
        datagram[0] = 0x45;
        datagram[2..4].copy_from_slice(&(total_len as u16).to_be_bytes());
        datagram[8] = 64;
        datagram[9] = 1;
        datagram[IPV4_HEADER_SIZE] = icmp_type;
        datagram[IPV4_HEADER_SIZE + 1] = code;
        datagram
    }

    #[test]
    fn test_payload_is_exact_filler() {
        for size in [0, 1, 3, 4, 5, 8, 56, 57, 1400] {
            let payload = echo_payload(size);
            assert_eq!(payload.len(), size);
            for (i, byte) in payload.iter().enumerate() {
                assert_eq!(*byte, FILLER[i % FILLER.len()]);
            }
        }
        assert_eq!(echo_payload(6), b"DATADA");
    }

    #[test]
    fn test_build_echo_request() {
        let packet = build_echo_request(56).unwrap();
        assert_eq!(packet.len(), ICMP_HEADER_SIZE + 56);
        assert_eq!(packet[0], 8);
        assert_eq!(packet[1], 0);

        let echo = EchoRequestPacket::new(&packet).unwrap();
        assert_eq!(echo.get_identifier(), identifier());
        assert_eq!(echo.get_sequence_number(), 1);
        assert_eq!(echo.payload(), &echo_payload(56)[..]);

        let icmp = IcmpPacket::new(&packet).unwrap();
        assert_eq!(checksum(&icmp), echo.get_checksum());
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(build_echo_request(13).unwrap(), build_echo_request(13).unwrap());
        assert_eq!(build_echo_request(0).unwrap().len(), ICMP_HEADER_SIZE);
    }

    #[test]
    fn test_build_rejects_oversized_payload() {
        assert!(matches!(
            build_echo_request(MAX_PAYLOAD_SIZE + 1),
            Err(ProbeError::Encoding(_))
        ));
    }

    #[test]
    fn test_classify_replies() {
        let from: IpAddr = "192.0.2.7".parse().unwrap();
        let rtt = Duration::from_millis(12);

        match classify(&ipv4_datagram(0, 0), rtt, from) {
            ProbeOutcome::EchoReply(reply) => {
                assert_eq!(reply, Reply { rtt, responder: from })
            }
            other => panic!("expected echo reply, got {other:?}"),
        }
        assert!(matches!(
            classify(&ipv4_datagram(11, 0), rtt, from),
            ProbeOutcome::TimeExceeded(_)
        ));
        match classify(&ipv4_datagram(3, 3), rtt, from) {
            ProbeOutcome::Error(ProbeError::UnexpectedType {
                icmp_type,
                code,
                responder,
            }) => {
                assert_eq!((icmp_type, code, responder), (3, 3, from));
            }
            other => panic!("expected unexpected type, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_malformed() {
        let from: IpAddr = "192.0.2.7".parse().unwrap();
        let rtt = Duration::from_millis(1);

        let datagram = ipv4_datagram(0, 0);
        assert!(matches!(
            classify(&datagram[..10], rtt, from),
            ProbeOutcome::Error(ProbeError::Parse(_))
        ));

        assert!(matches!(
            classify(&datagram[..IPV4_HEADER_SIZE + 2], rtt, from),
            ProbeOutcome::Error(ProbeError::Parse(_))
        ));

        let mut v6 = ipv4_datagram(0, 0);
        v6[0] = 0x65;
        assert!(matches!(
            classify(&v6, rtt, from),
            ProbeOutcome::Error(ProbeError::Parse(_))
        ));
    }
}
