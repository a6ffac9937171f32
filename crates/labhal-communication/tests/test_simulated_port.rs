//! Request/reply behaviour of CommunicationPort over a simulated link

use labhal_communication::{CommandPattern, CommunicationPort, SimulatedLink, SimulatedPort};
use labhal_core::TransportError;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn open(link: SimulatedLink) -> SimulatedPort {
    let port = CommunicationPort::new(link);
    port.open().unwrap();
    port
}

#[test]
fn test_ping_scenario() {
    let port = open(SimulatedLink::new());
    port.register_command("echo", CommandPattern::text("(.+)").unwrap(), |m| {
        Ok(m.payload.to_vec())
    });

    assert_eq!(port.transact("PING\n", "PING", None).unwrap(), "PING");

    let err = port.transact("PING\n", "PONG", None).unwrap_err();
    match err {
        TransportError::NoMatch { pattern, reply } => {
            assert_eq!(pattern, "PONG");
            assert_eq!(reply, "PING");
        }
        other => panic!("expected NoMatch, got {other:?}"),
    }
}

#[test]
fn test_alternate_reply_is_reported() {
    let port = open(SimulatedLink::new().with_command(
        "position",
        CommandPattern::text(r"^POS\?").unwrap(),
        |_| Ok(b"ERR 7\r\n".to_vec()),
    ));

    let err = port
        .transact_groups("POS?\r", r"^POS (\d+)", Some(r"^ERR (\d+)"))
        .unwrap_err();
    assert!(err.is_alternate_match());
}

#[test]
fn test_first_group_from_instrument_reply() {
    let port = open(SimulatedLink::new().with_command(
        "wavelength",
        CommandPattern::text(r"^WAV\?").unwrap(),
        |_| Ok(b"WAV 632.8 nm\r\n".to_vec()),
    ));

    let wavelength = port
        .transact_first_group("WAV?\r", r"WAV ([\d.]+) nm", None)
        .unwrap();
    assert_eq!(wavelength, "632.8");
}

#[test]
fn test_read_bytes_on_empty_buffer_times_out() {
    let port = open(SimulatedLink::echo_data());

    match port.read_bytes(4) {
        Err(TransportError::ReadTimeout { expected, received }) => {
            assert_eq!(expected, 4);
            assert_eq!(received, 0);
        }
        other => panic!("expected ReadTimeout, got {other:?}"),
    }
}

#[test]
fn test_transact_bytes_decodes_groups() {
    let port = open(SimulatedLink::new().with_command(
        "status",
        CommandPattern::data("^02(..)03$").unwrap(),
        |m| {
            let register = m.groups[0].clone().unwrap_or_default();
            Ok([vec![0x06], register, vec![0x00, 0x2a]].concat())
        },
    ));

    let groups = port
        .transact_bytes(&[0x02, 0x11, 0x03], 4, "^06(..)(....)$", Some("^15"))
        .unwrap();
    assert_eq!(groups, vec![Some(vec![0x11]), Some(vec![0x00, 0x2a])]);
}

#[test]
fn test_transact_bytes_negative_acknowledge() {
    let port = open(SimulatedLink::new().with_command(
        "status",
        CommandPattern::data("^02").unwrap(),
        |_| Ok(vec![0x15, 0x01]),
    ));

    let err = port
        .transact_bytes(&[0x02, 0x11, 0x03], 2, "^06(..)$", Some("^15"))
        .unwrap_err();
    assert!(matches!(err, TransportError::AlternateMatch { .. }));
}

#[test]
fn test_unrecognized_command_reaches_caller() {
    let port = open(SimulatedLink::new().with_command(
        "strict",
        CommandPattern::text("(.+)").unwrap(),
        |m| {
            Err(TransportError::UnrecognizedCommand {
                payload: m.payload_text().unwrap_or_default().to_string(),
            })
        },
    ));

    let err = port.transact("BOGUS\r", "OK", None).unwrap_err();
    assert!(matches!(err, TransportError::UnrecognizedCommand { .. }));
}

#[test]
fn test_concurrent_transactions_do_not_interleave() {
    let link = SimulatedLink::new()
        .with_reply_delay(Duration::from_millis(1))
        .with_command("query", CommandPattern::text(r"^Q(\d+_\d+)").unwrap(), |m| {
            Ok(format!("A{}\n", m.group_text(0).unwrap_or_default()).into_bytes())
        });
    let port = Arc::new(open(link));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let port = port.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let id = format!("{t}_{i}");
                    let reply = port
                        .transact(&format!("Q{id}\n"), &format!("^A{id}$"), None)
                        .unwrap();
                    assert_eq!(reply, format!("A{id}"));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(port.bytes_available().unwrap(), 0);
}

proptest! {
    #[test]
    fn prop_loopback_returns_written_bytes(data in proptest::collection::vec(any::<u8>(), 1..256)) {
        let port = open(SimulatedLink::echo_data());
        prop_assert_eq!(port.write_bytes(&data).unwrap(), data.len());
        prop_assert_eq!(port.read_bytes(data.len()).unwrap(), data);
    }
}
