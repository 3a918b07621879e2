//! Property-based serialization round-trip tests.
//!
//! Uses proptest to verify:
//! 1. Any valid `Message` survives an encode → decode round-trip.
//! 2. Any valid `SignalMessage` survives an encode → decode round-trip.
//! 3. Random bytes never cause a panic in either decoder.
//! 4. Data-URI encoding round-trips arbitrary byte payloads.

use proptest::prelude::*;

use peerchat_proto::codec;
use peerchat_proto::data_uri;
use peerchat_proto::message::{Message, MessageKind, PeerId};
use peerchat_proto::signal::{self, SignalMessage};

// --- Strategies for protocol types ---

/// Strategy for generating arbitrary `PeerId` values.
fn arb_peer_id() -> impl Strategy<Value = PeerId> {
    "[a-z0-9-]{1,24}".prop_map(PeerId::new)
}

/// Strategy for generating arbitrary `MessageKind` values.
fn arb_kind() -> impl Strategy<Value = MessageKind> {
    prop_oneof![Just(MessageKind::Text), Just(MessageKind::File)]
}

/// Strategy for generating arbitrary `Message` values.
fn arb_message() -> impl Strategy<Value = Message> {
    (
        arb_kind(),
        arb_peer_id(),
        "[^\x00]{0,512}",
        prop::option::of("[a-z0-9._-]{1,32}"),
    )
        .prop_map(|(kind, sender, content, file_name)| Message {
            kind,
            sender,
            content,
            file_name,
        })
}

/// Strategy for generating arbitrary `SignalMessage` values.
fn arb_signal_message() -> impl Strategy<Value = SignalMessage> {
    let id = || "[a-z0-9-]{1,24}".prop_map(String::from);
    prop_oneof![
        id().prop_map(|identity| SignalMessage::Register { identity }),
        id().prop_map(|identity| SignalMessage::Registered { identity }),
        (id(), id()).prop_map(|(from, to)| SignalMessage::Connect { from, to }),
        (id(), id()).prop_map(|(from, to)| SignalMessage::ConnectAck { from, to }),
        (id(), id(), prop::collection::vec(any::<u8>(), 0..256))
            .prop_map(|(from, to, payload)| SignalMessage::Payload { from, to, payload }),
        (id(), id()).prop_map(|(from, to)| SignalMessage::Close { from, to }),
        ".{0,64}".prop_map(|reason| SignalMessage::Error { reason }),
    ]
}

// --- Property tests ---

proptest! {
    /// Any valid Message survives an encode → decode round-trip.
    #[test]
    fn message_round_trip(msg in arb_message()) {
        let bytes = codec::encode(&msg).expect("encode should succeed");
        let decoded = codec::decode(&bytes).expect("decode should succeed");
        prop_assert_eq!(msg, decoded);
    }

    /// Any valid SignalMessage survives an encode → decode round-trip.
    #[test]
    fn signal_message_round_trip(msg in arb_signal_message()) {
        let bytes = signal::encode(&msg).expect("encode should succeed");
        let decoded = signal::decode(&bytes).expect("decode should succeed");
        prop_assert_eq!(msg, decoded);
    }

    /// Random bytes never cause a panic in the payload decoder.
    #[test]
    fn random_bytes_decode_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        // We don't care if it returns Ok or Err, just that it doesn't panic.
        let _ = codec::decode(&bytes);
    }

    /// Random bytes never cause a panic in the signal decoder.
    #[test]
    fn random_bytes_signal_decode_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = signal::decode(&bytes);
    }

    /// Data-URI encoding round-trips arbitrary payloads.
    #[test]
    fn data_uri_round_trip(bytes in prop::collection::vec(any::<u8>(), 0..4096)) {
        let uri = data_uri::encode(&bytes);
        let (mime, decoded) = data_uri::decode(&uri).expect("decode should succeed");
        prop_assert_eq!(mime, "application/octet-stream".to_string());
        prop_assert_eq!(decoded, bytes);
    }

    /// Random strings never cause a panic in the data-URI parser.
    #[test]
    fn random_strings_data_uri_no_panic(s in ".{0,256}") {
        let _ = data_uri::decode(&s);
    }
}
