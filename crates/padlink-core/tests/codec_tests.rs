//! Codec tests for PadLink core

use padlink_core::{
    codec, ControlId, ControlValue, ControllerType, GamepadLayout, HelloMessage, Message,
    SetNameMessage,
};

#[test]
fn test_encode_decode_hello() {
    let msg = Message::Hello(HelloMessage {
        version: 1,
        controller_type: ControllerType::Remote,
        layout: GamepadLayout::Extended,
        requested_index: Some(3),
        name: Some("Player One".to_string()),
    });

    let encoded = codec::encode(&msg).expect("encode failed");
    let decoded = codec::decode(&encoded).expect("decode failed");

    match decoded {
        Some(Message::Hello(hello)) => {
            assert_eq!(hello.version, 1);
            assert_eq!(hello.controller_type, ControllerType::Remote);
            assert_eq!(hello.layout, GamepadLayout::Extended);
            assert_eq!(hello.requested_index, Some(3));
            assert_eq!(hello.name.as_deref(), Some("Player One"));
        }
        other => panic!("Expected Hello message, got {:?}", other),
    }
}

#[test]
fn test_encode_decode_hello_without_optionals() {
    let msg = Message::Hello(HelloMessage {
        version: 1,
        controller_type: ControllerType::Mfi,
        layout: GamepadLayout::Regular,
        requested_index: None,
        name: None,
    });

    let encoded = codec::encode(&msg).expect("encode failed");
    let decoded = codec::decode(&encoded).expect("decode failed");

    match decoded {
        Some(Message::Hello(hello)) => {
            assert_eq!(hello.requested_index, None);
            assert_eq!(hello.name, None);
        }
        other => panic!("Expected Hello message, got {:?}", other),
    }
}

#[test]
fn test_encode_decode_set_name() {
    let msg = Message::SetName(SetNameMessage {
        controller_index: 7,
        name: Some("Renamed".to_string()),
    });

    let encoded = codec::encode(&msg).expect("encode failed");
    let decoded = codec::decode(&encoded).expect("decode failed");

    match decoded {
        Some(Message::SetName(set)) => {
            assert_eq!(set.controller_index, 7);
            assert_eq!(set.name.as_deref(), Some("Renamed"));
        }
        other => panic!("Expected SetName message, got {:?}", other),
    }
}

#[test]
fn test_control_value_roundtrip_button() {
    let msg = Message::Control(ControlValue {
        controller_index: 2,
        control: ControlId::ButtonA,
        value: 0.75,
        value2: None,
        pressed: Some(true),
        timestamp: 987654321,
    });

    let encoded = codec::encode(&msg).expect("encode failed");
    let decoded = codec::decode(&encoded).expect("decode failed");

    assert_eq!(decoded, Some(msg));
}

#[test]
fn test_control_value_roundtrip_joystick() {
    let msg = Message::Control(ControlValue {
        controller_index: 0,
        control: ControlId::LeftThumbstick,
        value: -0.5,
        value2: Some(1.0),
        pressed: None,
        timestamp: 42,
    });

    let encoded = codec::encode(&msg).expect("encode failed");
    let decoded = codec::decode(&encoded).expect("decode failed");

    assert_eq!(decoded, Some(msg));
}

#[test]
fn test_control_value_exact_bits() {
    // Bit-for-bit equality after a roundtrip, including denormal-ish floats
    for value in [0.0f32, -0.0, 1.0, f32::MIN_POSITIVE, 0.123456789] {
        let msg = Message::Control(ControlValue {
            controller_index: u16::MAX,
            control: ControlId::RightTrigger,
            value,
            value2: None,
            pressed: Some(false),
            timestamp: u64::MAX,
        });

        let encoded = codec::encode(&msg).expect("encode failed");
        match codec::decode(&encoded).expect("decode failed") {
            Some(Message::Control(cv)) => {
                assert_eq!(cv.value.to_bits(), value.to_bits());
                assert_eq!(cv.timestamp, u64::MAX);
            }
            other => panic!("Expected Control message, got {:?}", other),
        }
    }
}

#[test]
fn test_unknown_message_type_is_discarded() {
    // A frame whose body begins with an unassigned type code decodes to
    // None rather than an error, so the connection survives
    let frame = padlink_core::Frame::new(vec![0x7Fu8, 0xDE, 0xAD]);
    let encoded = frame.encode().expect("encode failed");

    let decoded = codec::decode(&encoded).expect("decode failed");
    assert_eq!(decoded, None);
}

#[test]
fn test_truncated_body_is_an_error() {
    let msg = Message::Control(ControlValue {
        controller_index: 1,
        control: ControlId::ButtonB,
        value: 1.0,
        value2: None,
        pressed: Some(true),
        timestamp: 1,
    });
    let encoded = codec::encode(&msg).expect("encode failed");

    // Rebuild a frame with the body cut short
    let frame = padlink_core::Frame::decode(&encoded[..]).unwrap();
    let short = padlink_core::Frame::new(frame.payload.slice(..frame.payload.len() - 2))
        .encode()
        .unwrap();

    assert!(codec::decode(&short).is_err());
}

#[test]
fn test_unknown_control_id_is_an_error() {
    // Type byte says Control, but the control code is unassigned
    let body = vec![
        0x20, // Control
        0x00, 0x01, // index
        0x7F, // bogus control id
        0x3F, 0x80, 0x00, 0x00, // value
        0x00, // no value2
        0x00, // no pressed
    ];
    let encoded = padlink_core::Frame::new(body).encode().unwrap();

    match codec::decode(&encoded) {
        Err(padlink_core::Error::UnknownControl(0x7F)) => {}
        other => panic!("Expected UnknownControl, got {:?}", other),
    }
}
