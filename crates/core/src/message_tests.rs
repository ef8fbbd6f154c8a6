// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn frame_layout_is_little_endian_tag_first() {
    let frame = Message::ack(PeerId(2), 258, ResourceClass::B)
        .to_frame()
        .unwrap();

    let bytes = frame.encode();

    assert_eq!(&bytes[0..4], &1i32.to_le_bytes());
    assert_eq!(&bytes[4..8], &2i32.to_le_bytes());
    assert_eq!(&bytes[8..12], &258i32.to_le_bytes());
    assert_eq!(&bytes[12..16], &1i32.to_le_bytes());
    assert_eq!(Frame::decode(&bytes).unwrap(), frame);
}

#[test]
fn decode_rejects_short_buffers() {
    assert_eq!(Frame::decode(&[0u8; 9]), Err(FrameError::BadLength(9)));
}

#[test]
fn decode_rejects_long_buffers() {
    let err = Frame::decode(&[0u8; 20]).unwrap_err();

    assert_eq!(err, FrameError::BadLength(20));
    assert_eq!(err.to_string(), "bad frame length: 20 bytes, expected 16");
}

#[test]
fn classify_request_frame() {
    let frame = Frame {
        tag: 0,
        body: WireMessage {
            sender_id: 1,
            sender_clock: 5,
            resource_class: 0,
        },
    };

    let message = Message::try_from(frame).unwrap();

    assert_eq!(message, Message::request(PeerId(1), 5, ResourceClass::A));
}

#[parameterized(
    unknown_tag = { 7, 0, 0, 0, FrameError::UnknownTag(7) },
    unknown_class = { 0, 0, 0, 4, FrameError::UnknownClass(4) },
    negative_sender = { 1, -1, 0, 0, FrameError::Negative { field: "sender_id", value: -1 } },
    negative_clock = { 2, 0, -9, 1, FrameError::Negative { field: "sender_clock", value: -9 } },
)]
fn malformed_frames_are_rejected(
    tag: i32,
    sender_id: i32,
    sender_clock: i32,
    resource_class: i32,
    expected: FrameError,
) {
    let frame = Frame {
        tag,
        body: WireMessage {
            sender_id,
            sender_clock,
            resource_class,
        },
    };

    assert_eq!(Message::try_from(frame), Err(expected));
}

#[test]
fn clock_beyond_i32_does_not_encode() {
    let message = Message::release(PeerId(0), u32::MAX, ResourceClass::A);

    assert!(matches!(
        message.to_frame(),
        Err(FrameError::Overflow {
            field: "sender_clock",
            ..
        })
    ));
}

#[parameterized(
    request = { MessageKind::Request, 0, "REQUEST" },
    ack = { MessageKind::Ack, 1, "ACK" },
    release = { MessageKind::Release, 2, "RELEASE" },
)]
fn message_kind_tags(kind: MessageKind, tag: i32, name: &str) {
    assert_eq!(kind.tag(), tag);
    assert_eq!(MessageKind::from_tag(tag), Ok(kind));
    assert_eq!(kind.to_string(), name);
}

#[test]
fn resource_class_wire_values() {
    assert_eq!(ResourceClass::A.wire(), 0);
    assert_eq!(ResourceClass::B.wire(), 1);
    assert_eq!(ResourceClass::B.index(), 1);
    assert_eq!(ResourceClass::from_wire(1), Ok(ResourceClass::B));
}
