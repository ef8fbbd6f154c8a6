// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol: REQUEST / ACK / RELEASE over a fixed three-field record
//!
//! The record is `{sender_id, sender_clock, resource_class}` as three `i32`s.
//! The message kind travels out of band as the frame tag. Encoded frames are
//! 16 little-endian bytes: `[tag, sender_id, sender_clock, resource_class]`.

use crate::clock::LamportTime;
use crate::id::PeerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of an encoded frame in bytes
pub const FRAME_LEN: usize = 16;

/// Errors decoding or encoding a frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("bad frame length: {0} bytes, expected {FRAME_LEN}")]
    BadLength(usize),
    #[error("unknown message tag: {0}")]
    UnknownTag(i32),
    #[error("unknown resource class: {0}")]
    UnknownClass(i32),
    #[error("negative {field}: {value}")]
    Negative { field: &'static str, value: i32 },
    #[error("{field} does not fit the wire format: {value}")]
    Overflow { field: &'static str, value: u32 },
}

/// A bounded resource pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceClass {
    A,
    B,
}

impl ResourceClass {
    pub const ALL: [ResourceClass; 2] = [ResourceClass::A, ResourceClass::B];

    pub fn wire(self) -> i32 {
        match self {
            ResourceClass::A => 0,
            ResourceClass::B => 1,
        }
    }

    pub fn from_wire(value: i32) -> Result<Self, FrameError> {
        match value {
            0 => Ok(ResourceClass::A),
            1 => Ok(ResourceClass::B),
            other => Err(FrameError::UnknownClass(other)),
        }
    }

    /// Position in per-class tables
    pub fn index(self) -> usize {
        self.wire() as usize
    }
}

impl std::fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceClass::A => write!(f, "A"),
            ResourceClass::B => write!(f, "B"),
        }
    }
}

/// Message type, carried as the frame tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Request,
    Ack,
    Release,
}

impl MessageKind {
    pub fn tag(self) -> i32 {
        match self {
            MessageKind::Request => 0,
            MessageKind::Ack => 1,
            MessageKind::Release => 2,
        }
    }

    pub fn from_tag(tag: i32) -> Result<Self, FrameError> {
        match tag {
            0 => Ok(MessageKind::Request),
            1 => Ok(MessageKind::Ack),
            2 => Ok(MessageKind::Release),
            other => Err(FrameError::UnknownTag(other)),
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Request => write!(f, "REQUEST"),
            MessageKind::Ack => write!(f, "ACK"),
            MessageKind::Release => write!(f, "RELEASE"),
        }
    }
}

/// The fixed-layout record exactly as it crosses the transport
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WireMessage {
    pub sender_id: i32,
    pub sender_clock: i32,
    pub resource_class: i32,
}

/// A wire record together with its out-of-band tag
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub tag: i32,
    pub body: WireMessage,
}

impl Frame {
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        let fields = [
            self.tag,
            self.body.sender_id,
            self.body.sender_clock,
            self.body.resource_class,
        ];
        for (chunk, field) in bytes.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        bytes
    }

    /// Decode the byte layout. Field values are validated later, when the
    /// frame is classified into a [`Message`].
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != FRAME_LEN {
            return Err(FrameError::BadLength(bytes.len()));
        }
        let mut fields = [0i32; 4];
        for (field, chunk) in fields.iter_mut().zip(bytes.chunks_exact(4)) {
            *field = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(Self {
            tag: fields[0],
            body: WireMessage {
                sender_id: fields[1],
                sender_clock: fields[2],
                resource_class: fields[3],
            },
        })
    }
}

/// A classified protocol message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub sender: PeerId,
    pub clock: LamportTime,
    pub class: ResourceClass,
}

impl Message {
    pub fn new(kind: MessageKind, sender: PeerId, clock: LamportTime, class: ResourceClass) -> Self {
        Self {
            kind,
            sender,
            clock,
            class,
        }
    }

    pub fn request(sender: PeerId, clock: LamportTime, class: ResourceClass) -> Self {
        Self::new(MessageKind::Request, sender, clock, class)
    }

    pub fn ack(sender: PeerId, clock: LamportTime, class: ResourceClass) -> Self {
        Self::new(MessageKind::Ack, sender, clock, class)
    }

    pub fn release(sender: PeerId, clock: LamportTime, class: ResourceClass) -> Self {
        Self::new(MessageKind::Release, sender, clock, class)
    }

    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        Ok(Frame {
            tag: self.kind.tag(),
            body: WireMessage {
                sender_id: to_wire("sender_id", self.sender.0)?,
                sender_clock: to_wire("sender_clock", self.clock)?,
                resource_class: self.class.wire(),
            },
        })
    }
}

impl TryFrom<Frame> for Message {
    type Error = FrameError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        let kind = MessageKind::from_tag(frame.tag)?;
        let class = ResourceClass::from_wire(frame.body.resource_class)?;
        let sender = from_wire("sender_id", frame.body.sender_id)?;
        let clock = from_wire("sender_clock", frame.body.sender_clock)?;
        Ok(Self {
            kind,
            sender: PeerId(sender),
            clock,
            class,
        })
    }
}

fn to_wire(field: &'static str, value: u32) -> Result<i32, FrameError> {
    i32::try_from(value).map_err(|_| FrameError::Overflow { field, value })
}

fn from_wire(field: &'static str, value: i32) -> Result<u32, FrameError> {
    u32::try_from(value).map_err(|_| FrameError::Negative { field, value })
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
