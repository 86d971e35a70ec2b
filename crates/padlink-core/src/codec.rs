//! Binary message codec
//!
//! Message bodies are a type byte followed by fixed-layout fields:
//! integers and floats big-endian, strings UTF-8 with a uint16 length
//! prefix, optional fields behind a one-byte presence marker. Bodies are
//! wrapped in a [`Frame`]; control values carry their timestamp in the
//! frame header rather than the body.

use crate::types::*;
use crate::{Error, Frame, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Encode a message into a complete frame
pub fn encode(message: &Message) -> Result<Bytes> {
    let body = encode_body(message);
    let frame = match message {
        Message::Control(cv) => Frame::new(body).with_timestamp(cv.timestamp),
        _ => Frame::new(body),
    };
    frame.encode()
}

/// Decode a complete frame into a message.
///
/// Returns `Ok(None)` for an unknown message type: forward compatibility
/// means unrecognized messages are discarded, not treated as fatal.
pub fn decode(data: &[u8]) -> Result<Option<Message>> {
    let frame = Frame::decode(data)?;
    decode_body(&frame)
}

fn encode_body(message: &Message) -> Bytes {
    let mut buf = BytesMut::with_capacity(32);

    match message {
        Message::Hello(hello) => {
            buf.put_u8(MessageType::Hello as u8);
            buf.put_u8(hello.version);
            buf.put_u8(hello.controller_type as u8);
            buf.put_u8(hello.layout as u8);
            put_opt_u16(&mut buf, hello.requested_index);
            put_opt_str(&mut buf, hello.name.as_deref());
        }
        Message::SetName(msg) => {
            buf.put_u8(MessageType::SetName as u8);
            buf.put_u16(msg.controller_index);
            put_opt_str(&mut buf, msg.name.as_deref());
        }
        Message::Control(cv) => {
            buf.put_u8(MessageType::Control as u8);
            buf.put_u16(cv.controller_index);
            buf.put_u8(cv.control as u8);
            buf.put_f32(cv.value);
            match cv.value2 {
                Some(v) => {
                    buf.put_u8(1);
                    buf.put_f32(v);
                }
                None => buf.put_u8(0),
            }
            match cv.pressed {
                Some(p) => {
                    buf.put_u8(1);
                    buf.put_u8(p as u8);
                }
                None => buf.put_u8(0),
            }
        }
    }

    buf.freeze()
}

fn decode_body(frame: &Frame) -> Result<Option<Message>> {
    let mut buf = &frame.payload[..];

    if buf.remaining() < 1 {
        return Err(Error::Truncated);
    }
    let type_code = buf.get_u8();

    let message_type = match MessageType::from_u8(type_code) {
        Some(t) => t,
        None => {
            tracing::debug!("discarding unknown message type 0x{:02x}", type_code);
            return Ok(None);
        }
    };

    let message = match message_type {
        MessageType::Hello => {
            if buf.remaining() < 3 {
                return Err(Error::Truncated);
            }
            let version = buf.get_u8();
            let type_byte = buf.get_u8();
            let controller_type = ControllerType::from_u8(type_byte)
                .ok_or(Error::UnknownControllerType(type_byte))?;
            let layout_byte = buf.get_u8();
            let layout =
                GamepadLayout::from_u8(layout_byte).ok_or(Error::UnknownLayout(layout_byte))?;
            let requested_index = get_opt_u16(&mut buf)?;
            let name = get_opt_str(&mut buf)?;
            Message::Hello(HelloMessage {
                version,
                controller_type,
                layout,
                requested_index,
                name,
            })
        }
        MessageType::SetName => {
            if buf.remaining() < 2 {
                return Err(Error::Truncated);
            }
            let controller_index = buf.get_u16();
            let name = get_opt_str(&mut buf)?;
            Message::SetName(SetNameMessage {
                controller_index,
                name,
            })
        }
        MessageType::Control => {
            if buf.remaining() < 7 {
                return Err(Error::Truncated);
            }
            let controller_index = buf.get_u16();
            let control_byte = buf.get_u8();
            let control =
                ControlId::from_u8(control_byte).ok_or(Error::UnknownControl(control_byte))?;
            let value = buf.get_f32();

            let value2 = if get_presence(&mut buf)? {
                if buf.remaining() < 4 {
                    return Err(Error::Truncated);
                }
                Some(buf.get_f32())
            } else {
                None
            };

            let pressed = if get_presence(&mut buf)? {
                if buf.remaining() < 1 {
                    return Err(Error::Truncated);
                }
                Some(buf.get_u8() != 0)
            } else {
                None
            };

            Message::Control(ControlValue {
                controller_index,
                control,
                value,
                value2,
                pressed,
                timestamp: frame.timestamp.unwrap_or(0),
            })
        }
    };

    Ok(Some(message))
}

fn put_opt_u16(buf: &mut BytesMut, val: Option<u16>) {
    match val {
        Some(v) => {
            buf.put_u8(1);
            buf.put_u16(v);
        }
        None => buf.put_u8(0),
    }
}

fn get_opt_u16(buf: &mut &[u8]) -> Result<Option<u16>> {
    if get_presence(buf)? {
        if buf.remaining() < 2 {
            return Err(Error::Truncated);
        }
        Ok(Some(buf.get_u16()))
    } else {
        Ok(None)
    }
}

fn put_opt_str(buf: &mut BytesMut, val: Option<&str>) {
    match val {
        Some(s) => {
            buf.put_u8(1);
            let bytes = s.as_bytes();
            buf.put_u16(bytes.len() as u16);
            buf.extend_from_slice(bytes);
        }
        None => buf.put_u8(0),
    }
}

fn get_opt_str(buf: &mut &[u8]) -> Result<Option<String>> {
    if !get_presence(buf)? {
        return Ok(None);
    }
    if buf.remaining() < 2 {
        return Err(Error::Truncated);
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(Error::Truncated);
    }
    let bytes = buf.copy_to_bytes(len);
    let s = std::str::from_utf8(&bytes).map_err(|_| Error::InvalidString)?;
    Ok(Some(s.to_string()))
}

fn get_presence(buf: &mut &[u8]) -> Result<bool> {
    if buf.remaining() < 1 {
        return Err(Error::Truncated);
    }
    Ok(buf.get_u8() != 0)
}
