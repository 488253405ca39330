//! Envelope framing shared by every relayed GC message.
//!
//! Wire format: `u32` message type (LE), `i32` header length (LE), header
//! bytes, body bytes. The envelope is not self-delimiting past the header;
//! the body is whatever remains in the buffer handed to `decode`.

use bytes::{Buf, BufMut};

use crate::{ProtocolError, Result};

/// High bit of the message type: body uses the structured message schema.
pub const STRUCTURED_FLAG: u32 = 0x8000_0000;

/// Type id + header length prefix, in bytes.
pub const ENVELOPE_PREFIX_SIZE: usize = 8;

/// A decoded envelope. Owns its header and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub msg_type: u32,
    pub header: Vec<u8>,
    pub body: Vec<u8>,
}

impl Envelope {
    pub fn new(msg_type: u32, header: Vec<u8>, body: Vec<u8>) -> Self {
        Self {
            msg_type,
            header,
            body,
        }
    }

    /// Message id with the structured-schema flag stripped.
    pub fn base_type(&self) -> u32 {
        base_type(self.msg_type)
    }

    pub fn is_structured(&self) -> bool {
        self.msg_type & STRUCTURED_FLAG != 0
    }

    pub fn encoded_len(&self) -> usize {
        ENVELOPE_PREFIX_SIZE + self.header.len() + self.body.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        encode(self.msg_type, &self.header, &self.body)
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        decode(buf)
    }
}

/// Strip the structured-schema flag from a raw type id.
pub fn base_type(msg_type: u32) -> u32 {
    msg_type & !STRUCTURED_FLAG
}

/// Encode an envelope. An empty header is written as `header_len = 0`.
pub fn encode(msg_type: u32, header: &[u8], body: &[u8]) -> Vec<u8> {
    debug_assert!(header.len() <= i32::MAX as usize);

    let mut out = Vec::with_capacity(ENVELOPE_PREFIX_SIZE + header.len() + body.len());
    out.put_u32_le(msg_type);
    out.put_i32_le(header.len() as i32);
    out.put_slice(header);
    out.put_slice(body);
    out
}

/// Decode an envelope, copying header and body out of `buf`.
pub fn decode(buf: &[u8]) -> Result<Envelope> {
    let (msg_type, header_len) = read_prefix(buf)?;
    let body_start = ENVELOPE_PREFIX_SIZE + header_len;

    Ok(Envelope {
        msg_type,
        header: buf[ENVELOPE_PREFIX_SIZE..body_start].to_vec(),
        body: buf[body_start..].to_vec(),
    })
}

/// Read only the type id, if at least four bytes are present.
pub fn peek_type(buf: &[u8]) -> Option<u32> {
    if buf.len() < 4 {
        return None;
    }
    let mut cursor = buf;
    Some(cursor.get_u32_le())
}

/// Offset of the first body byte.
pub fn body_offset(buf: &[u8]) -> Result<usize> {
    let (_, header_len) = read_prefix(buf)?;
    Ok(ENVELOPE_PREFIX_SIZE + header_len)
}

/// Rewrite header and body of the envelope already in `buf`, keeping its
/// type id. The capacity is `buf.len()`. Returns the new total length.
///
/// Nothing is written when the new form does not fit.
pub fn rewrite_in_place(buf: &mut [u8], new_header: &[u8], new_body: &[u8]) -> Result<usize> {
    let capacity = buf.len();
    let needed = ENVELOPE_PREFIX_SIZE + new_header.len() + new_body.len();
    if needed > capacity {
        return Err(ProtocolError::BufferTooSmall { needed, capacity });
    }

    let mut out = &mut buf[4..needed];
    out.put_i32_le(new_header.len() as i32);
    out.put_slice(new_header);
    out.put_slice(new_body);

    Ok(needed)
}

fn read_prefix(buf: &[u8]) -> Result<(u32, usize)> {
    if buf.len() < ENVELOPE_PREFIX_SIZE {
        return Err(ProtocolError::MalformedEnvelope(format!(
            "envelope too short: {} bytes",
            buf.len()
        )));
    }

    let mut cursor = buf;
    let msg_type = cursor.get_u32_le();
    let header_len = cursor.get_i32_le();

    if header_len < 0 {
        return Err(ProtocolError::MalformedEnvelope(format!(
            "negative header length {header_len}"
        )));
    }

    let header_len = header_len as usize;
    if header_len > cursor.remaining() {
        return Err(ProtocolError::MalformedEnvelope(format!(
            "header length {header_len} exceeds remaining {} bytes",
            cursor.remaining()
        )));
    }

    Ok((msg_type, header_len))
}
