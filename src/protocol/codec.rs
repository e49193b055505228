//! Protocol codec
//!
//! Encoding and decoding functions for queue message bodies.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────────┐
//! │ Ver (1)  │ Len (4)  │ CRC (4)  │   bincode record    │
//! └──────────┴──────────┴──────────┴─────────────────────┘
//! ```
//! Length and CRC are big-endian and cover the record only. Anything
//! another program drops on the well-known keys fails the version, length
//! or checksum check instead of being misread as a command.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{GpioError, Result};

use super::{Command, CommandName, Params, ResponseEnvelope};

/// Current frame version
pub const FRAME_VERSION: u8 = 1;

/// Header size: 1 byte version + 4 bytes length + 4 bytes CRC
pub const FRAME_HEADER_SIZE: usize = 9;

/// Request record as carried on the wire
///
/// `function` is a free string so unknown or missing names reach the
/// server and can be logged rather than failing deserialization.
#[derive(Debug, Serialize, Deserialize)]
struct RequestRecord {
    function: Option<String>,
    parms: Params,
}

// =============================================================================
// Framing
// =============================================================================

fn frame(body: &[u8], max_size: usize) -> Result<Vec<u8>> {
    let size = FRAME_HEADER_SIZE + body.len();
    if size > max_size {
        return Err(GpioError::MessageTooLarge {
            size,
            max: max_size,
        });
    }

    let mut buf = BytesMut::with_capacity(size);
    buf.put_u8(FRAME_VERSION);
    buf.put_u32(body.len() as u32);
    buf.put_u32(crc32fast::hash(body));
    buf.put_slice(body);
    Ok(buf.to_vec())
}

fn unframe(bytes: &[u8]) -> Result<&[u8]> {
    if bytes.len() < FRAME_HEADER_SIZE {
        return Err(GpioError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            FRAME_HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..FRAME_HEADER_SIZE];
    let version = header.get_u8();
    let body_len = header.get_u32() as usize;
    let crc = header.get_u32();

    if version != FRAME_VERSION {
        return Err(GpioError::Protocol(format!(
            "Unsupported frame version {} (expected {})",
            version, FRAME_VERSION
        )));
    }

    let body = &bytes[FRAME_HEADER_SIZE..];
    if body.len() != body_len {
        return Err(GpioError::Protocol(format!(
            "Frame length mismatch: header says {} bytes, got {}",
            body_len,
            body.len()
        )));
    }

    let actual = crc32fast::hash(body);
    if actual != crc {
        return Err(GpioError::Protocol(format!(
            "Frame checksum mismatch: expected {:08x}, got {:08x}",
            crc, actual
        )));
    }

    Ok(body)
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a command, refusing frames larger than `max_size`
pub fn encode_request(command: &Command, max_size: usize) -> Result<Vec<u8>> {
    encode_request_record(Some(command.function.as_str()), &command.parms, max_size)
}

/// Encode a raw request record
///
/// Lets tools and tests put arbitrary function names on the wire.
pub fn encode_request_record(
    function: Option<&str>,
    parms: &Params,
    max_size: usize,
) -> Result<Vec<u8>> {
    let record = RequestRecord {
        function: function.map(str::to_string),
        parms: parms.clone(),
    };
    let body = bincode::serialize(&record)?;
    frame(&body, max_size)
}

/// Decode a command
///
/// Fails with a protocol error for a bad frame, a missing function or an
/// unknown function. Parameters are not validated here.
pub fn decode_request(bytes: &[u8]) -> Result<Command> {
    let body = unframe(bytes)?;
    let record: RequestRecord = bincode::deserialize(body)?;

    let name = record
        .function
        .filter(|f| !f.is_empty())
        .ok_or_else(|| GpioError::Protocol("No function call received".to_string()))?;
    let function: CommandName = name.parse()?;

    Ok(Command {
        function,
        parms: record.parms,
    })
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a query reply
pub fn encode_response(response: &ResponseEnvelope, max_size: usize) -> Result<Vec<u8>> {
    let body = bincode::serialize(response)?;
    frame(&body, max_size)
}

/// Decode a query reply
pub fn decode_response(bytes: &[u8]) -> Result<ResponseEnvelope> {
    let body = unframe(bytes)?;
    Ok(bincode::deserialize(body)?)
}
