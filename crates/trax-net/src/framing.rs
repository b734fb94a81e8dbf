//! Length-prefixed JSON framing.
//!
//! Each frame is three concatenated parts: a 4-byte little-endian unsigned
//! integer giving the byte length of the JSON header; the UTF-8 JSON
//! header with required fields `message_type`, `content_encoding`,
//! `byteorder`, and `content_length`; and `content_length` bytes of
//! payload encoded per `content_encoding` (only `utf-8` JSON payloads are
//! supported).

use crate::messages::MessageType;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Largest header or payload this side will accept, a guard against
/// malformed length prefixes.
const MAX_PART_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct FrameHeader {
    message_type: u32,
    content_encoding: String,
    byteorder: String,
    content_length: usize,
}

/// Write one frame.
pub fn write_frame<W: Write>(
    writer: &mut W,
    message_type: MessageType,
    payload: &serde_json::Value,
) -> Result<()> {
    let content = serde_json::to_vec(payload).context("encoding payload")?;
    let header = FrameHeader {
        message_type: message_type.as_u32(),
        content_encoding: "utf-8".into(),
        byteorder: if cfg!(target_endian = "big") { "big" } else { "little" }.into(),
        content_length: content.len(),
    };
    let header_bytes = serde_json::to_vec(&header).context("encoding frame header")?;
    writer.write_all(&(header_bytes.len() as u32).to_le_bytes())?;
    writer.write_all(&header_bytes)?;
    writer.write_all(&content)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame. Returns `Ok(None)` on a clean end-of-stream at a frame
/// boundary.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<(MessageType, serde_json::Value)>> {
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err).context("reading frame prefix"),
    }
    let header_len = u32::from_le_bytes(prefix) as usize;
    if header_len == 0 || header_len > MAX_PART_BYTES {
        bail!("frame header length {header_len} is out of range");
    }

    let mut header_bytes = vec![0u8; header_len];
    reader
        .read_exact(&mut header_bytes)
        .context("reading frame header")?;
    let header: FrameHeader =
        serde_json::from_slice(&header_bytes).context("parsing frame header")?;
    if !header.content_encoding.eq_ignore_ascii_case("utf-8") {
        bail!("unsupported content encoding '{}'", header.content_encoding);
    }
    if header.byteorder != "little" && header.byteorder != "big" {
        bail!("unsupported byteorder '{}'", header.byteorder);
    }
    if header.content_length > MAX_PART_BYTES {
        bail!("frame payload length {} is out of range", header.content_length);
    }
    let message_type = MessageType::try_from(header.message_type)?;

    let mut content = vec![0u8; header.content_length];
    reader
        .read_exact(&mut content)
        .context("reading frame payload")?;
    let payload = if content.is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_slice(&content).context("parsing frame payload")?
    };
    Ok(Some((message_type, payload)))
}
