// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Exact-length reliable I/O over a byte stream
//!
//! [`read_full`] and [`write_full`] absorb short transfers and
//! interrupted calls; the frame helpers layer the codec on top so no
//! partial frame is ever exposed above this module.

use std::io::{self, Read, Write};

use super::message::{Message, HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::error::{Code, MpiError, MpiResult};

/// Read exactly `buf.len()` bytes
///
/// An interrupted read counts as zero progress and is retried. An
/// orderly peer close with bytes still outstanding is a transport
/// failure, not success.
pub fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> MpiResult<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(MpiError::new(
                    Code::TransportError,
                    format!(
                        "connection closed with {} of {} bytes outstanding",
                        buf.len() - filled,
                        buf.len()
                    ),
                ))
            }
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(MpiError::new(
                    Code::TransportError,
                    format!("read failed: {e}"),
                ))
            }
        }
    }
    Ok(())
}

/// Write all of `buf`, retrying interrupted calls
pub fn write_full<W: Write>(writer: &mut W, buf: &[u8]) -> MpiResult<()> {
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => {
                return Err(MpiError::new(
                    Code::TransportError,
                    "connection closed before write completed",
                ))
            }
            Ok(n) => written += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(MpiError::new(
                    Code::TransportError,
                    format!("write failed: {e}"),
                ))
            }
        }
    }
    Ok(())
}

/// Read one complete frame and decode it
pub fn read_frame<R: Read>(reader: &mut R) -> MpiResult<Message> {
    let mut header = [0u8; HEADER_LEN];
    read_full(reader, &mut header)?;

    let payload_len =
        u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    // Checked before the allocation, so a garbage length header cannot
    // drive a multi-gigabyte reservation.
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(MpiError::new(
            Code::ProtocolError,
            format!(
                "frame declares {payload_len} payload bytes, limit is {MAX_PAYLOAD_LEN}"
            ),
        ));
    }

    let mut frame = vec![0u8; HEADER_LEN + payload_len];
    frame[..HEADER_LEN].copy_from_slice(&header);
    if payload_len > 0 {
        read_full(reader, &mut frame[HEADER_LEN..])?;
    }

    Message::decode(&frame)
}

/// Encode and write one complete frame
pub fn write_frame<W: Write>(writer: &mut W, message: &Message) -> MpiResult<()> {
    write_full(writer, &message.encode())?;
    writer.flush()?;
    Ok(())
}
