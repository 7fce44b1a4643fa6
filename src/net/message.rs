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

//! Wire message codec
//!
//! Every frame starts with a fixed 20-byte header followed by `length`
//! payload bytes (always 0 for init frames):
//!
//! ```text
//! offset  size  field
//!      0     4  length (payload byte count)
//!      4     4  type (1 = init, 2 = data)
//!      8    12  variant block:
//!               init: rank (4), address (4), port (2), padding (2)
//!               data: tag (4), reserved (4), datatype code (4)
//! ```
//!
//! All header fields travel in network byte order so hosts of differing
//! endianness interoperate. This module performs no I/O.

use crate::data_types::DataType;
use crate::error::{Code, MpiError, MpiResult};

/// Fixed header size of every frame, in bytes
pub const HEADER_LEN: usize = 20;

/// Upper bound on the payload bytes one frame may carry
///
/// Well below what the 32-bit length field can express, so a garbage
/// length header can be rejected before any allocation happens.
pub const MAX_PAYLOAD_LEN: usize = 1 << 30;

/// Type code for init frames
const TYPE_INIT: u32 = 1;
/// Type code for data frames
const TYPE_DATA: u32 = 2;

/// One wire-format message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Rendezvous handshake: a peer announces its rank and listening
    /// coordinates to the root. Carries no payload.
    Init { rank: u32, address: u32, port: u16 },
    /// Application payload, tagged and typed
    Data {
        datatype: DataType,
        tag: u32,
        payload: Vec<u8>,
    },
}

impl Message {
    /// Build an init message
    pub fn init(rank: u32, address: u32, port: u16) -> Self {
        Message::Init {
            rank,
            address,
            port,
        }
    }

    /// Build a data message owning its payload
    pub fn data(datatype: DataType, tag: u32, payload: Vec<u8>) -> Self {
        Message::Data {
            datatype,
            tag,
            payload,
        }
    }

    /// Payload byte count carried by this message (0 for init)
    pub fn payload_len(&self) -> usize {
        match self {
            Message::Init { .. } => 0,
            Message::Data { payload, .. } => payload.len(),
        }
    }

    fn type_code(&self) -> u32 {
        match self {
            Message::Init { .. } => TYPE_INIT,
            Message::Data { .. } => TYPE_DATA,
        }
    }

    /// Serialize into one complete frame (header plus payload)
    ///
    /// Panics if the payload exceeds [`MAX_PAYLOAD_LEN`]; the send path
    /// validates payload sizes before a message is ever constructed.
    pub fn encode(&self) -> Vec<u8> {
        let length = self.payload_len();
        assert!(
            length <= MAX_PAYLOAD_LEN,
            "payload of {length} bytes exceeds the {MAX_PAYLOAD_LEN}-byte frame limit"
        );
        let mut frame = vec![0u8; HEADER_LEN + length];
        frame[0..4].copy_from_slice(&(length as u32).to_be_bytes());
        frame[4..8].copy_from_slice(&self.type_code().to_be_bytes());

        match self {
            Message::Init {
                rank,
                address,
                port,
            } => {
                frame[8..12].copy_from_slice(&rank.to_be_bytes());
                frame[12..16].copy_from_slice(&address.to_be_bytes());
                frame[16..18].copy_from_slice(&port.to_be_bytes());
                // bytes 18..20 stay zero padding
            }
            Message::Data {
                datatype,
                tag,
                payload,
            } => {
                frame[8..12].copy_from_slice(&tag.to_be_bytes());
                // bytes 12..16 are reserved and stay zero
                frame[16..20].copy_from_slice(&datatype.code().to_be_bytes());
                frame[HEADER_LEN..].copy_from_slice(payload);
            }
        }

        frame
    }

    /// Parse one complete frame
    ///
    /// Rejects frames that are shorter than the header, carry an unknown
    /// type code, declare a nonzero length for an init frame, or declare
    /// a data length that disagrees with the bytes actually present.
    pub fn decode(frame: &[u8]) -> MpiResult<Message> {
        if frame.len() < HEADER_LEN {
            return Err(MpiError::new(
                Code::ProtocolError,
                format!(
                    "frame too short: {} bytes, header needs {}",
                    frame.len(),
                    HEADER_LEN
                ),
            ));
        }

        let length = read_u32(frame, 0) as usize;
        let type_code = read_u32(frame, 4);

        match type_code {
            TYPE_INIT => {
                if length != 0 {
                    return Err(MpiError::new(
                        Code::ProtocolError,
                        format!("init frame declares nonzero payload length {length}"),
                    ));
                }
                Ok(Message::Init {
                    rank: read_u32(frame, 8),
                    address: read_u32(frame, 12),
                    port: read_u16(frame, 16),
                })
            }
            TYPE_DATA => {
                let carried = frame.len() - HEADER_LEN;
                if length != carried {
                    return Err(MpiError::new(
                        Code::ProtocolError,
                        format!("data frame declares {length} payload bytes but carries {carried}"),
                    ));
                }
                let datatype = DataType::from_code(read_u32(frame, 16)).map_err(|e| {
                    MpiError::new(Code::ProtocolError, format!("data frame header: {e}"))
                })?;
                Ok(Message::Data {
                    datatype,
                    tag: read_u32(frame, 8),
                    payload: frame[HEADER_LEN..].to_vec(),
                })
            }
            other => Err(MpiError::new(
                Code::ProtocolError,
                format!("unknown message type code {other}"),
            )),
        }
    }
}

#[inline]
fn read_u32(frame: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([frame[at], frame[at + 1], frame[at + 2], frame[at + 3]])
}

#[inline]
fn read_u16(frame: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([frame[at], frame[at + 1]])
}
