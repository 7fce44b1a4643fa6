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

//! Communicator: routing table plus the blocking send/receive engine

use std::collections::BTreeMap;
use std::net::TcpStream;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

use super::message::{Message, MAX_PAYLOAD_LEN};
use super::transport::{read_frame, read_full, write_frame, write_full};
use super::ROOT_RANK;
use crate::data_types::DataType;
use crate::error::{Code, MpiError, MpiResult};

/// Byte the root writes to every peer to release it from finalize
const TERMINATION_SIGNAL: [u8; 1] = [0];

/// One registered peer connection
pub struct RoutingEntry {
    /// Rank of the peer on the other end
    pub rank: u32,
    /// Address the peer advertised in its handshake
    pub address: u32,
    /// Port the peer advertised in its handshake
    pub port: u16,
    pub(crate) stream: TcpStream,
}

/// Receive source selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Accept a message from whichever registered connection is ready
    /// first (lowest rank when several are ready at once)
    Any,
    /// Block on the connection registered for this rank
    Rank(u32),
}

/// Outcome of the most recent receive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecvStatus {
    /// Rank the message came from; unset until a receive completes
    pub source: Option<u32>,
    /// Payload bytes received
    pub length: usize,
}

impl RecvStatus {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.source = None;
        self.length = 0;
    }
}

/// A process's private view of the communicator: its size, its own rank,
/// and a live connection per reachable peer
///
/// The root holds one entry per non-root rank; every non-root holds
/// exactly one entry, keyed by the root rank. The table is built once by
/// bootstrap and read-only afterwards.
pub struct Communicator {
    world_size: u32,
    rank: u32,
    table: BTreeMap<u32, RoutingEntry>,
}

impl Communicator {
    pub(crate) fn new(world_size: u32, rank: u32, table: BTreeMap<u32, RoutingEntry>) -> Self {
        Self {
            world_size,
            rank,
            table,
        }
    }

    /// Total process count
    pub fn world_size(&self) -> u32 {
        self.world_size
    }

    /// Rank of the local process
    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn is_root(&self) -> bool {
        self.rank == ROOT_RANK
    }

    /// Ranks with a registered connection, ascending
    pub fn registered_ranks(&self) -> Vec<u32> {
        self.table.keys().copied().collect()
    }

    /// Routing entry for `rank`, if registered
    pub fn route(&self, rank: u32) -> Option<&RoutingEntry> {
        self.table.get(&rank)
    }

    fn entry(&self, rank: u32) -> MpiResult<&RoutingEntry> {
        self.table.get(&rank).ok_or_else(|| {
            MpiError::new(
                Code::RoutingError,
                format!("no connection registered for rank {rank}"),
            )
        })
    }

    /// Blocking send of `count` elements of `datatype` from `buf`
    ///
    /// The payload is the first `count * datatype.size()` bytes of `buf`.
    pub fn send(
        &self,
        dest: u32,
        buf: &[u8],
        count: usize,
        datatype: DataType,
        tag: u32,
    ) -> MpiResult<()> {
        let nbytes = count.checked_mul(datatype.size()).ok_or_else(|| {
            MpiError::new(
                Code::ArgumentError,
                format!("element count {count} overflows for {datatype}"),
            )
        })?;
        if nbytes > MAX_PAYLOAD_LEN {
            return Err(MpiError::new(
                Code::ArgumentError,
                format!(
                    "{count} x {datatype} is {nbytes} bytes, \
                     over the {MAX_PAYLOAD_LEN}-byte frame limit"
                ),
            ));
        }
        if buf.len() < nbytes {
            return Err(MpiError::new(
                Code::ArgumentError,
                format!(
                    "send buffer holds {} bytes but {count} x {datatype} needs {nbytes}",
                    buf.len()
                ),
            ));
        }

        let entry = self.entry(dest)?;
        let message = Message::data(datatype, tag, buf[..nbytes].to_vec());
        log::debug!(
            "rank {} sending {} bytes tag {} to rank {}",
            self.rank,
            nbytes,
            tag,
            dest
        );
        write_frame(&mut &entry.stream, &message)
    }

    /// Blocking receive of one message into `buf`
    ///
    /// Blocks until a frame arrives from the selected source, copies the
    /// payload into `buf`, and records the source rank and payload length
    /// in `status`. Returns the number of payload bytes received.
    ///
    /// The tag argument is carried for interface compatibility but does
    /// not filter delivery; messages are returned in arrival order.
    pub fn recv(
        &self,
        buf: &mut [u8],
        source: Source,
        _tag: u32,
        status: &mut RecvStatus,
    ) -> MpiResult<usize> {
        status.reset();

        let from = match source {
            Source::Rank(rank) => {
                self.entry(rank)?;
                rank
            }
            Source::Any => self.wait_any()?,
        };

        let entry = self.entry(from)?;
        let message = read_frame(&mut &entry.stream)?;
        let payload = match message {
            Message::Data { payload, .. } => payload,
            Message::Init { rank, .. } => {
                return Err(MpiError::new(
                    Code::ProtocolError,
                    format!("unexpected init frame (rank {rank}) outside bootstrap"),
                ))
            }
        };

        if buf.len() < payload.len() {
            return Err(MpiError::new(
                Code::ArgumentError,
                format!(
                    "receive buffer holds {} bytes but payload is {}",
                    buf.len(),
                    payload.len()
                ),
            ));
        }
        buf[..payload.len()].copy_from_slice(&payload);

        status.source = Some(from);
        status.length = payload.len();
        log::debug!(
            "rank {} received {} bytes from rank {}",
            self.rank,
            payload.len(),
            from
        );
        Ok(payload.len())
    }

    /// Elements of `datatype` in the most recent receive
    pub fn get_count(&self, status: &RecvStatus, datatype: DataType) -> usize {
        status.length / datatype.size()
    }

    #[cfg(unix)]
    fn wait_any(&self) -> MpiResult<u32> {
        // BTreeMap iteration is ascending, which is what gives the
        // lowest-rank tie-break its determinism.
        let fds: Vec<(u32, std::os::unix::io::RawFd)> = self
            .table
            .values()
            .map(|entry| (entry.rank, entry.stream.as_raw_fd()))
            .collect();
        super::readiness::wait_readable(&fds)
    }

    #[cfg(not(unix))]
    fn wait_any(&self) -> MpiResult<u32> {
        Err(MpiError::new(
            Code::TransportError,
            "wildcard receive is not supported on this platform",
        ))
    }

    /// Root side of shutdown: release every registered peer
    pub(crate) fn signal_termination(&self) -> MpiResult<()> {
        for entry in self.table.values() {
            write_full(&mut &entry.stream, &TERMINATION_SIGNAL)?;
        }
        Ok(())
    }

    /// Non-root side of shutdown: block until the root signals
    pub(crate) fn await_termination(&self) -> MpiResult<()> {
        let root = self.entry(ROOT_RANK)?;
        let mut signal = [0u8; 1];
        read_full(&mut &root.stream, &mut signal)
    }
}
