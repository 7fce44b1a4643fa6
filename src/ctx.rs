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

//! Process runtime lifecycle around a communicator
//!
//! A context moves `Uninitialized -> Initialized -> Finalized`, with
//! `Finalized` terminal. Every engine operation demands `Initialized`.
//! The context is an explicit value owned by the caller, so independent
//! communicators can coexist within one process (the integration tests
//! rely on this to run whole multi-rank scenarios as threads).

use crate::data_types::DataType;
use crate::error::{Code, MpiError, MpiResult};
use crate::net::bootstrap::{bootstrap, BootstrapConfig};
use crate::net::communicator::{Communicator, RecvStatus, Source};

/// Upper bound on the stored processor name length
pub const MAX_PROCESSOR_NAME: usize = 256;

/// Lifecycle states of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Finalized,
}

/// Process-wide runtime state: the communicator and its lifecycle
pub struct MpiContext {
    state: LifecycleState,
    comm: Option<Communicator>,
    processor_name: String,
}

impl Default for MpiContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MpiContext {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            comm: None,
            processor_name: String::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// One-time initialization: runs the rendezvous bootstrap
    pub fn init(&mut self, config: &BootstrapConfig) -> MpiResult<()> {
        match self.state {
            LifecycleState::Uninitialized => {}
            LifecycleState::Initialized => {
                return Err(MpiError::new(Code::StateError, "already initialized"))
            }
            LifecycleState::Finalized => {
                return Err(MpiError::new(
                    Code::StateError,
                    "context has been finalized",
                ))
            }
        }

        let comm = bootstrap(config)?;
        log::info!(
            "initialized rank {} of {} on {}",
            comm.rank(),
            comm.world_size(),
            config.hostname
        );

        let mut name = config.hostname.clone();
        name.truncate(MAX_PROCESSOR_NAME);
        self.processor_name = name;
        self.comm = Some(comm);
        self.state = LifecycleState::Initialized;
        Ok(())
    }

    fn comm(&self) -> MpiResult<&Communicator> {
        match self.state {
            LifecycleState::Initialized => self
                .comm
                .as_ref()
                .ok_or_else(|| MpiError::new(Code::StateError, "communicator missing")),
            LifecycleState::Uninitialized => {
                Err(MpiError::new(Code::StateError, "not initialized"))
            }
            LifecycleState::Finalized => {
                Err(MpiError::new(Code::StateError, "context has been finalized"))
            }
        }
    }

    /// Size of the communicator
    pub fn world_size(&self) -> MpiResult<u32> {
        Ok(self.comm()?.world_size())
    }

    /// Rank of the local process
    pub fn rank(&self) -> MpiResult<u32> {
        Ok(self.comm()?.rank())
    }

    /// Hostname captured at init, bounded to [`MAX_PROCESSOR_NAME`]
    pub fn processor_name(&self) -> MpiResult<&str> {
        self.comm()?;
        Ok(&self.processor_name)
    }

    /// Borrow the live communicator
    pub fn communicator(&self) -> MpiResult<&Communicator> {
        self.comm()
    }

    /// Blocking send; see [`Communicator::send`]
    pub fn send(
        &self,
        dest: u32,
        buf: &[u8],
        count: usize,
        datatype: DataType,
        tag: u32,
    ) -> MpiResult<()> {
        self.comm()?.send(dest, buf, count, datatype, tag)
    }

    /// Blocking receive; see [`Communicator::recv`]
    pub fn recv(
        &self,
        buf: &mut [u8],
        source: Source,
        tag: u32,
        status: &mut RecvStatus,
    ) -> MpiResult<usize> {
        self.comm()?.recv(buf, source, tag, status)
    }

    /// Elements of `datatype` in the most recent receive
    pub fn get_count(&self, status: &RecvStatus, datatype: DataType) -> MpiResult<usize> {
        Ok(self.comm()?.get_count(status, datatype))
    }

    /// Shut the communicator down and release every connection
    ///
    /// The root writes the one-byte termination signal to every
    /// registered peer; every non-root blocks reading that byte from its
    /// root connection before tearing down. Root-initiated so non-roots
    /// cannot wait forever.
    pub fn finalize(&mut self) -> MpiResult<()> {
        self.comm()?;
        let comm = self
            .comm
            .take()
            .ok_or_else(|| MpiError::new(Code::StateError, "communicator missing"))?;

        let handshake = if comm.is_root() {
            comm.signal_termination()
        } else {
            comm.await_termination()
        };

        // Dropping the communicator closes each connection exactly once.
        drop(comm);
        self.state = LifecycleState::Finalized;
        log::info!("finalized");
        handshake
    }
}
