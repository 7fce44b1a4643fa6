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

//! Networking and communication components
//!
//! The layering, leaves first: [`message`] is the pure wire codec,
//! [`transport`] moves exact-length byte runs and whole frames over a
//! stream, [`bootstrap`] runs the rendezvous that builds the routing
//! table, and [`communicator`] is the blocking send/receive engine on
//! top of it.

pub mod bootstrap;
pub mod communicator;
pub mod message;
#[cfg(unix)]
pub(crate) mod readiness;
pub mod transport;

// Re-exports for convenience
pub use bootstrap::{bootstrap, BootstrapConfig};
pub use communicator::{Communicator, RecvStatus, RoutingEntry, Source};
pub use message::{Message, MAX_PAYLOAD_LEN};

/// Rank of the rendezvous root in every communicator
pub const ROOT_RANK: u32 = 0;
