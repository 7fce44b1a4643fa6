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

//! minimpi: minimal point-to-point message passing over TCP
//!
//! A fixed set of cooperating processes rendezvous through a root process
//! (rank 0) and exchange tagged, typed payloads over a star topology of
//! TCP connections. The crate provides the wire codec, the rendezvous
//! bootstrap, a blocking send/receive engine with wildcard receive, and
//! the process lifecycle around them.

pub mod ctx;
pub mod data_types;
pub mod error;
pub mod net;
pub mod util;

// Re-export commonly used types
pub use crate::ctx::{LifecycleState, MpiContext, MAX_PROCESSOR_NAME};
pub use crate::data_types::DataType;
pub use crate::error::{Code, MpiError, MpiResult};
pub use crate::net::bootstrap::BootstrapConfig;
pub use crate::net::communicator::{Communicator, RecvStatus, Source};
pub use crate::net::ROOT_RANK;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
