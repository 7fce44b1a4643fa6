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

//! Shared helpers for multi-rank scenarios run as loopback threads

use std::net::TcpListener;

use minimpi::{BootstrapConfig, MpiContext};

/// Pick a port that is currently free on loopback
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Bootstrap parameters for one rank of a loopback communicator
pub fn config(world_size: u32, rank: u32, root_port: u16) -> BootstrapConfig {
    BootstrapConfig::new(
        world_size,
        rank,
        format!("host{rank}"),
        "127.0.0.1",
        root_port,
    )
    .unwrap()
}

/// Initialize a context for one rank of a loopback communicator
pub fn init_rank(world_size: u32, rank: u32, root_port: u16) -> MpiContext {
    let mut ctx = MpiContext::new();
    ctx.init(&config(world_size, rank, root_port)).unwrap();
    ctx
}
