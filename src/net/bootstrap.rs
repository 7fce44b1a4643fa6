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

//! Communicator bootstrap: the rendezvous that builds the routing table
//!
//! The root listens on its well-known port and accepts one handshake per
//! non-root rank; every non-root connects to the root and announces its
//! rank with an init frame. Star topology: non-roots never connect to
//! each other.

use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use super::communicator::{Communicator, RoutingEntry};
use super::message::Message;
use super::transport::{read_frame, write_frame};
use super::ROOT_RANK;
use crate::error::{Code, MpiError, MpiResult};

/// Listen backlog for the root's rendezvous socket
const ACCEPT_BACKLOG: i32 = 100;

/// Consecutive failed handshakes tolerated before the rendezvous aborts
pub const MAX_ACCEPT_FAILURES: u32 = 32;

/// Connection attempts a non-root makes before giving up on the root
const CONNECT_RETRIES: u32 = 10;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// The five positional bootstrap parameters
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Total process count, >= 1
    pub world_size: u32,
    /// Rank of the local process, < world_size
    pub rank: u32,
    /// Hostname of the local process
    pub hostname: String,
    /// Hostname of the root process
    pub root_host: String,
    /// Port the root's rendezvous listener binds
    pub root_port: u16,
}

impl BootstrapConfig {
    pub fn new(
        world_size: u32,
        rank: u32,
        hostname: impl Into<String>,
        root_host: impl Into<String>,
        root_port: u16,
    ) -> MpiResult<Self> {
        let config = Self {
            world_size,
            rank,
            hostname: hostname.into(),
            root_host: root_host.into(),
            root_port,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse the five positional parameters:
    /// process count, local rank, local hostname, root hostname, root port
    pub fn from_args<I>(args: I) -> MpiResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        if args.len() != 5 {
            return Err(MpiError::new(
                Code::ArgumentError,
                format!(
                    "expected 5 positional parameters \
                     (count rank hostname root-hostname root-port), got {}",
                    args.len()
                ),
            ));
        }

        let world_size = parse_number(&args[0], "process count")?;
        let rank = parse_number(&args[1], "rank")?;
        let root_port = parse_number(&args[4], "root port")?;

        Self::new(world_size, rank, args[2].clone(), args[3].clone(), root_port)
    }

    pub fn validate(&self) -> MpiResult<()> {
        if self.world_size < 1 {
            return Err(MpiError::new(
                Code::ArgumentError,
                format!("process count must be at least 1, got {}", self.world_size),
            ));
        }
        if self.rank >= self.world_size {
            return Err(MpiError::new(
                Code::ArgumentError,
                format!(
                    "rank {} is outside the communicator of size {}",
                    self.rank, self.world_size
                ),
            ));
        }
        Ok(())
    }

    pub fn is_root(&self) -> bool {
        self.rank == ROOT_RANK
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, what: &str) -> MpiResult<T> {
    raw.parse().map_err(|_| {
        MpiError::new(
            Code::ArgumentError,
            format!("invalid {what}: {raw:?}"),
        )
    })
}

/// Run the rendezvous and build the routing table
pub fn bootstrap(config: &BootstrapConfig) -> MpiResult<Communicator> {
    config.validate()?;

    let table = if config.is_root() {
        accept_peers(config)?
    } else {
        connect_root(config)?
    };

    Ok(Communicator::new(config.world_size, config.rank, table))
}

/// Root path: accept handshakes until every non-root rank is registered
fn accept_peers(config: &BootstrapConfig) -> MpiResult<BTreeMap<u32, RoutingEntry>> {
    let listener = listen(config.root_port)?;
    let expected = (config.world_size - 1) as usize;
    log::info!(
        "root listening on port {} for {} peer(s)",
        config.root_port,
        expected
    );

    let mut table = BTreeMap::new();
    let mut failures = 0u32;
    while table.len() < expected {
        match accept_one(&listener, config.world_size, &table) {
            Ok(entry) => {
                log::info!(
                    "registered rank {} ({}/{} peers)",
                    entry.rank,
                    table.len() + 1,
                    expected
                );
                failures = 0;
                table.insert(entry.rank, entry);
            }
            Err(e) => {
                failures += 1;
                log::warn!(
                    "handshake attempt failed ({failures}/{MAX_ACCEPT_FAILURES}): {e}"
                );
                if failures >= MAX_ACCEPT_FAILURES {
                    return Err(MpiError::new(
                        Code::TransportError,
                        format!(
                            "rendezvous aborted after {MAX_ACCEPT_FAILURES} \
                             consecutive failed handshakes"
                        ),
                    ));
                }
            }
        }
    }

    Ok(table)
}

fn listen(port: u16) -> MpiResult<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| MpiError::new(Code::TransportError, format!("socket create failed: {e}")))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| MpiError::new(Code::TransportError, format!("reuse-address failed: {e}")))?;

    let addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], port));
    socket
        .bind(&addr.into())
        .map_err(|e| MpiError::new(Code::TransportError, format!("bind to port {port} failed: {e}")))?;
    socket
        .listen(ACCEPT_BACKLOG)
        .map_err(|e| MpiError::new(Code::TransportError, format!("listen failed: {e}")))?;

    Ok(socket.into())
}

/// Accept one connection and run its handshake
fn accept_one(
    listener: &TcpListener,
    world_size: u32,
    table: &BTreeMap<u32, RoutingEntry>,
) -> MpiResult<RoutingEntry> {
    let (stream, peer_addr) = listener
        .accept()
        .map_err(|e| MpiError::new(Code::TransportError, format!("accept failed: {e}")))?;
    stream.set_nodelay(true).ok();
    log::debug!("accepted connection from {peer_addr}");

    match read_frame(&mut &stream)? {
        Message::Init {
            rank,
            address,
            port,
        } => {
            if rank == ROOT_RANK || rank >= world_size {
                return Err(MpiError::new(
                    Code::ProtocolError,
                    format!("handshake rank {rank} out of range for size {world_size}"),
                ));
            }
            if table.contains_key(&rank) {
                return Err(MpiError::new(
                    Code::ProtocolError,
                    format!("rank {rank} is already registered"),
                ));
            }
            Ok(RoutingEntry {
                rank,
                address,
                port,
                stream,
            })
        }
        Message::Data { .. } => Err(MpiError::new(
            Code::ProtocolError,
            "expected init frame in handshake, got data frame",
        )),
    }
}

/// Non-root path: connect to the root and announce our rank
fn connect_root(config: &BootstrapConfig) -> MpiResult<BTreeMap<u32, RoutingEntry>> {
    let addr = resolve(&config.root_host, config.root_port)?;
    let stream = connect_with_retry(addr)?;
    stream.set_nodelay(true).ok();

    // Advertised address/port complete the handshake format; nothing
    // consumes them downstream in a star topology.
    let local_address = match stream.local_addr() {
        Ok(SocketAddr::V4(v4)) => u32::from(*v4.ip()),
        _ => 0,
    };
    write_frame(&mut &stream, &Message::init(config.rank, local_address, 0))?;
    log::info!(
        "rank {} connected to root at {}",
        config.rank,
        addr
    );

    let mut table = BTreeMap::new();
    table.insert(
        ROOT_RANK,
        RoutingEntry {
            rank: ROOT_RANK,
            address: 0,
            port: config.root_port,
            stream,
        },
    );
    Ok(table)
}

fn resolve(host: &str, port: u16) -> MpiResult<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            MpiError::new(
                Code::TransportError,
                format!("failed to resolve {host}: {e}"),
            )
        })?
        .next()
        .ok_or_else(|| {
            MpiError::new(
                Code::ArgumentError,
                format!("host {host} resolved to no addresses"),
            )
        })
}

fn connect_with_retry(addr: SocketAddr) -> MpiResult<TcpStream> {
    let mut attempt = 0;
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                attempt += 1;
                if attempt >= CONNECT_RETRIES {
                    return Err(MpiError::new(
                        Code::TransportError,
                        format!(
                            "failed to connect to root at {addr} \
                             after {CONNECT_RETRIES} attempts: {e}"
                        ),
                    ));
                }
                log::warn!("connect to {addr} failed (attempt {attempt}): {e}");
                thread::sleep(CONNECT_RETRY_DELAY);
            }
        }
    }
}
