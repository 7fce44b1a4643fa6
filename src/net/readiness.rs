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

//! Readiness multiplexing over the routing table's connections
//!
//! Blocks in `poll(2)` with no timeout until at least one connection has
//! data available. When several are ready at once, the lowest rank wins,
//! so wildcard receive order is deterministic.

use std::os::unix::io::RawFd;

use crate::error::{Code, MpiError, MpiResult};

/// Wait until one of `fds` is readable and return its rank
///
/// `fds` must be sorted by ascending rank; the first ready slot in that
/// order is reported. A hangup or error condition counts as readable so
/// the subsequent read surfaces the failure instead of blocking forever.
pub(crate) fn wait_readable(fds: &[(u32, RawFd)]) -> MpiResult<u32> {
    if fds.is_empty() {
        return Err(MpiError::new(
            Code::RoutingError,
            "no connections registered to wait on",
        ));
    }

    let mut pollfds: Vec<libc::pollfd> = fds
        .iter()
        .map(|&(_, fd)| libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();

    loop {
        let rc = unsafe { libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, -1) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(MpiError::new(
                Code::TransportError,
                format!("poll failed: {err}"),
            ));
        }

        for (slot, &(rank, _)) in pollfds.iter().zip(fds) {
            if slot.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
                return Ok(rank);
            }
        }
        // poll returned without any slot we care about; wait again
    }
}
