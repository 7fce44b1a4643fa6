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

//! Round-trip latency benchmark
//!
//! The root sends a message of each size to every peer and waits for the
//! echo, sweeping sizes from 2^3 to 2^22 bytes. Per (size, peer) it runs
//! 8 iterations, discards the first as warm-up, and prints min/avg/max
//! round-trip times.
//!
//! Usage: `rtt <count> <rank> <hostname> <root-hostname> <root-port>`

use std::env;
use std::process::ExitCode;
use std::time::Instant;

use minimpi::{
    BootstrapConfig, Code, DataType, MpiContext, MpiError, MpiResult, RecvStatus, Source,
    ROOT_RANK,
};

const RTT_ITERATIONS: usize = 8;
const MSG_START_EXP: u32 = 3;
const MSG_END_EXP: u32 = 22;

fn main() -> ExitCode {
    minimpi::util::logging::init_logging();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rtt: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> MpiResult<()> {
    let config = BootstrapConfig::from_args(env::args().skip(1))?;
    let mut ctx = MpiContext::new();
    ctx.init(&config)?;

    let world_size = ctx.world_size()?;
    let rank = ctx.rank()?;
    log::debug!("processor {} has rank {rank}", ctx.processor_name()?);

    let result = if rank == ROOT_RANK {
        run_root(&ctx, world_size)
    } else {
        run_echo(&ctx)
    };

    // Finalize even on benchmark failure so peers are released.
    let finalized = ctx.finalize();
    result.and(finalized)
}

/// Root: time a send/echo round trip per message size and peer
fn run_root(ctx: &MpiContext, world_size: u32) -> MpiResult<()> {
    let mut status = RecvStatus::new();

    for exp in MSG_START_EXP..=MSG_END_EXP {
        let msg_size = 1usize << exp;
        let buffer = vec![0u8; msg_size];
        let mut echo = vec![0u8; msg_size];

        print!("{msg_size:<8}");
        for peer in 1..world_size {
            let mut min_rtt = f64::MAX;
            let mut max_rtt = 0.0f64;
            let mut cum_rtt = 0.0f64;

            for iteration in 0..RTT_ITERATIONS {
                let started = Instant::now();
                ctx.send(peer, &buffer, msg_size, DataType::Char, 0)?;
                ctx.recv(&mut echo, Source::Any, 0, &mut status)?;
                let rtt = started.elapsed().as_secs_f64();

                if status.source != Some(peer) {
                    return Err(MpiError::new(
                        Code::ProtocolError,
                        format!("echo from rank {:?}, expected {peer}", status.source),
                    ));
                }
                let echoed = ctx.get_count(&status, DataType::Char)?;
                if echoed != msg_size {
                    return Err(MpiError::new(
                        Code::ProtocolError,
                        format!("echo of {echoed} bytes, expected {msg_size}"),
                    ));
                }

                // First iteration warms the path up and is excluded
                if iteration != 0 {
                    min_rtt = min_rtt.min(rtt);
                    max_rtt = max_rtt.max(rtt);
                    cum_rtt += rtt;
                }
            }

            let avg_rtt = cum_rtt / (RTT_ITERATIONS - 1) as f64;
            print!("{min_rtt:e} {avg_rtt:e} {max_rtt:e} ");
        }
        println!();
    }

    Ok(())
}

/// Non-root: echo every message straight back to the root
fn run_echo(ctx: &MpiContext) -> MpiResult<()> {
    let nr_sizes = (MSG_END_EXP - MSG_START_EXP + 1) as usize;
    let mut buffer = vec![0u8; 1usize << MSG_END_EXP];
    let mut status = RecvStatus::new();

    for _ in 0..RTT_ITERATIONS * nr_sizes {
        let received = ctx.recv(&mut buffer, Source::Rank(ROOT_RANK), 0, &mut status)?;
        ctx.send(ROOT_RANK, &buffer[..received], received, DataType::Char, 0)?;
    }

    Ok(())
}
