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

//! Messaging engine tests: blocking send, wildcard receive, get_count

mod common;

use std::thread;

use minimpi::net::MAX_PAYLOAD_LEN;
use minimpi::{Code, DataType, RecvStatus, Source, ROOT_RANK};

/// Scenario: rank 0 sends a 1024-byte char payload with tag 7 to rank 1;
/// rank 1's wildcard receive reports source 0 and a char count of 1024.
#[test]
fn wildcard_receive_reports_source_and_count() {
    let port = common::free_port();

    let root = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 0, port);
        let payload: Vec<u8> = (0..1024u32).map(|i| i as u8).collect();
        ctx.send(1, &payload, 1024, DataType::Char, 7).unwrap();
        ctx.finalize().unwrap();
    });

    let peer = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 1, port);
        let mut buf = vec![0u8; 2048];
        let mut status = RecvStatus::new();

        let received = ctx
            .recv(&mut buf, Source::Any, 0, &mut status)
            .unwrap();

        assert_eq!(received, 1024);
        assert_eq!(status.source, Some(ROOT_RANK));
        assert_eq!(status.length, 1024);
        assert_eq!(ctx.get_count(&status, DataType::Char).unwrap(), 1024);
        let expected: Vec<u8> = (0..1024u32).map(|i| i as u8).collect();
        assert_eq!(&buf[..1024], &expected[..]);

        ctx.finalize().unwrap();
    });

    root.join().unwrap();
    peer.join().unwrap();
}

/// Scenario: ranks 1 and 2 each send one message to the root at
/// overlapping times; two sequential wildcard receives return exactly one
/// complete message each, with distinct sources and intact payloads.
#[test]
fn overlapping_sends_arrive_whole_and_distinct() {
    let port = common::free_port();

    let root = thread::spawn(move || {
        let mut ctx = common::init_rank(3, 0, port);
        let mut buf = vec![0u8; 4096];
        let mut status = RecvStatus::new();
        let mut seen = Vec::new();

        for _ in 0..2 {
            let received = ctx.recv(&mut buf, Source::Any, 0, &mut status).unwrap();
            let source = status.source.unwrap();
            assert_eq!(received, 512);
            // Each sender fills its payload with its own rank
            assert!(buf[..512].iter().all(|&b| b == source as u8));
            seen.push(source);
        }

        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2]);
        ctx.finalize().unwrap();
    });

    let senders: Vec<_> = [1u32, 2]
        .into_iter()
        .map(|rank| {
            thread::spawn(move || {
                let mut ctx = common::init_rank(3, rank, port);
                let payload = vec![rank as u8; 512];
                ctx.send(ROOT_RANK, &payload, 512, DataType::Char, rank)
                    .unwrap();
                ctx.finalize().unwrap();
            })
        })
        .collect();

    root.join().unwrap();
    for sender in senders {
        sender.join().unwrap();
    }
}

#[test]
fn directed_receive_blocks_on_the_named_rank() {
    let port = common::free_port();

    let root = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 0, port);
        let payload = [1u8, 2, 3, 4, 5, 6, 7, 8];
        ctx.send(1, &payload, 2, DataType::Int, 0).unwrap();
        ctx.finalize().unwrap();
    });

    let peer = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 1, port);
        let mut buf = [0u8; 8];
        let mut status = RecvStatus::new();

        ctx.recv(&mut buf, Source::Rank(ROOT_RANK), 0, &mut status)
            .unwrap();

        assert_eq!(status.source, Some(ROOT_RANK));
        assert_eq!(status.length, 8);
        assert_eq!(ctx.get_count(&status, DataType::Int).unwrap(), 2);
        assert_eq!(ctx.get_count(&status, DataType::Double).unwrap(), 1);
        assert_eq!(ctx.get_count(&status, DataType::Char).unwrap(), 8);
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);

        ctx.finalize().unwrap();
    });

    root.join().unwrap();
    peer.join().unwrap();
}

#[test]
fn send_to_unregistered_rank_is_routing_error() {
    let port = common::free_port();

    let root = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 0, port);
        // The root routes to rank 1 only; rank 5 and itself are unknown.
        let err = ctx.send(5, &[0u8; 4], 4, DataType::Char, 0).unwrap_err();
        assert_eq!(err.code(), Code::RoutingError);
        let err = ctx.send(0, &[0u8; 4], 4, DataType::Char, 0).unwrap_err();
        assert_eq!(err.code(), Code::RoutingError);
        ctx.finalize().unwrap();
    });

    let peer = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 1, port);
        let err = ctx
            .recv(&mut [0u8; 4], Source::Rank(2), 0, &mut RecvStatus::new())
            .unwrap_err();
        assert_eq!(err.code(), Code::RoutingError);
        ctx.finalize().unwrap();
    });

    root.join().unwrap();
    peer.join().unwrap();
}

#[test]
fn short_send_buffer_is_argument_error() {
    let port = common::free_port();

    let root = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 0, port);
        // 4 doubles need 32 bytes
        let err = ctx
            .send(1, &[0u8; 16], 4, DataType::Double, 0)
            .unwrap_err();
        assert_eq!(err.code(), Code::ArgumentError);
        ctx.finalize().unwrap();
    });

    let peer = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 1, port);
        ctx.finalize().unwrap();
    });

    root.join().unwrap();
    peer.join().unwrap();
}

/// A payload too large for the frame's 32-bit length field is rejected
/// up front instead of truncating the length header on the wire.
#[test]
fn oversized_send_is_argument_error() {
    let port = common::free_port();

    let root = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 0, port);
        let err = ctx
            .send(1, &[0u8; 8], MAX_PAYLOAD_LEN + 1, DataType::Char, 0)
            .unwrap_err();
        assert_eq!(err.code(), Code::ArgumentError);
        assert!(err.to_string().contains("frame limit"));

        // count * element size must not wrap around either
        let err = ctx
            .send(1, &[0u8; 8], usize::MAX, DataType::Double, 0)
            .unwrap_err();
        assert_eq!(err.code(), Code::ArgumentError);

        ctx.finalize().unwrap();
    });

    let peer = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 1, port);
        ctx.finalize().unwrap();
    });

    root.join().unwrap();
    peer.join().unwrap();
}

#[test]
fn short_receive_buffer_is_argument_error() {
    let port = common::free_port();

    let root = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 0, port);
        ctx.send(1, &[7u8; 100], 100, DataType::Char, 0).unwrap();
        ctx.finalize().unwrap();
    });

    let peer = thread::spawn(move || {
        let mut ctx = common::init_rank(2, 1, port);
        let mut status = RecvStatus::new();
        let err = ctx
            .recv(&mut [0u8; 10], Source::Any, 0, &mut status)
            .unwrap_err();
        assert_eq!(err.code(), Code::ArgumentError);
        // The failed receive leaves the status reset
        assert_eq!(status, RecvStatus::new());
        ctx.finalize().unwrap();
    });

    root.join().unwrap();
    peer.join().unwrap();
}
