//! Tests for the System V transport
//!
//! These tests run against real kernel queues. Every test uses keys derived
//! from the process id and removes its queues when done.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gpiosysv::driver::MemoryDriver;
use gpiosysv::ipc::{drain_queue, SysVTransport, TagFilter, Transport, Wait};
use gpiosysv::protocol::{CommandName, REQUEST_TAG};
use gpiosysv::server::{DropReason, Outcome, Server};
use gpiosysv::{Client, Config, GpioError, PinId, PinValue};

// =============================================================================
// Helper Functions
// =============================================================================

static NEXT: AtomicI32 = AtomicI32::new(0);

/// Queue key unique to this process and test
fn unique_key() -> i32 {
    let pid = std::process::id() as i32 & 0x00FF_FFFF;
    0x5100_0000 | (pid << 4 & 0x00FF_FFF0) | (NEXT.fetch_add(1, Ordering::Relaxed) & 0xF)
}

/// Removes the queue on drop so failing tests do not leak it
struct QueueGuard<'a> {
    transport: &'a SysVTransport,
    key: i32,
}

impl Drop for QueueGuard<'_> {
    fn drop(&mut self) {
        let _ = self.transport.remove(self.key);
    }
}

fn setup() -> (SysVTransport, i32) {
    (SysVTransport::new(), unique_key())
}

// =============================================================================
// Delivery Tests
// =============================================================================

#[test]
fn test_send_and_receive() {
    let (transport, key) = setup();
    let _guard = QueueGuard { transport: &transport, key };

    transport.send(key, 0x4746, b"payload").unwrap();
    assert_eq!(transport.pending(key).unwrap(), 1);

    let message = transport
        .receive(key, TagFilter::Exact(0x4746), Wait::NoWait)
        .unwrap()
        .unwrap();
    assert_eq!(message.tag, 0x4746);
    assert_eq!(message.payload, b"payload");
    assert_eq!(transport.pending(key).unwrap(), 0);
}

#[test]
fn test_tag_filter() {
    let (transport, key) = setup();
    let _guard = QueueGuard { transport: &transport, key };

    transport.send(key, 1, b"one").unwrap();
    transport.send(key, 2, b"two").unwrap();

    let message = transport.receive(key, TagFilter::Exact(2), Wait::NoWait).unwrap().unwrap();
    assert_eq!(message.payload, b"two");

    let message = transport.receive(key, TagFilter::Any, Wait::NoWait).unwrap().unwrap();
    assert_eq!(message.payload, b"one");
}

#[test]
fn test_empty_payload() {
    let (transport, key) = setup();
    let _guard = QueueGuard { transport: &transport, key };

    transport.send(key, 5, b"").unwrap();
    let message = transport.receive(key, TagFilter::Any, Wait::NoWait).unwrap().unwrap();
    assert!(message.payload.is_empty());
}

#[test]
fn test_receive_timeout() {
    let (transport, key) = setup();
    let _guard = QueueGuard { transport: &transport, key };

    let start = Instant::now();
    let received = transport
        .receive(key, TagFilter::Any, Wait::Timeout(Duration::from_millis(60)))
        .unwrap();

    assert!(received.is_none());
    assert!(start.elapsed() >= Duration::from_millis(60));
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_absent_queue() {
    let (transport, key) = setup();

    assert!(!transport.exists(key).unwrap());
    assert_eq!(transport.pending(key).unwrap(), 0);
    transport.remove(key).unwrap();
}

#[test]
fn test_remove_then_recreate() {
    let (transport, key) = setup();
    let _guard = QueueGuard { transport: &transport, key };

    transport.send(key, 1, b"old").unwrap();
    transport.remove(key).unwrap();
    assert!(!transport.exists(key).unwrap());

    transport.send(key, 1, b"new").unwrap();
    let message = transport.receive(key, TagFilter::Any, Wait::NoWait).unwrap().unwrap();
    assert_eq!(message.payload, b"new");
}

#[test]
fn test_drain_then_absent() {
    let (transport, key) = setup();
    let _guard = QueueGuard { transport: &transport, key };

    for tag in 1..=3 {
        transport.send(key, tag, b"m").unwrap();
    }

    assert_eq!(drain_queue(&transport, key, true).unwrap(), 3);
    assert!(!transport.exists(key).unwrap());
}

// =============================================================================
// Limit Tests
// =============================================================================

#[test]
fn test_oversized_payload_refused() {
    let (transport, key) = setup();
    let _guard = QueueGuard { transport: &transport, key };

    let payload = vec![0u8; transport.max_payload() + 1];
    assert!(matches!(
        transport.send(key, 1, &payload),
        Err(GpioError::MessageTooLarge { .. })
    ));
}

#[test]
fn test_invalid_tag_refused() {
    let (transport, key) = setup();
    let _guard = QueueGuard { transport: &transport, key };

    let err = transport.send(key, 0, b"x").unwrap_err();
    assert_eq!(err.code(), libc::EINVAL);
}

#[test]
fn test_oversized_message_is_cut_and_consumed() {
    let (transport, key) = setup();
    let _guard = QueueGuard { transport: &transport, key };
    let wide = SysVTransport::with_max_payload(4096);

    wide.send(key, 1, &vec![0xAB; 3000]).unwrap();
    wide.send(key, 1, b"next").unwrap();

    let cut = transport.receive(key, TagFilter::Any, Wait::NoWait).unwrap().unwrap();
    assert!(cut.payload.len() < 3000);
    assert!(cut.payload.len() <= transport.max_payload());

    let next = transport.receive(key, TagFilter::Any, Wait::NoWait).unwrap().unwrap();
    assert_eq!(next.payload, b"next");
    assert_eq!(transport.pending(key).unwrap(), 0);
}

// =============================================================================
// Server Tests
// =============================================================================

#[test]
fn test_server_skips_oversized_and_foreign_frames() {
    let transport = Arc::new(SysVTransport::new());
    let config = Config::builder()
        .request_queue_key(unique_key())
        .reply_queue_key(unique_key())
        .build();
    let _request_guard = QueueGuard {
        transport: &transport,
        key: config.request_queue_key,
    };
    let _reply_guard = QueueGuard {
        transport: &transport,
        key: config.reply_queue_key,
    };

    let driver = Arc::new(MemoryDriver::new());
    let mut server = Server::new(config.clone(), transport.clone(), driver.clone());

    let wide = SysVTransport::with_max_payload(4096);
    wide.send(config.request_queue_key, REQUEST_TAG, &vec![0x5A; 3000])
        .unwrap();
    transport
        .send(config.request_queue_key, REQUEST_TAG, b"not a frame")
        .unwrap();
    Client::new(config.clone(), transport.clone())
        .set_pin_high(4)
        .unwrap();

    for _ in 0..2 {
        let outcome = server.poll(Wait::NoWait).unwrap();
        assert!(matches!(
            outcome,
            Some(Outcome::Dropped(DropReason::Malformed(_)))
        ));
    }
    assert_eq!(
        server.poll(Wait::NoWait).unwrap(),
        Some(Outcome::Executed {
            function: CommandName::SetPinHigh,
            ok: true,
        })
    );

    assert_eq!(driver.level(PinId::new(4).unwrap()), PinValue::High);
    assert_eq!(transport.pending(config.request_queue_key).unwrap(), 0);
    assert_eq!(server.stats().dropped, 2);
}
