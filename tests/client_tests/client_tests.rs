//! Tests for the client
//!
//! These tests verify:
//! - Invalid calls fail locally and never reach the request queue
//! - Valid calls post exactly one well-formed request
//! - Reply tags are unique per call, or fixed when configured
//! - Reply timeouts, null payloads and undecodable replies
//! - Blocking timed commands wait for the pattern to play out

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use gpiosysv::ipc::{MemoryTransport, TagFilter, Transport, Wait};
use gpiosysv::protocol::{
    self, Command, CommandName, Param, ResponseEnvelope, REPLY_QUEUE_KEY, REPLY_TAG_ARRAY,
    REPLY_TAG_PIN, REQUEST_QUEUE_KEY, REQUEST_TAG,
};
use gpiosysv::{Client, Config, FlashTiming, GpioError, PinId, PinValue, ERROR_SENTINEL};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_client(config: Config) -> (Arc<MemoryTransport>, Client) {
    let transport = Arc::new(MemoryTransport::new());
    let client = Client::new(config, transport.clone());
    (transport, client)
}

fn quick_config() -> Config {
    Config::builder().reply_timeout_ms(100).build()
}

/// Take the single request the client posted
fn take_request(transport: &MemoryTransport) -> Command {
    let message = transport
        .receive(REQUEST_QUEUE_KEY, TagFilter::Any, Wait::NoWait)
        .unwrap()
        .expect("no request posted");
    assert_eq!(message.tag, REQUEST_TAG);
    protocol::decode_request(&message.payload).unwrap()
}

/// Answer one query with `answer(command)`, on a background thread
fn respond_once<F>(transport: Arc<MemoryTransport>, answer: F) -> thread::JoinHandle<()>
where
    F: FnOnce(&Command) -> Vec<u8> + Send + 'static,
{
    thread::spawn(move || {
        let message = transport
            .receive(
                REQUEST_QUEUE_KEY,
                TagFilter::Exact(REQUEST_TAG),
                Wait::Timeout(Duration::from_secs(5)),
            )
            .unwrap()
            .expect("no query arrived");
        let command = protocol::decode_request(&message.payload).unwrap();
        let reply = command.reply_to().unwrap();
        transport.send(reply.queue_key, reply.tag, &answer(&command)).unwrap();
    })
}

fn assert_rejected_locally(result: gpiosysv::Result<()>, transport: &MemoryTransport) {
    let err = result.unwrap_err();
    assert!(matches!(err, GpioError::Validation { .. }), "{:?}", err);
    assert_eq!(err.code(), ERROR_SENTINEL);
    assert_eq!(transport.pending(REQUEST_QUEUE_KEY).unwrap(), 0);
}

// =============================================================================
// Local Validation Tests
// =============================================================================

#[test]
fn test_invalid_pins_never_sent() {
    let (transport, client) = setup_client(quick_config());

    assert_rejected_locally(client.set_pin(0, 1), &transport);
    assert_rejected_locally(client.set_pin(41, 1), &transport);
    assert_rejected_locally(client.set_pin_high(0), &transport);
    assert_rejected_locally(client.set_array_low(&[3, 41]), &transport);
    assert_rejected_locally(client.set_array_high(&[]), &transport);
}

#[test]
fn test_invalid_values_never_sent() {
    let (transport, client) = setup_client(quick_config());

    assert_rejected_locally(client.set_pin(5, 2), &transport);
    assert_rejected_locally(client.shift_data_bit(17, 27, 22, 2, 0), &transport);
    assert_rejected_locally(client.shift_data_array(17, 27, 22, &[1, 0, 5], 0), &transport);
    assert_rejected_locally(
        client.flash_pin_high_low(18, 0, FlashTiming::default(), false),
        &transport,
    );
}

#[test]
fn test_invalid_query_never_sent() {
    let (transport, client) = setup_client(quick_config());

    let err = client.get_pin(41).unwrap_err();
    assert_eq!(err.code(), ERROR_SENTINEL);
    assert_eq!(transport.pending(REQUEST_QUEUE_KEY).unwrap(), 0);
    assert!(!transport.exists(REPLY_QUEUE_KEY).unwrap());
}

// =============================================================================
// Posting Tests
// =============================================================================

#[test]
fn test_set_pin_high_posts_one_request() {
    let (transport, client) = setup_client(quick_config());

    client.set_pin_high(18).unwrap();

    assert_eq!(transport.pending(REQUEST_QUEUE_KEY).unwrap(), 1);
    let command = take_request(&transport);
    assert_eq!(command.function, CommandName::SetPinHigh);
    assert_eq!(command.parms.int(Param::PinId), Some(18));
}

#[test]
fn test_set_pins_binary_posts_value_and_pins() {
    let (transport, client) = setup_client(quick_config());

    client.set_pins_binary(5, &[2, 3, 4]).unwrap();

    let command = take_request(&transport);
    assert_eq!(command.function, CommandName::SetPinsBinary);
    assert_eq!(command.parms.int(Param::Value), Some(5));
    assert_eq!(command.parms.list(Param::PinArray), Some(&[2i64, 3, 4][..]));
}

#[test]
fn test_set_pins_binary_drops_bits_above_pin_count() {
    let (transport, client) = setup_client(quick_config());

    client.set_pins_binary((1 << 63) | 0b101, &[1, 2, 3]).unwrap();

    let command = take_request(&transport);
    assert_eq!(command.parms.int(Param::Value), Some(0b101));
}

#[test]
fn test_flash_binary_keeps_low_bits_of_wide_value() {
    let (transport, client) = setup_client(quick_config());
    let timing = FlashTiming {
        high_delay: 0,
        low_delay: 0,
    };

    client
        .flash_binary(u64::MAX, &[2, 3], 10, 0, timing, false)
        .unwrap();

    assert_eq!(take_request(&transport).parms.int(Param::Value), Some(0b11));
}

#[test]
fn test_oversized_delay_rejected_locally() {
    let (transport, client) = setup_client(quick_config());
    let timing = FlashTiming {
        high_delay: u64::MAX,
        low_delay: 0,
    };

    let err = client.flash_pin_high_low(18, 1, timing, false).unwrap_err();

    assert!(matches!(err, GpioError::Validation { .. }));
    assert_eq!(err.code(), ERROR_SENTINEL);
    assert_eq!(transport.pending(REQUEST_QUEUE_KEY).unwrap(), 0);
}

#[test]
fn test_shift_data_array_posts_bits() {
    let (transport, client) = setup_client(quick_config());

    client.shift_data_array(17, 27, 22, &[1, 0, 1, 1], 10).unwrap();

    let command = take_request(&transport);
    assert_eq!(command.parms.list(Param::BitArray), Some(&[1i64, 0, 1, 1][..]));
    assert_eq!(command.parms.int(Param::SrClk), Some(27));
}

#[test]
fn test_send_command_rejects_invalid_raw_command() {
    let (transport, client) = setup_client(quick_config());

    let command = Command::new(CommandName::SetPinLow).with(Param::PinId, 99i64);
    assert!(client.send_command(&command).is_err());
    assert_eq!(transport.pending(REQUEST_QUEUE_KEY).unwrap(), 0);
}

#[test]
fn test_submit_rejects_queries() {
    let (transport, client) = setup_client(quick_config());

    let mut command = Command::new(CommandName::GetPin).with(Param::PinId, 4i64);
    command.set_reply_to(protocol::ReplyTo {
        queue_key: REPLY_QUEUE_KEY,
        tag: 5,
    });
    assert!(client.submit(command, false).is_err());
    assert_eq!(transport.pending(REQUEST_QUEUE_KEY).unwrap(), 0);
}

// =============================================================================
// Blocking Tests
// =============================================================================

#[test]
fn test_blocking_flash_waits_for_pattern() {
    let (_transport, client) = setup_client(quick_config());
    let timing = FlashTiming {
        high_delay: 10_000,
        low_delay: 10_000,
    };

    let start = Instant::now();
    client.flash_pin_high_low(18, 2, timing, true).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[test]
fn test_blocking_huge_count_without_delays_returns_at_once() {
    let (transport, client) = setup_client(quick_config());
    let timing = FlashTiming {
        high_delay: 0,
        low_delay: 0,
    };

    let start = Instant::now();
    client.flash_pin_low_high(18, 10_000_000_000, timing, true).unwrap();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(take_request(&transport).parms.int(Param::Count), Some(10_000_000_000));
}

#[test]
fn test_blocking_ignored_for_untimed_commands() {
    let (transport, client) = setup_client(quick_config());

    client.shift_data_bit(17, 27, 22, 1, 10_000_000).unwrap();
    assert_eq!(transport.pending(REQUEST_QUEUE_KEY).unwrap(), 1);
}

// =============================================================================
// Reply Tag Tests
// =============================================================================

#[test]
fn test_unique_reply_tags() {
    let (_transport, client) = setup_client(quick_config());
    let (_other_transport, other) = setup_client(quick_config());

    let mut tags: Vec<i64> = (0..50)
        .map(|i| {
            let c = if i % 2 == 0 { &client } else { &other };
            c.next_reply_tag(CommandName::GetPin)
        })
        .collect();
    let total = tags.len();
    tags.sort_unstable();
    tags.dedup();

    assert_eq!(tags.len(), total);
    for tag in tags {
        assert!(tag >= 1);
        assert_ne!(tag, REQUEST_TAG);
    }
}

#[test]
fn test_fixed_reply_tags() {
    let config = Config::builder().unique_reply_tags(false).build();
    let (_transport, client) = setup_client(config);

    assert_eq!(client.next_reply_tag(CommandName::GetPin), REPLY_TAG_PIN);
    assert_eq!(client.next_reply_tag(CommandName::GetPinArray), REPLY_TAG_ARRAY);
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_get_pin_reply() {
    let (transport, client) = setup_client(quick_config());
    let responder = respond_once(transport.clone(), |command| {
        assert_eq!(command.function, CommandName::GetPin);
        let response = ResponseEnvelope::pin_status(Some(PinValue::High));
        protocol::encode_response(&response, protocol::MAX_MESSAGE_SIZE).unwrap()
    });

    assert_eq!(client.get_pin(7).unwrap(), Some(PinValue::High));
    responder.join().unwrap();
}

#[test]
fn test_get_pin_array_dec_reply() {
    let (transport, client) = setup_client(quick_config());
    let responder = respond_once(transport.clone(), |command| {
        let levels: BTreeMap<PinId, PinValue> = command
            .parms
            .list(Param::PinArray)
            .unwrap()
            .iter()
            .map(|&p| {
                let pin = PinId::try_from(p).unwrap();
                // Pins 2 and 4 high
                (pin, PinValue::from_bit(p % 2 == 0))
            })
            .collect();
        let response = ResponseEnvelope::array_status(Some(levels));
        protocol::encode_response(&response, protocol::MAX_MESSAGE_SIZE).unwrap()
    });

    assert_eq!(client.get_pin_array_dec(&[2, 3, 4]).unwrap(), Some(0b101));
    responder.join().unwrap();
}

#[test]
fn test_null_reply_is_none() {
    let (transport, client) = setup_client(quick_config());
    let responder = respond_once(transport.clone(), |_| {
        let response = ResponseEnvelope::pin_status(None);
        protocol::encode_response(&response, protocol::MAX_MESSAGE_SIZE).unwrap()
    });

    assert_eq!(client.get_pin(7).unwrap(), None);
    responder.join().unwrap();
}

#[test]
fn test_undecodable_reply_is_none() {
    let (transport, client) = setup_client(quick_config());
    let responder = respond_once(transport.clone(), |_| b"garbage".to_vec());

    assert_eq!(client.get_pin(7).unwrap(), None);
    responder.join().unwrap();
}

#[test]
fn test_reply_with_fixed_tag() {
    let config = Config::builder()
        .reply_timeout_ms(2000)
        .unique_reply_tags(false)
        .build();
    let (transport, client) = setup_client(config);
    let responder = respond_once(transport.clone(), |command| {
        assert_eq!(command.reply_to().unwrap().tag, REPLY_TAG_PIN);
        let response = ResponseEnvelope::pin_status(Some(PinValue::Low));
        protocol::encode_response(&response, protocol::MAX_MESSAGE_SIZE).unwrap()
    });

    assert_eq!(client.get_pin(7).unwrap(), Some(PinValue::Low));
    responder.join().unwrap();
}

#[test]
fn test_timeout_without_server() {
    let (transport, client) = setup_client(quick_config());

    // A stale reply for someone else sits on the reply queue
    transport.send(REPLY_QUEUE_KEY, 424_242, b"stale").unwrap();

    let start = Instant::now();
    let err = client.get_pin(7).unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.code(), ERROR_SENTINEL);
    assert!(start.elapsed() >= Duration::from_millis(100));

    // Reply queue purged but left in place; the request is still queued
    assert_eq!(transport.pending(REPLY_QUEUE_KEY).unwrap(), 0);
    assert!(transport.exists(REPLY_QUEUE_KEY).unwrap());
    assert_eq!(transport.pending(REQUEST_QUEUE_KEY).unwrap(), 1);
}
