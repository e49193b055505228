//! Protocol Module
//!
//! Defines the command set shared by clients and the server, its
//! parameter schema, and the wire encoding carried by the message queues.
//!
//! ## Channels
//! ```text
//!   clients ──► request queue (0x26274746, tag 0x4746) ──► server
//!   clients ◄── reply queue   (0x47462627, tag per query) ◄── server
//! ```
//!
//! ### Request Record
//! `{ function: CommandName, parms: { name → int | [int] } }`
//!
//! ### Response Record
//! `{ pin_status: 0|1 }` or `{ array_status: { pin → 0|1 } }`
//!
//! ### Frame Format
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────────┐
//! │ Ver (1)  │ Len (4)  │ CRC (4)  │   bincode record    │
//! └──────────┴──────────┴──────────┴─────────────────────┘
//! ```

mod command;
mod schema;
mod operation;
mod response;
mod codec;

pub use command::{Command, CommandName, Param, ParamValue, Params, ReplyTo};
pub use schema::{is_valid, required_params, rule_for, validate, Rule};
pub use operation::Operation;
pub use response::ResponseEnvelope;
pub use codec::{
    decode_request, decode_response, encode_request, encode_request_record, encode_response,
    FRAME_HEADER_SIZE, FRAME_VERSION,
};

// =============================================================================
// Well-known identifiers
// =============================================================================

/// Key of the request queue
pub const REQUEST_QUEUE_KEY: i32 = 0x2627_4746;

/// Key of the reply queue
pub const REPLY_QUEUE_KEY: i32 = 0x4746_2627;

/// Message type of every request
pub const REQUEST_TAG: i64 = 0x4746;

/// Fixed reply tag for `GetPin` when per-call tags are disabled
pub const REPLY_TAG_PIN: i64 = 0x6474;

/// Fixed reply tag for `GetPinArray` when per-call tags are disabled
pub const REPLY_TAG_ARRAY: i64 = 0x6475;

/// Maximum encoded message size in bytes
pub const MAX_MESSAGE_SIZE: usize = 2048;
