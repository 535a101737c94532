//! Wire protocol for the SPDM socket responder harness.
//!
//! Every message is one frame on a reliable byte stream:
//!
//! ```text
//! command:u32 BE | transport_type:u32 BE | length:u32 BE | payload:u8[length]
//! ```
//!
//! The payload is opaque to this layer and is never byte-swapped.

mod codec;
mod error;
mod frame;
mod message;

pub use codec::{read_buffer, read_u32, receive_bytes, send_bytes, write_buffer, write_u32};
pub use error::{Error, Result};
pub use frame::{FRAME_HEADER_LEN, Frame, receive_frame, send_frame};
pub use message::{
    Command, DEFAULT_MAX_PAYLOAD, DEFAULT_PORT, TCP_PORT, TEST_ACK, TransportType,
};
