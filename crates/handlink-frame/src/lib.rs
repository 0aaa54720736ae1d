//! Binary wire framing for hand actuator modules.
//!
//! Two sibling protocols drive the same register file over a point-to-point
//! serial link:
//!
//! - **RS-485 register protocol**: `EB 90 | deviceId | length | opcode |
//!   addrLo addrHi | payload... | checksum`
//! - **CAN-over-serial**: `AA AA | id0..id3 | payload(8, zero-padded) |
//!   dataLen | 00 01 00 | checksum | 55 55`, byte-stuffed so no reserved byte
//!   appears unescaped between the delimiters.
//!
//! The checksum in both variants is the unsigned 8-bit sum of the bytes from
//! the identifier/address field through the last payload-related field,
//! exclusive of the head and tail delimiters.

pub mod codec;
pub mod error;
pub mod registers;
pub mod stuff;

pub use codec::{
    can_identifier, decode_can_bytes, decode_can_values, decode_rs485_bytes, decode_rs485_values,
    encode_can_read, encode_can_write, encode_can_write_byte, encode_rs485_read,
    encode_rs485_write, frame_checksum, Operation, ProtocolVariant, CAN_FRAME_LEN,
    CAN_PAYLOAD_LEN, MAX_BLOCK_VALUES, MAX_CAN_FRAME_VALUES,
};
pub use error::{FrameError, Result};
pub use registers::{
    lookup, RegisterClass, RegisterDescriptor, RegisterShape, CLAMP_LIMIT, REGISTERS, SIGN_PIVOT,
};
pub use stuff::{stuff_frame, unstuff_frame, ESCAPE, RESERVED};
