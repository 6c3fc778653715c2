//! Modbus TCP Protocol Engine
//!
//! Core components for talking to a Modbus TCP power meter:
//!
//! ```text
//! meter-protocols/modbus
//!     ├── codec      (MBAP framing, response validation)
//!     ├── connection (TransportSession: lazy connect, reset on failure)
//!     └── client     (ProtocolClient: transaction ids, typed operations)
//! ```

mod client;
mod codec;
mod connection;
mod constants;

pub use client::{next_id, ProtocolClient};
pub use codec::{
    decode_response, encode_read, encode_reset, encode_write, exception_description, hex_frame,
    MbapHeader, ReadFunction, RegisterList, RequestKind,
};
pub use connection::{ConnectionParams, TransportSession};
pub use constants::{
    FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS, FC_RESET_ENERGY,
    FC_WRITE_SINGLE_REGISTER, MBAP_HEADER_LEN, MODBUS_MAX_READ_REGISTERS,
};
