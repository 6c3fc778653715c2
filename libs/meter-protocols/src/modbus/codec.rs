//! Modbus TCP frame codec
//!
//! Pure functions that build request frames (MBAP header + PDU) and
//! validate/decode the response buffer against the request that produced it.

use super::constants::{
    EXCEPTION_FLAG, FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS, FC_RESET_ENERGY,
    FC_WRITE_SINGLE_REGISTER, MBAP_HEADER_LEN, MIN_READ_RESPONSE_LEN, MIN_WRITE_RESPONSE_LEN,
    PROTOCOL_ID, REQUEST_REMAINING_LEN, RESET_REMAINING_LEN,
};
use crate::error::{ProtocolError, Result};
use tracing::debug;

/// Ordered register values, register 0 first
pub type RegisterList = Vec<u16>;

/// Register read function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFunction {
    /// FC03
    HoldingRegisters,
    /// FC04
    InputRegisters,
}

impl ReadFunction {
    pub fn code(self) -> u8 {
        match self {
            ReadFunction::HoldingRegisters => FC_READ_HOLDING_REGISTERS,
            ReadFunction::InputRegisters => FC_READ_INPUT_REGISTERS,
        }
    }
}

/// The request a response buffer is decoded against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Read(ReadFunction),
    WriteSingleRegister,
    ResetEnergy,
}

impl RequestKind {
    pub fn function_code(self) -> u8 {
        match self {
            RequestKind::Read(function) => function.code(),
            RequestKind::WriteSingleRegister => FC_WRITE_SINGLE_REGISTER,
            RequestKind::ResetEnergy => FC_RESET_ENERGY,
        }
    }
}

/// Modbus TCP MBAP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    /// Transaction identifier
    pub transaction_id: u16,
    /// Protocol identifier (fixed to 0)
    pub protocol_id: u16,
    /// Remaining length (unit id + PDU)
    pub length: u16,
    /// Unit identifier (slave address)
    pub unit_id: u8,
}

impl MbapHeader {
    fn new(transaction_id: u16, length: u16, unit_id: u8) -> Self {
        Self {
            transaction_id,
            protocol_id: PROTOCOL_ID,
            length,
            unit_id,
        }
    }

    fn write_to(&self, frame: &mut Vec<u8>) {
        frame.extend_from_slice(&self.transaction_id.to_be_bytes());
        frame.extend_from_slice(&self.protocol_id.to_be_bytes());
        frame.extend_from_slice(&self.length.to_be_bytes());
        frame.push(self.unit_id);
    }

    /// Parse the header from the start of a frame; `None` when too short
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < MBAP_HEADER_LEN {
            return None;
        }
        Some(Self {
            transaction_id: u16::from_be_bytes([data[0], data[1]]),
            protocol_id: u16::from_be_bytes([data[2], data[3]]),
            length: u16::from_be_bytes([data[4], data[5]]),
            unit_id: data[6],
        })
    }
}

/// Build a FC03/FC04 read request
pub fn encode_read(
    function: ReadFunction,
    unit_id: u8,
    transaction_id: u16,
    start_address: u16,
    count: u16,
) -> Vec<u8> {
    encode_two_fields(
        function.code(),
        unit_id,
        transaction_id,
        start_address,
        count,
    )
}

/// Build a FC06 write single register request
pub fn encode_write(unit_id: u8, transaction_id: u16, address: u16, value: u16) -> Vec<u8> {
    encode_two_fields(
        FC_WRITE_SINGLE_REGISTER,
        unit_id,
        transaction_id,
        address,
        value,
    )
}

/// Build the vendor energy reset request (function code only, no payload)
pub fn encode_reset(unit_id: u8, transaction_id: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(MBAP_HEADER_LEN + 1);
    MbapHeader::new(transaction_id, RESET_REMAINING_LEN, unit_id).write_to(&mut frame);
    frame.push(FC_RESET_ENERGY);
    frame
}

fn encode_two_fields(
    function_code: u8,
    unit_id: u8,
    transaction_id: u16,
    first: u16,
    second: u16,
) -> Vec<u8> {
    let mut frame = Vec::with_capacity(MBAP_HEADER_LEN + 5);
    MbapHeader::new(transaction_id, REQUEST_REMAINING_LEN, unit_id).write_to(&mut frame);
    frame.push(function_code);
    frame.extend_from_slice(&first.to_be_bytes());
    frame.extend_from_slice(&second.to_be_bytes());

    debug!(
        "Building TCP frame: trans_id={:04X}, unit_id={}, FC={:02X}",
        transaction_id, unit_id, function_code
    );

    frame
}

/// Validate and decode a response buffer
///
/// Read responses yield the register values in order. Write confirmations
/// yield the echoed `[address, value]` pair without checking it against the
/// request. The reset command succeeds on any non-empty buffer and yields an
/// empty list.
pub fn decode_response(request: RequestKind, raw: &[u8]) -> Result<RegisterList> {
    match request {
        RequestKind::Read(_) => decode_read(raw),
        RequestKind::WriteSingleRegister => decode_write(raw),
        RequestKind::ResetEnergy => {
            if raw.is_empty() {
                Err(ProtocolError::NoResponse)
            } else {
                Ok(Vec::new())
            }
        },
    }
}

fn decode_read(raw: &[u8]) -> Result<RegisterList> {
    ensure_len(raw, MIN_READ_RESPONSE_LEN)?;
    check_exception(raw)?;

    let byte_count = raw[MBAP_HEADER_LEN + 1] as usize;
    if byte_count % 2 != 0 {
        return Err(ProtocolError::malformed(format!(
            "odd byte count {byte_count} in register read"
        )));
    }
    let data_start = MIN_READ_RESPONSE_LEN;
    ensure_len(raw, data_start + byte_count)?;

    let registers = raw[data_start..data_start + byte_count]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    Ok(registers)
}

fn decode_write(raw: &[u8]) -> Result<RegisterList> {
    ensure_len(raw, MIN_WRITE_RESPONSE_LEN)?;
    check_exception(raw)?;

    let address = u16::from_be_bytes([raw[8], raw[9]]);
    let value = u16::from_be_bytes([raw[10], raw[11]]);
    Ok(vec![address, value])
}

fn ensure_len(raw: &[u8], needed: usize) -> Result<()> {
    if raw.len() < needed {
        return Err(ProtocolError::Truncated {
            needed,
            actual: raw.len(),
        });
    }
    Ok(())
}

/// Caller guarantees `raw` holds at least the function code and one more byte
fn check_exception(raw: &[u8]) -> Result<()> {
    let function_code = raw[MBAP_HEADER_LEN];
    if function_code > EXCEPTION_FLAG {
        return Err(ProtocolError::DeviceError {
            function: function_code & !EXCEPTION_FLAG,
            code: raw[MBAP_HEADER_LEN + 1],
        });
    }
    Ok(())
}

/// Get exception description
pub fn exception_description(exception_code: u8) -> &'static str {
    match exception_code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Slave Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Slave Device Busy",
        0x07 => "Negative Acknowledge",
        0x08 => "Memory Parity Error",
        0x0A => "Gateway Path Unavailable",
        0x0B => "Gateway Target Device Failed to Respond",
        _ => "Unknown Exception",
    }
}

/// Hex dump used for TX/RX logging
pub fn hex_frame(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
