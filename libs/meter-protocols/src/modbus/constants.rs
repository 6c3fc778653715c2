//! Modbus TCP constants used by the meter protocol engine

// ============================================================================
// Frame Layout
// ============================================================================

/// MBAP header length including the unit id
/// Format: Transaction ID(2) + Protocol ID(2) + Length(2) + Unit ID(1) = 7 bytes
pub const MBAP_HEADER_LEN: usize = 7;

/// Protocol identifier carried in every MBAP header
pub const PROTOCOL_ID: u16 = 0;

/// Remaining-length value for read/write requests: Unit ID + FC + two u16 fields
pub const REQUEST_REMAINING_LEN: u16 = 6;

/// Remaining-length value for the reset request: Unit ID + FC
pub const RESET_REMAINING_LEN: u16 = 2;

/// Minimum read response: header + function code + byte count
pub const MIN_READ_RESPONSE_LEN: usize = MBAP_HEADER_LEN + 2;

/// Minimum write confirmation: header + function code + address + value
pub const MIN_WRITE_RESPONSE_LEN: usize = MBAP_HEADER_LEN + 5;

/// Receive buffer for a single read call (largest legal ADU is 260 bytes)
pub const RESPONSE_BUFFER_SIZE: usize = 1024;

// ============================================================================
// Function Codes
// ============================================================================

/// FC03 Read Holding Registers
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// FC04 Read Input Registers
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// FC06 Write Single Register
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Vendor-specific energy counter reset
pub const FC_RESET_ENERGY: u8 = 0x42;

/// Error flag set on the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Register Operation Limits
// ============================================================================

/// Maximum number of registers for FC03/FC04
///
/// Response PDU: FC(1) + byte count(1) + N × 2 ≤ 253, so N ≤ 125
pub const MODBUS_MAX_READ_REGISTERS: u16 = 125;
