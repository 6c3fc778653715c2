//! Modbus Protocol Client
//!
//! Sequences transaction ids and drives the frame codec over a transport
//! session. One request is in flight at a time; nothing is retried here.

use super::codec::{
    decode_response, encode_read, encode_reset, encode_write, MbapHeader, ReadFunction,
    RegisterList, RequestKind,
};
use super::connection::{ConnectionParams, TransportSession};
use super::constants::{MBAP_HEADER_LEN, MODBUS_MAX_READ_REGISTERS};
use crate::error::{ProtocolError, Result};
use tracing::{debug, warn};

/// Next transaction id after `current`, wrapping 65535 to 0
pub fn next_id(current: u16) -> u16 {
    current.wrapping_add(1)
}

/// Typed register operations against one meter
#[derive(Debug)]
pub struct ProtocolClient {
    session: TransportSession,
    unit_id: u8,
    transaction_id: u16,
}

impl ProtocolClient {
    pub fn new(params: ConnectionParams, unit_id: u8) -> Self {
        Self::with_session(TransportSession::new(params), unit_id)
    }

    pub fn with_session(session: TransportSession, unit_id: u8) -> Self {
        Self {
            session,
            unit_id,
            transaction_id: 0,
        }
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Last transaction id handed out (0 before the first request)
    pub fn last_transaction_id(&self) -> u16 {
        self.transaction_id
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Release the underlying connection
    pub fn close(&mut self) {
        self.session.close();
    }

    fn allocate_id(&mut self) -> u16 {
        self.transaction_id = next_id(self.transaction_id);
        self.transaction_id
    }

    /// FC04 Read Input Registers
    pub async fn read_input_registers(&mut self, start: u16, count: u16) -> Result<RegisterList> {
        self.read_registers(ReadFunction::InputRegisters, start, count)
            .await
    }

    /// FC03 Read Holding Registers
    pub async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<RegisterList> {
        self.read_registers(ReadFunction::HoldingRegisters, start, count)
            .await
    }

    async fn read_registers(
        &mut self,
        function: ReadFunction,
        start: u16,
        count: u16,
    ) -> Result<RegisterList> {
        if count == 0 || count > MODBUS_MAX_READ_REGISTERS {
            return Err(ProtocolError::invalid_request(format!(
                "register count {count} outside 1..={MODBUS_MAX_READ_REGISTERS}"
            )));
        }

        let transaction_id = self.allocate_id();
        let request = encode_read(function, self.unit_id, transaction_id, start, count);
        let registers = self
            .exchange(RequestKind::Read(function), transaction_id, &request)
            .await?;

        debug!(
            "FC{:02X} read {} regs @{}: {:?}",
            function.code(),
            registers.len(),
            start,
            registers
        );
        Ok(registers)
    }

    /// FC06 Write Single Register
    pub async fn write_single_register(&mut self, address: u16, value: u16) -> Result<()> {
        let transaction_id = self.allocate_id();
        let request = encode_write(self.unit_id, transaction_id, address, value);
        self.exchange(RequestKind::WriteSingleRegister, transaction_id, &request)
            .await?;

        debug!("FC06 wrote {} @{}", value, address);
        Ok(())
    }

    /// Vendor command that zeroes the cumulative energy counter
    pub async fn reset_energy_counter(&mut self) -> Result<()> {
        let transaction_id = self.allocate_id();
        let request = encode_reset(self.unit_id, transaction_id);
        self.exchange(RequestKind::ResetEnergy, transaction_id, &request)
            .await?;

        debug!("Energy counter reset acknowledged");
        Ok(())
    }

    async fn exchange(
        &mut self,
        kind: RequestKind,
        transaction_id: u16,
        request: &[u8],
    ) -> Result<RegisterList> {
        let response = self.session.send_and_receive(request).await?;

        if kind != RequestKind::ResetEnergy && response.len() >= MBAP_HEADER_LEN {
            if let Some(header) = MbapHeader::parse(&response) {
                if header.transaction_id != transaction_id {
                    warn!(
                        "Transaction mismatch: expected {:04X}, got {:04X}",
                        transaction_id, header.transaction_id
                    );
                    self.session.close();
                    return Err(ProtocolError::TransactionMismatch {
                        expected: transaction_id,
                        actual: header.transaction_id,
                    });
                }
            }
        }

        let decoded = decode_response(kind, &response);
        if let Err(ProtocolError::Truncated { .. } | ProtocolError::Malformed(_)) = &decoded {
            // Stream position is unknown; resync through a fresh connection
            self.session.close();
        }
        decoded
    }
}
