//! Modbus PDU data structure
//!
//! Use a fixed-size stack array to avoid heap allocation per request.

use tracing::debug;

use crate::constants::{COIL_OFF, COIL_ON, EXCEPTION_FLAG, MAX_PDU_SIZE, MAX_READ_COILS};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::ModbusFunction;

/// PDU with stack-allocated fixed array
#[derive(Debug, Clone)]
pub struct ModbusPdu {
    data: [u8; MAX_PDU_SIZE],
    len: usize,
}

impl ModbusPdu {
    /// Create an empty PDU
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_PDU_SIZE],
            len: 0,
        }
    }

    /// Create a PDU from a byte slice
    pub fn from_slice(data: &[u8]) -> ModbusResult<Self> {
        if data.len() > MAX_PDU_SIZE {
            return Err(ModbusError::encoding(format!(
                "PDU too large: {} bytes (max {})",
                data.len(),
                MAX_PDU_SIZE
            )));
        }

        let mut pdu = Self::new();
        pdu.data[..data.len()].copy_from_slice(data);
        pdu.len = data.len();
        Ok(pdu)
    }

    /// Push a single byte
    #[inline]
    pub fn push(&mut self, byte: u8) -> ModbusResult<()> {
        if self.len >= MAX_PDU_SIZE {
            return Err(ModbusError::encoding("PDU buffer full"));
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    /// Push u16 in big-endian
    #[inline]
    pub fn push_u16(&mut self, value: u16) -> ModbusResult<()> {
        for byte in value.to_be_bytes() {
            self.push(byte)?;
        }
        Ok(())
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get function code (first byte)
    #[inline]
    pub fn function_code(&self) -> Option<u8> {
        self.as_slice().first().copied()
    }

    /// Function-specific bytes following the function code
    #[inline]
    pub fn payload(&self) -> &[u8] {
        self.as_slice().get(1..).unwrap_or(&[])
    }

    #[inline]
    pub fn is_exception(&self) -> bool {
        self.function_code()
            .map(|fc| fc & EXCEPTION_FLAG != 0)
            .unwrap_or(false)
    }

    pub fn function_code_description(fc: u8) -> &'static str {
        match ModbusFunction::from_u8(fc & !EXCEPTION_FLAG) {
            Ok(ModbusFunction::ReadCoils) => "Read Coils",
            Ok(ModbusFunction::WriteSingleCoil) => "Write Single Coil",
            Err(_) => "Unknown Function",
        }
    }
}

impl Default for ModbusPdu {
    fn default() -> Self {
        Self::new()
    }
}

/// PDU builder - fluent API
pub struct PduBuilder {
    pdu: ModbusPdu,
}

impl Default for PduBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PduBuilder {
    #[inline]
    pub fn new() -> Self {
        Self {
            pdu: ModbusPdu::new(),
        }
    }

    #[inline]
    pub fn function(mut self, function: ModbusFunction) -> ModbusResult<Self> {
        self.pdu.push(function.to_u8())?;
        Ok(self)
    }

    #[inline]
    pub fn address(mut self, addr: u16) -> ModbusResult<Self> {
        self.pdu.push_u16(addr)?;
        Ok(self)
    }

    #[inline]
    pub fn quantity(mut self, qty: u16) -> ModbusResult<Self> {
        self.pdu.push_u16(qty)?;
        Ok(self)
    }

    #[inline]
    pub fn value(mut self, value: u16) -> ModbusResult<Self> {
        self.pdu.push_u16(value)?;
        Ok(self)
    }

    pub fn build(self) -> ModbusPdu {
        if let Some(fc) = self.pdu.function_code() {
            debug!(
                "PDU built: FC={:02X} ({}), total_len={}",
                fc,
                ModbusPdu::function_code_description(fc),
                self.pdu.len()
            );
        }
        self.pdu
    }

    /// Build a read coils request PDU (FC01)
    ///
    /// # Arguments
    /// * `start_address` - Address of the first coil
    /// * `quantity` - Number of coils to read (1-2000)
    pub fn build_read_coils(start_address: u16, quantity: u16) -> ModbusResult<ModbusPdu> {
        if quantity == 0 || quantity as usize > MAX_READ_COILS {
            return Err(ModbusError::invalid_data(format!(
                "Invalid coil quantity {} (must be 1-{})",
                quantity, MAX_READ_COILS
            )));
        }
        Ok(PduBuilder::new()
            .function(ModbusFunction::ReadCoils)?
            .address(start_address)?
            .quantity(quantity)?
            .build())
    }

    /// Build a write single coil PDU (FC05)
    ///
    /// # Arguments
    /// * `address` - Coil address
    /// * `value` - Coil value (true = ON, false = OFF)
    pub fn build_write_single_coil(address: u16, value: bool) -> ModbusResult<ModbusPdu> {
        Ok(PduBuilder::new()
            .function(ModbusFunction::WriteSingleCoil)?
            .address(address)?
            .value(coil_to_wire(value))?
            .build())
    }
}

/// Output value on the wire for a coil state
#[inline]
pub fn coil_to_wire(value: bool) -> u16 {
    if value {
        COIL_ON
    } else {
        COIL_OFF
    }
}

/// Coil state for an output value, `None` for anything but 0xFF00/0x0000
#[inline]
pub fn coil_from_wire(value: u16) -> Option<bool> {
    match value {
        COIL_ON => Some(true),
        COIL_OFF => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdu_basic_operations() {
        let mut pdu = ModbusPdu::new();
        assert!(pdu.is_empty());

        pdu.push(0x01).unwrap();
        assert_eq!(pdu.function_code(), Some(0x01));
        assert!(!pdu.is_exception());

        pdu.push_u16(0x0013).unwrap();
        pdu.push_u16(0x0025).unwrap();

        assert_eq!(pdu.len(), 5);
        assert_eq!(pdu.as_slice(), &[0x01, 0x00, 0x13, 0x00, 0x25]);
        assert_eq!(pdu.payload(), &[0x00, 0x13, 0x00, 0x25]);
    }

    #[test]
    fn test_pdu_overflow() {
        let mut pdu = ModbusPdu::from_slice(&[0u8; MAX_PDU_SIZE]).unwrap();
        assert!(matches!(pdu.push(0), Err(ModbusError::Encoding { .. })));
        assert!(ModbusPdu::from_slice(&[0u8; MAX_PDU_SIZE + 1]).is_err());
    }

    #[test]
    fn test_exception_pdu() {
        let pdu = ModbusPdu::from_slice(&[0x85, 0x02]).unwrap();
        assert!(pdu.is_exception());
        assert_eq!(
            ModbusPdu::function_code_description(0x85),
            "Write Single Coil"
        );
    }

    #[test]
    fn test_build_read_coils() {
        let pdu = PduBuilder::build_read_coils(0x0013, 0x0025).unwrap();
        assert_eq!(pdu.as_slice(), &[0x01, 0x00, 0x13, 0x00, 0x25]);

        assert!(PduBuilder::build_read_coils(0, 0).is_err());
        assert!(PduBuilder::build_read_coils(0, 2001).is_err());
        assert!(PduBuilder::build_read_coils(0, 2000).is_ok());
    }

    #[test]
    fn test_build_write_single_coil() {
        let pdu = PduBuilder::build_write_single_coil(0x00AC, true).unwrap();
        assert_eq!(pdu.as_slice(), &[0x05, 0x00, 0xAC, 0xFF, 0x00]);

        let pdu = PduBuilder::build_write_single_coil(0x0001, false).unwrap();
        assert_eq!(pdu.as_slice(), &[0x05, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_coil_wire_values() {
        assert_eq!(coil_from_wire(coil_to_wire(true)), Some(true));
        assert_eq!(coil_from_wire(coil_to_wire(false)), Some(false));
        assert_eq!(coil_from_wire(0x1234), None);
    }
}
