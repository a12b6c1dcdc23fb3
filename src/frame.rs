//! # Modbus TCP Frame Codec
//!
//! Pure encode/decode between typed requests/responses and MBAP-framed bytes.
//! Nothing here touches a socket or owns a transaction counter; identifiers
//! are only placed into and read out of the header.
//!
//! ## Frame Layout
//!
//! ```text
//! +----------------+----------------+----------+---------+----------+-----------+
//! | Transaction ID |  Protocol ID   |  Length  | Unit ID | Function |  Payload  |
//! |    2 bytes     | 2 bytes (0x00) | 2 bytes  | 1 byte  |  1 byte  | variable  |
//! +----------------+----------------+----------+---------+----------+-----------+
//!                                    \______ counts these bytes ______________/
//! ```
//!
//! All multi-byte fields are big-endian.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::constants::{
    EXCEPTION_FLAG, MAX_MBAP_LENGTH, MAX_PDU_SIZE, MAX_READ_COILS, MBAP_FULL_HEADER_LEN,
    MBAP_HEADER_LEN, MIN_RESPONSE_FRAME_LEN, MODBUS_PROTOCOL_ID,
};
use crate::error::{ModbusError, ModbusResult};
use crate::pdu::{coil_from_wire, ModbusPdu};
use crate::protocol::{ModbusFunction, UnitId};

/// Modbus Application Protocol header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    /// Byte count of the unit id plus the PDU that follows
    pub length: u16,
    pub unit_id: UnitId,
}

impl MbapHeader {
    /// Header for a PDU of `pdu_len` bytes
    pub fn for_pdu(transaction_id: u16, unit_id: UnitId, pdu_len: usize) -> ModbusResult<Self> {
        if pdu_len == 0 || pdu_len > MAX_PDU_SIZE {
            return Err(ModbusError::encoding(format!(
                "PDU length {} out of range (1-{})",
                pdu_len, MAX_PDU_SIZE
            )));
        }
        Ok(Self {
            transaction_id,
            protocol_id: MODBUS_PROTOCOL_ID,
            length: (1 + pdu_len) as u16,
            unit_id,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.transaction_id);
        buf.put_u16(self.protocol_id);
        buf.put_u16(self.length);
        buf.put_u8(self.unit_id);
    }

    /// Parse the first seven bytes of a frame without validating them
    pub fn decode(bytes: &[u8]) -> ModbusResult<Self> {
        if bytes.len() < MBAP_FULL_HEADER_LEN {
            return Err(ModbusError::framing(format!(
                "MBAP header too short: {} bytes (need {})",
                bytes.len(),
                MBAP_FULL_HEADER_LEN
            )));
        }
        Ok(Self {
            transaction_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            unit_id: bytes[6],
        })
    }
}

/// Read the `length` field out of the fixed 6-byte MBAP prefix.
///
/// Rejects a foreign protocol id or a length that cannot hold a unit id and
/// function code, so a transport never waits on a bogus byte count.
pub fn expected_remaining(prefix: &[u8; MBAP_HEADER_LEN]) -> ModbusResult<usize> {
    let protocol_id = u16::from_be_bytes([prefix[2], prefix[3]]);
    if protocol_id != MODBUS_PROTOCOL_ID {
        return Err(ModbusError::framing(format!(
            "Invalid protocol id 0x{:04X}",
            protocol_id
        )));
    }
    let length = u16::from_be_bytes([prefix[4], prefix[5]]) as usize;
    if !(2..=MAX_MBAP_LENGTH).contains(&length) {
        return Err(ModbusError::framing(format!(
            "Invalid MBAP length {} (must be 2-{})",
            length, MAX_MBAP_LENGTH
        )));
    }
    Ok(length)
}

/// Build a complete request frame: MBAP header, function byte, payload.
pub fn encode_request(
    transaction_id: u16,
    unit_id: UnitId,
    function: u8,
    payload: &[u8],
) -> ModbusResult<Bytes> {
    let header = MbapHeader::for_pdu(transaction_id, unit_id, 1 + payload.len())?;

    let mut buf = BytesMut::with_capacity(MBAP_HEADER_LEN + header.length as usize);
    header.encode(&mut buf);
    buf.put_u8(function);
    buf.put_slice(payload);

    debug!(
        "Encoded request: tid={}, unit={}, FC={:02X}, frame_len={}",
        transaction_id,
        unit_id,
        function,
        buf.len()
    );
    Ok(buf.freeze())
}

/// Frame an already-built PDU.
pub fn encode_pdu(transaction_id: u16, unit_id: UnitId, pdu: &ModbusPdu) -> ModbusResult<Bytes> {
    let function = pdu
        .function_code()
        .ok_or_else(|| ModbusError::encoding("Cannot frame an empty PDU"))?;
    encode_request(transaction_id, unit_id, function, pdu.payload())
}

/// A decoded response frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub header: MbapHeader,
    pub function: u8,
    pub payload: Vec<u8>,
}

impl ResponseFrame {
    #[inline]
    pub fn transaction_id(&self) -> u16 {
        self.header.transaction_id
    }

    #[inline]
    pub fn unit_id(&self) -> UnitId {
        self.header.unit_id
    }

    #[inline]
    pub fn is_exception(&self) -> bool {
        is_exception(self.function)
    }

    /// Exception code of a well-formed exception PDU
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() && self.payload.len() == 1 {
            Some(self.payload[0])
        } else {
            None
        }
    }

    /// Check that this frame answers `function` and hand back its payload.
    ///
    /// An exception reply for the same function becomes
    /// [`ModbusError::Exception`]; any other function code is a decode error.
    pub fn expect_function(&self, function: ModbusFunction) -> ModbusResult<&[u8]> {
        let expected = function.to_u8();
        if self.function == expected {
            return Ok(&self.payload);
        }
        if self.function == function.exception_code() {
            return match self.exception_code() {
                Some(code) => Err(ModbusError::exception(self.function, code)),
                None => Err(ModbusError::decode(format!(
                    "Exception response must carry exactly 1 byte, got {}",
                    self.payload.len()
                ))),
            };
        }
        Err(ModbusError::decode(format!(
            "Function code mismatch: expected 0x{:02X}, got 0x{:02X}",
            expected, self.function
        )))
    }
}

/// Decode and validate an MBAP-framed response.
///
/// Fails with [`ModbusError::Framing`] on buffers shorter than 8 bytes, a
/// non-zero protocol id, a length field above 254, or a length field that
/// disagrees with the number of bytes following it.
pub fn decode_response(bytes: &[u8]) -> ModbusResult<ResponseFrame> {
    if bytes.len() < MIN_RESPONSE_FRAME_LEN {
        return Err(ModbusError::framing(format!(
            "Frame too short: {} bytes (need at least {})",
            bytes.len(),
            MIN_RESPONSE_FRAME_LEN
        )));
    }

    let header = MbapHeader::decode(bytes)?;
    if header.protocol_id != MODBUS_PROTOCOL_ID {
        return Err(ModbusError::framing(format!(
            "Invalid protocol id 0x{:04X}",
            header.protocol_id
        )));
    }

    if !(2..=MAX_MBAP_LENGTH).contains(&(header.length as usize)) {
        return Err(ModbusError::framing(format!(
            "Invalid MBAP length {} (must be 2..={})",
            header.length, MAX_MBAP_LENGTH
        )));
    }

    let remaining = bytes.len() - MBAP_HEADER_LEN;
    if header.length as usize != remaining {
        return Err(ModbusError::framing(format!(
            "Length mismatch: header says {}, frame carries {}",
            header.length, remaining
        )));
    }

    let function = bytes[MBAP_FULL_HEADER_LEN];
    let payload = bytes[MIN_RESPONSE_FRAME_LEN..].to_vec();

    debug!(
        "Decoded response: tid={}, unit={}, FC={:02X} ({}), payload_len={}",
        header.transaction_id,
        header.unit_id,
        function,
        ModbusPdu::function_code_description(function),
        payload.len()
    );

    Ok(ResponseFrame {
        header,
        function,
        payload,
    })
}

/// Decode the echoed (address, value) of a write single coil response.
pub fn decode_write_coil_response(payload: &[u8]) -> ModbusResult<(u16, bool)> {
    if payload.len() != 4 {
        return Err(ModbusError::decode(format!(
            "Write coil response must be 4 bytes, got {}",
            payload.len()
        )));
    }
    let address = u16::from_be_bytes([payload[0], payload[1]]);
    let raw = u16::from_be_bytes([payload[2], payload[3]]);
    let value = coil_from_wire(raw).ok_or_else(|| {
        ModbusError::decode(format!("Invalid coil output value 0x{:04X}", raw))
    })?;
    Ok((address, value))
}

/// Unpack a read coils response into `quantity` states in ascending address
/// order. Bits are LSB-first within each byte; padding bits are ignored.
pub fn decode_read_coils_response(payload: &[u8], quantity: u16) -> ModbusResult<Vec<bool>> {
    if quantity == 0 || quantity as usize > MAX_READ_COILS {
        return Err(ModbusError::invalid_data(format!(
            "Invalid coil quantity {} (must be 1-{})",
            quantity, MAX_READ_COILS
        )));
    }

    let (&byte_count, data) = payload
        .split_first()
        .ok_or_else(|| ModbusError::decode("Read coils response missing byte count"))?;

    let byte_count = byte_count as usize;
    if byte_count != data.len() {
        return Err(ModbusError::decode(format!(
            "Byte count {} does not match {} data bytes",
            byte_count,
            data.len()
        )));
    }

    let expected = (quantity as usize).div_ceil(8);
    if byte_count != expected {
        return Err(ModbusError::decode(format!(
            "Byte count {} does not cover {} coils (expected {})",
            byte_count, quantity, expected
        )));
    }

    Ok((0..quantity as usize)
        .map(|i| data[i / 8] & (1 << (i % 8)) != 0)
        .collect())
}

/// True iff the high bit of the function code is set
#[inline]
pub fn is_exception(function: u8) -> bool {
    function & EXCEPTION_FLAG != 0
}
