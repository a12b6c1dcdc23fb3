//! Modbus function and exception code definitions

use std::fmt;

use crate::constants::{
    EXCEPTION_ACKNOWLEDGE, EXCEPTION_FLAG, EXCEPTION_GATEWAY_PATH_UNAVAILABLE,
    EXCEPTION_GATEWAY_TARGET_FAILED, EXCEPTION_ILLEGAL_DATA_ADDRESS, EXCEPTION_ILLEGAL_DATA_VALUE,
    EXCEPTION_ILLEGAL_FUNCTION, EXCEPTION_MEMORY_PARITY_ERROR, EXCEPTION_SERVER_DEVICE_BUSY,
    EXCEPTION_SERVER_DEVICE_FAILURE, FC_READ_COILS, FC_WRITE_SINGLE_COIL,
};
use crate::error::{ModbusError, ModbusResult};

/// Modbus unit identifier (0-255, commonly 1 on direct TCP devices)
pub type UnitId = u8;

/// Function codes supported by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModbusFunction {
    /// Read Coils (0x01)
    ReadCoils = FC_READ_COILS,
    /// Write Single Coil (0x05)
    WriteSingleCoil = FC_WRITE_SINGLE_COIL,
}

impl ModbusFunction {
    pub fn from_u8(value: u8) -> ModbusResult<Self> {
        match value {
            FC_READ_COILS => Ok(Self::ReadCoils),
            FC_WRITE_SINGLE_COIL => Ok(Self::WriteSingleCoil),
            _ => Err(ModbusError::decode(format!(
                "Unsupported function code 0x{:02X}",
                value
            ))),
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Function code a server uses to reject this function
    pub fn exception_code(self) -> u8 {
        self.to_u8() | EXCEPTION_FLAG
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModbusFunction::ReadCoils => "Read Coils",
            ModbusFunction::WriteSingleCoil => "Write Single Coil",
        };
        write!(f, "{} (0x{:02X})", name, *self as u8)
    }
}

/// Standard Modbus exception codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModbusException {
    IllegalFunction = EXCEPTION_ILLEGAL_FUNCTION,
    IllegalDataAddress = EXCEPTION_ILLEGAL_DATA_ADDRESS,
    IllegalDataValue = EXCEPTION_ILLEGAL_DATA_VALUE,
    ServerDeviceFailure = EXCEPTION_SERVER_DEVICE_FAILURE,
    Acknowledge = EXCEPTION_ACKNOWLEDGE,
    ServerDeviceBusy = EXCEPTION_SERVER_DEVICE_BUSY,
    MemoryParityError = EXCEPTION_MEMORY_PARITY_ERROR,
    GatewayPathUnavailable = EXCEPTION_GATEWAY_PATH_UNAVAILABLE,
    GatewayTargetDeviceFailedToRespond = EXCEPTION_GATEWAY_TARGET_FAILED,
}

impl ModbusException {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            EXCEPTION_ILLEGAL_FUNCTION => Some(Self::IllegalFunction),
            EXCEPTION_ILLEGAL_DATA_ADDRESS => Some(Self::IllegalDataAddress),
            EXCEPTION_ILLEGAL_DATA_VALUE => Some(Self::IllegalDataValue),
            EXCEPTION_SERVER_DEVICE_FAILURE => Some(Self::ServerDeviceFailure),
            EXCEPTION_ACKNOWLEDGE => Some(Self::Acknowledge),
            EXCEPTION_SERVER_DEVICE_BUSY => Some(Self::ServerDeviceBusy),
            EXCEPTION_MEMORY_PARITY_ERROR => Some(Self::MemoryParityError),
            EXCEPTION_GATEWAY_PATH_UNAVAILABLE => Some(Self::GatewayPathUnavailable),
            EXCEPTION_GATEWAY_TARGET_FAILED => Some(Self::GatewayTargetDeviceFailedToRespond),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::IllegalFunction => "Illegal function",
            Self::IllegalDataAddress => "Illegal data address",
            Self::IllegalDataValue => "Illegal data value",
            Self::ServerDeviceFailure => "Server device failure",
            Self::Acknowledge => "Acknowledge, request accepted but still processing",
            Self::ServerDeviceBusy => "Server device busy",
            Self::MemoryParityError => "Memory parity error",
            Self::GatewayPathUnavailable => "Gateway path unavailable",
            Self::GatewayTargetDeviceFailedToRespond => "Gateway target device failed to respond",
        }
    }
}

impl fmt::Display for ModbusException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modbus Exception 0x{:02X}: {}", self.to_u8(), self.description())
    }
}
