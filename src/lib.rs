//! # Coil Modbus - Minimal Modbus TCP Coil Client
//!
//! A small, explicit Modbus TCP client for reading and forcing coils on
//! industrial devices (valves, relays, pumps).
//!
//! ## Features
//!
//! - **Async I/O**: Tokio-based transport with a per-transaction deadline
//! - **Single in-flight request**: one synchronous request/response pair per session
//! - **No hidden retries**: every failure is returned to the caller, typed
//! - **Strict decoding**: MBAP length, protocol id, transaction id and echo checks
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Client |
//! |------|----------|--------|
//! | 0x01 | Read Coils | ✅ |
//! | 0x05 | Write Single Coil | ✅ |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coil_modbus::{ModbusClient, ModbusResult, ModbusTcpClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let mut client = ModbusTcpClient::from_address("127.0.0.1:502", Duration::from_secs(5)).await?;
//!
//!     // Force coil 1 ON on unit 1
//!     client.write_coil(1, 1, true).await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus protocol constants based on official specification
pub mod constants;

/// Function and exception code definitions
pub mod protocol;

/// Stack-allocated PDU and request builder
pub mod pdu;

/// MBAP frame encoding and response decoding
pub mod frame;

/// Transaction id generation and response correlation
pub mod transaction;

/// Network transport layer for Modbus TCP
pub mod transport;

/// Client configuration
pub mod config;

/// Modbus client implementations
pub mod client;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use tokio;

// === Core client API ===
pub use client::{GenericModbusClient, ModbusClient, ModbusTcpClient};
pub use config::ClientConfig;

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Core types ===
pub use frame::{MbapHeader, ResponseFrame};
pub use pdu::{ModbusPdu, PduBuilder};
pub use protocol::{ModbusException, ModbusFunction, UnitId};
pub use transaction::TransactionTracker;

// === Transport ===
pub use transport::{ModbusTransport, TcpTransport, TransportStats};

pub use constants::{MAX_PDU_SIZE, MAX_READ_COILS};

/// Default timeout for operations (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
