//! High-level Modbus client implementations
//!
//! The client composes the transport session, the frame codec and the
//! transaction tracker into the two coil operations.
//!
//! # State Machine
//!
//! ```text
//! Disconnected --connect ok--> Connected --close / timeout / I/O error--> Disconnected
//! ```
//!
//! Coil operations require `Connected` and fail with
//! [`ModbusError::NotConnected`] otherwise. Each call performs exactly one
//! transaction; nothing is retried behind the caller's back, since a repeated
//! write reaches a physical actuator.
//!
//! # API Naming Convention
//!
//! | Function Code | Primary Name | Semantic Alias |
//! |---------------|--------------|----------------|
//! | 0x01 | `read_01()` | `read_coils()` |
//! | 0x05 | `write_05()` | `write_coil()` |
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use coil_modbus::{ClientConfig, ModbusClient, ModbusResult, ModbusTcpClient};
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let mut client = ModbusTcpClient::new(ClientConfig::default());
//!     client.connect("127.0.0.1", 502).await?;
//!
//!     client.write_coil(1, 1, true).await?;
//!     let coils = client.read_coils(1, 0, 8).await?;
//!     println!("Coils: {:?}", coils);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ModbusError, ModbusResult};
use crate::frame::{
    decode_read_coils_response, decode_response, decode_write_coil_response, encode_pdu,
    ResponseFrame,
};
use crate::pdu::{ModbusPdu, PduBuilder};
use crate::protocol::{ModbusFunction, UnitId};
use crate::transaction::TransactionTracker;
use crate::transport::{ModbusTransport, TcpTransport, TransportStats};

/// Coil operations offered by every client.
pub trait ModbusClient: Send + Sync {
    /// Read coils (function code 0x01).
    ///
    /// # Arguments
    ///
    /// * `unit_id` - The Modbus unit identifier
    /// * `address` - Starting coil address (0-65535)
    /// * `quantity` - Number of coils to read (1-2000)
    ///
    /// # Returns
    ///
    /// Exactly `quantity` coil states, ascending by address.
    fn read_01(
        &mut self,
        unit_id: UnitId,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = ModbusResult<Vec<bool>>> + Send;

    /// Write single coil (function code 0x05).
    ///
    /// Succeeds only when the server echoes the address and value exactly.
    ///
    /// # Arguments
    ///
    /// * `unit_id` - The Modbus unit identifier
    /// * `address` - Coil address (0-65535)
    /// * `value` - `true` for ON (0xFF00), `false` for OFF (0x0000)
    fn write_05(
        &mut self,
        unit_id: UnitId,
        address: u16,
        value: bool,
    ) -> impl Future<Output = ModbusResult<()>> + Send;

    fn is_connected(&self) -> bool;

    /// Close the session. Safe to call when already closed or after errors.
    fn close(&mut self) -> impl Future<Output = ModbusResult<()>> + Send;

    fn get_stats(&self) -> TransportStats;

    /// Alias for [`read_01`](Self::read_01)
    fn read_coils(
        &mut self,
        unit_id: UnitId,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = ModbusResult<Vec<bool>>> + Send {
        self.read_01(unit_id, address, quantity)
    }

    /// Alias for [`write_05`](Self::write_05)
    fn write_coil(
        &mut self,
        unit_id: UnitId,
        address: u16,
        value: bool,
    ) -> impl Future<Output = ModbusResult<()>> + Send {
        self.write_05(unit_id, address, value)
    }
}

/// Generic Modbus client that works with any transport
///
/// Owns at most one transport session plus the transaction counter for it.
pub struct GenericModbusClient<T: ModbusTransport> {
    transport: Option<T>,
    tracker: TransactionTracker,
    config: ClientConfig,
}

impl<T: ModbusTransport> GenericModbusClient<T> {
    /// Create a disconnected client
    pub fn new(config: ClientConfig) -> Self {
        Self {
            transport: None,
            tracker: TransactionTracker::starting_at(config.first_transaction_id),
            config,
        }
    }

    /// Create a client around an already open transport
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        let mut client = Self::new(config);
        client.attach(transport);
        client
    }

    /// Install a freshly opened transport and restart the transaction counter.
    ///
    /// Any previous transport is dropped; callers close it first.
    pub fn attach(&mut self, transport: T) {
        self.transport = Some(transport);
        self.tracker = TransactionTracker::starting_at(self.config.first_transaction_id);
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Transaction id of the most recent request on this session
    pub fn last_transaction_id(&self) -> Option<u16> {
        self.tracker.last_sent()
    }

    /// Send one request PDU and return the correlated response frame.
    async fn transact(
        &mut self,
        unit_id: UnitId,
        pdu: &ModbusPdu,
        timeout: Duration,
    ) -> ModbusResult<ResponseFrame> {
        let transport = match self.transport.as_mut() {
            Some(t) if t.is_connected() => t,
            _ => return Err(ModbusError::NotConnected),
        };

        let transaction_id = self.tracker.next_id();
        let frame = encode_pdu(transaction_id, unit_id, pdu)?;

        let bytes = match transport.send_and_receive(&frame, timeout).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.is_fatal_io() {
                    // The device may still act on this request; never reuse the session.
                    warn!("Transaction {} aborted: {}", transaction_id, e);
                    if let Err(close_err) = transport.close().await {
                        debug!("Close after failed transaction: {}", close_err);
                    }
                }
                return Err(e);
            }
        };

        let response = decode_response(&bytes)?;
        TransactionTracker::validate(transaction_id, response.transaction_id())?;

        if response.unit_id() != unit_id {
            return Err(ModbusError::decode(format!(
                "Unit id mismatch: expected {}, got {}",
                unit_id,
                response.unit_id()
            )));
        }

        Ok(response)
    }

    /// [`read_01`](ModbusClient::read_01) with a per-call deadline
    pub async fn read_coils_with_timeout(
        &mut self,
        unit_id: UnitId,
        address: u16,
        quantity: u16,
        timeout: Duration,
    ) -> ModbusResult<Vec<bool>> {
        let pdu = PduBuilder::build_read_coils(address, quantity)?;
        let response = self.transact(unit_id, &pdu, timeout).await?;
        let payload = response.expect_function(ModbusFunction::ReadCoils)?;
        let coils = decode_read_coils_response(payload, quantity)?;

        debug!(
            "Read {} coils from unit {} at address {}",
            coils.len(),
            unit_id,
            address
        );
        Ok(coils)
    }

    /// [`write_05`](ModbusClient::write_05) with a per-call deadline
    pub async fn write_coil_with_timeout(
        &mut self,
        unit_id: UnitId,
        address: u16,
        value: bool,
        timeout: Duration,
    ) -> ModbusResult<()> {
        let pdu = PduBuilder::build_write_single_coil(address, value)?;
        let response = self.transact(unit_id, &pdu, timeout).await?;
        let payload = response.expect_function(ModbusFunction::WriteSingleCoil)?;
        let (echo_address, echo_value) = decode_write_coil_response(payload)?;

        if echo_address != address || echo_value != value {
            return Err(ModbusError::decode(format!(
                "Write coil echo mismatch: sent ({}, {}), received ({}, {})",
                address, value, echo_address, echo_value
            )));
        }

        debug!(
            "Coil {} on unit {} set {}",
            address,
            unit_id,
            if value { "ON" } else { "OFF" }
        );
        Ok(())
    }
}

impl<T: ModbusTransport> ModbusClient for GenericModbusClient<T> {
    async fn read_01(
        &mut self,
        unit_id: UnitId,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<bool>> {
        let timeout = self.config.timeout;
        self.read_coils_with_timeout(unit_id, address, quantity, timeout)
            .await
    }

    async fn write_05(&mut self, unit_id: UnitId, address: u16, value: bool) -> ModbusResult<()> {
        let timeout = self.config.timeout;
        self.write_coil_with_timeout(unit_id, address, value, timeout)
            .await
    }

    fn is_connected(&self) -> bool {
        self.transport
            .as_ref()
            .map(|t| t.is_connected())
            .unwrap_or(false)
    }

    async fn close(&mut self) -> ModbusResult<()> {
        match self.transport.as_mut() {
            Some(transport) => transport.close().await,
            None => Ok(()),
        }
    }

    fn get_stats(&self) -> TransportStats {
        self.transport
            .as_ref()
            .map(|t| t.get_stats())
            .unwrap_or_default()
    }
}

/// Modbus TCP client implementation using the generic client
pub struct ModbusTcpClient {
    inner: GenericModbusClient<TcpTransport>,
}

impl ModbusTcpClient {
    /// Create a disconnected TCP client
    pub fn new(config: ClientConfig) -> Self {
        Self {
            inner: GenericModbusClient::new(config),
        }
    }

    /// Create a client and connect to a `host:port` address string
    pub async fn from_address(addr: &str, timeout: Duration) -> ModbusResult<Self> {
        let (host, port) = split_address(addr)?;
        let mut client = Self::new(ClientConfig::default().with_timeout(timeout));
        client.connect(host, port).await?;
        Ok(client)
    }

    /// Connect using the configured timeout
    pub async fn connect(&mut self, host: &str, port: u16) -> ModbusResult<()> {
        let timeout = self.inner.config().timeout;
        self.connect_with_timeout(host, port, timeout).await
    }

    /// Open a session to `host:port`, closing any previous one first.
    pub async fn connect_with_timeout(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> ModbusResult<()> {
        self.inner.close().await?;

        let mut transport = TcpTransport::connect(host, port, timeout).await?;
        transport.set_packet_logging(self.inner.config().packet_logging);
        self.inner.attach(transport);
        Ok(())
    }

    /// Remote address of the current or last session
    pub fn server_address(&self) -> Option<SocketAddr> {
        self.inner.transport().map(|t| t.peer_addr())
    }

    /// Enable or disable packet logging on the open session
    pub fn set_packet_logging(&mut self, enabled: bool) {
        if let Some(transport) = self.inner.transport_mut() {
            transport.set_packet_logging(enabled);
        }
    }

    /// Transaction id of the most recent request on this session
    pub fn last_transaction_id(&self) -> Option<u16> {
        self.inner.last_transaction_id()
    }

    /// Read coils with a per-call deadline
    pub async fn read_coils_with_timeout(
        &mut self,
        unit_id: UnitId,
        address: u16,
        quantity: u16,
        timeout: Duration,
    ) -> ModbusResult<Vec<bool>> {
        self.inner
            .read_coils_with_timeout(unit_id, address, quantity, timeout)
            .await
    }

    /// Write a single coil with a per-call deadline
    pub async fn write_coil_with_timeout(
        &mut self,
        unit_id: UnitId,
        address: u16,
        value: bool,
        timeout: Duration,
    ) -> ModbusResult<()> {
        self.inner
            .write_coil_with_timeout(unit_id, address, value, timeout)
            .await
    }
}

impl Default for ModbusTcpClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl ModbusClient for ModbusTcpClient {
    async fn read_01(
        &mut self,
        unit_id: UnitId,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<bool>> {
        self.inner.read_01(unit_id, address, quantity).await
    }

    async fn write_05(&mut self, unit_id: UnitId, address: u16, value: bool) -> ModbusResult<()> {
        self.inner.write_05(unit_id, address, value).await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn close(&mut self) -> ModbusResult<()> {
        self.inner.close().await
    }

    fn get_stats(&self) -> TransportStats {
        self.inner.get_stats()
    }
}

/// Split `host:port`, accepting bracketed IPv6 hosts.
fn split_address(addr: &str) -> ModbusResult<(&str, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| ModbusError::configuration(format!("Missing port in address: {}", addr)))?;
    let port = port
        .parse::<u16>()
        .map_err(|e| ModbusError::configuration(format!("Invalid port in {}: {}", addr, e)))?;
    let host = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(bracketed) => bracketed,
        None if host.contains(':') => {
            return Err(ModbusError::configuration(format!(
                "IPv6 host must be bracketed in address: {}",
                addr
            )))
        }
        None => host,
    };
    if host.is_empty() {
        return Err(ModbusError::configuration(format!(
            "Missing host in address: {}",
            addr
        )));
    }
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    // =========================================================================
    // MockTransport
    // =========================================================================

    /// Scripted transport: records request frames and replays queued replies
    struct MockTransport {
        requests: Vec<Vec<u8>>,
        responses: VecDeque<ModbusResult<Vec<u8>>>,
        connected: bool,
        closes: usize,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                requests: Vec::new(),
                responses: VecDeque::new(),
                connected: true,
                closes: 0,
            }
        }

        fn add_response(&mut self, response: ModbusResult<Vec<u8>>) {
            self.responses.push_back(response);
        }
    }

    impl ModbusTransport for MockTransport {
        fn send_and_receive(
            &mut self,
            frame: &[u8],
            _timeout: Duration,
        ) -> impl Future<Output = ModbusResult<Vec<u8>>> + Send {
            self.requests.push(frame.to_vec());
            let response = self
                .responses
                .pop_front()
                .unwrap_or_else(|| Err(ModbusError::connect("No response prepared in mock")));
            async move { response }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn close(&mut self) -> impl Future<Output = ModbusResult<()>> + Send {
            self.connected = false;
            self.closes += 1;
            async { Ok(()) }
        }

        fn get_stats(&self) -> TransportStats {
            TransportStats {
                requests_sent: self.requests.len() as u64,
                ..TransportStats::default()
            }
        }
    }

    /// MBAP-frame a response PDU
    fn response(tid: u16, unit: u8, pdu: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(7 + pdu.len());
        frame.extend_from_slice(&tid.to_be_bytes());
        frame.extend_from_slice(&[0x00, 0x00]);
        frame.extend_from_slice(&((pdu.len() + 1) as u16).to_be_bytes());
        frame.push(unit);
        frame.extend_from_slice(pdu);
        frame
    }

    fn client_with(mock: MockTransport) -> GenericModbusClient<MockTransport> {
        GenericModbusClient::with_transport(mock, ClientConfig::default())
    }

    fn sent(client: &GenericModbusClient<MockTransport>) -> &[Vec<u8>] {
        &client.transport().unwrap().requests
    }

    // =========================================================================
    // Write single coil
    // =========================================================================

    #[tokio::test]
    async fn test_write_coil_echo_success() {
        let mut mock = MockTransport::new();
        mock.add_response(Ok(response(1, 1, &[0x05, 0x00, 0x01, 0xFF, 0x00])));

        let mut client = client_with(mock);
        client.write_coil(1, 1, true).await.unwrap();

        assert_eq!(
            sent(&client)[0],
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x05, 0x00, 0x01, 0xFF, 0x00]
        );
        assert_eq!(client.last_transaction_id(), Some(1));
    }

    #[tokio::test]
    async fn test_write_coil_exception_response() {
        let mut mock = MockTransport::new();
        mock.add_response(Ok(response(1, 1, &[0x85, 0x02])));

        let mut client = client_with(mock);
        let err = client.write_coil(1, 1, true).await.unwrap_err();

        assert!(err.is_exception());
        assert_eq!(err.exception_code(), Some(0x02));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_write_coil_echo_mismatch() {
        let mut mock = MockTransport::new();
        // Server echoes OFF for an ON request
        mock.add_response(Ok(response(1, 1, &[0x05, 0x00, 0x01, 0x00, 0x00])));
        // Server echoes a different address
        mock.add_response(Ok(response(2, 1, &[0x05, 0x00, 0x02, 0xFF, 0x00])));

        let mut client = client_with(mock);
        assert!(matches!(
            client.write_coil(1, 1, true).await,
            Err(ModbusError::Decode { .. })
        ));
        assert!(matches!(
            client.write_coil(1, 1, true).await,
            Err(ModbusError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_correlation_error_keeps_session_open() {
        let mut mock = MockTransport::new();
        mock.add_response(Ok(response(9, 1, &[0x05, 0x00, 0x01, 0xFF, 0x00])));

        let mut client = client_with(mock);
        match client.write_coil(1, 1, true).await {
            Err(ModbusError::Correlation { expected, actual }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 9);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_unit_id_mismatch() {
        let mut mock = MockTransport::new();
        mock.add_response(Ok(response(1, 7, &[0x05, 0x00, 0x01, 0xFF, 0x00])));

        let mut client = client_with(mock);
        assert!(matches!(
            client.write_coil(1, 1, true).await,
            Err(ModbusError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout_disconnects_client() {
        let mut mock = MockTransport::new();
        mock.add_response(Err(ModbusError::timeout("request/response exchange", 2000)));

        let mut client = client_with(mock);
        let err = client.write_coil(1, 1, true).await.unwrap_err();
        assert!(matches!(err, ModbusError::Timeout { .. }));
        assert!(err.requires_reconnect());
        assert!(!client.is_connected());
        assert_eq!(client.transport().unwrap().closes, 1);

        // No second frame reaches the wire
        let err = client.write_coil(1, 1, true).await.unwrap_err();
        assert!(matches!(err, ModbusError::NotConnected));
        assert_eq!(sent(&client).len(), 1);
    }

    #[tokio::test]
    async fn test_transaction_ids_advance() {
        let mut mock = MockTransport::new();
        mock.add_response(Ok(response(1, 1, &[0x05, 0x00, 0x01, 0xFF, 0x00])));
        mock.add_response(Ok(response(2, 1, &[0x05, 0x00, 0x01, 0x00, 0x00])));

        let mut client = client_with(mock);
        client.write_coil(1, 1, true).await.unwrap();
        client.write_coil(1, 1, false).await.unwrap();

        let requests = sent(&client);
        assert_eq!(&requests[0][..2], &[0x00, 0x01]);
        assert_eq!(&requests[1][..2], &[0x00, 0x02]);
    }

    // =========================================================================
    // Read coils
    // =========================================================================

    #[tokio::test]
    async fn test_read_coils() {
        let mut mock = MockTransport::new();
        mock.add_response(Ok(response(1, 1, &[0x01, 0x02, 0xCD, 0x01])));

        let mut client = client_with(mock);
        let coils = client.read_coils(1, 20, 10).await.unwrap();

        assert_eq!(
            coils,
            vec![true, false, true, true, false, false, true, true, true, false]
        );
        assert_eq!(
            sent(&client)[0],
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x01, 0x00, 0x14, 0x00, 0x0A]
        );
    }

    #[tokio::test]
    async fn test_read_coils_invalid_quantity() {
        let mut client = client_with(MockTransport::new());

        assert!(matches!(
            client.read_coils(1, 0, 0).await,
            Err(ModbusError::InvalidData { .. })
        ));
        assert!(matches!(
            client.read_coils(1, 0, 2001).await,
            Err(ModbusError::InvalidData { .. })
        ));
        assert!(sent(&client).is_empty());
    }

    #[tokio::test]
    async fn test_read_coils_bad_byte_count() {
        let mut mock = MockTransport::new();
        mock.add_response(Ok(response(1, 1, &[0x01, 0x01, 0xFF])));

        let mut client = client_with(mock);
        assert!(matches!(
            client.read_coils(1, 0, 9).await,
            Err(ModbusError::Decode { .. })
        ));
    }

    // =========================================================================
    // Connection state
    // =========================================================================

    #[tokio::test]
    async fn test_operations_require_connection() {
        let mut client: GenericModbusClient<MockTransport> =
            GenericModbusClient::new(ClientConfig::default());

        assert!(!client.is_connected());
        assert!(matches!(
            client.write_coil(1, 1, true).await,
            Err(ModbusError::NotConnected)
        ));
        assert!(matches!(
            client.read_coils(1, 0, 1).await,
            Err(ModbusError::NotConnected)
        ));
        assert_eq!(client.get_stats(), TransportStats::default());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut client = client_with(MockTransport::new());
        client.close().await.unwrap();
        client.close().await.unwrap();
        assert!(!client.is_connected());
        assert!(matches!(
            client.write_coil(1, 1, true).await,
            Err(ModbusError::NotConnected)
        ));
    }

    #[test]
    fn test_split_address() {
        assert_eq!(split_address("127.0.0.1:502").unwrap(), ("127.0.0.1", 502));
        assert_eq!(split_address("plc.local:1502").unwrap(), ("plc.local", 1502));
        assert_eq!(split_address("[::1]:502").unwrap(), ("::1", 502));
        assert!(split_address("127.0.0.1").is_err());
        assert!(split_address("127.0.0.1:abc").is_err());
        assert!(split_address(":502").is_err());
        assert!(split_address("::1").is_err());
        assert!(split_address("::1:502").is_err());
        assert!(matches!(
            split_address("fe80::1"),
            Err(ModbusError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_tcp_client_starts_disconnected() {
        let mut client = ModbusTcpClient::default();
        assert!(!client.is_connected());
        assert_eq!(client.server_address(), None);
        assert!(matches!(
            client.write_coil(1, 1, true).await,
            Err(ModbusError::NotConnected)
        ));
        client.close().await.unwrap();
    }
}
