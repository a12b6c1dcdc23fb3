//! # Modbus TCP Transport Session
//!
//! Owns the byte stream to a Modbus TCP server and turns a framed request
//! into a framed response.
//!
//! Each exchange writes the whole request, reads the fixed 6-byte MBAP prefix
//! to learn the `length` field, then reads exactly that many more bytes. The
//! exchange runs under a single caller-supplied deadline. Only one exchange
//! can be in flight because every operation takes `&mut self`.
//!
//! A timeout or I/O failure drops the socket. The server may still have acted
//! on the request, so the session is not reused; the caller reconnects.
//!
//! ## Transport Statistics
//!
//! ```rust,no_run
//! # use coil_modbus::transport::{ModbusTransport, TransportStats};
//! # fn example(transport: &impl ModbusTransport) {
//! let stats = transport.get_stats();
//! println!("Requests sent: {}", stats.requests_sent);
//! println!("Timeouts: {}", stats.timeouts);
//! # }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::constants::{MBAP_FULL_HEADER_LEN, MBAP_HEADER_LEN};
use crate::error::{ModbusError, ModbusResult};
use crate::frame::expected_remaining;

/// Format raw bytes as hex string for packet logging
fn format_hex_packet(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Log packet with direction and unit id
fn log_packet(direction: &str, data: &[u8]) {
    let hex_string = format_hex_packet(data);
    match data.get(MBAP_FULL_HEADER_LEN - 1) {
        Some(unit) => info!("[MODBUS-TCP] {} unit:{} {}", direction, unit, hex_string),
        None => info!("[MODBUS-TCP] {} {}", direction, hex_string),
    }
}

/// Byte-stream transport for framed Modbus requests
///
/// Implemented by [`TcpTransport`]; tests drive the client with in-memory
/// implementations.
pub trait ModbusTransport: Send + Sync {
    /// Write a complete request frame and read back one complete response
    /// frame within `timeout`.
    ///
    /// # Errors
    ///
    /// - `ModbusError::NotConnected` - the session is closed
    /// - `ModbusError::Timeout` - no complete response before the deadline
    /// - `ModbusError::Io` - socket failure or EOF mid-frame
    /// - `ModbusError::Framing` - the response prefix is not a Modbus TCP header
    fn send_and_receive(
        &mut self,
        frame: &[u8],
        timeout: Duration,
    ) -> impl Future<Output = ModbusResult<Vec<u8>>> + Send;

    /// Local view of whether the session is open
    fn is_connected(&self) -> bool;

    /// Release the connection. Safe to call repeatedly.
    fn close(&mut self) -> impl Future<Output = ModbusResult<()>> + Send;

    fn get_stats(&self) -> TransportStats;
}

/// Transport layer statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Write `frame`, then read one MBAP-delimited response off `stream`.
///
/// `read_exact` loops over partial reads and reports EOF as
/// `UnexpectedEof`.
pub(crate) async fn exchange<S>(stream: &mut S, frame: &[u8]) -> ModbusResult<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(frame).await?;
    stream.flush().await?;

    let mut prefix = [0u8; MBAP_HEADER_LEN];
    stream.read_exact(&mut prefix).await?;
    let remaining = expected_remaining(&prefix)?;

    let mut response = vec![0u8; MBAP_HEADER_LEN + remaining];
    response[..MBAP_HEADER_LEN].copy_from_slice(&prefix);
    stream.read_exact(&mut response[MBAP_HEADER_LEN..]).await?;

    Ok(response)
}

/// Try each resolved address in turn, keeping the last failure for the error.
async fn resolve_and_connect(host: &str, port: u16) -> ModbusResult<(TcpStream, SocketAddr)> {
    let addrs = lookup_host((host, port))
        .await
        .map_err(|e| ModbusError::connect(format!("Failed to resolve {}:{}: {}", host, port, e)))?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok((stream, addr)),
            Err(e) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) => ModbusError::connect(format!("Failed to connect to {}:{}: {}", host, port, e)),
        None => ModbusError::connect(format!("No addresses found for {}:{}", host, port)),
    })
}

/// Modbus TCP transport
pub struct TcpTransport {
    stream: Option<TcpStream>,
    peer: SocketAddr,
    stats: TransportStats,
    packet_logging: bool,
}

impl TcpTransport {
    /// Resolve `host` and connect to the first address that accepts within
    /// `timeout`.
    pub async fn connect(host: &str, port: u16, timeout_dur: Duration) -> ModbusResult<Self> {
        let target = format!("{}:{}", host, port);
        debug!("Connecting to Modbus server {}", target);

        let connected = timeout(timeout_dur, resolve_and_connect(host, port)).await;

        let (stream, peer) = match connected {
            Ok(result) => result?,
            Err(_) => {
                return Err(ModbusError::connect(format!(
                    "Connecting to {} timed out after {}ms",
                    target,
                    timeout_dur.as_millis()
                )))
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY on {}: {}", peer, e);
        }

        info!("Connected to Modbus server {}", peer);
        Ok(Self {
            stream: Some(stream),
            peer,
            stats: TransportStats::default(),
            packet_logging: false,
        })
    }

    /// Remote address of the session
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Enable or disable packet logging
    pub fn set_packet_logging(&mut self, enabled: bool) {
        self.packet_logging = enabled;
    }
}

impl ModbusTransport for TcpTransport {
    async fn send_and_receive(
        &mut self,
        frame: &[u8],
        timeout_dur: Duration,
    ) -> ModbusResult<Vec<u8>> {
        let stream = self.stream.as_mut().ok_or(ModbusError::NotConnected)?;

        if self.packet_logging {
            log_packet("send", frame);
        }
        self.stats.requests_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;

        let result = timeout(timeout_dur, exchange(stream, frame)).await;

        match result {
            Ok(Ok(response)) => {
                self.stats.responses_received += 1;
                self.stats.bytes_received += response.len() as u64;
                if self.packet_logging {
                    log_packet("receive", &response);
                }
                Ok(response)
            }
            Ok(Err(e)) => {
                self.stats.errors += 1;
                if e.is_fatal_io() {
                    warn!("Closing session to {} after I/O error: {}", self.peer, e);
                    self.stream = None;
                }
                Err(e)
            }
            Err(_) => {
                self.stats.timeouts += 1;
                self.stats.errors += 1;
                warn!(
                    "No response from {} within {}ms, closing session",
                    self.peer,
                    timeout_dur.as_millis()
                );
                self.stream = None;
                Err(ModbusError::timeout(
                    "request/response exchange",
                    timeout_dur.as_millis() as u64,
                ))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn close(&mut self) -> ModbusResult<()> {
        if let Some(mut stream) = self.stream.take() {
            // Peer may already be gone; nothing to report to a cleanup path.
            let _ = stream.shutdown().await;
            info!("Closed session to {}", self.peer);
        }
        Ok(())
    }

    fn get_stats(&self) -> TransportStats {
        self.stats.clone()
    }
}
