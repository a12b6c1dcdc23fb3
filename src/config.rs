//! # Client Configuration
//!
//! Per-client settings for a Modbus TCP session.

use std::time::Duration;

use crate::DEFAULT_TIMEOUT_MS;

/// Transaction id used for the first request on a fresh client.
pub const DEFAULT_FIRST_TRANSACTION_ID: u16 = 1;

/// Client settings.
///
/// # Example
///
/// ```rust
/// use coil_modbus::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new()
///     .with_timeout(Duration::from_secs(2))
///     .with_packet_logging(true);
///
/// assert_eq!(config.timeout, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Default deadline for connect and for each coil transaction.
    pub timeout: Duration,
    /// Log every frame sent and received as hex at `info` level.
    pub packet_logging: bool,
    /// Transaction id of the first request.
    pub first_transaction_id: u16,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_packet_logging(mut self, enabled: bool) -> Self {
        self.packet_logging = enabled;
        self
    }

    pub fn with_first_transaction_id(mut self, id: u16) -> Self {
        self.first_transaction_id = id;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            packet_logging: false,
            first_transaction_id: DEFAULT_FIRST_TRANSACTION_ID,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.packet_logging);
        assert_eq!(config.first_transaction_id, 1);
    }

    #[test]
    fn test_builder_chain() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_millis(250))
            .with_packet_logging(true)
            .with_first_transaction_id(0xFFFF);

        assert_eq!(config.timeout, Duration::from_millis(250));
        assert!(config.packet_logging);
        assert_eq!(config.first_transaction_id, 0xFFFF);
    }
}
