//! TCP transport implementation

use crate::link::Transport;
use async_trait::async_trait;
use komfovent_core::{ModbusError, ModbusResult};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Standard Modbus TCP port
pub const MODBUS_TCP_PORT: u16 = 502;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP transport settings
///
/// The host is normalized once at construction: the literal name
/// "localhost" is replaced by the loopback numeric address. Connecting to
/// "localhost" goes through name resolution, which is much slower than
/// 127.0.0.1 and has been unreliable on some Linux machines.
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub recv_timeout: Duration,
}

impl TcpSettings {
    /// Create settings for a device on the standard Modbus port
    ///
    /// # Arguments
    ///
    /// * `host` - Hostname or numeric address of the device
    pub fn new(host: &str) -> Self {
        Self::with_port(host, MODBUS_TCP_PORT)
    }

    /// Create settings with an explicit port
    pub fn with_port(host: &str, port: u16) -> Self {
        let host = if host.eq_ignore_ascii_case("localhost") {
            "127.0.0.1".to_string()
        } else {
            host.to_string()
        };

        Self {
            host,
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        }
    }
}

/// TCP transport implementation
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    settings: TcpSettings,
}

impl TcpTransport {
    /// Create a new, not yet opened TCP transport
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
        }
    }

    /// Get the settings this transport connects with
    pub fn settings(&self) -> &TcpSettings {
        &self.settings
    }

    fn stream_mut(&mut self) -> ModbusResult<&mut TcpStream> {
        self.stream.as_mut().ok_or(ModbusError::NotConnected)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&mut self) -> ModbusResult<()> {
        // A stale connection from before a failure is discarded first.
        if self.stream.is_some() {
            self.close().await;
        }

        let addr = (self.settings.host.as_str(), self.settings.port);
        let stream = tokio::time::timeout(self.settings.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ModbusError::Timeout)?
            .map_err(ModbusError::Connection)?;

        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, buf: &[u8]) -> ModbusResult<()> {
        let timeout = self.settings.send_timeout;
        let stream = self.stream_mut()?;

        tokio::time::timeout(timeout, stream.write_all(buf))
            .await
            .map_err(|_| ModbusError::Timeout)?
            .map_err(ModbusError::Connection)
    }

    async fn receive_exact(&mut self, buf: &mut [u8]) -> ModbusResult<()> {
        let timeout = self.settings.recv_timeout;
        let stream = self.stream_mut()?;

        tokio::time::timeout(timeout, stream.read_exact(buf))
            .await
            .map_err(|_| ModbusError::Timeout)?
            .map_err(ModbusError::Connection)?;

        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }

    fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_is_normalized_to_loopback() {
        let settings = TcpSettings::new("localhost");
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, MODBUS_TCP_PORT);

        let settings = TcpSettings::new("LocalHost");
        assert_eq!(settings.host, "127.0.0.1");
    }

    #[test]
    fn test_other_hosts_are_kept_verbatim() {
        let settings = TcpSettings::with_port("192.168.1.40", 1502);
        assert_eq!(settings.host, "192.168.1.40");
        assert_eq!(settings.port, 1502);
    }

    #[tokio::test]
    async fn test_unopened_transport_is_closed() {
        let mut transport = TcpTransport::new(TcpSettings::new("127.0.0.1"));
        assert!(transport.is_closed());

        // close on a never-opened transport is a no-op
        transport.close().await;
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_io_on_closed_transport_fails() {
        let mut transport = TcpTransport::new(TcpSettings::new("127.0.0.1"));

        assert!(transport.send(&[0u8; 4]).await.is_err());
        let mut buf = [0u8; 4];
        assert!(transport.receive_exact(&mut buf).await.is_err());
    }
}
