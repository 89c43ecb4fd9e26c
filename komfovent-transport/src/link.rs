//! Transport trait for the physical link to the device

use async_trait::async_trait;
use komfovent_core::ModbusResult;

/// Byte-level transport to the device
///
/// Every operation is bounded: implementations apply their configured
/// timeouts to each call, so no method waits forever. `close` is
/// idempotent and infallible; after a failure the caller is expected to
/// close the transport and `open` it again later.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the physical connection
    ///
    /// Reopens a transport that was closed earlier. Implementations that
    /// find a stale connection discard it first.
    ///
    /// # Errors
    ///
    /// Returns error if the connection cannot be established within the
    /// configured timeout
    async fn open(&mut self) -> ModbusResult<()>;

    /// Send the whole buffer to the device
    ///
    /// # Errors
    ///
    /// Returns error if the transport is closed, the peer rejects the
    /// data, or the send timeout elapses
    async fn send(&mut self, buf: &[u8]) -> ModbusResult<()>;

    /// Receive exactly `buf.len()` bytes from the device
    ///
    /// # Errors
    ///
    /// Returns error if the transport is closed, the peer closes the
    /// connection early, or the receive timeout elapses
    async fn receive_exact(&mut self, buf: &mut [u8]) -> ModbusResult<()>;

    /// Close the transport and discard the underlying connection
    ///
    /// Safe to call repeatedly and on a transport that never opened.
    async fn close(&mut self);

    /// Check whether the transport is currently closed
    fn is_closed(&self) -> bool;
}
