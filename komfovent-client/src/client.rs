//! Connection supervision and register access façade
//!
//! # Architecture
//!
//! [`ReliableClient`] pairs two cooperating parts around one shared
//! transport:
//!
//! - **Supervisor**: a background task that watches the connection state
//!   and re-establishes the transport whenever it finds it down. It is
//!   the only place that may transition the link to `Connected`.
//! - **Façade**: the public `try_read`/`try_write` operations. They
//!   perform one transaction per call and classify every transport or
//!   framing failure as a disconnect, which the supervisor then repairs.
//!
//! The transport handle and the connection state are guarded by a single
//! mutex and only ever read or written as one unit, so a caller can
//! never observe a connected state with a stale handle, and a reconnect
//! can never race an in-flight transaction.
//!
//! # Failure contract
//!
//! Nothing here panics or returns an error to the caller: a failed read
//! is `None`, a failed write is `false`. During an outage callers simply
//! see failed results until the supervisor has reconnected, at which
//! point operations resume with no caller-side retry logic. Diagnostic
//! detail is available through [`ReliableClient::last_error`] and
//! [`ReliableClient::disconnect_count`].

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use komfovent_core::{ModbusError, ModbusResult, Register, assemble_datetime};
use komfovent_transport::{TcpSettings, TcpTransport, Transport};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::codec::{self, MBAP_HEADER_LENGTH, MbapHeader};

/// Wait between reconnect attempts
const RECONNECT_INTERVAL: Duration = Duration::from_millis(500);

/// Poll interval while connected, keeps the supervisor responsive to
/// disconnects flagged by the façade
const CONNECTED_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Settling time the device needs between request and response
const INTER_MESSAGE_DELAY: Duration = Duration::from_millis(100);

/// Cadence delay after a completed transaction, before the link lock is
/// released to the next caller
const POST_TRANSACTION_DELAY: Duration = Duration::from_millis(50);

/// Connection state of the device link
///
/// Register I/O is attempted only in `Connected`; every other state
/// short-circuits to a failure result without touching the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// `initialize` has not been called yet
    Uninitialized,
    /// Transport is down; the supervisor will reconnect
    Disconnected,
    /// The supervisor is currently opening the transport
    Connecting,
    /// Transport is up, transactions may proceed
    Connected,
}

/// The transport handle and its connectivity state, guarded as one unit
struct Link<T> {
    transport: T,
    state: ConnectionState,
}

struct Shared<T> {
    link: Mutex<Link<T>>,
    initialized: AtomicBool,
    stopping: AtomicBool,
    disconnect_count: AtomicU32,
    next_transaction: AtomicU16,
    last_error: StdMutex<Option<ModbusError>>,
}

impl<T> Shared<T> {
    fn record_error(&self, err: ModbusError) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err);
    }
}

/// Resilient single-device Modbus client
///
/// Create it, call [`initialize`](Self::initialize) once from within a
/// tokio runtime, then read and write registers from as many tasks as
/// needed. The background supervisor keeps the connection alive for the
/// life of the client; [`shutdown`](Self::shutdown) stops it and closes
/// the transport.
pub struct ReliableClient<T: Transport> {
    shared: Arc<Shared<T>>,
    supervisor: StdMutex<Option<JoinHandle<()>>>,
}

impl ReliableClient<TcpTransport> {
    /// Create a client for a device reachable at `host`, fixed port 502
    ///
    /// # Arguments
    ///
    /// * `host` - Hostname or numeric address; "localhost" is replaced
    ///   by the loopback numeric address
    pub fn new_tcp(host: &str) -> Self {
        Self::new(TcpTransport::new(TcpSettings::new(host)))
    }
}

impl<T: Transport> ReliableClient<T> {
    /// Create a client over the given transport, not yet initialized
    pub fn new(transport: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                link: Mutex::new(Link {
                    transport,
                    state: ConnectionState::Uninitialized,
                }),
                initialized: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
                disconnect_count: AtomicU32::new(0),
                next_transaction: AtomicU16::new(0),
                last_error: StdMutex::new(None),
            }),
            supervisor: StdMutex::new(None),
        }
    }

    /// Check whether `initialize` has been called
    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::SeqCst)
    }

    /// Check whether the device link is currently up
    pub async fn is_connected(&self) -> bool {
        self.shared.link.lock().await.state == ConnectionState::Connected
    }

    /// Get the current connection state
    pub async fn state(&self) -> ConnectionState {
        self.shared.link.lock().await.state
    }

    /// Number of times the supervisor found the link down and began a
    /// reconnect attempt, monotonic over the client lifetime
    pub fn disconnect_count(&self) -> u32 {
        self.shared.disconnect_count.load(Ordering::Relaxed)
    }

    /// The most recent transport failure, if any
    pub fn last_error(&self) -> Option<String> {
        self.shared
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|err| err.to_string())
    }

    /// Read one register
    ///
    /// Returns `None` when the client is not initialized, the link is
    /// down, or the transaction fails for any reason. Any mid-transaction
    /// failure marks the link disconnected and discards the transport;
    /// the supervisor re-establishes it in the background.
    pub async fn try_read(&self, register: Register) -> Option<u16> {
        if !self.is_initialized() {
            return None;
        }

        let mut link = self.shared.link.lock().await;
        if link.state != ConnectionState::Connected {
            return None;
        }

        let transaction_id = self.shared.next_transaction.fetch_add(1, Ordering::Relaxed);
        let request = codec::encode_read_request(transaction_id, register);

        let result = match Self::exchange(&mut *link, &request).await {
            Ok((header, pdu)) => codec::decode_read_response(transaction_id, &header, &pdu),
            Err(err) => Err(err),
        };

        match result {
            Ok(value) => {
                tokio::time::sleep(POST_TRANSACTION_DELAY).await;
                Some(value)
            }
            Err(err) => {
                self.disconnect_link(&mut *link, "read", register, err).await;
                None
            }
        }
    }

    /// Write one register
    ///
    /// Returns `false` under the same conditions `try_read` returns
    /// `None`; the failure classification is identical.
    pub async fn try_write(&self, register: Register, value: u16) -> bool {
        if !self.is_initialized() {
            return false;
        }

        let mut link = self.shared.link.lock().await;
        if link.state != ConnectionState::Connected {
            return false;
        }

        let transaction_id = self.shared.next_transaction.fetch_add(1, Ordering::Relaxed);
        let request = codec::encode_write_request(transaction_id, register, value);

        let result = match Self::exchange(&mut *link, &request).await {
            Ok((header, pdu)) => {
                codec::decode_write_response(transaction_id, &header, &pdu, register, value)
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                tokio::time::sleep(POST_TRANSACTION_DELAY).await;
                true
            }
            Err(err) => {
                self.disconnect_link(&mut *link, "write", register, err)
                    .await;
                false
            }
        }
    }

    /// Read the device clock
    ///
    /// Assembles the three packed clock registers into a timestamp. The
    /// registers are read independently and may straddle a reconnect;
    /// the result is not a consistent snapshot. When any read fails or
    /// the device returns values that do not form a valid calendar time,
    /// the current local wall clock is substituted and the success flag
    /// is `false`.
    pub async fn read_device_time(&self) -> (bool, NaiveDateTime) {
        let hour_minute = self.try_read(Register::HourAndMinute).await;
        let month_day = self.try_read(Register::MonthAndDay).await;
        let year = self.try_read(Register::Year).await;

        let assembled = match (hour_minute, month_day, year) {
            (Some(hour_minute), Some(month_day), Some(year)) => {
                assemble_datetime(hour_minute, month_day, year)
            }
            _ => None,
        };

        match assembled {
            Some(timestamp) => (true, timestamp),
            None => (false, Local::now().naive_local()),
        }
    }

    /// One request/response exchange on the locked link
    async fn exchange(link: &mut Link<T>, request: &[u8]) -> ModbusResult<(MbapHeader, Vec<u8>)> {
        link.transport.send(request).await?;

        tokio::time::sleep(INTER_MESSAGE_DELAY).await;

        let mut header_buf = [0u8; MBAP_HEADER_LENGTH];
        link.transport.receive_exact(&mut header_buf).await?;
        let header = MbapHeader::decode(&header_buf)?;

        let mut pdu = vec![0u8; header.pdu_length()];
        link.transport.receive_exact(&mut pdu).await?;

        Ok((header, pdu))
    }

    async fn disconnect_link(
        &self,
        link: &mut Link<T>,
        operation: &str,
        register: Register,
        err: ModbusError,
    ) {
        log::warn!(
            "Could not {} register {}, because of {}. Disconnecting.",
            operation,
            register,
            err
        );
        link.state = ConnectionState::Disconnected;
        link.transport.close().await;
        self.shared.record_error(err);
    }

    /// Stop the supervisor and close the transport
    ///
    /// The stop signal is honored at loop-iteration boundaries; an
    /// in-flight connect attempt finishes first.
    pub async fn shutdown(&self) {
        self.shared.stopping.store(true, Ordering::SeqCst);

        let handle = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let mut link = self.shared.link.lock().await;
        link.state = ConnectionState::Disconnected;
        link.transport.close().await;
    }
}

impl<T: Transport + 'static> ReliableClient<T> {
    /// Start the background supervisor
    ///
    /// Idempotent: the first call spawns the supervisor task and marks
    /// the client initialized, later calls are no-ops. Must be called
    /// from within a tokio runtime.
    pub fn initialize(&self) {
        if self.shared.initialized.swap(true, Ordering::SeqCst) {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move { supervise(shared).await });
        *self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }
}

/// Supervisor loop: detect a down link and re-establish the transport
///
/// Connect failures are recorded and retried on the next pass, never
/// fatal. This is the only place that transitions the link to
/// `Connected`.
async fn supervise<T: Transport>(shared: Arc<Shared<T>>) {
    while !shared.stopping.load(Ordering::SeqCst) {
        let attempted = {
            let mut link = shared.link.lock().await;
            if link.state == ConnectionState::Connected {
                false
            } else {
                shared.disconnect_count.fetch_add(1, Ordering::Relaxed);
                link.state = ConnectionState::Connecting;
                log::info!("Connecting to the Modbus device.");

                match link.transport.open().await {
                    Ok(()) => {
                        link.state = ConnectionState::Connected;
                        log::info!("Modbus device connected.");
                    }
                    Err(err) => {
                        log::error!("Connecting to the Modbus device failed: {}", err);
                        link.state = ConnectionState::Disconnected;
                        link.transport.close().await;
                        shared.record_error(err);
                    }
                }
                true
            }
        };

        let interval = if attempted {
            RECONNECT_INTERVAL
        } else {
            CONNECTED_POLL_INTERVAL
        };
        tokio::time::sleep(interval).await;
    }
}
