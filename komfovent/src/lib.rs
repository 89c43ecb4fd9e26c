//! Resilient Modbus TCP client for Komfovent Domekt ventilation controllers
//!
//! This library keeps a live connection to a single Domekt unit across
//! flaky networks and exposes register-level read/write operations that
//! never panic and never propagate errors to the caller.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `komfovent-core`: Error type, register map, device clock assembly
//! - `komfovent-transport`: Transport trait and TCP implementation
//! - `komfovent-client`: Transaction codec, connection supervisor, and
//!   the register access façade
//!
//! # Usage
//!
//! ```no_run
//! use komfovent::{Register, ReliableClient};
//!
//! async fn poll_once() {
//!     let client = ReliableClient::new_tcp("192.168.1.40");
//!     client.initialize();
//!
//!     // Failed reads are None until the supervisor has connected;
//!     // callers poll again on the next cycle.
//!     if let Some(level) = client.try_read(Register::FanLevel).await {
//!         println!("fan level: {}", level);
//!     }
//!
//!     client.shutdown().await;
//! }
//! ```

// Re-export core types
pub use komfovent_core::{ModbusError, ModbusResult, Register, assemble_datetime};

// Re-export the client API
pub use komfovent_client::{ConnectionState, ReliableClient};

// Re-export the transport seam
pub mod transport {
    pub use komfovent_transport::*;
}
