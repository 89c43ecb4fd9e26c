//! Transport layer for the Komfovent Modbus client
//!
//! This crate provides the byte-level transport seam the client depends
//! on: a bounded send/receive primitive with an explicit lifecycle, and
//! its TCP implementation.

pub mod link;
pub mod tcp;

pub use link::Transport;
pub use tcp::{MODBUS_TCP_PORT, TcpSettings, TcpTransport};
