//! Resilient Modbus client for the Komfovent Domekt controller
//!
//! This crate provides the transaction codec and the [`ReliableClient`],
//! a register-level read/write façade whose connection is kept alive by
//! a background supervisor task. Operations never panic and never
//! propagate errors past their boundary; a failed transaction simply
//! reports failure while the supervisor re-establishes the connection.

pub mod client;
pub mod codec;

pub use client::{ConnectionState, ReliableClient};
