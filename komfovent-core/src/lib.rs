//! Core types and utilities for the Komfovent Modbus client
//!
//! This crate provides the error type, the register map of the deployed
//! Domekt controller, and the device date/time assembly used throughout
//! the implementation.

pub mod datetime;
pub mod error;
pub mod registers;

pub use datetime::assemble_datetime;
pub use error::{ModbusError, ModbusResult};
pub use registers::Register;
