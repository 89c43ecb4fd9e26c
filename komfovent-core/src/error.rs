use thiserror::Error;

/// Main error type for Modbus client operations
#[derive(Error, Debug)]
pub enum ModbusError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Frame invalid: {0}")]
    FrameInvalid(String),

    #[error("Modbus exception: function 0x{0:02X}, code 0x{1:02X}")]
    Exception(u8, u8),

    #[error("Not connected")]
    NotConnected,
}

/// Result type alias for Modbus client operations
pub type ModbusResult<T> = Result<T, ModbusError>;
