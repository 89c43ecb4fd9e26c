//! Transaction codec for single-register Modbus TCP exchanges
//!
//! Pure functions mapping (operation, register, value) to request frames
//! and response frames back to values. Only the two function codes the
//! device is spoken to with are implemented: read holding register
//! (0x03) and write single register (0x06), always one register per
//! transaction, always unit identifier 2.

use bytes::{BufMut, BytesMut};
use komfovent_core::{ModbusError, ModbusResult, Register};

/// Unit identifier of the device in the deployed configuration
pub const UNIT_ID: u8 = 2;

/// MBAP header length in bytes (transaction, protocol, length, unit)
pub const MBAP_HEADER_LENGTH: usize = 7;

/// Function code: read holding registers
pub const FC_READ_HOLDING: u8 = 0x03;

/// Function code: write single register
pub const FC_WRITE_SINGLE: u8 = 0x06;

/// Modbus protocol identifier (always zero for Modbus TCP)
const PROTOCOL_ID: u16 = 0;

/// Largest PDU a well-formed frame may announce
const MAX_PDU_LENGTH: usize = 253;

/// MBAP header of a Modbus TCP frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    /// Remaining byte count announced by the frame (unit id + PDU)
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    /// Create a header for a PDU of `pdu_length` bytes
    pub fn new(transaction_id: u16, pdu_length: u16) -> Self {
        Self {
            transaction_id,
            length: pdu_length + 1,
            unit_id: UNIT_ID,
        }
    }

    /// Encode the header to bytes (big-endian)
    pub fn encode(&self) -> [u8; MBAP_HEADER_LENGTH] {
        let mut result = [0u8; MBAP_HEADER_LENGTH];
        result[0..2].copy_from_slice(&self.transaction_id.to_be_bytes());
        result[2..4].copy_from_slice(&PROTOCOL_ID.to_be_bytes());
        result[4..6].copy_from_slice(&self.length.to_be_bytes());
        result[6] = self.unit_id;
        result
    }

    /// Decode a header from bytes
    ///
    /// # Errors
    ///
    /// Returns error if the buffer is short, the protocol identifier is
    /// not the Modbus TCP one, or the announced length is out of range
    pub fn decode(data: &[u8]) -> ModbusResult<Self> {
        if data.len() < MBAP_HEADER_LENGTH {
            return Err(ModbusError::FrameInvalid(format!(
                "MBAP header too short: expected {}, got {}",
                MBAP_HEADER_LENGTH,
                data.len()
            )));
        }

        let protocol_id = u16::from_be_bytes([data[2], data[3]]);
        if protocol_id != PROTOCOL_ID {
            return Err(ModbusError::FrameInvalid(format!(
                "Unexpected protocol identifier: 0x{:04X}",
                protocol_id
            )));
        }

        let length = u16::from_be_bytes([data[4], data[5]]);
        if length < 2 || length as usize > MAX_PDU_LENGTH + 1 {
            return Err(ModbusError::FrameInvalid(format!(
                "Announced frame length out of range: {}",
                length
            )));
        }

        Ok(Self {
            transaction_id: u16::from_be_bytes([data[0], data[1]]),
            length,
            unit_id: data[6],
        })
    }

    /// Number of PDU bytes following the header
    pub fn pdu_length(&self) -> usize {
        self.length as usize - 1
    }
}

/// Encode a request to read one holding register
///
/// The register map uses the one-based numbering of the device manual;
/// the wire offset sent here is one less.
pub fn encode_read_request(transaction_id: u16, register: Register) -> Vec<u8> {
    let mut frame = BytesMut::with_capacity(MBAP_HEADER_LENGTH + 5);
    frame.put_slice(&MbapHeader::new(transaction_id, 5).encode());
    frame.put_u8(FC_READ_HOLDING);
    frame.put_u16(register.wire_offset());
    frame.put_u16(1);
    frame.to_vec()
}

/// Encode a request to write one holding register
pub fn encode_write_request(transaction_id: u16, register: Register, value: u16) -> Vec<u8> {
    let mut frame = BytesMut::with_capacity(MBAP_HEADER_LENGTH + 5);
    frame.put_slice(&MbapHeader::new(transaction_id, 5).encode());
    frame.put_u8(FC_WRITE_SINGLE);
    frame.put_u16(register.wire_offset());
    frame.put_u16(value);
    frame.to_vec()
}

fn check_envelope(
    transaction_id: u16,
    header: &MbapHeader,
    pdu: &[u8],
    function: u8,
) -> ModbusResult<()> {
    if header.transaction_id != transaction_id {
        return Err(ModbusError::FrameInvalid(format!(
            "Transaction id mismatch: expected {}, got {}",
            transaction_id, header.transaction_id
        )));
    }
    if header.unit_id != UNIT_ID {
        return Err(ModbusError::FrameInvalid(format!(
            "Unexpected unit identifier: {}",
            header.unit_id
        )));
    }
    if pdu.is_empty() {
        return Err(ModbusError::FrameInvalid("Empty PDU".to_string()));
    }
    if pdu[0] & 0x80 != 0 {
        let exception_code = if pdu.len() > 1 { pdu[1] } else { 0 };
        return Err(ModbusError::Exception(pdu[0], exception_code));
    }
    if pdu[0] != function {
        return Err(ModbusError::FrameInvalid(format!(
            "Unexpected function code: expected 0x{:02X}, got 0x{:02X}",
            function, pdu[0]
        )));
    }
    Ok(())
}

/// Decode the response to a read request into the register value
///
/// # Errors
///
/// Returns error on transaction id or unit mismatch, Modbus exception
/// frames, and short or malformed byte counts
pub fn decode_read_response(
    transaction_id: u16,
    header: &MbapHeader,
    pdu: &[u8],
) -> ModbusResult<u16> {
    check_envelope(transaction_id, header, pdu, FC_READ_HOLDING)?;

    if pdu.len() < 4 || pdu[1] != 2 {
        return Err(ModbusError::FrameInvalid(format!(
            "Malformed read response: {:02X?}",
            pdu
        )));
    }

    Ok(u16::from_be_bytes([pdu[2], pdu[3]]))
}

/// Decode the response to a write request, validating the echo
///
/// # Errors
///
/// Returns error on envelope mismatch or when the echoed offset/value
/// differ from what was written
pub fn decode_write_response(
    transaction_id: u16,
    header: &MbapHeader,
    pdu: &[u8],
    register: Register,
    value: u16,
) -> ModbusResult<()> {
    check_envelope(transaction_id, header, pdu, FC_WRITE_SINGLE)?;

    if pdu.len() < 5 {
        return Err(ModbusError::FrameInvalid(format!(
            "Malformed write response: {:02X?}",
            pdu
        )));
    }

    let echoed_offset = u16::from_be_bytes([pdu[1], pdu[2]]);
    let echoed_value = u16::from_be_bytes([pdu[3], pdu[4]]);
    if echoed_offset != register.wire_offset() || echoed_value != value {
        return Err(ModbusError::FrameInvalid(format!(
            "Write echo mismatch: offset {} value {}",
            echoed_offset, echoed_value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_read_request() {
        let frame = encode_read_request(0x0001, Register::Power);
        assert_eq!(
            frame,
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x02, 0x03, 0x00, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn test_encode_write_request() {
        // TemperatureSetpoint is register number 4, wire offset 3
        let frame = encode_write_request(0x1234, Register::TemperatureSetpoint, 0x00DC);
        assert_eq!(
            frame,
            vec![0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x02, 0x06, 0x00, 0x03, 0x00, 0xDC]
        );
    }

    #[test]
    fn test_decode_read_response() {
        let header = MbapHeader::decode(&[0x00, 0x07, 0x00, 0x00, 0x00, 0x05, 0x02]).unwrap();
        assert_eq!(header.transaction_id, 7);
        assert_eq!(header.pdu_length(), 4);

        let value = decode_read_response(7, &header, &[0x03, 0x02, 0xAB, 0xCD]).unwrap();
        assert_eq!(value, 0xABCD);
    }

    #[test]
    fn test_decode_write_response_echo() {
        let header = MbapHeader::new(9, 5);
        let pdu = [0x06, 0x00, 0x03, 0x00, 0xDC];
        assert!(
            decode_write_response(9, &header, &pdu, Register::TemperatureSetpoint, 0x00DC).is_ok()
        );

        // Echo carrying a different value is rejected
        let err = decode_write_response(9, &header, &pdu, Register::TemperatureSetpoint, 0x00DD)
            .unwrap_err();
        assert!(matches!(err, ModbusError::FrameInvalid(_)));
    }

    #[test]
    fn test_decode_rejects_transaction_id_mismatch() {
        let header = MbapHeader::new(1, 5);
        let err = decode_read_response(2, &header, &[0x03, 0x02, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, ModbusError::FrameInvalid(_)));
    }

    #[test]
    fn test_decode_exception_frame() {
        let header = MbapHeader::new(3, 2);
        let err = decode_read_response(3, &header, &[0x83, 0x02]).unwrap_err();
        assert!(matches!(err, ModbusError::Exception(0x83, 0x02)));
    }

    #[test]
    fn test_decode_rejects_bad_protocol_id() {
        let err = MbapHeader::decode(&[0x00, 0x01, 0x00, 0x01, 0x00, 0x05, 0x02]).unwrap_err();
        assert!(matches!(err, ModbusError::FrameInvalid(_)));
    }

    #[test]
    fn test_decode_rejects_short_header() {
        assert!(MbapHeader::decode(&[0x00, 0x01, 0x00]).is_err());
    }

    #[test]
    fn test_decode_rejects_out_of_range_length() {
        // Length 1 would leave no PDU at all
        assert!(MbapHeader::decode(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x02]).is_err());
        // Length 0x0200 exceeds the largest legal PDU
        assert!(MbapHeader::decode(&[0x00, 0x01, 0x00, 0x00, 0x02, 0x00, 0x02]).is_err());
    }

    #[test]
    fn test_decode_rejects_short_read_pdu() {
        let header = MbapHeader::new(4, 3);
        assert!(decode_read_response(4, &header, &[0x03, 0x02]).is_err());
    }
}
