//! Modbus RTU frame encoding and decoding
//!
//! Request:  `[unit_id, 0x03, addr_hi, addr_lo, count_hi, count_lo, crc_lo, crc_hi]`
//!
//! Response: `[unit_id, function, byte_count, payload.., crc_lo, crc_hi]`

use crate::crc::{crc16, Crc16};
use bytes::{BufMut, BytesMut};
use pro380_core::{MeterError, MeterResult};

/// Function code for "read holding registers"
pub const READ_HOLDING_REGISTERS: u8 = 0x03;

/// Largest register count a single read may request
pub const MAX_READ_REGISTERS: u16 = 125;

/// Bytes before the payload: unit id, function code, byte count
pub const RESPONSE_HEADER_LENGTH: usize = 3;

pub const CRC_LENGTH: usize = 2;

/// Length of an exception reply: unit id, function | 0x80, exception code, CRC
pub const EXCEPTION_FRAME_LENGTH: usize = 5;

const EXCEPTION_BIT: u8 = 0x80;

/// Build a read request frame
///
/// # Arguments
///
/// * `unit_id` - Addressed device on the shared line
/// * `address` - First register to read
/// * `register_count` - Number of 16-bit registers, `1..=MAX_READ_REGISTERS`
pub fn encode_request(unit_id: u8, address: u16, register_count: u16) -> MeterResult<Vec<u8>> {
    if register_count == 0 || register_count > MAX_READ_REGISTERS {
        return Err(MeterError::InvalidRequest(format!(
            "register count {} outside 1..={}",
            register_count, MAX_READ_REGISTERS
        )));
    }

    let mut frame = BytesMut::with_capacity(8);
    frame.put_u8(unit_id);
    frame.put_u8(READ_HOLDING_REGISTERS);
    frame.put_u16(address);
    frame.put_u16(register_count);

    let crc = crc16(&frame);
    frame.put_u16_le(crc);
    Ok(frame.to_vec())
}

/// Total response length for a payload of `payload_len` bytes
pub fn response_len(payload_len: u16) -> usize {
    RESPONSE_HEADER_LENGTH + payload_len as usize + CRC_LENGTH
}

/// Validate a response frame and strip header and CRC
///
/// The length is checked before the CRC, so a truncated or overlong frame is
/// always a framing error.
pub fn decode_response(raw: &[u8], expected_payload_len: u16) -> MeterResult<Vec<u8>> {
    let expected = response_len(expected_payload_len);
    if raw.len() != expected {
        return Err(MeterError::Framing {
            expected,
            actual: raw.len(),
        });
    }

    verify_crc(raw)?;

    let end = RESPONSE_HEADER_LENGTH + expected_payload_len as usize;
    Ok(raw[RESPONSE_HEADER_LENGTH..end].to_vec())
}

/// Like [`decode_response`], additionally checking the echoed header
///
/// Verifies the unit id, the function code and the byte count field. Exception
/// replies (function code with the high bit set) are reported as
/// [`MeterError::Exception`].
pub fn decode_response_for(raw: &[u8], unit_id: u8, expected_payload_len: u16) -> MeterResult<Vec<u8>> {
    if let Some(err) = exception_reply(raw)? {
        return Err(err);
    }

    let payload = decode_response(raw, expected_payload_len)?;

    if raw[0] != unit_id || raw[1] != READ_HOLDING_REGISTERS {
        return Err(MeterError::UnexpectedReply {
            unit_id: raw[0],
            function: raw[1],
        });
    }
    if raw[2] as usize != payload.len() {
        log::warn!("Byte count field {} disagrees with frame length", raw[2]);
        return Err(MeterError::Framing {
            expected: response_len(expected_payload_len),
            actual: response_len(raw[2] as u16),
        });
    }
    Ok(payload)
}

/// Whether a frame starting with `header` is an exception reply
pub fn is_exception(header: &[u8]) -> bool {
    header.len() >= 2 && header[1] & EXCEPTION_BIT != 0
}

/// Decode a complete exception reply, if `raw` is one
fn exception_reply(raw: &[u8]) -> MeterResult<Option<MeterError>> {
    if raw.len() != EXCEPTION_FRAME_LENGTH || !is_exception(raw) {
        return Ok(None);
    }
    verify_crc(raw)?;
    Ok(Some(MeterError::Exception {
        function: raw[1],
        code: raw[2],
    }))
}

/// Check the trailing little-endian CRC of a complete frame
pub fn verify_crc(raw: &[u8]) -> MeterResult<()> {
    if raw.len() < CRC_LENGTH + 1 {
        return Err(MeterError::Framing {
            expected: CRC_LENGTH + 1,
            actual: raw.len(),
        });
    }
    let split = raw.len() - CRC_LENGTH;
    let received = u16::from_le_bytes([raw[split], raw[split + 1]]);

    let mut calc = Crc16::new();
    calc.update_bytes(&raw[..split]);
    let expected = calc.value();

    if received != expected {
        return Err(MeterError::Checksum { expected, received });
    }
    Ok(())
}

/// Build a well-formed response frame around `payload`
///
/// Used by device simulators and tests. The byte-count field is one byte, so
/// the payload is limited to `2 * MAX_READ_REGISTERS` bytes.
pub fn encode_response(unit_id: u8, payload: &[u8]) -> MeterResult<Vec<u8>> {
    let max_len = 2 * MAX_READ_REGISTERS as usize;
    if payload.len() > max_len {
        return Err(MeterError::InvalidRequest(format!(
            "response payload of {} bytes exceeds {}",
            payload.len(),
            max_len
        )));
    }

    let mut frame = BytesMut::with_capacity(RESPONSE_HEADER_LENGTH + payload.len() + CRC_LENGTH);
    frame.put_u8(unit_id);
    frame.put_u8(READ_HOLDING_REGISTERS);
    frame.put_u8(payload.len() as u8);
    frame.put_slice(payload);
    let crc = crc16(&frame);
    frame.put_u16_le(crc);
    Ok(frame.to_vec())
}

/// Build an exception reply frame
pub fn encode_exception(unit_id: u8, code: u8) -> Vec<u8> {
    let mut frame = BytesMut::with_capacity(EXCEPTION_FRAME_LENGTH);
    frame.put_u8(unit_id);
    frame.put_u8(READ_HOLDING_REGISTERS | EXCEPTION_BIT);
    frame.put_u8(code);
    let crc = crc16(&frame);
    frame.put_u16_le(crc);
    frame.to_vec()
}
