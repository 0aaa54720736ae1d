use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::stuff::{stuff_frame, unstuff_frame};

/// RS-485 frame head: `EB 90`.
pub const RS485_HEAD: [u8; 2] = [0xEB, 0x90];

/// CAN-over-serial frame head byte, repeated twice.
pub const CAN_HEAD: u8 = 0xAA;

/// CAN-over-serial frame tail byte, repeated twice.
pub const CAN_TAIL: u8 = 0x55;

/// An unstuffed CAN frame is always this long.
pub const CAN_FRAME_LEN: usize = 21;

/// The CAN payload window carries 8 bytes, zero-padded.
pub const CAN_PAYLOAD_LEN: usize = 8;

/// A logical register block spans at most six values.
pub const MAX_BLOCK_VALUES: usize = 6;

/// One CAN frame carries at most four 16-bit values.
pub const MAX_CAN_FRAME_VALUES: usize = 4;

/// Identifier base bits for a register write (reads use zero).
const CAN_WRITE_BASE: u32 = 0x0400_0000;

/// Identifier low bits, always set.
const CAN_ID_SUFFIX: u32 = 0x3FFF;

/// Fixed extension bytes between data length and checksum.
const CAN_EXTENSION: [u8; 3] = [0x00, 0x01, 0x00];

const OPCODE_WRITE: u8 = 0x12;
const OPCODE_READ: u8 = 0x11;

/// Fixed response-length byte carried by RS-485 read requests.
const RS485_READ_LEN: u8 = 0x0C;

/// Which of the two sibling wire protocols is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVariant {
    /// Register protocol over RS-485: one frame carries a whole block.
    Rs485,
    /// CAN frames tunnelled over serial: at most four values per frame.
    Can,
}

/// Direction of a register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

/// Unsigned 8-bit sum of `bytes`, mod 256.
pub fn frame_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Compose the 32-bit CAN identifier for a register access.
///
/// `baseBits + (address << 14) + 0x3FFF`, where the base is `0x04000000` for
/// writes and zero for reads. Stored little-endian on the wire.
pub fn can_identifier(op: Operation, address: u16) -> u32 {
    let base = match op {
        Operation::Write => CAN_WRITE_BASE,
        Operation::Read => 0,
    };
    base + (u32::from(address) << 14) + CAN_ID_SUFFIX
}

/// Encode an RS-485 register write.
///
/// ```text
/// ┌───────┬────┬────────┬──────┬───────────────┬────────────┬──────────┐
/// │ EB 90 │ id │ 2n + 3 │ 0x12 │ addrLo addrHi │ n × LE i16 │ checksum │
/// └───────┴────┴────────┴──────┴───────────────┴────────────┴──────────┘
/// ```
///
/// The checksum covers every byte from the device id onward. A write value of
/// −1 encodes as `FF FF`, the module's "hold current target" sentinel.
pub fn encode_rs485_write(
    device_id: u8,
    address: u16,
    values: &[i16],
    dst: &mut BytesMut,
) -> Result<()> {
    if values.len() > MAX_BLOCK_VALUES {
        return Err(FrameError::TooManyValues {
            count: values.len(),
            max: MAX_BLOCK_VALUES,
        });
    }
    let start = dst.len();
    dst.reserve(8 + 2 * values.len());
    dst.put_slice(&RS485_HEAD);
    dst.put_u8(device_id);
    dst.put_u8(2 * values.len() as u8 + 3);
    dst.put_u8(OPCODE_WRITE);
    dst.put_u16_le(address);
    for &value in values {
        dst.put_i16_le(value);
    }
    let checksum = frame_checksum(&dst[start + 2..]);
    dst.put_u8(checksum);
    trace!(address, count = values.len(), "encoded rs485 write");
    Ok(())
}

/// Encode an RS-485 register read request.
///
/// Carries one payload byte, the fixed response-length `0x0C`, so the length
/// field is `1 + 3`.
pub fn encode_rs485_read(device_id: u8, address: u16, dst: &mut BytesMut) {
    let start = dst.len();
    dst.reserve(9);
    dst.put_slice(&RS485_HEAD);
    dst.put_u8(device_id);
    dst.put_u8(0x04);
    dst.put_u8(OPCODE_READ);
    dst.put_u16_le(address);
    dst.put_u8(RS485_READ_LEN);
    let checksum = frame_checksum(&dst[start + 2..]);
    dst.put_u8(checksum);
    trace!(address, "encoded rs485 read");
}

/// Validate an RS-485 response header and, in strict mode, its checksum.
///
/// Returns the total frame length implied by the length byte.
fn check_rs485_response(raw: &[u8], strict: bool) -> Result<usize> {
    if raw.len() < 7 {
        return Err(FrameError::ShortFrame {
            len: raw.len(),
            need: 7,
        });
    }
    if raw[0..2] != RS485_HEAD {
        return Err(FrameError::MalformedFrame("missing EB 90 header"));
    }
    let total = usize::from(raw[3]) + 5;
    if strict {
        if raw.len() < total {
            return Err(FrameError::ShortFrame {
                len: raw.len(),
                need: total,
            });
        }
        let computed = frame_checksum(&raw[2..total - 1]);
        let found = raw[total - 1];
        if computed != found {
            return Err(FrameError::ChecksumMismatch { found, computed });
        }
    }
    Ok(total)
}

/// Extract `count` 16-bit little-endian values from an RS-485 response.
///
/// Values sit at fixed offsets: byte 7 onward, step 2. No sanitization is
/// applied here; the caller maps raw readings through the register class.
pub fn decode_rs485_values(raw: &[u8], count: usize, strict: bool) -> Result<Vec<u16>> {
    check_rs485_response(raw, strict)?;
    let need = 7 + 2 * count;
    if raw.len() < need {
        return Err(FrameError::ShortFrame {
            len: raw.len(),
            need,
        });
    }
    Ok(raw[7..need]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Extract `count` raw bytes from an RS-485 response (byte-wide telemetry).
pub fn decode_rs485_bytes(raw: &[u8], count: usize, strict: bool) -> Result<Vec<u8>> {
    check_rs485_response(raw, strict)?;
    let need = 7 + count;
    if raw.len() < need {
        return Err(FrameError::ShortFrame {
            len: raw.len(),
            need,
        });
    }
    Ok(raw[7..need].to_vec())
}

/// Build one CAN frame around an 8-byte payload window and stuff it.
fn put_can_frame(identifier: u32, payload: &[u8; CAN_PAYLOAD_LEN], data_len: u8, dst: &mut BytesMut) {
    let mut frame = BytesMut::with_capacity(CAN_FRAME_LEN);
    frame.put_u8(CAN_HEAD);
    frame.put_u8(CAN_HEAD);
    frame.put_u32_le(identifier);
    frame.put_slice(payload);
    frame.put_u8(data_len);
    frame.put_slice(&CAN_EXTENSION);
    let checksum = frame_checksum(&frame[2..]);
    frame.put_u8(checksum);
    frame.put_u8(CAN_TAIL);
    frame.put_u8(CAN_TAIL);

    dst.extend_from_slice(&stuff_frame(&frame));
}

/// Encode a CAN register write of up to four values.
///
/// Values pack little-endian from payload offset 0, zero-padded to 8 bytes;
/// the data-length byte is the count of meaningful payload bytes.
pub fn encode_can_write(address: u16, values: &[i16], dst: &mut BytesMut) -> Result<()> {
    if values.is_empty() || values.len() > MAX_CAN_FRAME_VALUES {
        return Err(FrameError::TooManyValues {
            count: values.len(),
            max: MAX_CAN_FRAME_VALUES,
        });
    }
    let mut payload = [0u8; CAN_PAYLOAD_LEN];
    for (i, &value) in values.iter().enumerate() {
        payload[2 * i..2 * i + 2].copy_from_slice(&value.to_le_bytes());
    }
    let identifier = can_identifier(Operation::Write, address);
    put_can_frame(identifier, &payload, 2 * values.len() as u8, dst);
    trace!(address, count = values.len(), "encoded can write");
    Ok(())
}

/// Encode a CAN single-byte control register write.
pub fn encode_can_write_byte(address: u16, value: u8, dst: &mut BytesMut) {
    let mut payload = [0u8; CAN_PAYLOAD_LEN];
    payload[0] = value;
    let identifier = can_identifier(Operation::Write, address);
    put_can_frame(identifier, &payload, 1, dst);
    trace!(address, value, "encoded can control write");
}

/// Encode a CAN register read request for `byte_count` bytes.
///
/// Payload byte 0 carries the requested byte count; the data-length byte
/// repeats it.
pub fn encode_can_read(address: u16, byte_count: u8, dst: &mut BytesMut) {
    let mut payload = [0u8; CAN_PAYLOAD_LEN];
    payload[0] = byte_count;
    let identifier = can_identifier(Operation::Read, address);
    put_can_frame(identifier, &payload, byte_count, dst);
    trace!(address, byte_count, "encoded can read");
}

/// Locate the start marker, tolerating leading garbage in the buffer.
fn can_resync(raw: &[u8]) -> Result<usize> {
    raw.iter()
        .position(|&b| b == CAN_HEAD)
        .ok_or(FrameError::MalformedFrame("no AA start marker in window"))
}

/// Unstuff and validate one CAN frame starting at the first `AA`.
fn strict_can_frame(raw: &[u8]) -> Result<[u8; CAN_FRAME_LEN]> {
    let start = can_resync(raw)?;
    let stuffed = &raw[start..];
    if stuffed.len() < 2 || stuffed[1] != CAN_HEAD {
        return Err(FrameError::MalformedFrame("truncated AA AA header"));
    }

    let mut frame = [0u8; CAN_FRAME_LEN];
    frame[0] = CAN_HEAD;
    frame[1] = CAN_HEAD;
    let mut filled = 2;
    let mut i = 2;
    while filled < CAN_FRAME_LEN {
        let Some(&byte) = stuffed.get(i) else {
            return Err(FrameError::ShortFrame {
                len: raw.len(),
                need: start + CAN_FRAME_LEN,
            });
        };
        // Escapes only occur in the stuffed region, which ends at the tail.
        if byte == crate::stuff::ESCAPE && filled < CAN_FRAME_LEN - 2 {
            i += 1;
            let Some(&literal) = stuffed.get(i) else {
                return Err(FrameError::MalformedFrame("dangling escape byte"));
            };
            frame[filled] = literal;
        } else {
            frame[filled] = byte;
        }
        filled += 1;
        i += 1;
    }

    if frame[CAN_FRAME_LEN - 2] != CAN_TAIL || frame[CAN_FRAME_LEN - 1] != CAN_TAIL {
        return Err(FrameError::MalformedFrame("missing 55 55 tail"));
    }
    let computed = frame_checksum(&frame[2..CAN_FRAME_LEN - 3]);
    let found = frame[CAN_FRAME_LEN - 3];
    if computed != found {
        return Err(FrameError::ChecksumMismatch { found, computed });
    }
    Ok(frame)
}

/// Extract `count` 16-bit little-endian values from a CAN response.
///
/// Permissive mode replicates fielded receiver behavior: scan forward to the
/// first `AA`, then read the fixed window `start+6 .. start+6+2*count`
/// directly from the raw bytes, checksum ignored. Strict mode unstuffs the
/// frame, verifies tail and checksum, and reads the window from the unstuffed
/// bytes.
pub fn decode_can_values(raw: &[u8], count: usize, strict: bool) -> Result<Vec<u16>> {
    if count > MAX_CAN_FRAME_VALUES {
        return Err(FrameError::TooManyValues {
            count,
            max: MAX_CAN_FRAME_VALUES,
        });
    }
    let window = if strict {
        let frame = strict_can_frame(raw)?;
        frame[6..6 + 2 * count].to_vec()
    } else {
        let start = can_resync(raw)?;
        let need = start + 6 + 2 * count;
        if raw.len() < need {
            return Err(FrameError::ShortFrame {
                len: raw.len(),
                need,
            });
        }
        raw[start + 6..need].to_vec()
    };
    Ok(window
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Extract `count` raw bytes from a CAN response (byte-wide telemetry).
pub fn decode_can_bytes(raw: &[u8], count: usize, strict: bool) -> Result<Vec<u8>> {
    if count > CAN_PAYLOAD_LEN {
        return Err(FrameError::TooManyValues {
            count,
            max: CAN_PAYLOAD_LEN,
        });
    }
    if strict {
        let frame = strict_can_frame(raw)?;
        return Ok(frame[6..6 + count].to_vec());
    }
    let start = can_resync(raw)?;
    let need = start + 6 + count;
    if raw.len() < need {
        return Err(FrameError::ShortFrame {
            len: raw.len(),
            need,
        });
    }
    Ok(raw[start + 6..need].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rs485_write_golden_frame() {
        let mut buf = BytesMut::new();
        encode_rs485_write(1, 1486, &[1000; 6], &mut buf).unwrap();
        assert_eq!(
            buf.as_ref(),
            &[
                0xEB, 0x90, 0x01, 0x0F, 0x12, 0xCE, 0x05, //
                0xE8, 0x03, 0xE8, 0x03, 0xE8, 0x03, 0xE8, 0x03, 0xE8, 0x03, 0xE8, 0x03, //
                0x77,
            ]
        );
    }

    #[test]
    fn rs485_read_golden_frame() {
        let mut buf = BytesMut::new();
        encode_rs485_read(1, 1546, &mut buf);
        assert_eq!(
            buf.as_ref(),
            &[0xEB, 0x90, 0x01, 0x04, 0x11, 0x0A, 0x06, 0x0C, 0x32]
        );
    }

    #[test]
    fn rs485_hold_sentinel_encodes_as_ffff() {
        let mut buf = BytesMut::new();
        encode_rs485_write(1, 1486, &[-1], &mut buf).unwrap();
        assert_eq!(&buf[7..9], &[0xFF, 0xFF]);
    }

    #[test]
    fn rs485_checksum_is_deterministic() {
        let mut first = BytesMut::new();
        let mut second = BytesMut::new();
        encode_rs485_write(3, 1522, &[100, 200, 300], &mut first).unwrap();
        encode_rs485_write(3, 1522, &[100, 200, 300], &mut second).unwrap();
        assert_eq!(first, second);

        let checksum = frame_checksum(&first[2..first.len() - 1]);
        assert_eq!(checksum, first[first.len() - 1]);
    }

    #[test]
    fn rs485_rejects_oversized_block() {
        let mut buf = BytesMut::new();
        let err = encode_rs485_write(1, 1486, &[0; 7], &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::TooManyValues { count: 7, max: 6 }));
    }

    fn rs485_response(device_id: u8, values: &[u16]) -> Vec<u8> {
        let mut frame = vec![0xEB, 0x90, device_id, 2 * values.len() as u8 + 3, 0x11, 0x00, 0x00];
        for &v in values {
            frame.extend_from_slice(&v.to_le_bytes());
        }
        frame.push(frame_checksum(&frame[2..]));
        frame
    }

    #[test]
    fn rs485_decode_reads_fixed_window() {
        let raw = rs485_response(1, &[10, 20, 30, 40, 50, 60]);
        let values = decode_rs485_values(&raw, 6, false).unwrap();
        assert_eq!(values, vec![10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn rs485_decode_strict_accepts_valid_checksum() {
        let raw = rs485_response(1, &[10, 20, 30, 40, 50, 60]);
        assert!(decode_rs485_values(&raw, 6, true).is_ok());
    }

    #[test]
    fn rs485_decode_strict_rejects_bad_checksum() {
        let mut raw = rs485_response(1, &[10, 20, 30, 40, 50, 60]);
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let err = decode_rs485_values(&raw, 6, true).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[test]
    fn rs485_decode_rejects_bad_header() {
        let err = decode_rs485_values(&[0x00; 20], 6, false).unwrap_err();
        assert!(matches!(err, FrameError::MalformedFrame(_)));
    }

    #[test]
    fn rs485_decode_rejects_short_buffer() {
        let raw = rs485_response(1, &[10, 20]);
        let err = decode_rs485_values(&raw, 6, false).unwrap_err();
        assert!(matches!(err, FrameError::ShortFrame { .. }));
    }

    #[test]
    fn can_identifier_composition() {
        assert_eq!(can_identifier(Operation::Write, 1486), 0x0573_BFFF);
        assert_eq!(can_identifier(Operation::Read, 1546), 0x0182_BFFF);
        assert_eq!(can_identifier(Operation::Read, 0), 0x3FFF);
    }

    #[test]
    fn can_read_golden_frame() {
        let mut buf = BytesMut::new();
        encode_can_read(1546, 0x08, &mut buf);
        assert_eq!(
            buf.as_ref(),
            &[
                0xAA, 0xAA, // head
                0xFF, 0xBF, 0x82, 0x01, // identifier 0x0182BFFF little-endian
                0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // payload
                0x08, // data length
                0x00, 0x01, 0x00, // extension
                0x52, // checksum
                0x55, 0x55, // tail
            ]
        );
    }

    #[test]
    fn can_write_frame_checksum_survives_unstuffing() {
        let mut buf = BytesMut::new();
        // 0x55AA contains both reserved delimiter bytes.
        encode_can_write(1486, &[0x55AA_u16 as i16, 170, 85], &mut buf).unwrap();

        let frame = unstuff_frame(&buf);
        assert_eq!(frame.len(), CAN_FRAME_LEN);
        assert_eq!(&frame[0..2], &[0xAA, 0xAA]);
        assert_eq!(&frame[19..21], &[0x55, 0x55]);
        assert_eq!(frame_checksum(&frame[2..18]), frame[18]);
    }

    #[test]
    fn can_write_data_length_counts_meaningful_bytes() {
        let mut buf = BytesMut::new();
        encode_can_write(1020, &[1, 2], &mut buf).unwrap();
        let frame = unstuff_frame(&buf);
        assert_eq!(frame[14], 0x04);
        // Zero padding after the two values.
        assert_eq!(&frame[10..14], &[0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn can_control_write_carries_one_byte() {
        let mut buf = BytesMut::new();
        encode_can_write_byte(1000, 2, &mut buf);
        let frame = unstuff_frame(&buf);
        assert_eq!(frame[6], 0x02);
        assert_eq!(frame[14], 0x01);
    }

    #[test]
    fn can_write_rejects_more_than_four_values() {
        let mut buf = BytesMut::new();
        let err = encode_can_write(1486, &[0; 5], &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::TooManyValues { count: 5, max: 4 }));
    }

    fn can_response(address: u16, values: &[u16]) -> Vec<u8> {
        let mut payload = [0u8; CAN_PAYLOAD_LEN];
        for (i, &v) in values.iter().enumerate() {
            payload[2 * i..2 * i + 2].copy_from_slice(&v.to_le_bytes());
        }
        let mut buf = BytesMut::new();
        put_can_frame(
            can_identifier(Operation::Read, address),
            &payload,
            2 * values.len() as u8,
            &mut buf,
        );
        buf.to_vec()
    }

    #[test]
    fn can_decode_reads_window_after_resync() {
        let mut raw = vec![0x00, 0x13, 0x37]; // leading garbage
        raw.extend_from_slice(&can_response(1546, &[100, 200, 300, 400]));

        let values = decode_can_values(&raw, 4, false).unwrap();
        assert_eq!(values, vec![100, 200, 300, 400]);
    }

    #[test]
    fn can_decode_same_values_with_and_without_garbage() {
        let clean = can_response(1546, &[7, 8, 9, 10]);
        let mut noisy = vec![0x01, 0x02, 0x03, 0x04, 0x05];
        noisy.extend_from_slice(&clean);

        assert_eq!(
            decode_can_values(&clean, 4, false).unwrap(),
            decode_can_values(&noisy, 4, false).unwrap()
        );
    }

    #[test]
    fn can_decode_without_start_marker_is_malformed() {
        let err = decode_can_values(&[0x01, 0x02, 0x03, 0x04], 4, false).unwrap_err();
        assert!(matches!(err, FrameError::MalformedFrame(_)));
    }

    #[test]
    fn can_decode_short_window_is_an_error() {
        let raw = [0xAA, 0xAA, 0xFF, 0x3F];
        let err = decode_can_values(&raw, 4, false).unwrap_err();
        assert!(matches!(err, FrameError::ShortFrame { .. }));
    }

    #[test]
    fn can_decode_strict_roundtrips_stuffed_values() {
        // Values that force stuffing inside the payload window.
        let raw = can_response(1546, &[0xAA55, 0x55AA, 0xA5A5, 0x1234]);
        let values = decode_can_values(&raw, 4, true).unwrap();
        assert_eq!(values, vec![0xAA55, 0x55AA, 0xA5A5, 0x1234]);
    }

    #[test]
    fn can_decode_strict_rejects_corrupted_checksum() {
        let mut raw = can_response(1546, &[1, 2, 3, 4]);
        raw[7] ^= 0x01; // flip a payload bit, checksum now stale
        let err = decode_can_values(&raw, 4, true).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[test]
    fn can_byte_block_decode() {
        let mut payload = [0u8; CAN_PAYLOAD_LEN];
        payload[..6].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        let mut buf = BytesMut::new();
        put_can_frame(can_identifier(Operation::Read, 1612), &payload, 6, &mut buf);

        let bytes = decode_can_bytes(&buf, 6, false).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn rs485_byte_block_decode() {
        let mut frame = vec![0xEB, 0x90, 0x01, 0x09, 0x11, 0x46, 0x06];
        frame.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        frame.push(frame_checksum(&frame[2..]));
        let bytes = decode_rs485_bytes(&frame, 6, true).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0]);
    }
}
