//! Escape-byte insertion for the CAN-over-serial variant.
//!
//! The framing bytes `0xAA` (head), `0x55` (tail) and the escape marker
//! itself must never appear bare inside a frame body, or a receiver would
//! lose frame alignment. Stuffing inserts `0xA5` before any such body byte;
//! unstuffing drops the marker and keeps the following byte verbatim.

/// Escape marker inserted before a reserved body byte.
pub const ESCAPE: u8 = 0xA5;

/// Byte values that collide with frame delimiters.
pub const RESERVED: [u8; 3] = [0xAA, 0x55, ESCAPE];

/// Stuff a complete frame.
///
/// The two-byte head and two-byte tail are passed through untouched; every
/// reserved byte in between gets an [`ESCAPE`] inserted before it. Frames
/// shorter than head + tail are returned unchanged.
pub fn stuff_frame(frame: &[u8]) -> Vec<u8> {
    if frame.len() <= 4 {
        return frame.to_vec();
    }
    let (head, rest) = frame.split_at(2);
    let (body, tail) = rest.split_at(rest.len() - 2);

    let mut out = Vec::with_capacity(frame.len() + 4);
    out.extend_from_slice(head);
    for &byte in body {
        if RESERVED.contains(&byte) {
            out.push(ESCAPE);
        }
        out.push(byte);
    }
    out.extend_from_slice(tail);
    out
}

/// Exact inverse of [`stuff_frame`].
///
/// In the body region, an [`ESCAPE`] marks the next byte as a literal; the
/// marker itself is dropped. A trailing marker with no following body byte is
/// kept verbatim (a stuffer never produces one).
pub fn unstuff_frame(frame: &[u8]) -> Vec<u8> {
    if frame.len() <= 4 {
        return frame.to_vec();
    }
    let (head, rest) = frame.split_at(2);
    let (body, tail) = rest.split_at(rest.len() - 2);

    let mut out = Vec::with_capacity(frame.len());
    out.extend_from_slice(head);
    let mut iter = body.iter();
    while let Some(&byte) = iter.next() {
        if byte == ESCAPE {
            match iter.next() {
                Some(&literal) => out.push(literal),
                None => out.push(byte),
            }
        } else {
            out.push(byte);
        }
    }
    out.extend_from_slice(tail);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(body: &[u8]) -> Vec<u8> {
        let mut frame = vec![0xAA, 0xAA];
        frame.extend_from_slice(body);
        frame.extend_from_slice(&[0x55, 0x55]);
        frame
    }

    #[test]
    fn reserved_body_bytes_get_escaped() {
        let frame = framed(&[0x01, 0xAA, 0x02, 0x55, 0xA5, 0x03]);
        let stuffed = stuff_frame(&frame);
        assert_eq!(
            stuffed,
            vec![
                0xAA, 0xAA, // head untouched
                0x01, 0xA5, 0xAA, 0x02, 0xA5, 0x55, 0xA5, 0xA5, 0x03, //
                0x55, 0x55, // tail untouched
            ]
        );
    }

    #[test]
    fn clean_body_passes_through() {
        let frame = framed(&[0x01, 0x02, 0x03]);
        assert_eq!(stuff_frame(&frame), frame);
    }

    #[test]
    fn roundtrip_arbitrary_bodies() {
        // Exhaustive over all byte values plus adversarial runs.
        let mut body: Vec<u8> = (0..=255).collect();
        body.extend_from_slice(&[0xAA, 0xAA, 0x55, 0x55, 0xA5, 0xA5, 0xAA, 0x55, 0xA5]);

        let frame = framed(&body);
        assert_eq!(unstuff_frame(&stuff_frame(&frame)), frame);
    }

    #[test]
    fn stuffed_body_has_no_unescaped_reserved_bytes() {
        let frame = framed(&[0xAA, 0x55, 0xA5, 0x00, 0xAA]);
        let stuffed = stuff_frame(&frame);

        let body = &stuffed[2..stuffed.len() - 2];
        let mut i = 0;
        while i < body.len() {
            if body[i] == ESCAPE {
                i += 2; // escaped literal, skip it
                continue;
            }
            assert!(
                !RESERVED.contains(&body[i]),
                "unescaped reserved byte {:#04x} at body offset {i}",
                body[i]
            );
            i += 1;
        }
    }

    #[test]
    fn escaped_checksum_position_survives() {
        // A reserved byte directly before the tail (the checksum slot) is
        // still inside the stuffed region.
        let frame = framed(&[0x01, 0x02, 0x55]);
        let stuffed = stuff_frame(&frame);
        assert_eq!(
            stuffed,
            vec![0xAA, 0xAA, 0x01, 0x02, 0xA5, 0x55, 0x55, 0x55]
        );
        assert_eq!(unstuff_frame(&stuffed), frame);
    }

    #[test]
    fn undersized_frames_pass_through() {
        assert_eq!(stuff_frame(&[0xAA, 0x55]), vec![0xAA, 0x55]);
        assert_eq!(unstuff_frame(&[0xAA, 0x55]), vec![0xAA, 0x55]);
    }
}
