//! Drive a scripted hand module and print its telemetry.
//!
//! No hardware required: the transport replays canned response frames, which
//! makes this a convenient smoke test for the whole encode/decode path.
//!
//! Run with:
//!   cargo run --example loopback

use handlink::frame::frame_checksum;
use handlink::session::{HandSession, SessionConfig, SessionError};
use handlink::transport::ScriptedTransport;

fn can_response(values: &[u16]) -> Vec<u8> {
    let mut frame = vec![0xAA, 0xAA, 0x01, 0x00, 0x00, 0x00];
    let mut payload = [0u8; 8];
    for (i, &v) in values.iter().enumerate() {
        payload[2 * i..2 * i + 2].copy_from_slice(&v.to_le_bytes());
    }
    frame.extend_from_slice(&payload);
    frame.push(2 * values.len() as u8);
    frame.extend_from_slice(&[0x00, 0x01, 0x00]);
    frame.push(frame_checksum(&frame[2..]));
    frame.extend_from_slice(&[0x55, 0x55]);
    frame
}

fn main() -> Result<(), SessionError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut port = ScriptedTransport::new();
    // Acks for the two setpoint frames, then telemetry sub-blocks.
    port.queue_response(vec![0x01]);
    port.queue_response(vec![0x01]);
    port.queue_response(can_response(&[812, 797, 805, 801]));
    port.queue_response(can_response(&[799, 40000]));
    port.queue_response(can_response(&[120, 95, 40000, 110]));
    port.queue_response(can_response(&[102, 98]));

    let mut hand = HandSession::new(port, SessionConfig::can());

    hand.set_angles(&[800, 800, 800, 800, 800, 800])?;
    println!("angles:  {:?}", hand.angles()?);
    println!("forces:  {:?}", hand.forces()?);

    let port = hand.into_transport();
    println!("frames sent: {}", port.sent_frames().len());
    for frame in port.sent_frames() {
        println!("  {:02X?}", frame);
    }
    Ok(())
}
