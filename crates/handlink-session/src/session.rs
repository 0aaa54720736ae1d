use bytes::BytesMut;
use tracing::{debug, trace};

use handlink_frame::{
    codec, lookup, ProtocolVariant, RegisterShape, MAX_BLOCK_VALUES, MAX_CAN_FRAME_VALUES,
};
use handlink_transport::{receive_with, CancelToken, Transport};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// Base address of the first user-defined gesture angle bank.
const GESTURE_BANK_BASE: u16 = 1066;
/// One bank spans six 16-bit registers.
const GESTURE_BANK_STRIDE: u16 = 12;
/// Banks are numbered 14..=45 on the module.
const GESTURE_BANK_RANGE: std::ops::RangeInclusive<i16> = 14..=45;

/// One physical frame's worth of a logical register block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SubBlock {
    address: u16,
    count: usize,
}

/// Split a logical block access into at most two physical frames.
///
/// The wire format caps one CAN frame at four values; the remainder lives
/// eight bytes (four registers) above the base address.
fn sub_blocks(address: u16, count: usize) -> (SubBlock, Option<SubBlock>) {
    if count <= MAX_CAN_FRAME_VALUES {
        (SubBlock { address, count }, None)
    } else {
        (
            SubBlock {
                address,
                count: MAX_CAN_FRAME_VALUES,
            },
            Some(SubBlock {
                address: address + 8,
                count: count - MAX_CAN_FRAME_VALUES,
            }),
        )
    }
}

fn guard(what: &'static str, values: &[i16], min: i16, max: i16) -> Result<()> {
    for &value in values {
        if value < min || value > max {
            return Err(SessionError::ValueOutOfRange {
                what,
                value,
                min,
                max,
            });
        }
    }
    Ok(())
}

/// A register access session over one transport.
///
/// The session holds exclusive use of the transport: one transaction is in
/// flight at a time, and every write or read blocks until its response
/// arrives or the configured receive discipline gives up. All driver state
/// lives here; nothing is process-global.
pub struct HandSession<T> {
    transport: T,
    config: SessionConfig,
    cancel: CancelToken,
    buf: BytesMut,
}

impl<T: Transport> HandSession<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            cancel: CancelToken::new(),
            buf: BytesMut::with_capacity(64),
        }
    }

    /// A token that cancels in-progress polling receives when triggered.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Consume the session and return the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send the staged frame, pace, and wait for a response.
    fn exchange(&mut self, expected_len: usize) -> Result<Vec<u8>> {
        trace!("send {:02X?}", &self.buf[..]);
        self.transport.send(&self.buf)?;
        if !self.config.inter_frame_gap.is_zero() {
            std::thread::sleep(self.config.inter_frame_gap);
        }
        let max_len = expected_len.min(self.config.max_response_len);
        let response = receive_with(
            &mut self.transport,
            max_len,
            &self.config.discipline,
            &self.cancel,
        )?;
        trace!("recv {:02X?}", &response[..]);
        Ok(response)
    }

    /// Send the staged frame and discard the acknowledgment.
    ///
    /// Acknowledgment content is not interpreted beyond "a non-empty response
    /// arrived"; no response within the discipline's budget fails the write.
    fn exchange_ack(&mut self) -> Result<()> {
        let _ack = self.exchange(self.config.max_response_len)?;
        Ok(())
    }

    /// Write up to six values to a named register block.
    pub fn write_register(&mut self, name: &str, values: &[i16]) -> Result<()> {
        let reg = lookup(name)?;
        match reg.shape {
            RegisterShape::ByteBlock => Err(SessionError::ReadOnly(reg.name)),
            RegisterShape::Control => {
                if values.len() != 1 {
                    return Err(SessionError::InvalidValueCount(values.len()));
                }
                self.write_control(reg.name, reg.address, values[0])
            }
            RegisterShape::ShortBlock => {
                debug!(register = reg.name, count = values.len(), "write block");
                self.write_short_block(reg.address, values)
            }
        }
    }

    /// Read `count` values from a named register block, sanitized per the
    /// register's class.
    pub fn read_register(&mut self, name: &str, count: usize) -> Result<Vec<i16>> {
        let reg = lookup(name)?;
        debug!(register = reg.name, count, "read block");
        let raw = match reg.shape {
            RegisterShape::Control => return Err(SessionError::WriteOnly(reg.name)),
            RegisterShape::ShortBlock => self.read_shorts(reg.address, count)?,
            RegisterShape::ByteBlock => self
                .read_bytes(reg.address, count)?
                .into_iter()
                .map(u16::from)
                .collect(),
        };
        Ok(raw.into_iter().map(|v| reg.class.sanitize(v)).collect())
    }

    /// Read `count` raw bytes from a byte-wide telemetry block.
    pub fn read_register_bytes(&mut self, name: &str, count: usize) -> Result<Vec<u8>> {
        let reg = lookup(name)?;
        if reg.shape == RegisterShape::Control {
            return Err(SessionError::WriteOnly(reg.name));
        }
        debug!(register = reg.name, count, "read byte block");
        self.read_bytes(reg.address, count)
    }

    fn write_short_block(&mut self, address: u16, values: &[i16]) -> Result<()> {
        if values.is_empty() || values.len() > MAX_BLOCK_VALUES {
            return Err(SessionError::InvalidValueCount(values.len()));
        }
        match self.config.variant {
            ProtocolVariant::Rs485 => {
                self.buf.clear();
                codec::encode_rs485_write(self.config.device_id, address, values, &mut self.buf)?;
                self.exchange_ack()
            }
            ProtocolVariant::Can => {
                let (first, second) = sub_blocks(address, values.len());
                self.can_write_chunk(first.address, &values[..first.count])?;
                if let Some(rest) = second {
                    self.can_write_chunk(rest.address, &values[first.count..])?;
                }
                Ok(())
            }
        }
    }

    fn can_write_chunk(&mut self, address: u16, values: &[i16]) -> Result<()> {
        self.buf.clear();
        codec::encode_can_write(address, values, &mut self.buf)?;
        self.exchange_ack()
    }

    fn write_control(&mut self, name: &'static str, address: u16, value: i16) -> Result<()> {
        if !(0..=255).contains(&value) {
            return Err(SessionError::ValueOutOfRange {
                what: name,
                value,
                min: 0,
                max: 255,
            });
        }
        debug!(register = name, value, "write control");
        self.buf.clear();
        match self.config.variant {
            ProtocolVariant::Rs485 => {
                codec::encode_rs485_write(self.config.device_id, address, &[value], &mut self.buf)?;
            }
            ProtocolVariant::Can => {
                codec::encode_can_write_byte(address, value as u8, &mut self.buf);
            }
        }
        self.exchange_ack()
    }

    fn read_shorts(&mut self, address: u16, count: usize) -> Result<Vec<u16>> {
        if count == 0 || count > MAX_BLOCK_VALUES {
            return Err(SessionError::InvalidValueCount(count));
        }
        let strict = self.config.verify_checksums;
        match self.config.variant {
            ProtocolVariant::Rs485 => {
                self.buf.clear();
                codec::encode_rs485_read(self.config.device_id, address, &mut self.buf);
                let response = self.exchange(8 + 2 * count)?;
                Ok(codec::decode_rs485_values(&response, count, strict)?)
            }
            ProtocolVariant::Can => {
                let (first, second) = sub_blocks(address, count);
                let mut values = self.can_read_chunk(first.address, first.count)?;
                if let Some(rest) = second {
                    values.extend(self.can_read_chunk(rest.address, rest.count)?);
                }
                Ok(values)
            }
        }
    }

    fn can_read_chunk(&mut self, address: u16, count: usize) -> Result<Vec<u16>> {
        self.buf.clear();
        codec::encode_can_read(address, 2 * count as u8, &mut self.buf);
        let response = self.exchange(self.config.max_response_len)?;
        Ok(codec::decode_can_values(
            &response,
            count,
            self.config.verify_checksums,
        )?)
    }

    fn read_bytes(&mut self, address: u16, count: usize) -> Result<Vec<u8>> {
        if count == 0 || count > MAX_BLOCK_VALUES {
            return Err(SessionError::InvalidValueCount(count));
        }
        let strict = self.config.verify_checksums;
        self.buf.clear();
        match self.config.variant {
            ProtocolVariant::Rs485 => {
                codec::encode_rs485_read(self.config.device_id, address, &mut self.buf);
                let response = self.exchange(8 + count)?;
                Ok(codec::decode_rs485_bytes(&response, count, strict)?)
            }
            ProtocolVariant::Can => {
                codec::encode_can_read(address, count as u8, &mut self.buf);
                let response = self.exchange(self.config.max_response_len)?;
                Ok(codec::decode_can_bytes(&response, count, strict)?)
            }
        }
    }

    // Setpoints. Ranges are the module's documented per-channel limits;
    // −1 is the "hold current target" sentinel where accepted.

    pub fn set_angles(&mut self, angles: &[i16; 6]) -> Result<()> {
        guard("angle", angles, -1, 1000)?;
        self.write_register("angleSet", angles)
    }

    pub fn set_forces(&mut self, forces: &[i16; 6]) -> Result<()> {
        guard("force", forces, 0, 1000)?;
        self.write_register("forceSet", forces)
    }

    pub fn set_speeds(&mut self, speeds: &[i16; 6]) -> Result<()> {
        guard("speed", speeds, 0, 1000)?;
        self.write_register("speedSet", speeds)
    }

    pub fn set_positions(&mut self, positions: &[i16; 6]) -> Result<()> {
        guard("position", positions, 0, 2000)?;
        self.write_register("posSet", positions)
    }

    pub fn set_current_limits(&mut self, limits: &[i16; 6]) -> Result<()> {
        guard("current limit", limits, 0, 1500)?;
        self.write_register("currentLimit", limits)
    }

    pub fn set_default_speeds(&mut self, speeds: &[i16; 6]) -> Result<()> {
        guard("default speed", speeds, 0, 1000)?;
        self.write_register("defaultSpeed", speeds)
    }

    pub fn set_default_forces(&mut self, forces: &[i16; 6]) -> Result<()> {
        guard("default force", forces, 0, 1000)?;
        self.write_register("defaultForce", forces)
    }

    /// Store six angles into user-defined gesture bank `bank` (14..=45).
    pub fn set_gesture_angles(&mut self, bank: i16, angles: &[i16; 6]) -> Result<()> {
        if !GESTURE_BANK_RANGE.contains(&bank) {
            return Err(SessionError::ValueOutOfRange {
                what: "gesture bank",
                value: bank,
                min: *GESTURE_BANK_RANGE.start(),
                max: *GESTURE_BANK_RANGE.end(),
            });
        }
        guard("angle", angles, -1, 1000)?;
        let address = GESTURE_BANK_BASE + GESTURE_BANK_STRIDE * (bank as u16 - 14);
        debug!(bank, address, "write gesture bank");
        self.write_short_block(address, angles)
    }

    // Telemetry.

    pub fn angles(&mut self) -> Result<Vec<i16>> {
        self.read_register("angleAct", 6)
    }

    pub fn forces(&mut self) -> Result<Vec<i16>> {
        self.read_register("forceAct", 6)
    }

    pub fn positions(&mut self) -> Result<Vec<i16>> {
        self.read_register("posAct", 6)
    }

    pub fn currents(&mut self) -> Result<Vec<i16>> {
        self.read_register("currentAct", 6)
    }

    pub fn angle_targets(&mut self) -> Result<Vec<i16>> {
        self.read_register("angleSet", 6)
    }

    pub fn force_targets(&mut self) -> Result<Vec<i16>> {
        self.read_register("forceSet", 6)
    }

    pub fn position_targets(&mut self) -> Result<Vec<i16>> {
        self.read_register("posSet", 6)
    }

    pub fn status(&mut self) -> Result<Vec<u8>> {
        self.read_register_bytes("statusCode", 6)
    }

    pub fn error_codes(&mut self) -> Result<Vec<u8>> {
        self.read_register_bytes("errorCode", 6)
    }

    pub fn temperatures(&mut self) -> Result<Vec<u8>> {
        self.read_register_bytes("temperature", 6)
    }

    /// Check whether a module answers on this link: reads the actual-position
    /// block and reports whether a response arrived at all.
    pub fn probe(&mut self) -> Result<bool> {
        match self.positions() {
            Ok(_) => Ok(true),
            Err(SessionError::Transport(handlink_transport::TransportError::Timeout(_))) => {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    // Control registers.

    /// Assign a new device id (1..=254).
    pub fn set_id(&mut self, id: i16) -> Result<()> {
        if !(1..=254).contains(&id) {
            return Err(SessionError::ValueOutOfRange {
                what: "device id",
                value: id,
                min: 1,
                max: 254,
            });
        }
        self.write_register("handId", &[id])
    }

    /// Select a baud-rate mode (0 = 115200, 1 = 57600, 2 = 19200).
    pub fn set_baud_mode(&mut self, mode: i16) -> Result<()> {
        if !(0..=2).contains(&mode) {
            return Err(SessionError::ValueOutOfRange {
                what: "baud mode",
                value: mode,
                min: 0,
                max: 2,
            });
        }
        self.write_register("baudRate", &[mode])
    }

    /// Recall a preset gesture by number (0..=45).
    pub fn set_gesture(&mut self, number: i16) -> Result<()> {
        if !(0..=45).contains(&number) {
            return Err(SessionError::ValueOutOfRange {
                what: "gesture number",
                value: number,
                min: 0,
                max: 45,
            });
        }
        self.write_register("gestureNo", &[number])
    }

    pub fn clear_error(&mut self) -> Result<()> {
        self.write_register("clearError", &[1])
    }

    pub fn save_flash(&mut self) -> Result<()> {
        self.write_register("saveFlash", &[1])
    }

    pub fn reset_parameters(&mut self) -> Result<()> {
        self.write_register("resetParam", &[1])
    }

    pub fn calibrate_force(&mut self) -> Result<()> {
        self.write_register("forceCalibrate", &[1])
    }
}

impl<T> std::fmt::Debug for HandSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandSession")
            .field("variant", &self.config.variant)
            .field("device_id", &self.config.device_id)
            .finish()
    }
}
