//! Register name → address table for the hand actuator module.
//!
//! Addresses index a 16-bit register file; six-wide blocks occupy twelve
//! consecutive bytes. Each entry also records its access shape and the
//! sanitization rule for values read back from it.

use crate::error::{FrameError, Result};

/// Telemetry readings above this are sensor noise and clamp to zero.
pub const CLAMP_LIMIT: u16 = 6000;

/// Unsigned readings at or above this reinterpret as two's-complement
/// negatives. The pivot itself has no positive `i16` representation and maps
/// to −32768.
pub const SIGN_PIVOT: u16 = 32768;

/// Sanitization rule applied to values read back from a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterClass {
    /// Unsigned magnitude channel: readings above [`CLAMP_LIMIT`] clamp to 0.
    Magnitude,
    /// Signed channel: readings at or above [`SIGN_PIVOT`] are negative
    /// quantities.
    Signed,
    /// No 16-bit sanitization (byte-wide telemetry, control registers).
    Raw,
}

impl RegisterClass {
    /// Apply this class's sanitization rule to a raw 16-bit reading.
    pub fn sanitize(self, raw: u16) -> i16 {
        match self {
            RegisterClass::Magnitude => {
                if raw > CLAMP_LIMIT {
                    0
                } else {
                    raw as i16
                }
            }
            RegisterClass::Signed => {
                if raw >= SIGN_PIVOT {
                    (i32::from(raw) - 65536) as i16
                } else {
                    raw as i16
                }
            }
            RegisterClass::Raw => raw as i16,
        }
    }
}

/// How a register is accessed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterShape {
    /// Six 16-bit values, one per finger channel.
    ShortBlock,
    /// Six 8-bit values, one per finger channel (telemetry only).
    ByteBlock,
    /// Single-byte control register (id, flash, calibration, ...).
    Control,
}

/// One entry in the register table. Immutable, defined at process start.
#[derive(Debug, Clone, Copy)]
pub struct RegisterDescriptor {
    pub name: &'static str,
    pub address: u16,
    pub shape: RegisterShape,
    pub class: RegisterClass,
}

use RegisterClass::{Magnitude, Raw, Signed};
use RegisterShape::{ByteBlock, Control, ShortBlock};

/// The full register table of the actuator module.
pub static REGISTERS: &[RegisterDescriptor] = &[
    // Control registers
    RegisterDescriptor { name: "handId", address: 1000, shape: Control, class: Raw },
    RegisterDescriptor { name: "baudRate", address: 1001, shape: Control, class: Raw },
    RegisterDescriptor { name: "clearError", address: 1004, shape: Control, class: Raw },
    RegisterDescriptor { name: "saveFlash", address: 1005, shape: Control, class: Raw },
    RegisterDescriptor { name: "resetParam", address: 1006, shape: Control, class: Raw },
    RegisterDescriptor { name: "gestureNo", address: 1008, shape: Control, class: Raw },
    RegisterDescriptor { name: "forceCalibrate", address: 1009, shape: Control, class: Raw },
    // Configuration blocks
    RegisterDescriptor { name: "currentLimit", address: 1020, shape: ShortBlock, class: Magnitude },
    RegisterDescriptor { name: "defaultSpeed", address: 1032, shape: ShortBlock, class: Magnitude },
    RegisterDescriptor { name: "defaultForce", address: 1044, shape: ShortBlock, class: Magnitude },
    // User-defined gesture angle banks start here, one bank per 12 bytes.
    RegisterDescriptor { name: "userDefAngle", address: 1066, shape: ShortBlock, class: Magnitude },
    // Setpoint blocks
    RegisterDescriptor { name: "posSet", address: 1474, shape: ShortBlock, class: Magnitude },
    RegisterDescriptor { name: "angleSet", address: 1486, shape: ShortBlock, class: Magnitude },
    RegisterDescriptor { name: "forceSet", address: 1498, shape: ShortBlock, class: Magnitude },
    RegisterDescriptor { name: "speedSet", address: 1522, shape: ShortBlock, class: Magnitude },
    // Telemetry blocks
    RegisterDescriptor { name: "posAct", address: 1534, shape: ShortBlock, class: Magnitude },
    RegisterDescriptor { name: "angleAct", address: 1546, shape: ShortBlock, class: Magnitude },
    RegisterDescriptor { name: "forceAct", address: 1582, shape: ShortBlock, class: Signed },
    RegisterDescriptor { name: "currentAct", address: 1594, shape: ShortBlock, class: Magnitude },
    RegisterDescriptor { name: "errorCode", address: 1606, shape: ByteBlock, class: Raw },
    RegisterDescriptor { name: "statusCode", address: 1612, shape: ByteBlock, class: Raw },
    RegisterDescriptor { name: "temperature", address: 1618, shape: ByteBlock, class: Raw },
];

/// Look a register up by name.
pub fn lookup(name: &str) -> Result<&'static RegisterDescriptor> {
    REGISTERS
        .iter()
        .find(|reg| reg.name == name)
        .ok_or_else(|| FrameError::UnknownRegister(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_registers_resolve() {
        assert_eq!(lookup("angleSet").unwrap().address, 1486);
        assert_eq!(lookup("forceSet").unwrap().address, 1498);
        assert_eq!(lookup("speedSet").unwrap().address, 1522);
        assert_eq!(lookup("angleAct").unwrap().address, 1546);
        assert_eq!(lookup("forceAct").unwrap().address, 1582);
    }

    #[test]
    fn unknown_register_is_an_error() {
        let err = lookup("bogus").unwrap_err();
        assert!(matches!(err, FrameError::UnknownRegister(name) if name == "bogus"));
    }

    #[test]
    fn magnitude_clamp_law() {
        assert_eq!(RegisterClass::Magnitude.sanitize(0), 0);
        assert_eq!(RegisterClass::Magnitude.sanitize(1000), 1000);
        assert_eq!(RegisterClass::Magnitude.sanitize(6000), 6000);
        assert_eq!(RegisterClass::Magnitude.sanitize(6001), 0);
        assert_eq!(RegisterClass::Magnitude.sanitize(0xFFFF), 0);
    }

    #[test]
    fn signed_conversion_law() {
        assert_eq!(RegisterClass::Signed.sanitize(40000), -25536);
        assert_eq!(RegisterClass::Signed.sanitize(65535), -1);
        assert_eq!(RegisterClass::Signed.sanitize(100), 100);
        assert_eq!(RegisterClass::Signed.sanitize(32000), 32000);
    }

    #[test]
    fn signed_pivot_boundary_maps_to_i16_min() {
        // Both sides of the pivot, plus the pivot itself, which cannot be a
        // positive i16 and lands on the bottom of the signed range.
        assert_eq!(RegisterClass::Signed.sanitize(32767), 32767);
        assert_eq!(RegisterClass::Signed.sanitize(32768), i16::MIN);
        assert_eq!(RegisterClass::Signed.sanitize(32769), -32767);
    }

    #[test]
    fn signed_values_are_not_clamped() {
        // 40000 > 6000, but the force channel must come back negative,
        // not zeroed — the two rules apply to different register classes.
        assert_ne!(RegisterClass::Signed.sanitize(40000), 0);
    }

    #[test]
    fn force_actual_is_signed_angle_actual_is_not() {
        assert_eq!(lookup("forceAct").unwrap().class, RegisterClass::Signed);
        assert_eq!(lookup("angleAct").unwrap().class, RegisterClass::Magnitude);
    }
}
