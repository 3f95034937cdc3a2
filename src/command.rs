use num::FromPrimitive;
use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::register::RegisterMap;
use crate::RgError;

/// Value of the control register.
///
/// Only one option should be set at a time. The gripper will not start a new
/// motion before the one currently being executed is done (see the busy flag).
#[repr(u16)]
#[derive(Debug, Clone, Copy, FromPrimitive, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlFlag {
    /// Start the motion with the target force and width.
    /// Width is calculated without the fingertip offset.
    /// Ignored by the gripper while the busy flag is set.
    Grip = 0x0001,
    /// Stop the current motion.
    Stop = 0x0008,
    /// Same as `Grip`, but width is calculated with the set fingertip offset.
    GripWithOffset = 0x0010,
}

impl ControlFlag {
    /// Decode a raw control word, `None` when it is not a single known flag.
    pub fn from_word(word: u16) -> Option<Self> {
        ControlFlag::from_u16(word)
    }
}

/// Target block of the gripper.
///
/// Written to the registers starting at the target force register, 3 words:
/// force, width, control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GripperCommand {
    /// Width between the fingers to be moved to and maintained, in mm.
    /// Measured between the insides of the aluminium fingers unless the
    /// control flag is `GripWithOffset`.
    pub width_mm: f64,
    /// Force to be reached when gripping and holding a workpiece, in N.
    pub force_n: f64,
    /// The control flag written after width and force.
    pub control: ControlFlag,
}

impl Default for GripperCommand {
    fn default() -> Self {
        Self {
            width_mm: 0.0,
            force_n: 0.0,
            control: ControlFlag::Grip,
        }
    }
}

impl GripperCommand {
    /// Create a new default gripper command, a grip to 0 mm with no force.
    pub fn new() -> Self {
        Self::default()
    }

    /// Target width in mm.
    pub fn width(mut self, width_mm: f64) -> Self {
        self.width_mm = width_mm;
        self
    }

    /// Target force in N.
    pub fn force(mut self, force_n: f64) -> Self {
        self.force_n = force_n;
        self
    }

    pub fn control(mut self, control: ControlFlag) -> Self {
        self.control = control;
        self
    }

    /// Validate against the variant's range and make the array for writing to the registers.
    ///
    /// Nothing is encoded if either value is out of range.
    pub fn encode(&self, map: &RegisterMap) -> Result<[u16; 3], RgError> {
        let force = map.encode_force(self.force_n)?;
        let width = map.encode_width(self.width_mm)?;
        Ok([force, width, self.control as u16])
    }

    /// Inverse of [`GripperCommand::encode`], up to the register quantization.
    pub fn decode(map: &RegisterMap, words: &[u16]) -> Option<Self> {
        match words {
            [force, width, control] => Some(Self {
                width_mm: map.decode_length(*width),
                force_n: map.decode_force(*force),
                control: ControlFlag::from_word(*control)?,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::{RG2, RG6};

    #[test]
    fn encodes_force_width_control_in_order() {
        let cmd = GripperCommand::new().width(50.0).force(20.0);
        assert_eq!(cmd.encode(&RG2).unwrap(), [200, 500, 0x0001]);

        let cmd = cmd.control(ControlFlag::GripWithOffset);
        assert_eq!(cmd.encode(&RG6).unwrap(), [200, 500, 0x0010]);
    }

    #[test]
    fn range_depends_on_variant() {
        let cmd = GripperCommand::new().width(150.0).force(100.0);
        assert!(cmd.encode(&RG2).is_err());
        assert!(cmd.encode(&RG6).is_ok());
    }

    #[test]
    fn decode_reproduces_input_within_quantization() {
        let cmd = GripperCommand::new().width(87.63).force(33.37);
        let decoded = GripperCommand::decode(&RG6, &cmd.encode(&RG6).unwrap()).unwrap();
        assert!((decoded.width_mm - cmd.width_mm).abs() <= 0.05 + 1e-9);
        assert!((decoded.force_n - cmd.force_n).abs() <= 0.05 + 1e-9);
        assert_eq!(decoded.control, ControlFlag::Grip);
    }

    #[test]
    fn control_word_decoding() {
        assert_eq!(ControlFlag::from_word(8), Some(ControlFlag::Stop));
        assert_eq!(ControlFlag::from_word(16), Some(ControlFlag::GripWithOffset));
        assert_eq!(ControlFlag::from_word(9), None);
        assert!(GripperCommand::decode(&RG2, &[1, 2]).is_none());
    }
}
