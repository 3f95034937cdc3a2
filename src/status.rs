use serde::{Deserialize, Serialize};

use crate::register::RegisterMap;
use crate::RgError;

/// Status of the gripper.
///
/// Decoded from the status block (fingertip offset up to width with offset)
/// and the target force register, read fresh on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GripperStatus {
    /// A motion is ongoing, new commands are not accepted.
    pub busy: bool,
    /// An internal or external grip is detected.
    pub grip_detected: bool,
    /// Safety switch 1 is pushed.
    pub s1_pushed: bool,
    /// Safety circuit 1 is activated, the gripper will not move.
    pub s1_triggered: bool,
    /// Safety switch 2 is pushed.
    pub s2_pushed: bool,
    /// Safety circuit 2 is activated, the gripper will not move.
    pub s2_triggered: bool,
    /// A safety switch was pushed on power on.
    pub safety_error: bool,
    /// Width between the aluminium fingers in mm, without fingertip offset.
    pub width_mm: f64,
    /// Width in mm with the set fingertip offset considered.
    pub width_with_offset_mm: f64,
    /// Fingertip offset in mm.
    pub fingertip_offset_mm: f64,
    /// Force the gripper is holding in N. The firmware does not measure the
    /// force, this is the echo of the target force register.
    pub force_n: f64,
}

impl GripperStatus {
    /// parse the gripper status from the status block and the force register.
    pub fn parse(map: &RegisterMap, block: &[u16], force_raw: u16) -> Result<Self, RgError> {
        let start = map.status_block_start();
        let expected = map.status_block_len() as usize;
        if block.len() < expected {
            return Err(RgError::ShortResponse {
                address: start,
                expected,
                actual: block.len(),
            });
        }
        let reg = |address: u16| block[(address - start) as usize];

        let word = reg(map.status);
        let bits = &map.status_bits;
        let bit = |n: u8| word & (1 << n) != 0;

        Ok(GripperStatus {
            busy: bit(bits.busy),
            grip_detected: bit(bits.grip_detected),
            s1_pushed: bit(bits.s1_pushed),
            s1_triggered: bit(bits.s1_triggered),
            s2_pushed: bit(bits.s2_pushed),
            s2_triggered: bit(bits.s2_triggered),
            safety_error: bit(bits.safety_error),
            width_mm: map.decode_length(reg(map.current_width)),
            width_with_offset_mm: map.decode_length(reg(map.current_width_with_offset)),
            fingertip_offset_mm: map.decode_offset(reg(map.fingertip_offset)),
            force_n: map.decode_force(force_raw),
        })
    }

    /// The gripper only accepts new commands while not busy.
    pub fn accepts_commands(&self) -> bool {
        !self.busy
    }

    /// A safety circuit is activated or a safety error is latched.
    /// Only a power cycle resets this.
    pub fn safety_tripped(&self) -> bool {
        self.s1_triggered || self.s2_triggered || self.safety_error
    }
}
