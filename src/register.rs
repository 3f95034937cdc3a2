//! Vendor register map of the RG2/RG6 grippers behind the Compute Box.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RgError;

/// Registers hold lengths in 1/10 mm and forces in 1/10 N.
pub const SCALE: f64 = 10.0;

/// Gripper model attached to the Compute Box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GripperVariant {
    /// RG2, 110 mm stroke, 40 N.
    Rg2,
    /// RG6, 160 mm stroke, 120 N.
    Rg6,
}

impl GripperVariant {
    /// The static register table of this variant.
    pub fn register_map(&self) -> &'static RegisterMap {
        match self {
            GripperVariant::Rg2 => &RG2,
            GripperVariant::Rg6 => &RG6,
        }
    }
}

impl FromStr for GripperVariant {
    type Err = RgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rg2" => Ok(GripperVariant::Rg2),
            "rg6" => Ok(GripperVariant::Rg6),
            _ => Err(RgError::UnknownVariant(s.to_string())),
        }
    }
}

impl std::fmt::Display for GripperVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GripperVariant::Rg2 => write!(f, "rg2"),
            GripperVariant::Rg6 => write!(f, "rg6"),
        }
    }
}

/// Bit positions inside the status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBits {
    /// High while a motion is ongoing; new commands are ignored meanwhile.
    pub busy: u8,
    /// High when an internal or external grip is detected.
    pub grip_detected: u8,
    /// Safety switch 1 is pushed.
    pub s1_pushed: u8,
    /// Safety circuit 1 is activated, the gripper will not move until power cycled.
    pub s1_triggered: u8,
    /// Safety switch 2 is pushed.
    pub s2_pushed: u8,
    /// Safety circuit 2 is activated, the gripper will not move until power cycled.
    pub s2_triggered: u8,
    /// A safety switch was pushed on power on.
    pub safety_error: u8,
}

/// Holding register layout, scaling and mechanical range of one gripper variant.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterMap {
    pub variant: GripperVariant,
    /// Target force, written together with width and control as one block.
    pub target_force: u16,
    pub target_width: u16,
    pub control: u16,
    /// Fingertip offset, signed two's complement.
    pub fingertip_offset: u16,
    /// Width between the aluminium fingers, without fingertip offset.
    pub current_width: u16,
    pub status: u16,
    pub current_width_with_offset: u16,
    pub status_bits: StatusBits,
    /// Raw register units per mm / per N.
    pub scale: f64,
    pub max_width_mm: f64,
    pub max_force_n: f64,
}

const STATUS_BITS: StatusBits = StatusBits {
    busy: 0,
    grip_detected: 1,
    s1_pushed: 2,
    s1_triggered: 3,
    s2_pushed: 4,
    s2_triggered: 5,
    safety_error: 6,
};

/// RG2 register table.
pub static RG2: RegisterMap = RegisterMap {
    variant: GripperVariant::Rg2,
    target_force: 0,
    target_width: 1,
    control: 2,
    fingertip_offset: 258,
    current_width: 267,
    status: 268,
    current_width_with_offset: 275,
    status_bits: STATUS_BITS,
    scale: SCALE,
    max_width_mm: 110.0,
    max_force_n: 40.0,
};

/// RG6 register table.
pub static RG6: RegisterMap = RegisterMap {
    variant: GripperVariant::Rg6,
    target_force: 0,
    target_width: 1,
    control: 2,
    fingertip_offset: 258,
    current_width: 267,
    status: 268,
    current_width_with_offset: 275,
    status_bits: STATUS_BITS,
    scale: SCALE,
    max_width_mm: 160.0,
    max_force_n: 120.0,
};

impl RegisterMap {
    /// First register of the block read on every status poll.
    pub fn status_block_start(&self) -> u16 {
        self.fingertip_offset
            .min(self.current_width)
            .min(self.status)
            .min(self.current_width_with_offset)
    }

    /// Number of registers in the status block.
    pub fn status_block_len(&self) -> u16 {
        let end = self
            .fingertip_offset
            .max(self.current_width)
            .max(self.status)
            .max(self.current_width_with_offset);
        end - self.status_block_start() + 1
    }

    /// Checks `width_mm` against the stroke and converts it to register units.
    pub fn encode_width(&self, width_mm: f64) -> Result<u16, RgError> {
        encode("width", width_mm, self.max_width_mm, self.scale)
    }

    /// Checks `force_n` against the force range and converts it to register units.
    pub fn encode_force(&self, force_n: f64) -> Result<u16, RgError> {
        encode("force", force_n, self.max_force_n, self.scale)
    }

    pub fn decode_length(&self, raw: u16) -> f64 {
        raw as f64 / self.scale
    }

    /// The fingertip offset register is signed.
    pub fn decode_offset(&self, raw: u16) -> f64 {
        raw as i16 as f64 / self.scale
    }

    pub fn decode_force(&self, raw: u16) -> f64 {
        raw as f64 / self.scale
    }
}

fn encode(field: &'static str, value: f64, max: f64, scale: f64) -> Result<u16, RgError> {
    if !(0.0..=max).contains(&value) {
        return Err(RgError::OutOfRange {
            field,
            value,
            min: 0.0,
            max,
        });
    }
    Ok((value * scale).round() as u16)
}
