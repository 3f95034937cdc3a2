//! # onrobot-rg
//!
//! `onrobot-rg` is a library for interfacing with OnRobot RG grippers
//! through the OnRobot Compute Box, over Modbus TCP.
//! ### Compatible product
//! - [x] OnRobot RG2
//! - [x] OnRobot RG6
//!
//! ## Example
//! ```no_run
//! use onrobot_rg::*;
//!
//! fn main() -> Result<(), RgError> {
//!     // Compute Box endpoint and the attached gripper model
//!     let mut gripper = RgGripper::connect("192.168.1.1", 502, GripperVariant::Rg2)?;
//!
//!     // the gripper only accepts commands while it is not busy
//!     let status = gripper.read_status()?;
//!     println!("current width : {} mm", status.width_with_offset_mm);
//!
//!     // move to 50 mm holding with 20 N, then wait for the busy flag to clear
//!     let status = gripper.set_target(50.0, 20.0)?.await_motion()?;
//!     println!("grip detected : {}", status.grip_detected);
//!
//!     // chained command with builder pattern
//!     let cmd = GripperCommand::new()
//!         .width(80.0)
//!         .force(10.0)
//!         .control(ControlFlag::GripWithOffset);
//!     gripper.write_command(&cmd)?.await_motion()?;
//!
//!     // out of range values are rejected before anything is sent
//!     assert!(gripper.set_target(200.0, 20.0).is_err());
//!
//!     // the connection is closed when the gripper is dropped
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod gripper;
pub mod poll;
pub mod register;
pub mod status;
pub mod transport;

use std::time::Duration;

use thiserror::Error;

pub use command::{ControlFlag, GripperCommand};
pub use gripper::RgGripper;
pub use poll::{wait_for_motion, Clock, MotionPhase, PollConfig, PollState, SystemClock};
pub use register::{GripperVariant, RegisterMap, StatusBits, RG2, RG6};
pub use status::GripperStatus;
pub use transport::{ConnectionConfig, ModbusTcp, Transport};

#[derive(Debug, Error)]
pub enum RgError {
    #[error("cannot connect to the compute box at {endpoint}")]
    Connection {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("connection is closed")]
    Closed,
    #[error("{field} {value} is outside of {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("unknown gripper `{0}`, expected rg2 or rg6")]
    UnknownVariant(String),
    #[error("modbus exception at register {address}: {exception}")]
    Exception {
        address: u16,
        exception: tokio_modbus::Exception,
    },
    #[error("modbus protocol or transport error at register {address}")]
    Modbus {
        address: u16,
        #[source]
        source: tokio_modbus::Error,
    },
    #[error("expected {expected} registers from {address}, got {actual}")]
    ShortResponse {
        address: u16,
        expected: usize,
        actual: usize,
    },
    #[error("motion not done within {timeout:?} ({ticks} status reads)")]
    Timeout { timeout: Duration, ticks: u32 },
}
