use log::info;

use crate::command::{ControlFlag, GripperCommand};
use crate::poll::{wait_for_motion, Clock, PollConfig, SystemClock};
use crate::register::{GripperVariant, RegisterMap};
use crate::status::GripperStatus;
use crate::transport::{ConnectionConfig, ModbusTcp, Transport};
use crate::RgError;

/// Data Structure for interfacing with an RG2/RG6 gripper through the Compute Box.
///
/// Owns the connection; it is closed when the gripper is dropped.
pub struct RgGripper<T: Transport = ModbusTcp> {
    transport: T,
    map: &'static RegisterMap,
    poll: PollConfig,
}

impl RgGripper<ModbusTcp> {
    /// Connect to the Compute Box at `host:port`.
    pub fn connect(host: &str, port: u16, variant: GripperVariant) -> Result<Self, RgError> {
        Ok(Self::new(ModbusTcp::connect(host, port)?, variant))
    }

    /// Connect with an explicit connection configuration.
    pub fn connect_with(config: &ConnectionConfig, variant: GripperVariant) -> Result<Self, RgError> {
        Ok(Self::new(ModbusTcp::connect_with(config)?, variant))
    }
}

impl<T: Transport> RgGripper<T> {
    /// Force used by [`RgGripper::move_to`], clamped to the variant's maximum.
    pub const DEFAULT_FORCE_N: f64 = 40.0;

    /// Constructer from an open transport.
    pub fn new(transport: T, variant: GripperVariant) -> Self {
        Self {
            transport,
            map: variant.register_map(),
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn variant(&self) -> GripperVariant {
        self.map.variant
    }

    pub fn register_map(&self) -> &'static RegisterMap {
        self.map
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validate and write a command as one block: force, width, control.
    ///
    /// Nothing is written when the width or force is out of range.
    pub fn write_command(&mut self, cmd: &GripperCommand) -> Result<&mut Self, RgError> {
        let words = cmd.encode(self.map)?;
        self.transport.write_registers(self.map.target_force, &words)?;
        info!(
            "{}: {:?} to {} mm with {} N",
            self.map.variant, cmd.control, cmd.width_mm, cmd.force_n
        );
        Ok(self)
    }

    /// Command the gripper to move to `width_mm` and hold with `force_n`.
    ///
    /// Width is measured between the insides of the aluminium fingers.
    /// The gripper ignores the command while it is busy.
    pub fn set_target(&mut self, width_mm: f64, force_n: f64) -> Result<&mut Self, RgError> {
        let cmd = GripperCommand::new()
            .width(width_mm)
            .force(force_n)
            .control(ControlFlag::Grip);
        self.write_command(&cmd)
    }

    /// Same as [`RgGripper::set_target`], with the width including the fingertip offset.
    pub fn set_target_with_offset(
        &mut self,
        width_mm: f64,
        force_n: f64,
    ) -> Result<&mut Self, RgError> {
        let cmd = GripperCommand::new()
            .width(width_mm)
            .force(force_n)
            .control(ControlFlag::GripWithOffset);
        self.write_command(&cmd)
    }

    /// Write only the control register.
    ///
    /// `Grip` and `GripWithOffset` start a motion on the targets already in
    /// the target registers, `Stop` stops the current motion.
    pub fn set_control(&mut self, flag: ControlFlag) -> Result<&mut Self, RgError> {
        self.transport.write_registers(self.map.control, &[flag as u16])?;
        info!("{}: {:?}", self.map.variant, flag);
        Ok(self)
    }

    /// Stop the current motion.
    pub fn stop(&mut self) -> Result<&mut Self, RgError> {
        self.set_control(ControlFlag::Stop)
    }

    /// Update the target force without starting a motion.
    pub fn write_target_force(&mut self, force_n: f64) -> Result<&mut Self, RgError> {
        let raw = self.map.encode_force(force_n)?;
        self.transport.write_registers(self.map.target_force, &[raw])?;
        Ok(self)
    }

    /// Update the target width without starting a motion.
    pub fn write_target_width(&mut self, width_mm: f64) -> Result<&mut Self, RgError> {
        let raw = self.map.encode_width(width_mm)?;
        self.transport.write_registers(self.map.target_width, &[raw])?;
        Ok(self)
    }

    /// Move to `width_mm` with the default force.
    pub fn move_to(&mut self, width_mm: f64) -> Result<&mut Self, RgError> {
        let force = Self::DEFAULT_FORCE_N.min(self.map.max_force_n);
        self.set_target(width_mm, force)
    }

    /// Open to the variant's full stroke.
    pub fn open(&mut self, force_n: f64) -> Result<&mut Self, RgError> {
        self.set_target(self.map.max_width_mm, force_n)
    }

    /// Close the fingers completely.
    pub fn close(&mut self, force_n: f64) -> Result<&mut Self, RgError> {
        self.set_target(0.0, force_n)
    }

    /// Read the current status of the gripper.
    pub fn read_status(&mut self) -> Result<GripperStatus, RgError> {
        let block = self.transport.read_registers(
            self.map.status_block_start(),
            self.map.status_block_len(),
        )?;
        let force = self.read_register(self.map.target_force)?;
        GripperStatus::parse(self.map, &block, force)
    }

    /// Fingertip offset in mm.
    pub fn fingertip_offset(&mut self) -> Result<f64, RgError> {
        let raw = self.read_register(self.map.fingertip_offset)?;
        Ok(self.map.decode_offset(raw))
    }

    /// Width between the fingers in mm, without the fingertip offset.
    pub fn width(&mut self) -> Result<f64, RgError> {
        let raw = self.read_register(self.map.current_width)?;
        Ok(self.map.decode_length(raw))
    }

    /// Width between the fingers in mm, with the fingertip offset considered.
    pub fn width_with_offset(&mut self) -> Result<f64, RgError> {
        let raw = self.read_register(self.map.current_width_with_offset)?;
        Ok(self.map.decode_length(raw))
    }

    /// Await for the current motion to finish.
    ///
    /// ## Return `GripperStatus`
    /// the status read once the busy flag cleared. On [`RgError::Timeout`] the
    /// gripper is left where it is, query [`RgGripper::read_status`] to learn the outcome.
    pub fn await_motion(&mut self) -> Result<GripperStatus, RgError> {
        self.await_motion_with(&mut SystemClock::new())
    }

    /// Read the status and, if a motion is ongoing, wait for it to finish.
    ///
    /// The gripper ignores new commands while busy.
    pub fn await_ready(&mut self) -> Result<GripperStatus, RgError> {
        self.await_ready_with(&mut SystemClock::new())
    }

    /// [`RgGripper::await_ready`] with an explicit time source.
    pub fn await_ready_with<C: Clock>(&mut self, clock: &mut C) -> Result<GripperStatus, RgError> {
        let status = self.read_status()?;
        if status.accepts_commands() {
            return Ok(status);
        }
        info!("{}: busy, waiting for the ongoing motion", self.map.variant);
        self.await_motion_with(clock)
    }

    /// [`RgGripper::await_motion`] with an explicit time source.
    pub fn await_motion_with<C: Clock>(&mut self, clock: &mut C) -> Result<GripperStatus, RgError> {
        let poll = self.poll.clone();
        wait_for_motion(|| self.read_status(), clock, &poll)
    }

    /// Close the connection. Dropping the gripper does the same.
    pub fn disconnect(&mut self) {
        self.transport.close();
    }

    fn read_register(&mut self, address: u16) -> Result<u16, RgError> {
        let words = self.transport.read_registers(address, 1)?;
        words.first().copied().ok_or(RgError::ShortResponse {
            address,
            expected: 1,
            actual: 0,
        })
    }
}

impl<T: Transport> Drop for RgGripper<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}
