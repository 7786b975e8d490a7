use std::{thread, time::Duration};

use log::info;

use crate::{config::ServoConfig, error::HardwareError, GateId};

pub mod pca9685;

pub use pca9685::Pca9685;

/// Opens and closes the blast gates on the manifold.
///
/// Both calls block until the gate has finished moving.
pub trait GateActuator {
    fn open(&mut self, gate: GateId) -> Result<(), HardwareError>;
    fn close(&mut self, gate: GateId) -> Result<(), HardwareError>;
}

/// Anything that can hold a servo pulse on a numbered channel
pub trait PwmDriver {
    fn set_pulse_width(&mut self, channel: usize, pulse_us: f32) -> Result<(), HardwareError>;
}

/// Pulse width for a continuous rotation servo. -1.0 is full reverse, 0.0
/// stops, 1.0 is full forward.
pub fn throttle_to_pulse(throttle: f32, min_pulse: u32, max_pulse: u32) -> Result<f32, HardwareError> {
    if !(-1.0..=1.0).contains(&throttle) {
        return Err(HardwareError::InvalidThrottle(throttle));
    }

    let fraction = (throttle + 1.0) / 2.0;
    Ok(min_pulse as f32 + fraction * (max_pulse - min_pulse) as f32)
}

/// One continuous servo per gate, each wired to the PWM channel with the
/// same number as the gate.
pub struct ServoGates<D: PwmDriver> {
    driver: D,
    channels: usize,
    min_pulse: u32,
    max_pulse: u32,
    throttle: f32,
    open_time: Duration,
    close_time: Duration,
}

impl<D: PwmDriver> ServoGates<D> {
    pub fn new(driver: D, config: &ServoConfig, channels: usize) -> Self {
        Self {
            driver,
            channels,
            min_pulse: config.min_pulse,
            max_pulse: config.max_pulse,
            throttle: config.throttle,
            open_time: config.open_duration(),
            close_time: config.close_duration(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Run the servo at `throttle` for `duration`, then stop it
    fn drive(&mut self, gate: GateId, throttle: f32, duration: Duration) -> Result<(), HardwareError> {
        if gate >= self.channels {
            return Err(HardwareError::UnknownChannel(gate));
        }

        let pulse = throttle_to_pulse(throttle, self.min_pulse, self.max_pulse)?;
        self.driver.set_pulse_width(gate, pulse)?;
        thread::sleep(duration);

        let neutral = throttle_to_pulse(0.0, self.min_pulse, self.max_pulse)?;
        self.driver.set_pulse_width(gate, neutral)
    }
}

impl<D: PwmDriver> GateActuator for ServoGates<D> {
    fn open(&mut self, gate: GateId) -> Result<(), HardwareError> {
        self.drive(gate, -self.throttle, self.open_time)?;
        info!("Open Gate #{}", gate);
        Ok(())
    }

    fn close(&mut self, gate: GateId) -> Result<(), HardwareError> {
        self.drive(gate, self.throttle, self.close_time)?;
        info!("Close Gate #{}", gate);
        Ok(())
    }
}
