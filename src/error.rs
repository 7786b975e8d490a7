use thiserror::Error;

use crate::GateId;

/// Failures raised by the gate and RF drivers.
///
/// The controller logs these and carries on; they never unwind a state
/// transition halfway.
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("gpio: {0}")]
    Gpio(String),
    #[error("i2c: {0}")]
    I2c(String),
    #[error("no servo channel for gate {0}")]
    UnknownChannel(GateId),
    #[error("pwm frequency {0}Hz is out of range")]
    InvalidFrequency(u32),
    #[error("throttle {0} is outside -1.0..=1.0")]
    InvalidThrottle(f32),
    #[error("unknown rf protocol {0}")]
    InvalidProtocol(usize),
}

#[cfg(feature = "pi")]
impl From<rppal::gpio::Error> for HardwareError {
    fn from(e: rppal::gpio::Error) -> Self {
        HardwareError::Gpio(e.to_string())
    }
}

#[cfg(feature = "pi")]
impl From<rppal::i2c::Error> for HardwareError {
    fn from(e: rppal::i2c::Error) -> Self {
        HardwareError::I2c(e.to_string())
    }
}
