#![cfg_attr(not(feature = "pi"), allow(dead_code))]

use log::{debug, info};

#[cfg(feature = "pi")]
use rppal::i2c::I2c;

use super::PwmDriver;
use crate::{config::ServoConfig, error::HardwareError};

const MODE1: u8 = 0x00;
const PRESCALE: u8 = 0xFE;
const LED0_ON_L: u8 = 0x06;

const MODE1_SLEEP: u8 = 0x10;
const MODE1_AUTO_INCREMENT: u8 = 0x20;
const MODE1_RESTART: u8 = 0x80;

pub const CHANNELS: usize = 16;

/// Resolution of the PWM counter
const STEPS: f32 = 4096.0;

/// Value for the PRESCALE register. The chip only accepts 3..=255.
pub fn prescale(reference_clock_speed: u32, frequency: u32) -> Result<u8, HardwareError> {
    if frequency == 0 {
        return Err(HardwareError::InvalidFrequency(frequency));
    }

    let prescale = (reference_clock_speed as f32 / STEPS / frequency as f32 + 0.5) as u32;
    if !(3..=255).contains(&prescale) {
        return Err(HardwareError::InvalidFrequency(frequency));
    }

    Ok(prescale as u8)
}

/// Number of counter steps the output stays high for a pulse of `pulse_us`
pub fn pulse_to_ticks(pulse_us: f32, frequency: u32) -> u16 {
    let ticks = pulse_us * frequency as f32 * STEPS / 1_000_000.0;
    ticks.round().clamp(0.0, STEPS - 1.0) as u16
}

/// 16 channel, 12 bit PWM controller on the I2C bus.
///
/// Without the `pi` feature the duty values are only kept in memory and
/// logged.
pub struct Pca9685 {
    #[cfg(feature = "pi")]
    i2c: I2c,
    frequency: u32,
    duty: [u16; CHANNELS],
}

impl Pca9685 {
    pub fn init(config: &ServoConfig) -> Result<Self, HardwareError> {
        let prescale = prescale(config.reference_clock_speed, config.frequency)?;

        #[cfg(feature = "pi")]
        let i2c = {
            let mut i2c = I2c::new()?;
            i2c.set_slave_address(config.i2c_address)?;

            // The prescaler can only be written while the oscillator sleeps
            let old_mode = i2c.smbus_read_byte(MODE1)?;
            i2c.smbus_write_byte(MODE1, (old_mode & 0x7F) | MODE1_SLEEP)?;
            i2c.smbus_write_byte(PRESCALE, prescale)?;
            i2c.smbus_write_byte(MODE1, old_mode)?;
            std::thread::sleep(std::time::Duration::from_millis(5));
            i2c.smbus_write_byte(MODE1, old_mode | MODE1_RESTART | MODE1_AUTO_INCREMENT)?;
            i2c
        };

        info!(
            "PCA9685 at {:#04x}: {}Hz, prescale {}",
            config.i2c_address, config.frequency, prescale
        );

        Ok(Self {
            #[cfg(feature = "pi")]
            i2c,
            frequency: config.frequency,
            duty: [0; CHANNELS],
        })
    }

    /// Last duty value written to `channel`
    pub fn duty(&self, channel: usize) -> Option<u16> {
        self.duty.get(channel).copied()
    }

    fn write_duty(&mut self, channel: usize, ticks: u16) -> Result<(), HardwareError> {
        let Some(slot) = self.duty.get_mut(channel) else {
            return Err(HardwareError::UnknownChannel(channel));
        };

        #[cfg(feature = "pi")]
        {
            // ON at 0, OFF at `ticks`, low byte first
            let register = LED0_ON_L + 4 * channel as u8;
            let [off_l, off_h] = ticks.to_le_bytes();
            self.i2c.block_write(register, &[0, 0, off_l, off_h])?;
        }

        debug!("PWM channel {}: {} ticks", channel, ticks);
        *slot = ticks;
        Ok(())
    }
}

impl PwmDriver for Pca9685 {
    fn set_pulse_width(&mut self, channel: usize, pulse_us: f32) -> Result<(), HardwareError> {
        let ticks = pulse_to_ticks(pulse_us, self.frequency);
        self.write_duty(channel, ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prescale() {
        assert_eq!(prescale(25_000_000, 50).unwrap(), 122);
        assert_eq!(prescale(25_000_000, 60).unwrap(), 102);
        assert_eq!(prescale(25_000_000, 1526).unwrap(), 4);
    }

    #[test]
    fn test_prescale_out_of_range() {
        assert!(prescale(25_000_000, 0).is_err());
        assert!(prescale(25_000_000, 10).is_err());
        assert!(prescale(25_000_000, 3000).is_err());
    }

    #[test]
    fn test_pulse_to_ticks() {
        assert_eq!(pulse_to_ticks(1500.0, 50), 307);
        assert_eq!(pulse_to_ticks(750.0, 50), 154);
        assert_eq!(pulse_to_ticks(2250.0, 50), 461);
        assert_eq!(pulse_to_ticks(0.0, 50), 0);
        // Longer than a whole period
        assert_eq!(pulse_to_ticks(30_000.0, 50), 4095);
    }

    #[cfg(not(feature = "pi"))]
    #[test]
    fn test_simulated_duty() {
        let config = ServoConfig {
            i2c_address: 0x40,
            reference_clock_speed: 25_000_000,
            frequency: 50,
            min_pulse: 750,
            max_pulse: 2250,
            throttle: 1.0,
            open_time: 0.0,
            close_time: 0.0,
        };
        let mut pwm = Pca9685::init(&config).unwrap();

        pwm.set_pulse_width(3, 1500.0).unwrap();
        assert_eq!(pwm.duty(3), Some(307));
        assert_eq!(pwm.duty(0), Some(0));

        assert!(matches!(
            pwm.set_pulse_width(16, 1500.0),
            Err(HardwareError::UnknownChannel(16))
        ));
    }
}
