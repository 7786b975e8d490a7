use std::{path::Path, time::Duration};

use anyhow::{bail, Error};
use pi_pinout::{GpioPin, PhysicalPin, WiringPiPin};
use serde::{Deserialize, Serialize};

use crate::rf::protocol::PROTOCOLS;

/// The PCA9685 has 16 PWM channels, one per gate
pub const MAX_GATES: usize = 16;

pub const DEFAULT_CONFIG_PATH: &str = "config.ron";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Config {
    pub dusty: DustyConfig,
    pub servo: ServoConfig,
    pub rf: RfConfig,
    #[serde(default)]
    pub halt: Option<HaltConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DustyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    pub max_switches: usize,
    /// Ticks to wait before closing the gate of a switch that was turned off
    pub gate_close_pause: u32,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServoConfig {
    #[serde(default = "default_i2c_address")]
    pub i2c_address: u16,
    #[serde(default = "default_reference_clock_speed")]
    pub reference_clock_speed: u32,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    /// Pulse width in microseconds at full reverse
    #[serde(default = "default_min_pulse")]
    pub min_pulse: u32,
    /// Pulse width in microseconds at full forward
    #[serde(default = "default_max_pulse")]
    pub max_pulse: u32,
    /// Closing throttle. Opening uses the negated value.
    pub throttle: f32,
    /// Seconds
    pub open_time: f32,
    /// Seconds
    pub close_time: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RfConfig {
    pub enabled: bool,
    /// Data line of the 433MHz transmitter
    pub pin: Pin,
    #[serde(default = "default_tx_repeat")]
    pub tx_repeat: u32,
    #[serde(default = "default_tx_proto")]
    pub tx_proto: usize,
    pub on_code: u32,
    pub off_code: u32,
    /// Overrides the protocol's pulse length, in microseconds
    #[serde(default)]
    pub tx_pulselength: Option<u32>,
    /// Overrides the code length, in bits
    #[serde(default)]
    pub tx_length: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub enum Pin {
    Physical(PhysicalPin),
    Gpio(GpioPin),
    WiringPi(WiringPiPin),
}

impl Pin {
    /// BCM numbering, as used by the GPIO driver
    pub fn gpio(self) -> GpioPin {
        match self {
            Pin::Physical(pin) => pin.into(),
            Pin::Gpio(pin) => pin,
            Pin::WiringPi(pin) => pin.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HaltConfig {
    /// Program and arguments, e.g. `["sudo", "shutdown", "-h", "now"]`
    pub command: Vec<String>,
}

fn default_port() -> u16 {
    51826
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_i2c_address() -> u16 {
    0x40
}

fn default_reference_clock_speed() -> u32 {
    25_000_000
}

fn default_frequency() -> u32 {
    50
}

fn default_min_pulse() -> u32 {
    750
}

fn default_max_pulse() -> u32 {
    2250
}

fn default_tx_repeat() -> u32 {
    10
}

fn default_tx_proto() -> usize {
    1
}

impl Config {
    /// Load the config from `path`, falling back to `config.ron`
    pub fn load(path: Option<&Path>) -> Result<Config, Error> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let config = std::fs::read_to_string(path)?;
        Config::from_ron(&config)
    }

    pub fn from_ron(s: &str) -> Result<Config, Error> {
        let config: Config = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.dusty.max_switches == 0 || self.dusty.max_switches > MAX_GATES {
            bail!(
                "dusty.max_switches must be between 1 and {}, got {}",
                MAX_GATES,
                self.dusty.max_switches
            );
        }
        if self.dusty.tick_interval_ms == 0 {
            bail!("dusty.tick_interval_ms must be greater than 0");
        }

        let servo = &self.servo;
        if !(-1.0..=1.0).contains(&servo.throttle) {
            bail!("servo.throttle must be within -1.0..=1.0, got {}", servo.throttle);
        }
        if servo.min_pulse >= servo.max_pulse {
            bail!(
                "servo.min_pulse ({}) must be below servo.max_pulse ({})",
                servo.min_pulse,
                servo.max_pulse
            );
        }
        if servo.frequency == 0 || servo.reference_clock_speed == 0 {
            bail!("servo.frequency and servo.reference_clock_speed must be non-zero");
        }
        for (name, secs) in [("open_time", servo.open_time), ("close_time", servo.close_time)] {
            if !secs.is_finite() || secs < 0.0 {
                bail!("servo.{} must be a non-negative number of seconds", name);
            }
        }

        if self.rf.tx_proto == 0 || self.rf.tx_proto > PROTOCOLS.len() {
            bail!(
                "rf.tx_proto must be between 1 and {}, got {}",
                PROTOCOLS.len(),
                self.rf.tx_proto
            );
        }
        if let Some(length) = self.rf.tx_length {
            if length == 0 || length > 32 {
                bail!("rf.tx_length must be between 1 and 32 bits, got {}", length);
            }
        }

        if let Some(halt) = &self.halt {
            if halt.command.is_empty() {
                bail!("halt.command must name a program");
            }
        }

        Ok(())
    }
}

impl DustyConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl ServoConfig {
    pub fn open_duration(&self) -> Duration {
        Duration::from_secs_f32(self.open_time)
    }

    pub fn close_duration(&self) -> Duration {
        Duration::from_secs_f32(self.close_time)
    }
}
