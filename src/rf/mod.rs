use log::{debug, error, info, warn};

#[cfg(feature = "pi")]
use rppal::gpio::{Gpio, OutputPin};

use crate::{config::RfConfig, error::HardwareError};

#[cfg(feature = "pi")]
use crate::config::Pin;

use self::protocol::{Encoder, Pulse};

pub mod protocol;

/// Number of times a failed transmission is attempted before giving up
const TX_ATTEMPTS: usize = 2;

/// Switches the dust collector's remote outlet.
pub trait PowerTransmitter {
    fn send_on(&mut self) -> Result<(), HardwareError>;
    fn send_off(&mut self) -> Result<(), HardwareError>;

    /// Leave the transmitter idle before the process exits
    fn cleanup(&mut self) {}
}

/// The data line of a 433MHz transmitter module
pub trait PulseLine {
    /// Hold the line high then low for the given times
    fn pulse(&mut self, pulse: Pulse) -> Result<(), HardwareError>;

    /// Drive the line low
    fn release(&mut self);
}

#[cfg(feature = "pi")]
pub struct GpioLine {
    pin: OutputPin,
}

#[cfg(feature = "pi")]
impl GpioLine {
    pub fn open(pin: Pin) -> Result<Self, HardwareError> {
        let bcm = pin.gpio().0;
        let pin = Gpio::new()?.get(bcm)?.into_output_low();
        info!("RF transmitter on GPIO {}", bcm);
        Ok(Self { pin })
    }
}

#[cfg(feature = "pi")]
impl PulseLine for GpioLine {
    fn pulse(&mut self, pulse: Pulse) -> Result<(), HardwareError> {
        self.pin.set_high();
        std::thread::sleep(std::time::Duration::from_micros(pulse.high_us as u64));
        self.pin.set_low();
        std::thread::sleep(std::time::Duration::from_micros(pulse.low_us as u64));
        Ok(())
    }

    fn release(&mut self) {
        self.pin.set_low();
    }
}

/// Stand-in line for hosts without GPIO. Only counts what would be sent.
#[derive(Debug, Default)]
pub struct SimulatedLine {
    pub pulses: usize,
}

impl PulseLine for SimulatedLine {
    fn pulse(&mut self, _pulse: Pulse) -> Result<(), HardwareError> {
        self.pulses += 1;
        Ok(())
    }

    fn release(&mut self) {}
}

/// Remote controlled outlet feeding the dust collector motor
pub struct RfRemote<L: PulseLine> {
    line: Option<L>,
    encoder: Encoder,
    on_code: u32,
    off_code: u32,
    tx_repeat: u32,
    tx_length: Option<u32>,
}

impl<L: PulseLine> RfRemote<L> {
    /// `line` is only needed when the config enables rf
    pub fn new(config: &RfConfig, line: Option<L>) -> Result<Self, HardwareError> {
        let encoder = Encoder::new(config.tx_proto, config.tx_pulselength)?;

        let line = match (config.enabled, line) {
            (true, Some(line)) => Some(line),
            (true, None) => {
                warn!("rf enabled but no transmitter line was given");
                None
            }
            (false, _) => None,
        };

        Ok(Self {
            line,
            encoder,
            on_code: config.on_code,
            off_code: config.off_code,
            tx_repeat: config.tx_repeat,
            tx_length: config.tx_length,
        })
    }

    pub fn line(&self) -> Option<&L> {
        self.line.as_ref()
    }

    fn tx_code(&mut self, code: u32) -> Result<(), HardwareError> {
        let Some(line) = self.line.as_mut() else {
            info!("rf disabled");
            return Ok(());
        };

        let pulses = self.encoder.encode(code, self.tx_length);
        let mut attempt = 1;
        loop {
            let sent = (0..self.tx_repeat)
                .try_for_each(|_| pulses.iter().try_for_each(|pulse| line.pulse(*pulse)));
            line.release();

            match sent {
                Ok(()) => {
                    debug!("rf code {} sent {} times", code, self.tx_repeat);
                    return Ok(());
                }
                Err(e) if attempt < TX_ATTEMPTS => {
                    error!("rf code {} failed, retrying: {}", code, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<L: PulseLine> PowerTransmitter for RfRemote<L> {
    fn send_on(&mut self) -> Result<(), HardwareError> {
        self.tx_code(self.on_code)
    }

    fn send_off(&mut self) -> Result<(), HardwareError> {
        self.tx_code(self.off_code)
    }

    fn cleanup(&mut self) {
        if let Some(line) = self.line.as_mut() {
            line.release();
        }
    }
}
