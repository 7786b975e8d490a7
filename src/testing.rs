//! Instant stand-ins for the gate servos and the RF remote

use std::sync::{Arc, Mutex};

use crate::{error::HardwareError, gate::GateActuator, rf::PowerTransmitter, GateId};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    Open(GateId),
    Close(GateId),
    On,
    Off,
}

/// Hardware calls in the order they were made, shared between fakes
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: Event) -> usize {
        self.events().iter().filter(|e| **e == event).count()
    }
}

pub struct RecordingGates {
    log: EventLog,
    /// Every call still records, then fails
    pub failing: bool,
}

impl RecordingGates {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            failing: false,
        }
    }

    pub fn failing(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            failing: true,
        }
    }

    fn result(&self, gate: GateId) -> Result<(), HardwareError> {
        if self.failing {
            Err(HardwareError::I2c(format!("gate {} not acknowledged", gate)))
        } else {
            Ok(())
        }
    }
}

impl GateActuator for RecordingGates {
    fn open(&mut self, gate: GateId) -> Result<(), HardwareError> {
        self.log.push(Event::Open(gate));
        self.result(gate)
    }

    fn close(&mut self, gate: GateId) -> Result<(), HardwareError> {
        self.log.push(Event::Close(gate));
        self.result(gate)
    }
}

pub struct RecordingPower {
    log: EventLog,
    /// Number of upcoming calls that record, then fail
    pub failures: usize,
    pub cleaned_up: bool,
}

impl RecordingPower {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            failures: 0,
            cleaned_up: false,
        }
    }

    pub fn failing(log: &EventLog, failures: usize) -> Self {
        Self {
            failures,
            ..Self::new(log)
        }
    }

    fn result(&mut self) -> Result<(), HardwareError> {
        if self.failures > 0 {
            self.failures -= 1;
            Err(HardwareError::Gpio("transmitter unplugged".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PowerTransmitter for RecordingPower {
    fn send_on(&mut self) -> Result<(), HardwareError> {
        self.log.push(Event::On);
        self.result()
    }

    fn send_off(&mut self) -> Result<(), HardwareError> {
        self.log.push(Event::Off);
        self.result()
    }

    fn cleanup(&mut self) {
        self.cleaned_up = true;
    }
}
