use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::{gate::GateActuator, rf::PowerTransmitter, switch::Switch, GateId};

/// Ticks left before a deferred gate close
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Countdown {
    /// Nothing has been armed since startup
    #[default]
    Idle,
    /// 0 means close on the next tick
    Ticks(u32),
}

impl Countdown {
    pub fn remaining(&self) -> Option<u32> {
        match self {
            Countdown::Idle => None,
            Countdown::Ticks(n) => Some(*n),
        }
    }
}

/// Point in time view of the controller, served by the status endpoint
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ControllerStatus {
    pub active: Option<GateId>,
    pub pending_close_gate: Option<GateId>,
    pub countdown: Option<u32>,
    pub collector_powered: bool,
}

/// Routes the dust collector to one machine at a time.
///
/// Turning a switch on closes whichever gate was routed before, opens the
/// switch's gate and powers the collector. Turning it off powers the
/// collector down right away but leaves the gate open for
/// `gate_close_pause` ticks, so flicking the same machine back on doesn't
/// make the gate chatter.
///
/// Every call blocks for as long as the gates take to move. Callers must
/// serialize access; see [`ControlLoop`](crate::runtime::ControlLoop).
pub struct Controller<G, P> {
    gates: G,
    power: P,
    switches: Vec<Arc<Switch>>,
    gate_close_pause: u32,

    active: Option<Arc<Switch>>,
    pending_close_gate: Option<GateId>,
    countdown: Countdown,
    collector_powered: bool,
}

impl<G: GateActuator, P: PowerTransmitter> Controller<G, P> {
    pub fn new(gates: G, power: P, switches: Vec<Arc<Switch>>, gate_close_pause: u32) -> Self {
        Self {
            gates,
            power,
            switches,
            gate_close_pause,
            active: None,
            pending_close_gate: None,
            countdown: Countdown::Idle,
            collector_powered: false,
        }
    }

    /// The registered switch for `id`.
    ///
    /// Panics on an unknown id: switches and controller are wired together
    /// at startup, so this is a bug rather than something to recover from.
    pub fn switch(&self, id: GateId) -> &Arc<Switch> {
        match self.switches.get(id) {
            Some(switch) => switch,
            None => panic!(
                "switch {} is not registered ({} switches)",
                id,
                self.switches.len()
            ),
        }
    }

    fn assert_registered(&self, switch: &Arc<Switch>) {
        assert!(
            Arc::ptr_eq(self.switch(switch.id()), switch),
            "{} is not the registered switch for gate {}",
            switch.name(),
            switch.id()
        );
    }

    /// Route the collector to `switch`, taking over from any other active
    /// switch. A close still pending from an earlier `deactivate` is dropped.
    pub fn activate(&mut self, switch: &Arc<Switch>) {
        self.assert_registered(switch);

        if let Some(previous) = self.active.take() {
            if !Arc::ptr_eq(&previous, switch) {
                self.close_gate(previous.id());
                previous.power_down();
            }
        }

        // Supersedes any close still waiting on the countdown
        self.countdown = Countdown::Ticks(0);
        self.pending_close_gate = None;

        self.active = Some(Arc::clone(switch));
        switch.set_displayed(true);
        self.open_gate(switch.id());
        self.turn_on_dust_collector();
    }

    /// Stop the collector and schedule the gate of `switch` to close
    pub fn deactivate(&mut self, switch: &Arc<Switch>) {
        self.assert_registered(switch);

        match &self.active {
            Some(active) if Arc::ptr_eq(active, switch) => {}
            Some(active) => warn!(
                "{} turned off while {} is active",
                switch.name(),
                active.name()
            ),
            None => warn!("{} turned off while no switch is active", switch.name()),
        }

        self.pending_close_gate = Some(switch.id());
        self.active = None;
        switch.set_displayed(false);
        self.countdown = Countdown::Ticks(self.gate_close_pause);
        self.turn_off_dust_collector();
    }

    /// Advance the deferred close by one step.
    ///
    /// A tick either counts down or closes, never both, so a pause of `P`
    /// closes the gate on the `P + 1`th tick.
    pub fn tick(&mut self) {
        match self.countdown {
            Countdown::Ticks(n) if n > 0 => {
                self.countdown = Countdown::Ticks(n - 1);
                debug!("counting down {}", n - 1);
            }
            Countdown::Ticks(0) => {
                if let Some(gate) = self.pending_close_gate.take() {
                    self.close_gate(gate);
                }
            }
            _ => {}
        }
    }

    /// Leave the transmitter idle before the process exits
    pub fn shutdown(&mut self) {
        info!("shutting down controller");
        self.power.cleanup();
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            active: self.active.as_ref().map(|switch| switch.id()),
            pending_close_gate: self.pending_close_gate,
            countdown: self.countdown.remaining(),
            collector_powered: self.collector_powered,
        }
    }

    pub fn active(&self) -> Option<&Arc<Switch>> {
        self.active.as_ref()
    }

    pub fn pending_close_gate(&self) -> Option<GateId> {
        self.pending_close_gate
    }

    pub fn countdown(&self) -> Countdown {
        self.countdown
    }

    pub fn collector_powered(&self) -> bool {
        self.collector_powered
    }

    pub fn power(&self) -> &P {
        &self.power
    }

    fn open_gate(&mut self, gate: GateId) {
        if let Err(e) = self.gates.open(gate) {
            error!("Failed to open gate #{}: {}", gate, e);
        }
    }

    fn close_gate(&mut self, gate: GateId) {
        if let Err(e) = self.gates.close(gate) {
            error!("Failed to close gate #{}: {}", gate, e);
        }
    }

    fn turn_on_dust_collector(&mut self) {
        if self.collector_powered {
            return;
        }

        match self.power.send_on() {
            Ok(()) => {
                self.collector_powered = true;
                info!("turn on dust collector");
            }
            Err(e) => error!("Failed to turn on dust collector: {}", e),
        }
    }

    /// Unlike turning on, the off code goes out even if the collector is
    /// already off.
    fn turn_off_dust_collector(&mut self) {
        self.collector_powered = false;
        if let Err(e) = self.power.send_off() {
            error!("Failed to turn off dust collector: {}", e);
        }
        info!("turn off dust collector");
    }
}
