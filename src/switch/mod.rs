use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use log::info;
use serde::Serialize;

use crate::{runtime::ControllerHandle, GateId};

pub mod halt;

pub use halt::HaltSwitch;

/// What the outside world sees of a switch
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SwitchState {
    pub id: GateId,
    pub name: String,
    pub on: bool,
}

/// One machine in the shop. Toggling it routes the dust collector to that
/// machine's gate.
#[derive(Debug)]
pub struct Switch {
    id: GateId,
    name: String,
    on: AtomicBool,
    forced_off: AtomicU64,
    controller: ControllerHandle,
}

impl Switch {
    pub fn new(id: GateId, controller: ControllerHandle) -> Self {
        Self {
            id,
            name: format!("Dusty Switch #{}", id),
            on: AtomicBool::new(false),
            forced_off: AtomicU64::new(0),
            controller,
        }
    }

    /// Switches for gates `0..count`
    pub fn bank(count: usize, controller: &ControllerHandle) -> Vec<Arc<Switch>> {
        (0..count)
            .map(|id| Arc::new(Switch::new(id, controller.clone())))
            .collect()
    }

    pub fn id(&self) -> GateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SwitchState {
        SwitchState {
            id: self.id,
            name: self.name.clone(),
            on: self.is_on(),
        }
    }

    /// Number of times another switch took over and forced this one off
    pub fn forced_off(&self) -> u64 {
        self.forced_off.load(Ordering::SeqCst)
    }

    /// Called when someone flips the switch. Every toggle is forwarded, so
    /// turning an idle switch off again resends the off code. The displayed
    /// state follows once the controller has applied the toggle.
    pub async fn set_state(&self, on: bool) {
        info!("State Change: {}", on);
        if on {
            info!("{} turn on", self.name);
            self.controller.activate(self.id).await;
        } else {
            info!("{} turn off", self.name);
            self.controller.deactivate(self.id, self.forced_off()).await;
        }
    }

    /// Update the displayed state. Only the controller calls this.
    pub(crate) fn set_displayed(&self, on: bool) {
        self.on.store(on, Ordering::SeqCst);
    }

    /// Show the switch as off without telling the controller. Used when
    /// another switch takes over.
    pub fn power_down(&self) {
        info!("{} power down", self.name);
        self.forced_off.fetch_add(1, Ordering::SeqCst);
        self.on.store(false, Ordering::SeqCst);
    }
}
