use tokio::sync::oneshot;

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod rf;
pub mod runtime;
pub mod switch;
pub mod ticker;

#[cfg(test)]
mod testing;

pub mod prelude {
    pub use crate::{
        config::*, controller::*, error::*, gate::*, rf::*, runtime::*, switch::*, ticker::*,
    };
}

/// Index of a gate on the manifold. Doubles as the switch id and the PWM
/// channel driving that gate's servo.
pub type GateId = usize;

/// Messages processed, one at a time, by the control loop
#[derive(Debug)]
pub enum ControlMessage {
    /// A switch was turned on
    Activate(GateId),
    /// A switch was turned off. `forced_off` is the switch's
    /// [`forced_off`](switch::Switch::forced_off) count when it was toggled;
    /// if a takeover has forced it off since, the toggle is stale.
    Deactivate { gate: GateId, forced_off: u64 },
    /// Periodic countdown step
    Tick,
    /// Snapshot of the controller state
    Status(oneshot::Sender<controller::ControllerStatus>),
    /// Release the hardware and stop the loop
    Shutdown,
}
