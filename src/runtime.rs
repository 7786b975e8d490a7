use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{anyhow, Error};
use log::{error, info};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    controller::{Controller, ControllerStatus},
    gate::GateActuator,
    rf::PowerTransmitter,
    ControlMessage, GateId,
};

/// Queue between the switches, the ticker and the control loop
pub fn control_channel(capacity: usize) -> (ControllerHandle, ControlReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let tick_pending = Arc::new(AtomicBool::new(false));

    (
        ControllerHandle {
            tx,
            tick_pending: tick_pending.clone(),
        },
        ControlReceiver { rx, tick_pending },
    )
}

/// Cheap, cloneable way to reach the controller. Holding one doesn't keep
/// the controller alive.
#[derive(Clone, Debug)]
pub struct ControllerHandle {
    tx: mpsc::Sender<ControlMessage>,
    tick_pending: Arc<AtomicBool>,
}

impl ControllerHandle {
    pub async fn activate(&self, gate: GateId) {
        self.send(ControlMessage::Activate(gate)).await;
    }

    pub async fn deactivate(&self, gate: GateId, forced_off: u64) {
        self.send(ControlMessage::Deactivate { gate, forced_off }).await;
    }

    /// Queue a tick unless one is already queued or running. Returns whether
    /// a tick was queued.
    pub fn request_tick(&self) -> bool {
        if self.tick_pending.swap(true, Ordering::SeqCst) {
            return false;
        }

        if self.tx.try_send(ControlMessage::Tick).is_err() {
            self.tick_pending.store(false, Ordering::SeqCst);
            return false;
        }

        true
    }

    pub async fn status(&self) -> Result<ControllerStatus, Error> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ControlMessage::Status(reply_tx))
            .await
            .map_err(|_| anyhow!("control loop is not running"))?;
        Ok(reply_rx.await?)
    }

    pub async fn shutdown(&self) {
        self.send(ControlMessage::Shutdown).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, message: ControlMessage) {
        if let Err(e) = self.tx.send(message).await {
            error!("Control loop is gone, dropping {:?}", e.0);
        }
    }
}

pub struct ControlReceiver {
    rx: mpsc::Receiver<ControlMessage>,
    tick_pending: Arc<AtomicBool>,
}

impl ControlReceiver {
    pub async fn recv(&mut self) -> Option<ControlMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ControlMessage> {
        self.rx.try_recv().ok()
    }

    pub fn blocking_recv(&mut self) -> Option<ControlMessage> {
        self.rx.blocking_recv()
    }

    /// Let the ticker queue the next tick
    pub fn tick_done(&self) {
        self.tick_pending.store(false, Ordering::SeqCst);
    }
}

/// Owns the controller and applies queued messages one at a time.
///
/// Gate moves block, so the loop runs on its own blocking thread rather
/// than on the async workers.
pub struct ControlLoop<G, P> {
    controller: Controller<G, P>,
    receiver: ControlReceiver,
}

impl<G, P> ControlLoop<G, P>
where
    G: GateActuator + Send + 'static,
    P: PowerTransmitter + Send + 'static,
{
    pub fn new(controller: Controller<G, P>, receiver: ControlReceiver) -> Self {
        Self {
            controller,
            receiver,
        }
    }

    /// Run until shutdown. The controller is handed back once the loop ends.
    pub fn spawn(self) -> JoinHandle<Controller<G, P>> {
        tokio::task::spawn_blocking(move || self.run())
    }

    pub fn run(mut self) -> Controller<G, P> {
        info!("Control loop started");

        while let Some(message) = self.receiver.blocking_recv() {
            match message {
                ControlMessage::Activate(gate) => {
                    let switch = self.controller.switch(gate).clone();
                    self.controller.activate(&switch);
                }
                ControlMessage::Deactivate { gate, forced_off } => {
                    let switch = self.controller.switch(gate).clone();
                    if switch.forced_off() != forced_off {
                        info!("{} was taken over before it was turned off, ignoring", switch.name());
                        continue;
                    }
                    if let Some(active) = self.controller.active() {
                        if !Arc::ptr_eq(active, &switch) {
                            info!("{} turned off while {} is active, ignoring", switch.name(), active.name());
                            continue;
                        }
                    }
                    self.controller.deactivate(&switch);
                }
                ControlMessage::Tick => {
                    self.controller.tick();
                    self.receiver.tick_done();
                }
                ControlMessage::Status(reply) => {
                    // The asker may have given up already
                    let _ = reply.send(self.controller.status());
                }
                ControlMessage::Shutdown => break,
            }
        }

        self.controller.shutdown();
        info!("Control loop stopped");
        self.controller
    }
}
