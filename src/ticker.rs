use std::time::Duration;

use log::{debug, info};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::runtime::ControllerHandle;

/// Drives the controller's countdown at a fixed period
pub struct Ticker;

impl Ticker {
    /// Start ticking. The first tick comes one `period` after the call.
    ///
    /// A tick is dropped if the previous one hasn't been handled yet, so
    /// slow gate moves never pile up ticks behind them.
    pub fn spawn(controller: ControllerHandle, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Ticking every {:?}", period);

            let mut interval = interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                if controller.is_closed() {
                    break;
                }
                if !controller.request_tick() {
                    debug!("Previous tick still pending, skipping");
                }
            }

            info!("Ticker stopped");
        })
    }
}
