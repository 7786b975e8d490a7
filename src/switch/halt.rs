use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Error};
use log::{info, warn};
use tokio::process::Command;

use crate::config::HaltConfig;

/// Extra switch that shuts the Pi down. It never talks to the controller.
#[derive(Debug)]
pub struct HaltSwitch {
    command: Option<Vec<String>>,
    on: AtomicBool,
}

impl HaltSwitch {
    pub fn new(config: Option<HaltConfig>) -> Self {
        Self {
            command: config.map(|config| config.command),
            on: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        "Halt"
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    /// Turning the switch on runs the halt command. Turning it off only
    /// updates the displayed state.
    pub async fn set_state(&self, on: bool) -> Result<(), Error> {
        self.on.store(on, Ordering::SeqCst);
        if !on {
            return Ok(());
        }

        let Some((program, args)) = self.command.as_ref().and_then(|c| c.split_first()) else {
            warn!("Halt requested but no halt command is configured");
            self.on.store(false, Ordering::SeqCst);
            return Ok(());
        };

        info!("Halt: running {} {}", program, args.join(" "));
        let status = Command::new(program).args(args).status().await;
        self.on.store(false, Ordering::SeqCst);

        let status = status?;
        if !status.success() {
            bail!("halt command exited with {}", status);
        }
        Ok(())
    }
}
