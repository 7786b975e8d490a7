//! Move a single gate by hand, to check servo wiring and open/close times.
//!
//! gate-test <gate> <open|close> [config.ron]

use std::path::PathBuf;

use anyhow::{bail, Error};
use dusty::prelude::*;

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let (Some(gate), Some(action)) = (args.next(), args.next()) else {
        bail!("usage: gate-test <gate> <open|close> [config.ron]");
    };
    let gate: usize = gate.parse()?;
    let config = Config::load(args.next().map(PathBuf::from).as_deref())?;

    if gate >= config.dusty.max_switches {
        bail!(
            "gate {} is out of range, config has {} switches",
            gate,
            config.dusty.max_switches
        );
    }

    let pwm = Pca9685::init(&config.servo)?;
    let mut gates = ServoGates::new(pwm, &config.servo, config.dusty.max_switches);

    match action.as_str() {
        "open" => gates.open(gate)?,
        "close" => gates.close(gate)?,
        other => bail!("unknown action {:?}, expected open or close", other),
    }

    println!("Gate #{} {} done", gate, action);
    Ok(())
}
