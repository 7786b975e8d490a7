use std::path::PathBuf;

use anyhow::Error;
use log::{error, info};
use tokio::net::TcpListener;

use dusty::api::{self, ApiState};
use dusty::prelude::*;

/// Room for a burst of switch toggles while a gate is moving
const CONTROL_QUEUE: usize = 100;

#[cfg(feature = "pi")]
type Line = GpioLine;
#[cfg(not(feature = "pi"))]
type Line = SimulatedLine;

#[cfg(feature = "pi")]
fn rf_line(config: &RfConfig) -> Result<Option<Line>, HardwareError> {
    if config.enabled {
        GpioLine::open(config.pin).map(Some)
    } else {
        Ok(None)
    }
}

#[cfg(not(feature = "pi"))]
fn rf_line(_config: &RfConfig) -> Result<Option<Line>, HardwareError> {
    Ok(Some(SimulatedLine::default()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load the config file
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DUSTY_CONFIG").ok())
        .map(PathBuf::from);
    let config = Config::load(path.as_deref())?;
    let switch_count = config.dusty.max_switches;

    // Gates
    info!("Starting {} gates...", switch_count);
    let pwm = Pca9685::init(&config.servo)?;
    let gates = ServoGates::new(pwm, &config.servo, switch_count);

    // Dust collector remote
    info!("Starting rf...");
    let power = RfRemote::new(&config.rf, rf_line(&config.rf)?)?;

    // Controller and its switches
    let (handle, receiver) = control_channel(CONTROL_QUEUE);
    let switches = Switch::bank(switch_count, &handle);
    let controller = Controller::new(gates, power, switches.clone(), config.dusty.gate_close_pause);
    let control = ControlLoop::new(controller, receiver).spawn();

    let ticker = Ticker::spawn(handle.clone(), config.dusty.tick_interval());

    // HTTP
    let halt = HaltSwitch::new(config.halt.clone());
    let app = api::router(ApiState::new(switches, halt, handle.clone()));
    let listener = TcpListener::bind(("0.0.0.0", config.dusty.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ticker.abort();
    handle.shutdown().await;
    control.await?;

    Ok(())
}
