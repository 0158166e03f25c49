//! Engine binary for the ReFactory simulation.
//!
//! Wires together configuration, the starter script, snapshot restore, the
//! Rhai script host, operator controls and the run loop, then runs until a
//! limit is reached or the operator stops it.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `refactory-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the session with the starter script
//! 4. Restore the last snapshot, if any
//! 5. Start the ctrl-c handler and the stdin console
//! 6. Run the simulation loop
//! 7. Save a final snapshot and log the result

mod console;
mod error;
mod progress;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use refactory_core::config::SimulationConfig;
use refactory_core::operator::OperatorState;
use refactory_core::runner::{self, RunOptions};
use refactory_core::scheduler::TickScheduler;
use refactory_core::tick::Simulation;
use refactory_script::{RhaiScriptHost, STARTER_SCRIPT_NAME, starter_script};
use refactory_types::PlayerScript;

use crate::error::EngineError;
use crate::progress::ProgressLog;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "refactory-config.yaml";

/// Ticks between progress lines (10 s at the default rate).
const PROGRESS_EVERY_TICKS: u64 = 300;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, session setup or the run loop fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = SimulationConfig::load_or_default(Path::new(CONFIG_FILE))?;

    // 2. Initialize structured logging. RUST_LOG wins over the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        seed = config.spawner.seed,
        ticks_per_second = config.timing.ticks_per_second,
        snapshot_path = %config.persistence.snapshot_path.display(),
        "refactory-engine starting"
    );

    // 3. Build the session.
    let mut host = RhaiScriptHost::new();
    let starter = load_starter(&config).await?;
    if let Err(e) = host.check(&starter.source) {
        warn!(error = %e, "starter script does not compile; robots will fault until it is edited");
    }
    let mut sim = Simulation::new(&config, vec![starter])?;
    info!(
        robots = sim.world.robots.len(),
        machines = sim.world.machines.len(),
        piles = sim.world.spawned_resources.len(),
        "starting floor created"
    );

    // 4. Restore the last snapshot.
    let options = RunOptions::from_config(&config);
    if config.persistence.restore_on_start {
        restore(&mut sim, &options).await;
    }

    // 5. Operator controls.
    let operator = Arc::new(OperatorState::new(&config.timing, &config.simulation));
    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping");
                operator.request_stop();
            }
        });
    }
    tokio::spawn(console::run_console(Arc::clone(&operator)));
    info!("{}", console::HELP);

    // 6. Run.
    let mut scheduler = TickScheduler::new(&config.timing)?;
    let mut callback = ProgressLog::new(PROGRESS_EVERY_TICKS);
    let result = runner::run_simulation(
        &mut sim,
        &mut host,
        &mut scheduler,
        &operator,
        &options,
        &mut callback,
    )
    .await;

    // 7. Final save, even when the loop failed.
    if config.persistence.save_on_exit {
        if let Some(autosave) = options.autosave.as_ref() {
            if let Err(e) = autosave.store.save(&sim.world).await {
                warn!(error = %e, "final snapshot failed");
            }
        }
    }

    let result = result.map_err(EngineError::from)?;
    runner::log_simulation_end(&result);
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "refactory-engine shutdown complete"
    );
    Ok(())
}

/// The configured starter script file, or the built-in starter.
async fn load_starter(config: &SimulationConfig) -> Result<PlayerScript, EngineError> {
    let Some(path) = config.script.starter_path.as_ref() else {
        return Ok(starter_script());
    };
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| EngineError::StarterScript {
            path: path.display().to_string(),
            source,
        })?;
    info!(path = %path.display(), "starter script loaded from file");
    Ok(PlayerScript::new(STARTER_SCRIPT_NAME, source))
}

/// Swap in the stored world, keeping the fresh one on any failure.
async fn restore(sim: &mut Simulation, options: &RunOptions) {
    let Some(autosave) = options.autosave.as_ref() else {
        return;
    };
    if !autosave.store.exists().await {
        info!("no snapshot found, starting fresh");
        return;
    }
    match autosave.store.load().await {
        Ok(snapshot) => {
            info!(tick = snapshot.state.tick, saved_at = %snapshot.saved_at, "session restored");
            sim.replace_world(snapshot.state);
        }
        Err(e) => warn!(error = %e, "snapshot unusable, starting fresh"),
    }
}
