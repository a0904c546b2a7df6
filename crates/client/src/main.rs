//! Playtest binary.
//!
//! Composition root: loads `.env`, installs logging, builds the global session
//! from the environment and runs the scripted scenario against it.
//!
//! ```bash
//! RUST_LOG=case_stack=debug,invoker=debug cargo run -p client --bin playtest
//! ```

use anyhow::Result;
use client::{Playtest, PlaytestConfig};
use runtime::Session;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let session = Session::global();
    let config = session.config();
    tracing::info!(
        fault_limit = config.case_stack.fault_limit,
        max_retries = config.invoker.max_retries,
        "Starting playtest"
    );

    let report = Playtest::setup(session, PlaytestConfig::default())?.run()?;
    tracing::info!(
        frames = report.frames,
        shots = report.shots,
        reloads = report.reloads,
        blocked_inputs = report.blocked_inputs,
        bandit_hp = report.bandit_hp,
        bandit_down = report.bandit_down,
        final_case = %report.final_case,
        "Playtest finished"
    );

    session.teardown();
    Ok(())
}
