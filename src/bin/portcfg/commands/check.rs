//! `portcfg check` command

use anyhow::Result;

use super::{load_project_config, load_signals};
use crate::cli::CheckArgs;
use portcfg::negotiate::gate;

pub fn execute(args: CheckArgs) -> Result<()> {
    let config = load_project_config()?;
    let signals = load_signals(&args.signals, &config)?;

    gate::check(&signals)?;

    println!(
        "ok: {} {} targeting {} meets every minimum requirement",
        signals.compiler.family, signals.compiler.version, signals.target.os
    );
    Ok(())
}
