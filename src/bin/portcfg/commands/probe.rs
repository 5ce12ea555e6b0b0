//! `portcfg probe` command
//!
//! Prints the detected signals as TOML, ready to be fed back with
//! `--signals`.

use anyhow::{Context, Result};

use super::{load_project_config, load_signals};
use crate::cli::ProbeArgs;
use portcfg::util::fs;

pub fn execute(args: ProbeArgs) -> Result<()> {
    let config = load_project_config()?;
    let signals = load_signals(&args.signals, &config)?;

    let text = toml::to_string_pretty(&signals).context("failed to serialize signals")?;
    let text = format!("# fingerprint: {}\n{}", signals.fingerprint(), text);

    match &args.output {
        Some(path) => {
            fs::write_string(path, &text)?;
            tracing::info!("wrote signals to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
