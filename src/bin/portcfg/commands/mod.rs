//! Command implementations

pub mod check;
pub mod completions;
pub mod explain;
pub mod matrix;
pub mod probe;
pub mod resolve;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::cli::SignalArgs;
use portcfg::core::macros::MacroTable;
use portcfg::core::presets;
use portcfg::core::signal::{lenient_version, Signals};
use portcfg::negotiate::{detect, probe as signal_probe};
use portcfg::util::config::{global_config_path, load_config, project_config_path};
use portcfg::util::diagnostic::suggestions;
use portcfg::util::{fs, Config};

/// Load the merged global and project configuration.
pub fn load_project_config() -> Result<Config> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(load_config(
        global_config_path().as_deref(),
        &project_config_path(&cwd),
    ))
}

/// The effective prefix: command line, then configuration.
pub fn prefix(args: &SignalArgs, config: &Config) -> String {
    args.prefix
        .clone()
        .unwrap_or_else(|| config.prefix().to_string())
}

/// Build the signal set the command line asks for.
pub fn load_signals(args: &SignalArgs, config: &Config) -> Result<Signals> {
    let prefix = prefix(args, config);

    let mut signals = if let Some(path) = &args.signals {
        read_signal_file(path)?
    } else if let Some(path) = &args.macros {
        let text = fs::read_to_string(path)?;
        signal_probe::from_macros(&MacroTable::parse(&text), &prefix)
    } else if let Some(name) = &args.preset {
        presets::preset(name).ok_or_else(|| {
            anyhow!(
                "unknown preset `{}` (available: {})\n{}",
                name,
                presets::PRESET_NAMES.join(", "),
                suggestions::UNKNOWN_PRESET
            )
        })?
    } else {
        let mut request = config.probe_request();
        if args.cc.is_some() {
            request.cc = args.cc.clone();
        }
        request.extra_args.extend(args.extra_args.iter().cloned());
        request
            .extra_args
            .extend(args.defines.iter().map(|d| format!("-D{}", d)));
        return finish(detect::probe_compiler(&request, &prefix)?, args, config);
    };

    if !args.defines.is_empty() {
        let switches = MacroTable::from_switches(args.defines.iter().map(String::as_str));
        signal_probe::read_build(&switches, &prefix, &mut signals);
    }
    finish(signals, args, config)
}

fn finish(mut signals: Signals, args: &SignalArgs, config: &Config) -> Result<Signals> {
    if let Some(raw) = &args.compiler_version {
        let version = lenient_version(raw)
            .ok_or_else(|| anyhow!("invalid compiler version `{}`", raw))?;
        signal_probe::override_compiler_version(&mut signals, version);
    }
    config.overrides.apply(&mut signals);
    debug!("signals fingerprint {}", signals.fingerprint());
    Ok(signals)
}

/// Parse a signal file.
pub fn read_signal_file(path: &Path) -> Result<Signals> {
    let text = fs::read_to_string(path)?;
    toml::from_str(&text).with_context(|| {
        format!(
            "failed to parse signal file: {}\n{}",
            path.display(),
            suggestions::BAD_SIGNALS
        )
    })
}
