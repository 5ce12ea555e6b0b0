//! `portcfg resolve` command

use anyhow::Result;
use tracing::info;

use super::{load_project_config, load_signals, prefix};
use crate::cli::{OutputFormat, ResolveArgs};
use portcfg::emit::{self, header, EmitOptions};
use portcfg::negotiate::Negotiator;
use portcfg::util::fs;

pub fn execute(args: ResolveArgs) -> Result<()> {
    let config = load_project_config()?;
    let signals = load_signals(&args.signals, &config)?;

    let opts = EmitOptions {
        prefix: prefix(&args.signals, &config),
        guard: args.guard.clone().or_else(|| config.output.guard.clone()),
    };

    let mut unit = Negotiator::new(opts.prefix.clone());
    let resolved = unit.include(&signals)?;

    let text = match args.format {
        OutputFormat::Header => header::render(resolved, &opts),
        OutputFormat::Json => emit::to_json(resolved, &opts)? + "\n",
    };

    // A configured path only applies to the header form.
    let output = args.output.clone().or_else(|| match args.format {
        OutputFormat::Header => config.output.path.clone(),
        OutputFormat::Json => None,
    });

    match output {
        Some(path) => {
            if fs::write_if_changed(&path, &text)? {
                info!("wrote {}", path.display());
            } else {
                info!("{} is unchanged", path.display());
            }
        }
        None => print!("{}", text),
    }
    Ok(())
}
