//! `portcfg explain` command
//!
//! Prints the rule chain behind a flag, constant or shim and marks the rule
//! that fired for the given signals.

use anyhow::{anyhow, Result};

use super::{load_project_config, load_signals, prefix};
use crate::cli::ExplainArgs;
use portcfg::core::catalog::{self, CatalogEntry};
use portcfg::core::resolved::{ResolvedConfig, RuleHit};
use portcfg::core::signal::Signals;
use portcfg::negotiate::flags::{self, FlagAction};
use portcfg::negotiate::{negotiate_with_prefix, shims, RuleChain};
use portcfg::util::diagnostic::suggestions;

pub fn execute(args: ExplainArgs) -> Result<()> {
    let config = load_project_config()?;
    let signals = load_signals(&args.signals, &config)?;
    let prefix = prefix(&args.signals, &config);

    let entry = catalog::lookup(&args.name, &prefix).ok_or_else(|| {
        anyhow!(
            "`{}` is not a known configuration name\n{}",
            args.name,
            suggestions::UNKNOWN_NAME
        )
    })?;

    let resolved = match negotiate_with_prefix(&signals, &prefix) {
        Ok(resolved) => Some(resolved),
        Err(e) => {
            println!("note: negotiation fails for these signals: {}", e);
            None
        }
    };

    match entry {
        CatalogEntry::Flag(flag) => {
            let chain = flags::flag_chain(flag);
            print_chain(&prefix, &chain, &signals, |a| match a {
                FlagAction::Define => "defined".to_string(),
                FlagAction::Absent => "absent".to_string(),
            });
            if let Some(config) = &resolved {
                let state = if config.has(flag) { "present" } else { "absent" };
                println!("result: {}", state);
            }
        }
        CatalogEntry::Constant(constant) => {
            let chain = flags::constant_chain(constant);
            print_chain(&prefix, &chain, &signals, |v| v.to_string());
            if let Some(r) = resolved
                .as_ref()
                .and_then(|c| c.resolved_constant(constant))
            {
                let source = if r.overridden {
                    " (external definition)"
                } else {
                    ""
                };
                println!("result: {}{}", r.value, source);
            }
        }
        CatalogEntry::Shim(id) => {
            let chain = shims::shim_chain(id);
            print_chain(&prefix, &chain, &signals, |body| {
                if body.is_empty() {
                    "(no-op)".to_string()
                } else {
                    body.to_string()
                }
            });
            if let Some(config) = &resolved {
                print_shim_result(config, &prefix, id);
            }
        }
    }
    Ok(())
}

fn print_chain<A>(
    prefix: &str,
    chain: &RuleChain<A>,
    signals: &Signals,
    describe: impl Fn(&A) -> String,
) {
    let (_, hit) = chain.evaluate(signals);
    println!("{}", qualify(prefix, chain.name()));

    for (index, rule) in chain.rules().iter().enumerate() {
        let fired = hit.index == Some(index);
        println!(
            "  {} {}. if {} => {}",
            marker(fired),
            index + 1,
            rule.cond,
            describe(&rule.action)
        );
    }
    println!(
        "  {} otherwise => {}",
        marker(hit.is_fallback()),
        describe(chain.fallback())
    );
    println!("decided by: {}", describe_hit(&hit));
}

fn qualify(prefix: &str, bare: &str) -> String {
    if prefix.is_empty() {
        bare.to_string()
    } else {
        format!("{}_{}", prefix, bare)
    }
}

fn marker(fired: bool) -> &'static str {
    if fired {
        "→"
    } else {
        " "
    }
}

fn describe_hit(hit: &RuleHit) -> String {
    match hit.index {
        Some(i) => format!("rule {} ({})", i + 1, hit.condition),
        None => "fallback".to_string(),
    }
}

fn print_shim_result(config: &ResolvedConfig, prefix: &str, id: catalog::ShimId) {
    let Some(shim) = config.shim(id) else {
        return;
    };
    let name = qualify(prefix, id.name());
    println!("result: {}", shim.expansion.define_line(&name));
    if let (Some(marker), Some(active)) = (id.marker(), shim.marker) {
        println!("marker: {} = {}", qualify(prefix, marker.name), u8::from(active));
    }
}
