//! Rendering of a resolved configuration.
//!
//! The header form is what C/C++ translation units include; the JSON form is
//! for build scripts that want to read decisions without a preprocessor.

pub mod header;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::core::catalog::DEFAULT_PREFIX;
use crate::core::resolved::{PredicateSupport, ResolvedConfig};
use crate::util::fs;

/// Naming options for emitted output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Namespace prefix for every emitted name
    pub prefix: String,
    /// Include guard; derived from the prefix when unset
    pub guard: Option<String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            prefix: DEFAULT_PREFIX.to_string(),
            guard: None,
        }
    }
}

impl EmitOptions {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        EmitOptions {
            prefix: prefix.into(),
            guard: None,
        }
    }

    pub fn guard(&self) -> String {
        match &self.guard {
            Some(guard) => guard.clone(),
            None if self.prefix.is_empty() => "CONFIG_H_".to_string(),
            None => format!("{}_CONFIG_H_", self.prefix),
        }
    }

    fn qualify(&self, bare: &str) -> String {
        if self.prefix.is_empty() {
            bare.to_string()
        } else {
            format!("{}_{}", self.prefix, bare)
        }
    }
}

#[derive(Serialize)]
struct JsonView<'a> {
    prefix: &'a str,
    fingerprint: &'a str,
    predicates: &'a PredicateSupport,
    flags: BTreeMap<String, bool>,
    constants: BTreeMap<String, JsonConstant>,
    shims: BTreeMap<String, String>,
    markers: BTreeMap<String, bool>,
}

#[derive(Serialize)]
struct JsonConstant {
    value: u32,
    overridden: bool,
}

/// Render the configuration as pretty-printed JSON.
pub fn to_json(config: &ResolvedConfig, opts: &EmitOptions) -> Result<String> {
    let flags = crate::core::catalog::CapabilityFlag::ALL
        .iter()
        .map(|f| (opts.qualify(f.name()), config.has(*f)))
        .collect();

    let constants = config
        .constants()
        .map(|(c, r)| {
            (
                opts.qualify(c.name()),
                JsonConstant {
                    value: r.value,
                    overridden: r.overridden,
                },
            )
        })
        .collect();

    let mut shims = BTreeMap::new();
    let mut markers = BTreeMap::new();
    for (id, shim) in config.shims() {
        shims.insert(opts.qualify(id.name()), shim.expansion.body.clone());
        if let (Some(marker), Some(active)) = (id.marker(), shim.marker) {
            markers.insert(opts.qualify(marker.name), active);
        }
    }

    let view = JsonView {
        prefix: &opts.prefix,
        fingerprint: config.fingerprint(),
        predicates: config.predicates(),
        flags,
        constants,
        shims,
        markers,
    };
    Ok(serde_json::to_string_pretty(&view)?)
}

/// Write the header to `path`, leaving the file untouched when unchanged.
///
/// Returns whether the file was written.
pub fn write_header(config: &ResolvedConfig, opts: &EmitOptions, path: &Path) -> Result<bool> {
    fs::write_if_changed(path, &header::render(config, opts))
}
