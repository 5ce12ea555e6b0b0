//! Capability negotiation.
//!
//! One ordered pass per compilation unit:
//!
//! 1. the gate rejects environments below the hard minimums,
//! 2. the flag resolver derives capability flags and constants,
//! 3. the shim generator picks one expansion per attribute shim.
//!
//! Every name is registered in a write-once [`Registry`], and the result is
//! frozen into a [`ResolvedConfig`].

pub mod cond;
pub mod detect;
pub mod error;
pub mod flags;
pub mod gate;
pub mod probe;
pub mod registry;
pub mod rule;
pub mod shims;

use tracing::{debug, info};

use crate::core::catalog::DEFAULT_PREFIX;
use crate::core::resolved::{PredicateSupport, ResolvedConfig};
use crate::core::signal::Signals;

pub use cond::Cond;
pub use error::NegotiationError;
pub use registry::{Origin, Registry};
pub use rule::{Rule, RuleChain};

/// Negotiate a configuration using the default prefix.
pub fn negotiate(signals: &Signals) -> Result<ResolvedConfig, NegotiationError> {
    negotiate_with_prefix(signals, DEFAULT_PREFIX)
}

/// Negotiate a configuration whose names carry `prefix`.
///
/// The prefix only affects how conflicting names are reported.
pub fn negotiate_with_prefix(
    signals: &Signals,
    prefix: &str,
) -> Result<ResolvedConfig, NegotiationError> {
    gate::check(signals)?;

    let mut registry = Registry::new(prefix, &signals.build.predefined);
    let flags = flags::resolve(signals, &mut registry)?;
    let constants = flags::resolve_constants(signals, &mut registry)?;
    let shims = shims::resolve(signals, &mut registry)?;

    let lang = &signals.language;
    let predicates = PredicateSupport {
        has_attribute: lang.attributes.is_some(),
        has_cpp_attribute: lang.cplusplus.is_some() && lang.cpp_attributes.is_some(),
        has_builtin: lang.builtins.is_some(),
    };
    let builtins = lang.builtins.clone().unwrap_or_default();

    let resolved = ResolvedConfig::new(
        signals.fingerprint(),
        flags,
        constants,
        shims,
        predicates,
        builtins,
    );
    info!(
        "negotiated {} {}: {} flags, {} names defined",
        signals.compiler.family,
        signals.compiler.version,
        resolved.present_flags().count(),
        registry.len()
    );
    Ok(resolved)
}

/// Negotiation state for one compilation unit.
///
/// Including the configuration again with identical signals is a no-op;
/// including it with different signals is a conflict.
#[derive(Debug, Clone)]
pub struct Negotiator {
    prefix: String,
    resolved: Option<ResolvedConfig>,
}

impl Default for Negotiator {
    fn default() -> Self {
        Negotiator::new(DEFAULT_PREFIX)
    }
}

impl Negotiator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Negotiator {
            prefix: prefix.into(),
            resolved: None,
        }
    }

    /// Include the configuration for `signals`.
    pub fn include(&mut self, signals: &Signals) -> Result<&ResolvedConfig, NegotiationError> {
        let fingerprint = signals.fingerprint();
        match self.resolved.take() {
            Some(existing) if existing.fingerprint() == fingerprint => {
                debug!("re-inclusion with identical signals ({})", fingerprint);
                Ok(self.resolved.insert(existing))
            }
            Some(existing) => {
                let err = NegotiationError::ConfigurationConflict {
                    name: format!("{} configuration", self.prefix),
                    existing: format!("resolved from signals {}", existing.fingerprint()),
                    attempted: format!("signals {}", fingerprint),
                };
                self.resolved = Some(existing);
                Err(err)
            }
            None => {
                let resolved = negotiate_with_prefix(signals, &self.prefix)?;
                Ok(self.resolved.insert(resolved))
            }
        }
    }

    /// The configuration, once included.
    pub fn resolved(&self) -> Option<&ResolvedConfig> {
        self.resolved.as_ref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
