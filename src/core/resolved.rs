//! The immutable result of one negotiation pass.
//!
//! Downstream consumers receive a `&ResolvedConfig` instead of consulting
//! ambient global definitions.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::core::catalog::{CapabilityFlag, DerivedConstant, ShimId};
use crate::core::signal::ByteOrder;

/// Which rule of a chain produced a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    /// Index of the matching rule, or `None` for the chain's fallback.
    pub index: Option<usize>,
    /// Rendered condition of the matching rule.
    pub condition: String,
}

impl RuleHit {
    pub fn is_fallback(&self) -> bool {
        self.index.is_none()
    }
}

/// Resolution of a single capability flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagDecision {
    pub present: bool,
    pub hit: RuleHit,
}

/// Resolution of a derived constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConstant {
    pub value: u32,
    /// Set when an external definition replaced the derived value.
    pub overridden: bool,
    pub hit: RuleHit,
}

/// The text a shim expands to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expansion {
    pub params: &'static [&'static str],
    pub body: String,
}

impl Expansion {
    pub fn new(params: &'static [&'static str], body: impl Into<String>) -> Self {
        Expansion {
            params,
            body: body.into(),
        }
    }

    /// The no-op expansion.
    pub fn empty(params: &'static [&'static str]) -> Self {
        Expansion::new(params, "")
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Render as a `#define` line for `name`.
    pub fn define_line(&self, name: &str) -> String {
        let head = if self.params.is_empty() {
            name.to_string()
        } else {
            format!("{}({})", name, self.params.join(", "))
        };
        if self.body.is_empty() {
            format!("#define {}", head)
        } else {
            format!("#define {} {}", head, self.body)
        }
    }
}

/// Resolution of one attribute shim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedShim {
    pub expansion: Expansion,
    pub hit: RuleHit,
    /// Companion marker value, for shims that carry one.
    pub marker: Option<bool>,
}

/// Availability of the compiler's feature-test predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PredicateSupport {
    pub has_attribute: bool,
    pub has_cpp_attribute: bool,
    pub has_builtin: bool,
}

/// The configuration record for one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    fingerprint: String,
    flags: BTreeMap<CapabilityFlag, FlagDecision>,
    constants: BTreeMap<DerivedConstant, ResolvedConstant>,
    shims: BTreeMap<ShimId, ResolvedShim>,
    predicates: PredicateSupport,
    builtins: BTreeSet<String>,
}

impl ResolvedConfig {
    pub(crate) fn new(
        fingerprint: String,
        flags: BTreeMap<CapabilityFlag, FlagDecision>,
        constants: BTreeMap<DerivedConstant, ResolvedConstant>,
        shims: BTreeMap<ShimId, ResolvedShim>,
        predicates: PredicateSupport,
        builtins: BTreeSet<String>,
    ) -> Self {
        ResolvedConfig {
            fingerprint,
            flags,
            constants,
            shims,
            predicates,
            builtins,
        }
    }

    /// Fingerprint of the signals this record was resolved from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Whether a capability flag is present.
    pub fn has(&self, flag: CapabilityFlag) -> bool {
        self.flags.get(&flag).is_some_and(|d| d.present)
    }

    /// Present flags, in catalog order.
    pub fn present_flags(&self) -> impl Iterator<Item = CapabilityFlag> + '_ {
        self.flags
            .iter()
            .filter(|(_, d)| d.present)
            .map(|(f, _)| *f)
    }

    /// How a flag was decided.
    pub fn flag_decision(&self, flag: CapabilityFlag) -> Option<&FlagDecision> {
        self.flags.get(&flag)
    }

    /// Value of a derived constant.
    pub fn constant(&self, constant: DerivedConstant) -> u32 {
        self.constants.get(&constant).map(|c| c.value).unwrap_or(0)
    }

    pub fn resolved_constant(&self, constant: DerivedConstant) -> Option<&ResolvedConstant> {
        self.constants.get(&constant)
    }

    pub fn constants(&self) -> impl Iterator<Item = (DerivedConstant, &ResolvedConstant)> + '_ {
        self.constants.iter().map(|(c, r)| (*c, r))
    }

    /// The active resolution of a shim.
    pub fn shim(&self, id: ShimId) -> Option<&ResolvedShim> {
        self.shims.get(&id)
    }

    pub fn shims(&self) -> impl Iterator<Item = (ShimId, &ResolvedShim)> + '_ {
        self.shims.iter().map(|(id, s)| (*id, s))
    }

    /// Byte order implied by the endianness flags.
    pub fn byte_order(&self) -> Option<ByteOrder> {
        if self.has(CapabilityFlag::IsLittleEndian) {
            Some(ByteOrder::Little)
        } else if self.has(CapabilityFlag::IsBigEndian) {
            Some(ByteOrder::Big)
        } else {
            None
        }
    }

    pub fn predicates(&self) -> &PredicateSupport {
        &self.predicates
    }

    /// `HAVE_BUILTIN(name)`: false when `__has_builtin` is unavailable.
    pub fn has_builtin(&self, name: &str) -> bool {
        self.predicates.has_builtin && self.builtins.contains(name)
    }
}
