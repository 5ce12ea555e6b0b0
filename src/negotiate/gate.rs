//! Minimum-requirement gate.
//!
//! A closed, ordered list of hard requirements. The first violated
//! requirement aborts negotiation; nothing else is evaluated after it.

use tracing::debug;

use crate::core::signal::{Signals, StdLib, TargetOs};
use crate::negotiate::cond::Cond;
use crate::negotiate::error::NegotiationError;

/// One hard requirement on the build environment.
#[derive(Debug, Clone)]
pub struct Requirement {
    /// What must hold, in words.
    pub assumption: &'static str,
    /// The environment violates the requirement when this holds.
    pub violated_when: Cond,
}

impl Requirement {
    fn new(assumption: &'static str, violated_when: Cond) -> Self {
        Requirement {
            assumption,
            violated_when,
        }
    }

    pub fn is_violated(&self, signals: &Signals) -> bool {
        self.violated_when.eval(signals)
    }
}

/// The requirement list, in evaluation order.
pub fn requirements() -> Vec<Requirement> {
    vec![
        Requirement::new("Cygwin is not supported", Cond::Os(TargetOs::Cygwin)),
        Requirement::new(
            "MSVC 2015 Update 2 (_MSC_FULL_VER 190023918) or newer",
            Cond::all([Cond::MsvcFullBelow(190_023_918), Cond::not(Cond::Clang)]),
        ),
        Requirement::new(
            "GCC 4.7 or newer",
            Cond::all([Cond::gcc(), Cond::GnucBelow(4, 7)]),
        ),
        Requirement::new(
            "Apple clang 4.2.1 from Xcode 4.5 (__apple_build_version__ 4211165) or newer",
            Cond::AppleBuildBelow(4_211_165),
        ),
        Requirement::new(
            "C++11 or newer",
            Cond::all([Cond::CxxBelow(201103), Cond::not(Cond::Msvc)]),
        ),
        Requirement::new("glibc 2.12 or newer", Cond::GlibcBelow(2, 12)),
        Requirement::new("STLport is not supported", Cond::StdLib(StdLib::Stlport)),
        Requirement::new("8-bit char (CHAR_BIT == 8)", Cond::CharBitsNot(8)),
        Requirement::new("int is at least 32 bits wide", Cond::IntBitsBelow(32)),
    ]
}

/// Run the gate. Fails on the first violated requirement.
pub fn check(signals: &Signals) -> Result<(), NegotiationError> {
    for req in requirements() {
        if req.is_violated(signals) {
            debug!("gate: violated `{}` ({})", req.assumption, req.violated_when);
            return Err(NegotiationError::unsupported(req.assumption));
        }
    }
    debug!("gate: all requirements hold");
    Ok(())
}
