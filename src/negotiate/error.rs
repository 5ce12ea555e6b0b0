//! Negotiation error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// A fatal negotiation failure. Feature absence is never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum NegotiationError {
    /// A hard minimum requirement is violated.
    #[error("unsupported environment: {assumption}")]
    #[diagnostic(
        code(portcfg::gate::unsupported),
        help("upgrade the toolchain or change the target so this assumption holds")
    )]
    UnsupportedEnvironment { assumption: String },

    /// A configuration name was defined twice.
    #[error("configuration conflict: `{name}` is already defined ({existing}), cannot define it again ({attempted})")]
    #[diagnostic(
        code(portcfg::registry::conflict),
        help("remove the external definition of `{name}` from the build flags")
    )]
    ConfigurationConflict {
        name: String,
        existing: String,
        attempted: String,
    },
}

impl NegotiationError {
    pub(crate) fn unsupported(assumption: impl Into<String>) -> Self {
        NegotiationError::UnsupportedEnvironment {
            assumption: assumption.into(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            NegotiationError::UnsupportedEnvironment { assumption } => {
                Diagnostic::error("unsupported build environment")
                    .with_context(format!("violated assumption: {}", assumption))
                    .with_suggestion("Use a newer compiler or standard library")
                    .with_suggestion("Run `portcfg probe` to inspect the detected signals")
            }
            NegotiationError::ConfigurationConflict {
                name,
                existing,
                attempted,
            } => Diagnostic::error(format!("`{}` is defined twice", name))
                .with_context(format!("existing definition: {}", existing))
                .with_context(format!("attempted definition: {}", attempted))
                .with_suggestion(format!("Remove `-D{}` from the build invocation", name))
                .with_suggestion(
                    "Include the configuration once per compilation unit, with the same inputs",
                ),
        }
    }
}
