//! Compatibility-matrix runs.
//!
//! A matrix file lists environments and what negotiation should make of
//! them:
//!
//! ```toml
//! [[case]]
//! name = "gcc-4.6"
//! preset = "linux-gcc"
//! compiler-version = "4.6"
//! expect = "unsupported"
//!
//! [[case]]
//! name = "clang-no-mmap"
//! preset = "linux-clang"
//! present = ["HAVE_THREAD_LOCAL"]
//! absent = ["IS_BIG_ENDIAN"]
//! ```
//!
//! Cases are independent and run in parallel; results come back in file
//! order.

use std::fmt::Write;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use rayon::prelude::*;
use serde::Deserialize;

use crate::core::catalog::{self, CatalogEntry, DEFAULT_PREFIX};
use crate::core::macros::MacroTable;
use crate::core::presets;
use crate::core::resolved::ResolvedConfig;
use crate::core::signal::{lenient_version, Signals};
use crate::negotiate::{negotiate_with_prefix, probe, NegotiationError};
use crate::util::fs;

/// What a case is expected to negotiate to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    #[default]
    Ok,
    Unsupported,
    Conflict,
}

/// One environment of the matrix.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MatrixCase {
    pub name: String,
    pub preset: Option<String>,
    pub signals: Option<Signals>,
    pub compiler_version: Option<String>,
    /// External definitions, as with `-D`
    pub defines: Vec<String>,
    pub expect: Expectation,
    /// Flags that must be present
    pub present: Vec<String>,
    /// Flags that must be absent
    pub absent: Vec<String>,
}

/// A parsed matrix file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Matrix {
    pub prefix: Option<String>,
    #[serde(rename = "case")]
    pub cases: Vec<MatrixCase>,
}

impl Matrix {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse matrix file: {}", path.display()))
    }

    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }
}

impl MatrixCase {
    /// Build the signal set the case describes.
    pub fn signals(&self, prefix: &str) -> Result<Signals> {
        let mut signals = match (&self.signals, &self.preset) {
            (Some(_), Some(_)) => bail!("case `{}` sets both `signals` and `preset`", self.name),
            (Some(signals), None) => signals.clone(),
            (None, Some(name)) => presets::preset(name)
                .ok_or_else(|| anyhow!("case `{}`: unknown preset `{}`", self.name, name))?,
            (None, None) => bail!("case `{}` needs `signals` or `preset`", self.name),
        };

        if let Some(raw) = &self.compiler_version {
            let version = lenient_version(raw).ok_or_else(|| {
                anyhow!("case `{}`: invalid compiler version `{}`", self.name, raw)
            })?;
            probe::override_compiler_version(&mut signals, version);
        }
        if !self.defines.is_empty() {
            let switches = MacroTable::from_switches(self.defines.iter().map(String::as_str));
            probe::read_build(&switches, prefix, &mut signals);
        }
        Ok(signals)
    }
}

/// Outcome of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    pub name: String,
    /// Why the case failed; `None` when it passed
    pub failure: Option<String>,
    /// Summary of what negotiation produced
    pub summary: String,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Outcome of a whole matrix.
#[derive(Debug, Clone, Default)]
pub struct MatrixReport {
    pub results: Vec<CaseResult>,
}

impl MatrixReport {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Run every case, in parallel.
pub fn run_matrix(matrix: &Matrix, jobs: Option<usize>) -> MatrixReport {
    if let Some(j) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(j)
            .build_global()
            .ok(); // Ignore if already set
    }

    let prefix = matrix.prefix();
    tracing::info!("running {} matrix cases", matrix.cases.len());

    let results = matrix
        .cases
        .par_iter()
        .map(|case| run_case(case, prefix))
        .collect();

    MatrixReport { results }
}

/// Run a single case.
pub fn run_case(case: &MatrixCase, prefix: &str) -> CaseResult {
    let outcome = case
        .signals(prefix)
        .map(|signals| negotiate_with_prefix(&signals, prefix));

    let (failure, summary) = match outcome {
        Err(e) => (Some(format!("{:#}", e)), "invalid case".to_string()),
        Ok(result) => judge(case, prefix, &result),
    };

    CaseResult {
        name: case.name.clone(),
        failure,
        summary,
    }
}

fn judge(
    case: &MatrixCase,
    prefix: &str,
    result: &Result<ResolvedConfig, NegotiationError>,
) -> (Option<String>, String) {
    let summary = match result {
        Ok(config) => format!("{} flags present", config.present_flags().count()),
        Err(e) => e.to_string(),
    };

    let failure = match (case.expect, result) {
        (Expectation::Ok, Ok(config)) => check_flags(case, prefix, config),
        (Expectation::Unsupported, Err(NegotiationError::UnsupportedEnvironment { .. }))
        | (Expectation::Conflict, Err(NegotiationError::ConfigurationConflict { .. })) => None,
        (expected, _) => Some(format!("expected {:?}, got: {}", expected, summary)),
    };
    (failure, summary)
}

fn check_flags(case: &MatrixCase, prefix: &str, config: &ResolvedConfig) -> Option<String> {
    let mut problems = Vec::new();
    for (names, want) in [(&case.present, true), (&case.absent, false)] {
        for name in names {
            match catalog::lookup(name, prefix) {
                Some(CatalogEntry::Flag(flag)) if config.has(flag) != want => {
                    let state = if want { "absent" } else { "present" };
                    problems.push(format!("{} is {}", name, state));
                }
                Some(CatalogEntry::Flag(_)) => {}
                _ => problems.push(format!("{} is not a capability flag", name)),
            }
        }
    }
    if problems.is_empty() {
        None
    } else {
        Some(problems.join("; "))
    }
}

/// Format a report for terminal output.
pub fn format_report(report: &MatrixReport) -> String {
    let mut output = String::new();

    for result in &report.results {
        let status = if result.passed() { "[OK]" } else { "[!!]" };
        let _ = writeln!(output, "  {} {} ({})", status, result.name, result.summary);
        if let Some(failure) = &result.failure {
            let _ = writeln!(output, "      {}", failure);
        }
    }

    let _ = writeln!(
        output,
        "\n{} passed, {} failed",
        report.passed_count(),
        report.failed_count()
    );
    output
}
