//! Compiler invocation for the probe.
//!
//! Runs the C++ compiler to dump its predefined macros, then test-compiles
//! `#include <h>` for each standard header of interest, since `__has_include`
//! answers cannot be read from a dump.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use crate::core::macros::MacroTable;
use crate::core::signal::Signals;
use crate::negotiate::probe;
use crate::util::diagnostic::suggestions;
use crate::util::process::{find_cxx_compiler, find_executable, ProcessBuilder};

/// Standard headers probed by default.
pub const DEFAULT_HEADERS: &[&str] = &["any", "optional", "variant", "string_view"];

/// Headers pulled into the macro dump so library and platform version
/// macros show up.
const DUMP_PRELUDE: &str = "\
#include <cstddef>
#include <climits>
#if defined(__has_include)
#if defined(__ANDROID__) && __has_include(<android/ndk-version.h>)
#include <android/ndk-version.h>
#endif
#if defined(__APPLE__) && __has_include(<Availability.h>)
#include <Availability.h>
#endif
#if defined(__APPLE__) && __has_include(<TargetConditionals.h>)
#include <TargetConditionals.h>
#endif
#endif
";

/// What to probe and how.
#[derive(Debug, Clone, Default)]
pub struct ProbeRequest {
    /// Compiler to run; discovered from `CXX` and `PATH` when unset
    pub cc: Option<PathBuf>,
    /// Headers to test-compile
    pub headers: Vec<String>,
    /// Extra compiler arguments (`-std=c++17`, `-D...`, `--target=...`)
    pub extra_args: Vec<String>,
}

impl ProbeRequest {
    /// Headers to test, falling back to [`DEFAULT_HEADERS`].
    pub fn headers(&self) -> Vec<String> {
        if self.headers.is_empty() {
            DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect()
        } else {
            self.headers.clone()
        }
    }
}

/// Resolve the compiler to run.
pub fn locate_compiler(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(cc) = configured {
        if cc.exists() {
            return Ok(cc.to_path_buf());
        }
        let name = cc.to_string_lossy();
        return find_executable(&name)
            .with_context(|| format!("configured compiler `{}` not found", cc.display()));
    }

    match find_cxx_compiler() {
        Some(cc) => Ok(cc),
        None => bail!("no C++ compiler found\n{}", suggestions::NO_COMPILER),
    }
}

/// Dump the compiler's predefined macros.
pub fn dump_macros(cc: &Path, extra_args: &[String]) -> Result<MacroTable> {
    let dump = |stdin: &str| {
        ProcessBuilder::new(cc)
            .args(["-dM", "-E", "-x", "c++"])
            .args(extra_args)
            .arg("-")
            .stdin(stdin)
            .exec_and_check()
    };

    let output = match dump(DUMP_PRELUDE) {
        Ok(output) => output,
        Err(e) => {
            warn!("macro dump with library headers failed, retrying without: {:#}", e);
            dump("")?
        }
    };

    let text = String::from_utf8_lossy(&output.stdout);
    let table = MacroTable::parse(&text);
    debug!("{} predefined macros from {}", table.len(), cc.display());
    Ok(table)
}

/// Whether `#include <header>` compiles.
pub fn header_available(cc: &Path, header: &str, extra_args: &[String]) -> Result<bool> {
    let output = ProcessBuilder::new(cc)
        .args(["-fsyntax-only", "-x", "c++"])
        .args(extra_args)
        .arg("-")
        .stdin(format!("#include <{}>\n", header))
        .exec()?;
    Ok(output.status.success())
}

/// Probe a real compiler into a signal set.
pub fn probe_compiler(request: &ProbeRequest, prefix: &str) -> Result<Signals> {
    let cc = locate_compiler(request.cc.as_deref())?;
    info!("probing {}", cc.display());

    let macros = dump_macros(&cc, &request.extra_args)?;
    let mut signals = probe::from_macros(&macros, prefix);

    for header in request.headers() {
        if header_available(&cc, &header, &request.extra_args)? {
            debug!("<{}> available", header);
            signals.language.headers.insert(header);
        }
    }

    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let request = ProbeRequest::default();
        assert_eq!(request.headers(), vec!["any", "optional", "variant", "string_view"]);

        let request = ProbeRequest {
            headers: vec!["span".to_string()],
            ..ProbeRequest::default()
        };
        assert_eq!(request.headers(), vec!["span"]);
    }

    #[test]
    fn test_dump_prelude_reaches_platform_headers() {
        assert!(DUMP_PRELUDE.contains("#include <android/ndk-version.h>"));
        assert!(DUMP_PRELUDE.contains("#include <Availability.h>"));
        assert!(DUMP_PRELUDE.contains("#include <TargetConditionals.h>"));
        assert_eq!(
            DUMP_PRELUDE.matches("#if ").count(),
            DUMP_PRELUDE.matches("#endif").count()
        );
    }

    #[test]
    fn test_missing_configured_compiler() {
        let err = locate_compiler(Some(Path::new("/nonexistent/portcfg-cc"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
