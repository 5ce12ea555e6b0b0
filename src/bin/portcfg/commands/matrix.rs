//! `portcfg matrix` command

use anyhow::{bail, Result};

use crate::cli::MatrixArgs;
use portcfg::ops::{format_report, run_matrix, Matrix};

pub fn execute(args: MatrixArgs) -> Result<()> {
    let matrix = Matrix::load(&args.file)?;
    if matrix.cases.is_empty() {
        bail!(
            "no cases in {}\nhelp: Add `[[case]]` tables with a `preset` or `signals`",
            args.file.display()
        );
    }

    let report = run_matrix(&matrix, args.jobs);
    print!("{}", format_report(&report));

    if !report.all_passed() {
        bail!(
            "{} of {} matrix cases failed",
            report.failed_count(),
            report.results.len()
        );
    }
    Ok(())
}
