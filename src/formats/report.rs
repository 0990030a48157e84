//! Enrichment report writer
//!
//! Successful families go to the tabular report in family-name order;
//! failed families go to the diagnostic writer only.

use super::fisher::{ErrorResult, FamilyOutcome, FamilyResult};
use std::io::{self, Write};

/// Report header, ten tab-separated columns
pub const REPORT_HEADER: &str =
    "File\ta1_b1\ta1_b0\ta0_b1\ta0_b0\tp_left\tp_right\tp_both\tFoldEnrich\tOverlap_fraction";

/// Rows written to each channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub reported: usize,
    pub failed: usize,
}

fn outcome_key(outcome: &FamilyOutcome) -> (&str, &str) {
    match outcome {
        Ok(FamilyResult {
            family, identifier, ..
        })
        | Err(ErrorResult {
            family, identifier, ..
        }) => (family.as_str(), identifier.as_str()),
    }
}

/// Sort outcomes by family name, independent of completion order
pub fn sort_outcomes(outcomes: &mut [FamilyOutcome]) {
    outcomes.sort_by(|a, b| outcome_key(a).cmp(&outcome_key(b)));
}

/// Write the header and one row per successful family
///
/// Error outcomes are written to `diagnostics` as `<id>\tERROR\t<reason>`
/// and never appear in `report`.
pub fn emit_report<W: Write, D: Write>(
    mut outcomes: Vec<FamilyOutcome>,
    report: &mut W,
    diagnostics: &mut D,
) -> io::Result<EmitStats> {
    sort_outcomes(&mut outcomes);
    let mut stats = EmitStats::default();

    writeln!(report, "{}", REPORT_HEADER)?;
    for outcome in &outcomes {
        match outcome {
            Ok(result) => {
                writeln!(report, "{}", result.to_row())?;
                stats.reported += 1;
            }
            Err(error) => {
                writeln!(diagnostics, "{}", error)?;
                stats.failed += 1;
            }
        }
    }

    report.flush()?;
    diagnostics.flush()?;
    Ok(stats)
}
