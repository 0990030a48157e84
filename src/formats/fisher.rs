//! `bedtools fisher` report parsing
//!
//! Parsing happens in stages that can be tested on their own:
//!
//! 1. [`classify_line`] turns each line into a [`ReportLine`]
//! 2. [`parse_fisher_report`] assembles the lines into a [`FisherReport`]
//! 3. [`FisherReport::correct_tail_swap`] undoes the primitive's tail swap
//! 4. [`FamilyResult::from_report`] derives the overlap fraction
//!
//! A typical report looks like:
//!
//! ```text
//! # Number of query intervals: 10
//! # Number of db intervals: 150
//! # Number of overlaps: 3
//! # Number of possible intervals (estimated): 37331
//! # phyper(3 - 1, 10, 37331 - 10, 150, lower.tail=F)
//! # Contingency Table Of Counts
//! #_________________________________________
//! #           |  in -b       | not in -b    |
//! #     in -a | 3            | 7            |
//! # not in -a | 147          | 37174        |
//! #_________________________________________
//! # p-values for fisher's exact test
//! left    right   two-tail    ratio
//! 1   8.1e-06 8.1e-06 106.5
//! ```

use crate::core::ReportParseError;
use std::fmt;

/// Reports shorter than this are treated as truncated
pub const MIN_REPORT_LINES: usize = 14;

/// 2x2 contingency counts: `a` is the region file, `b` the family file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContingencyTable {
    pub a1_b1: u64,
    pub a1_b0: u64,
    pub a0_b1: u64,
    pub a0_b0: u64,
}

/// A p-value or ratio as printed by the primitive
///
/// `value` drives the tail-swap comparison; `text` is what the report
/// prints, so tokens such as `8.1e-06` or `0.5000` pass through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistic {
    pub value: f64,
    pub text: String,
}

impl Statistic {
    /// Parse a token, keeping its original spelling
    pub fn parse(token: &str) -> Option<Self> {
        token.parse::<f64>().ok().map(|value| Self {
            value,
            text: token.to_string(),
        })
    }

    /// A statistic with no original token, printed with [`format_float`]
    pub fn from_value(value: f64) -> Self {
        Self {
            value,
            text: format_float(value),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One classified report line
#[derive(Debug, Clone, PartialEq)]
pub enum ReportLine {
    /// `in -a | <int> | <int>`
    InA(u64, u64),
    /// `not in -a | <int> | <int>`
    NotInA(u64, u64),
    /// `p_left p_right p_both ratio`
    Values([Statistic; 4]),
    /// Anything else
    Other,
}

/// Structured report before correction
#[derive(Debug, Clone, PartialEq)]
pub struct FisherReport {
    pub table: ContingencyTable,
    pub p_left: Statistic,
    pub p_right: Statistic,
    pub p_both: Statistic,
    pub ratio: Statistic,
}

/// Count lines the way `wc -l` would, plus a final unterminated line
pub fn count_lines(raw: &str) -> usize {
    let bytes = raw.as_bytes();
    let newlines = memchr::memchr_iter(b'\n', bytes).count();
    match bytes.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

fn parse_count_cells(line: &str) -> Result<(u64, u64), ReportParseError> {
    let mut cells = line.split('|').skip(1).map(str::trim);
    let mut next = || -> Result<u64, ReportParseError> {
        let value = cells.next().unwrap_or("");
        value.parse().map_err(|_| ReportParseError::InvalidCount {
            line: line.to_string(),
            value: value.to_string(),
        })
    };
    Ok((next()?, next()?))
}

/// Classify a single report line
pub fn classify_line(line: &str) -> Result<ReportLine, ReportParseError> {
    // "not in -a" contains "in -a", so it must be tested first
    if line.contains("not in -a") {
        let (b1, b0) = parse_count_cells(line)?;
        return Ok(ReportLine::NotInA(b1, b0));
    }
    if line.contains("in -a") {
        let (b1, b0) = parse_count_cells(line)?;
        return Ok(ReportLine::InA(b1, b0));
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if let [p_left, p_right, p_both, ratio] = tokens.as_slice() {
        let parsed = (
            Statistic::parse(p_left),
            Statistic::parse(p_right),
            Statistic::parse(p_both),
            Statistic::parse(ratio),
        );
        if let (Some(p_left), Some(p_right), Some(p_both), Some(ratio)) = parsed {
            return Ok(ReportLine::Values([p_left, p_right, p_both, ratio]));
        }
    }

    Ok(ReportLine::Other)
}

/// Parse a complete report
///
/// The two contingency rows and the value line may appear in any order;
/// the first occurrence of each wins.
pub fn parse_fisher_report(raw: &str) -> Result<FisherReport, ReportParseError> {
    let found = count_lines(raw);
    if found < MIN_REPORT_LINES {
        return Err(ReportParseError::TooFewLines {
            expected: MIN_REPORT_LINES,
            found,
        });
    }

    let mut in_a = None;
    let mut not_in_a = None;
    let mut values = None;

    for line in raw.lines() {
        match classify_line(line)? {
            ReportLine::InA(b1, b0) => {
                in_a.get_or_insert((b1, b0));
            }
            ReportLine::NotInA(b1, b0) => {
                not_in_a.get_or_insert((b1, b0));
            }
            ReportLine::Values(v) => {
                values.get_or_insert(v);
            }
            ReportLine::Other => {}
        }
    }

    let (a1_b1, a1_b0) = in_a.ok_or(ReportParseError::MissingContingencyRow("in -a"))?;
    let (a0_b1, a0_b0) = not_in_a.ok_or(ReportParseError::MissingContingencyRow("not in -a"))?;
    let [p_left, p_right, p_both, ratio] = values.ok_or(ReportParseError::MissingDataLine)?;

    Ok(FisherReport {
        table: ContingencyTable {
            a1_b1,
            a1_b0,
            a0_b1,
            a0_b0,
        },
        p_left,
        p_right,
        p_both,
        ratio,
    })
}

impl FisherReport {
    /// Swap the one-tailed p-values when bedtools reports them reversed
    ///
    /// bedtools swaps left and right tails when the two-tailed p-value
    /// underflows. The heuristic only fires for enrichment (`ratio > 1`) with
    /// `p_right > p_left`; depletion is left alone, as is a ratio of exactly 1.
    /// Returns whether a swap happened.
    pub fn correct_tail_swap(&mut self) -> bool {
        if self.ratio.value > 1.0 && self.p_right.value > self.p_left.value {
            std::mem::swap(&mut self.p_left, &mut self.p_right);
            true
        } else {
            false
        }
    }
}

/// One row of the enrichment report
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyResult {
    /// Family label, used for ordering
    pub family: String,
    /// Sanitised identifier, printed in the `File` column
    pub identifier: String,
    pub table: ContingencyTable,
    pub p_left: Statistic,
    pub p_right: Statistic,
    pub p_both: Statistic,
    /// Ratio reported by bedtools, verbatim
    pub fold_enrichment: Statistic,
    /// `a1_b1 / (a1_b1 + a1_b0)`; NaN when both are zero
    pub overlap_fraction: f64,
}

impl FamilyResult {
    /// Build a result from an already-corrected report
    pub fn from_report(family: &str, identifier: &str, report: &FisherReport) -> Self {
        let table = report.table;
        let denominator = (table.a1_b1 + table.a1_b0) as f64;

        Self {
            family: family.to_string(),
            identifier: identifier.to_string(),
            table,
            p_left: report.p_left.clone(),
            p_right: report.p_right.clone(),
            p_both: report.p_both.clone(),
            fold_enrichment: report.ratio.clone(),
            overlap_fraction: table.a1_b1 as f64 / denominator,
        }
    }

    /// Tab-delimited report row
    pub fn to_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.identifier,
            self.table.a1_b1,
            self.table.a1_b0,
            self.table.a0_b1,
            self.table.a0_b0,
            self.p_left,
            self.p_right,
            self.p_both,
            self.fold_enrichment,
            format_float(self.overlap_fraction),
        )
    }
}

/// A family that produced no usable result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResult {
    pub family: String,
    pub identifier: String,
    pub reason: String,
}

impl fmt::Display for ErrorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\tERROR\t{}", self.identifier, self.reason)
    }
}

/// Result or error for one family
pub type FamilyOutcome = Result<FamilyResult, ErrorResult>;

/// Parse, correct and derive a family's row from raw report text
pub fn evaluate_report(raw: &str, family: &str, identifier: &str) -> FamilyOutcome {
    match parse_fisher_report(raw) {
        Ok(mut report) => {
            if report.correct_tail_swap() {
                log::debug!("{}: swapped left/right p-values", identifier);
            }
            Ok(FamilyResult::from_report(family, identifier, &report))
        }
        Err(e) => Err(ErrorResult {
            family: family.to_string(),
            identifier: identifier.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Format a derived float for the report
///
/// Shortest round-trip decimal, with exponent notation for magnitudes
/// below 1e-4. NaN prints as `NaN`, infinities as `inf`/`-inf`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if value != 0.0 && value.abs() < 1e-4 {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}
