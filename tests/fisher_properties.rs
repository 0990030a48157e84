//! Property tests for `bedtools fisher` report handling
//!
//! Covers the tail-swap correction, the derived overlap fraction and
//! rejection of truncated reports.

use proptest::prelude::*;
use te_enrich::core::ReportParseError;
use te_enrich::formats::fisher::{
    evaluate_report, parse_fisher_report, ContingencyTable, FamilyResult, FisherReport,
    Statistic, MIN_REPORT_LINES,
};

fn report_text(table: ContingencyTable, values: [f64; 4]) -> String {
    format!(
        "# Number of query intervals: {}\n\
         # Number of db intervals: {}\n\
         # Number of overlaps: {}\n\
         # Number of possible intervals (estimated): {}\n\
         # phyper({} - 1, {}, {} - {}, {}, lower.tail=F)\n\
         # Contingency Table Of Counts\n\
         #_________________________________________\n\
         #           |  in -b       | not in -b    |\n\
         #     in -a | {}            | {}            |\n\
         # not in -a | {}          | {}        |\n\
         #_________________________________________\n\
         # p-values for fisher's exact test\n\
         left\tright\ttwo-tail\tratio\n\
         {}\t{}\t{}\t{}\n",
        table.a1_b1 + table.a1_b0,
        table.a1_b1 + table.a0_b1,
        table.a1_b1,
        table.a1_b1 + table.a1_b0 + table.a0_b1 + table.a0_b0,
        table.a1_b1,
        table.a1_b1 + table.a1_b0,
        table.a1_b1 + table.a1_b0 + table.a0_b1 + table.a0_b0,
        table.a1_b1 + table.a1_b0,
        table.a1_b1 + table.a0_b1,
        table.a1_b1,
        table.a1_b0,
        table.a0_b1,
        table.a0_b0,
        values[0],
        values[1],
        values[2],
        values[3],
    )
}

fn table(a1_b1: u64, a1_b0: u64) -> ContingencyTable {
    ContingencyTable {
        a1_b1,
        a1_b0,
        a0_b1: 150,
        a0_b0: 37_000,
    }
}

fn arb_table() -> impl Strategy<Value = ContingencyTable> {
    (0u64..10_000, 0u64..10_000, 0u64..10_000, 0u64..1_000_000).prop_map(
        |(a1_b1, a1_b0, a0_b1, a0_b0)| ContingencyTable {
            a1_b1,
            a1_b0,
            a0_b1,
            a0_b0,
        },
    )
}

proptest! {
    /// Property: after correction an enriched family never has p_right > p_left
    #[test]
    fn prop_enriched_tails_ordered(
        p_left in 0.0f64..=1.0,
        p_right in 0.0f64..=1.0,
        ratio in 1.0001f64..1000.0
    ) {
        let mut report = FisherReport {
            table: table(10, 40),
            p_left: Statistic::from_value(p_left),
            p_right: Statistic::from_value(p_right),
            p_both: Statistic::from_value(0.5),
            ratio: Statistic::from_value(ratio),
        };
        report.correct_tail_swap();
        prop_assert!(report.p_right.value <= report.p_left.value);
        prop_assert_eq!(report.p_left.value.max(report.p_right.value), p_left.max(p_right));
    }

    /// Property: depleted or neutral families are never swapped
    #[test]
    fn prop_depleted_never_swapped(
        p_left in 0.0f64..=1.0,
        p_right in 0.0f64..=1.0,
        ratio in 0.0f64..=1.0
    ) {
        let mut report = FisherReport {
            table: table(10, 40),
            p_left: Statistic::from_value(p_left),
            p_right: Statistic::from_value(p_right),
            p_both: Statistic::from_value(0.5),
            ratio: Statistic::from_value(ratio),
        };
        prop_assert!(!report.correct_tail_swap());
        prop_assert_eq!(report.p_left.value, p_left);
        prop_assert_eq!(report.p_right.value, p_right);
    }

    /// Property: contingency counts survive the text report unchanged
    #[test]
    fn prop_counts_parsed(t in arb_table()) {
        let parsed = parse_fisher_report(&report_text(t, [1.0, 0.5, 0.5, 1.0])).unwrap();
        prop_assert_eq!(parsed.table, t);
    }

    /// Property: overlap fraction is a1_b1 / (a1_b1 + a1_b0), NaN when undefined
    #[test]
    fn prop_overlap_fraction(t in arb_table()) {
        let one = Statistic::from_value(1.0);
        let report = FisherReport {
            table: t,
            p_left: one.clone(),
            p_right: one.clone(),
            p_both: one.clone(),
            ratio: one,
        };
        let result = FamilyResult::from_report("F", "F", &report);
        if t.a1_b1 + t.a1_b0 == 0 {
            prop_assert!(result.overlap_fraction.is_nan());
        } else {
            prop_assert!((0.0..=1.0).contains(&result.overlap_fraction));
            prop_assert_eq!(result.overlap_fraction, t.a1_b1 as f64 / (t.a1_b1 + t.a1_b0) as f64);
        }
    }

    /// Property: any report truncated below the minimum line count is rejected
    #[test]
    fn prop_truncated_rejected(keep in 0usize..MIN_REPORT_LINES) {
        let full = report_text(table(10, 40), [0.0001, 0.9, 0.0002, 2.5]);
        let truncated: String = full.lines().take(keep).map(|l| format!("{}\n", l)).collect();
        let is_too_short = matches!(
            parse_fisher_report(&truncated),
            Err(ReportParseError::TooFewLines { .. })
        );
        prop_assert!(is_too_short);
    }
}

#[test]
fn test_swap_correction_example() {
    let raw = report_text(table(10, 40), [0.0001, 0.9, 0.0002, 2.5]);
    let result = evaluate_report(&raw, "AluY", "AluY").unwrap();
    assert_eq!(result.p_left.value, 0.9);
    assert_eq!(result.p_right.value, 0.0001);
    assert_eq!(result.fold_enrichment.value, 2.5);
}

#[test]
fn test_no_swap_when_depleted_example() {
    let raw = report_text(table(10, 40), [0.0001, 0.9, 0.0002, 0.5]);
    let result = evaluate_report(&raw, "AluY", "AluY").unwrap();
    assert_eq!(result.p_left.value, 0.0001);
    assert_eq!(result.p_right.value, 0.9);
}

#[test]
fn test_overlap_fraction_example() {
    let raw = report_text(table(10, 40), [1.0, 0.01, 0.02, 3.0]);
    let result = evaluate_report(&raw, "AluY", "AluY").unwrap();
    assert_eq!(result.overlap_fraction, 0.2);
}

#[test]
fn test_malformed_is_error_result() {
    let raw = "***** ERROR: Unrecognized parameter\n";
    let err = evaluate_report(raw, "L1:LINE", "L1_LINE").unwrap_err();
    assert_eq!(err.family, "L1:LINE");
    assert_eq!(err.identifier, "L1_LINE");
    assert!(err.to_string().contains("ERROR"));
}

#[test]
fn test_infinite_ratio_parsed() {
    let raw = report_text(table(10, 0), [1.0, 0.001, 0.001, f64::INFINITY]);
    let result = evaluate_report(&raw, "X", "X").unwrap();
    assert!(result.fold_enrichment.value.is_infinite());
    assert_eq!(result.overlap_fraction, 1.0);
}
