//! File format adapters
//!
//! Readers for chromosome-size and BED-like inputs, the `bedtools fisher`
//! report parser, and the tab-delimited enrichment report.

pub mod bed;
pub mod chrom_sizes;
pub mod fisher;
pub mod report;

pub use bed::{filter_to_chromosomes, FilterStats, IntervalRecord};
pub use chrom_sizes::{build_chromosome_set, build_genome_sizes, ChromosomeSet, GenomeSizes};
pub use fisher::{
    evaluate_report, parse_fisher_report, ContingencyTable, ErrorResult, FamilyOutcome, FamilyResult,
    FisherReport, Statistic,
};
pub use report::{emit_report, EmitStats, REPORT_HEADER};
