//! TE-Enrich - transposable-element family enrichment
//!
//! Tests whether TE families overlap a set of genomic regions more (or less)
//! than expected, running `bedtools fisher` once per family.
//!
//! # Pipeline
//!
//! - Restrict the TE, region and chromosome-size inputs to the chromosomes
//!   named in the size file, sorted by (chromosome, start)
//! - Group TE rows by family (4th column), skipping small families
//! - Run the overlap test per family, in parallel with rayon
//! - Parse each report, correct the bedtools tail swap and write one row
//!   per family
//!
//! # Example
//!
//! ```ignore
//! use te_enrich::{run_enrichment, BedtoolsFisher, EnrichmentConfig, EnrichmentInputs};
//!
//! let inputs = EnrichmentInputs::new("hg38.sizes", "rmsk.bed", "peaks.bed");
//! let tester = BedtoolsFisher::new("bedtools");
//! let run = run_enrichment(&inputs, &EnrichmentConfig::default(), &tester)?;
//! te_enrich::emit_report(run.outcomes, &mut std::io::stdout(), &mut std::io::stderr())?;
//! ```

pub mod core;
pub mod formats;

// Re-export commonly used types
pub use core::{
    run_enrichment, BedtoolsFisher, ConfigError, EnrichmentConfig, EnrichmentError,
    EnrichmentInputs, EnrichmentRun, FamilyError, OverlapTester, RawReport, RunStats,
    MIN_FAMILY_SIZE,
};
pub use formats::{emit_report, ChromosomeSet, FamilyOutcome, FamilyResult, IntervalRecord, REPORT_HEADER};
