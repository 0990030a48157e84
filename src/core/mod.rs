//! Core enrichment functionality
//!
//! This module contains the error taxonomy, input helpers, family
//! partitioning, the overlap-test seam and the per-family driver.

pub mod enrichment;
mod error;
pub mod family;
pub mod io;
pub mod tester;

pub use enrichment::{
    run_enrichment, run_families, test_family, EnrichmentConfig, EnrichmentInputs, EnrichmentRun,
    RunStats, ScopedFile, WorkDir,
};
pub use error::{
    ConfigError, EnrichmentError, FamilyError, FamilyResultOf, ReportParseError, Result,
};
pub use family::{partition_by_family, sanitize_family_name, FamilyPartition, TeFamily, MIN_FAMILY_SIZE};
pub use io::{detect_compression, open_input, CompressionFormat, LineIterator, DEFAULT_BUFFER_SIZE};
pub use tester::{BedtoolsFisher, OverlapTester, RawReport};
