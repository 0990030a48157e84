//! Enrichment driver
//!
//! Restricts the three inputs to a shared chromosome set, partitions the TE
//! rows by family and runs the overlap test once per family. Families are
//! independent: one failing never stops the others.

use super::error::{ConfigError, EnrichmentError, FamilyError, Result};
use super::family::{partition_by_family, TeFamily, MIN_FAMILY_SIZE};
use super::tester::OverlapTester;
use crate::formats::bed::{filter_to_chromosomes, write_records_to, FilterStats};
use crate::formats::chrom_sizes::{build_chromosome_set, build_genome_sizes};
use crate::formats::fisher::{evaluate_report, ErrorResult, FamilyOutcome};
use crate::formats::report::sort_outcomes;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Paths of the three inputs
#[derive(Debug, Clone)]
pub struct EnrichmentInputs {
    pub chrom_sizes: PathBuf,
    pub te_bed: PathBuf,
    pub regions: PathBuf,
}

impl EnrichmentInputs {
    pub fn new<P: Into<PathBuf>>(chrom_sizes: P, te_bed: P, regions: P) -> Self {
        Self {
            chrom_sizes: chrom_sizes.into(),
            te_bed: te_bed.into(),
            regions: regions.into(),
        }
    }

    /// Fail with a configuration error if any input is missing
    pub fn check_exist(&self) -> std::result::Result<(), ConfigError> {
        for (role, path) in [
            ("Chromosome size", &self.chrom_sizes),
            ("TE BED", &self.te_bed),
            ("Region BED", &self.regions),
        ] {
            if !path.is_file() {
                return Err(ConfigError::MissingInput {
                    role,
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Run settings
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Families with fewer rows are skipped
    pub min_family_size: usize,
    /// Worker threads; 1 runs families sequentially
    pub threads: usize,
    /// Parent of the run's working directory (system temp dir if `None`)
    pub temp_dir: Option<PathBuf>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            min_family_size: MIN_FAMILY_SIZE,
            threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            temp_dir: None,
        }
    }
}

/// Counters for the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub chromosomes: usize,
    /// Chromosomes written to the genome file
    pub genome_lengths: usize,
    /// Repeated chromosome lines dropped from the genome file
    pub genome_duplicates: usize,
    pub te: FilterStats,
    pub regions: FilterStats,
    /// Distinct family labels among the filtered TE rows
    pub families_seen: usize,
    pub families_tested: usize,
    pub families_below_threshold: usize,
    pub te_rows_without_family: usize,
    pub families_failed: usize,
}

/// Outcomes of a run, sorted by family name
#[derive(Debug)]
pub struct EnrichmentRun {
    pub outcomes: Vec<FamilyOutcome>,
    pub stats: RunStats,
}

/// The run's scoped working directory
///
/// Holds the filtered genome and region files for the whole run; dropping it
/// removes everything inside.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
    genome: PathBuf,
    regions: PathBuf,
}

impl WorkDir {
    /// Create an empty working directory under `parent`
    pub fn create(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("te-enrich-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| EnrichmentError::io(parent.unwrap_or(&std::env::temp_dir()), e))?;

        let genome = dir.path().join("genome.txt");
        let regions = dir.path().join("regions.bed");
        Ok(Self { dir, genome, regions })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn genome(&self) -> &Path {
        &self.genome
    }

    pub fn regions(&self) -> &Path {
        &self.regions
    }

    /// Working file name for a family; the ordinal keeps colliding
    /// identifiers apart
    pub fn family_path(&self, family: &TeFamily) -> PathBuf {
        self.dir
            .path()
            .join(format!("{:05}_{}.bed", family.ordinal, family.identifier))
    }
}

/// A file removed when dropped, on every exit path
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Materialise, test and evaluate one family
///
/// The working file is removed before returning, whatever the outcome.
pub fn test_family<T: OverlapTester + ?Sized>(
    family: &TeFamily,
    work: &WorkDir,
    tester: &T,
) -> FamilyOutcome {
    let failure = |reason: String| ErrorResult {
        family: family.name.clone(),
        identifier: family.identifier.clone(),
        reason,
    };

    let working = ScopedFile::new(work.family_path(family));
    if let Err(source) = write_records_to(working.path(), &family.records) {
        let e = FamilyError::WorkingFile {
            path: working.path().to_path_buf(),
            source,
        };
        log::error!("{}: {}", family.identifier, e);
        return Err(failure(e.to_string()));
    }

    let raw = tester.run_overlap_test(work.genome(), work.regions(), working.path());
    drop(working);

    match raw {
        Ok(raw) => {
            if !raw.stderr.trim().is_empty() {
                log::debug!("{} stderr: {}", family.identifier, raw.stderr.trim());
            }
            let outcome = evaluate_report(&raw.stdout, &family.name, &family.identifier);
            if let Err(e) = &outcome {
                log::error!("{}: {}", family.identifier, e.reason);
            }
            outcome
        }
        Err(e) => {
            log::error!("{}: {}", family.identifier, e);
            Err(failure(e.to_string()))
        }
    }
}

/// Test every family, sequentially or on a bounded worker pool
pub fn run_families<T: OverlapTester + ?Sized>(
    families: &[TeFamily],
    work: &WorkDir,
    tester: &T,
    threads: usize,
) -> Result<Vec<FamilyOutcome>> {
    if threads == 0 {
        return Err(ConfigError::ZeroThreads.into());
    }

    let mut outcomes: Vec<FamilyOutcome> = if threads > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| EnrichmentError::ThreadPool(e.to_string()))?;
        pool.install(|| {
            families
                .par_iter()
                .map(|family| test_family(family, work, tester))
                .collect()
        })
    } else {
        families
            .iter()
            .map(|family| test_family(family, work, tester))
            .collect()
    };

    sort_outcomes(&mut outcomes);
    Ok(outcomes)
}

/// Run the full enrichment analysis
///
/// All temporary files live in a [`WorkDir`] that is removed before this
/// function returns, on success and on error.
pub fn run_enrichment<T: OverlapTester + ?Sized>(
    inputs: &EnrichmentInputs,
    config: &EnrichmentConfig,
    tester: &T,
) -> Result<EnrichmentRun> {
    inputs.check_exist()?;
    if config.threads == 0 {
        return Err(ConfigError::ZeroThreads.into());
    }

    let mut stats = RunStats::default();

    let chroms = build_chromosome_set(&inputs.chrom_sizes)
        .map_err(|e| EnrichmentError::io(&inputs.chrom_sizes, e))?;
    if chroms.is_empty() {
        return Err(ConfigError::NoChromosomes(inputs.chrom_sizes.clone()).into());
    }
    stats.chromosomes = chroms.len();
    log::info!("{} chromosomes in {}", chroms.len(), inputs.chrom_sizes.display());

    let genome = build_genome_sizes(&inputs.chrom_sizes)
        .map_err(|e| EnrichmentError::io(&inputs.chrom_sizes, e))?;
    if genome.is_empty() {
        return Err(ConfigError::NoChromosomeSizes(inputs.chrom_sizes.clone()).into());
    }
    if genome.without_length > 0 {
        log::warn!(
            "{} lines in {} have no length and are left out of the genome file",
            genome.without_length,
            inputs.chrom_sizes.display()
        );
    }
    stats.genome_lengths = genome.len();
    stats.genome_duplicates = genome.duplicates;

    let work = WorkDir::create(config.temp_dir.as_deref())?;
    log::debug!("Working directory: {}", work.path().display());

    genome.write_to(work.genome()).map_err(|e| EnrichmentError::io(work.genome(), e))?;

    let (regions, region_stats) = filter_to_chromosomes(&inputs.regions, &chroms)
        .map_err(|e| EnrichmentError::io(&inputs.regions, e))?;
    write_records_to(work.regions(), &regions).map_err(|e| EnrichmentError::io(work.regions(), e))?;
    log_filter("Region", &inputs.regions, &region_stats);
    if regions.is_empty() {
        log::warn!("No region rows left after chromosome filtering");
    }
    stats.regions = region_stats;

    let (te_rows, te_stats) = filter_to_chromosomes(&inputs.te_bed, &chroms)
        .map_err(|e| EnrichmentError::io(&inputs.te_bed, e))?;
    log_filter("TE", &inputs.te_bed, &te_stats);
    stats.te = te_stats;

    let partition = partition_by_family(te_rows, config.min_family_size);
    stats.te_rows_without_family = partition.missing_family;
    stats.families_below_threshold = partition.below_threshold.len();
    stats.families_seen = partition.retained.len() + partition.below_threshold.len();
    let families = partition.families();
    stats.families_tested = families.len();
    log::info!(
        "Testing {} of {} families ({} below {} records)",
        stats.families_tested,
        stats.families_seen,
        stats.families_below_threshold,
        config.min_family_size
    );

    let outcomes = run_families(&families, &work, tester, config.threads)?;
    stats.families_failed = outcomes.iter().filter(|o| o.is_err()).count();

    Ok(EnrichmentRun { outcomes, stats })
}

fn log_filter(role: &str, path: &Path, stats: &FilterStats) {
    log::info!(
        "{} {}: {} rows, {} kept, {} on other chromosomes, {} malformed",
        role,
        path.display(),
        stats.total,
        stats.kept,
        stats.off_set,
        stats.malformed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FamilyResultOf;
    use crate::core::tester::RawReport;
    use crate::formats::bed::IntervalRecord;

    struct FailingTester;

    impl OverlapTester for FailingTester {
        fn run_overlap_test(&self, _: &Path, _: &Path, subject: &Path) -> FamilyResultOf<RawReport> {
            assert!(subject.exists());
            Err(FamilyError::Io(std::io::Error::new(std::io::ErrorKind::Other, "no engine")))
        }
    }

    fn family(name: &str, ordinal: usize) -> TeFamily {
        TeFamily {
            name: name.to_string(),
            identifier: name.replace('/', "_"),
            ordinal,
            records: vec![IntervalRecord::parse("chr1\t1\t10\tX").unwrap()],
        }
    }

    #[test]
    fn test_family_path_uses_ordinal() {
        let work = WorkDir::create(None).unwrap();
        let path = work.family_path(&family("DNA/hAT", 7));
        assert_eq!(path.file_name().unwrap(), "00007_DNA_hAT.bed");
        assert!(path.starts_with(work.path()));
    }

    #[test]
    fn test_workdir_removed_on_drop() {
        let work = WorkDir::create(None).unwrap();
        let path = work.path().to_path_buf();
        std::fs::write(work.genome(), "chr1\t100\n").unwrap();
        assert!(path.exists());
        drop(work);
        assert!(!path.exists());
    }

    #[test]
    fn test_scoped_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.bed");
        {
            let scoped = ScopedFile::new(path.clone());
            std::fs::write(scoped.path(), "x").unwrap();
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_failure_is_error_result_and_file_removed() {
        let work = WorkDir::create(None).unwrap();
        let fam = family("AluY", 0);
        let outcome = test_family(&fam, &work, &FailingTester);
        let err = outcome.unwrap_err();
        assert_eq!(err.identifier, "AluY");
        assert!(err.reason.contains("no engine"));
        assert!(!work.family_path(&fam).exists());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let work = WorkDir::create(None).unwrap();
        let result = run_families(&[], &work, &FailingTester, 0);
        assert!(matches!(result, Err(EnrichmentError::Config(ConfigError::ZeroThreads))));
    }

    #[test]
    fn test_missing_input_detected() {
        let inputs = EnrichmentInputs::new("/no/sizes", "/no/te.bed", "/no/regions.bed");
        let err = inputs.check_exist().unwrap_err();
        assert!(matches!(err, ConfigError::MissingInput { role: "Chromosome size", .. }));
    }
}
