//! TE-Enrich CLI entry point
//!
//! Fisher's exact test of TE family enrichment in genomic regions.

use anyhow::Context;
use clap::{ArgAction, Parser};
use te_enrich::core::{run_enrichment, BedtoolsFisher, EnrichmentConfig, EnrichmentInputs};
use te_enrich::formats::emit_report;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "te-enrich")]
#[command(about = "Test TE family enrichment in genomic regions with bedtools fisher")]
#[command(version)]
#[command(author = "TE-Enrich Contributors")]
struct Cli {
    /// Chromosome size file (first column: chromosome name)
    chrom_sizes: PathBuf,
    /// TE annotation BED file (4th column: TE family)
    te_bed: PathBuf,
    /// Region BED file to test for enrichment
    regions: PathBuf,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
    /// Output file (optional, stdout if not specified)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
    /// Number of threads (default: number of CPUs)
    #[arg(short = 't', long)]
    threads: Option<usize>,
    /// Minimum number of records a TE family needs to be tested
    #[arg(long = "min-family-size", default_value_t = te_enrich::MIN_FAMILY_SIZE)]
    min_family_size: usize,
    /// Per-family timeout for bedtools, in seconds (default: none)
    #[arg(long)]
    timeout: Option<u64>,
    /// bedtools executable
    #[arg(long, default_value = "bedtools")]
    bedtools: PathBuf,
    /// Directory for temporary working files (default: system temp dir)
    #[arg(long = "temp-dir")]
    temp_dir: Option<PathBuf>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let start = Instant::now();

    let inputs = EnrichmentInputs::new(cli.chrom_sizes, cli.te_bed, cli.regions);
    inputs.check_exist()?;

    let tester = BedtoolsFisher::new(cli.bedtools).with_timeout(cli.timeout.map(Duration::from_secs));
    tester.ensure_available()?;

    let mut config = EnrichmentConfig {
        min_family_size: cli.min_family_size,
        temp_dir: cli.temp_dir,
        ..Default::default()
    };
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }

    eprintln!(
        "Testing TE families in {:?} against {:?} ({} threads)",
        inputs.te_bed, inputs.regions, config.threads
    );
    let run = run_enrichment(&inputs, &config, &tester)?;

    let mut report: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let emitted = emit_report(run.outcomes, &mut report, &mut io::stderr().lock())
        .context("Failed to write report")?;

    let stats = run.stats;
    eprintln!("\n=== Enrichment Statistics ===");
    eprintln!("Chromosomes:         {}", stats.chromosomes);
    eprintln!("Genome lengths:      {} ({} duplicates dropped)", stats.genome_lengths, stats.genome_duplicates);
    eprintln!("TE rows kept:        {} / {}", stats.te.kept, stats.te.total);
    eprintln!("Region rows kept:    {} / {}", stats.regions.kept, stats.regions.total);
    eprintln!("Families seen:       {}", stats.families_seen);
    eprintln!("  - Below minimum:   {}", stats.families_below_threshold);
    eprintln!("  - Tested:          {}", stats.families_tested);
    eprintln!("  - Reported:        {}", emitted.reported);
    eprintln!("  - Failed:          {}", emitted.failed);
    eprintln!("Time elapsed:        {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
