//! BED-like interval reading and chromosome filtering
//!
//! Rows are split on whitespace. Only the chromosome and start fields are
//! interpreted; every field is kept verbatim for writing back out.

use super::chrom_sizes::ChromosomeSet;
use crate::core::io::{create_buf_writer, is_skippable_line, open_input, LineIterator};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// A parsed BED-like row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalRecord {
    /// Chromosome name (field 1)
    pub chrom: String,
    /// Start position (field 2)
    pub start: u64,
    /// End position (field 3), when present and numeric
    pub end: Option<u64>,
    /// All fields verbatim, including the three above
    fields: Vec<String>,
}

/// Why a row was rejected by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedRow {
    TooFewFields,
    InvalidStart,
}

impl IntervalRecord {
    /// Parse one row. Start must be a non-negative integer; start <= end
    /// is not checked.
    pub fn parse(line: &str) -> Result<Self, MalformedRow> {
        let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if fields.len() < 2 {
            return Err(MalformedRow::TooFewFields);
        }

        let start = fields[1].parse().map_err(|_| MalformedRow::InvalidStart)?;
        let end = fields.get(2).and_then(|f| f.parse().ok());

        Ok(Self {
            chrom: fields[0].clone(),
            start,
            end,
            fields,
        })
    }

    /// Get a field by 0-based index
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// TE family name (field 4)
    pub fn family(&self) -> Option<&str> {
        self.field(3)
    }

    /// Tab-joined fields
    pub fn to_line(&self) -> String {
        self.fields.join("\t")
    }
}

/// Filtering statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Data rows read (comments and blank lines excluded)
    pub total: usize,
    /// Rows kept
    pub kept: usize,
    /// Rows on a chromosome absent from the set
    pub off_set: usize,
    /// Rows skipped as malformed
    pub malformed: usize,
}

/// Sort rows by (chromosome, start), keeping file order among ties
pub fn sort_records(records: &mut [IntervalRecord]) {
    records.sort_by(|a, b| a.chrom.cmp(&b.chrom).then(a.start.cmp(&b.start)));
}

/// Read, sort and restrict rows from a reader to the chromosome set
///
/// Malformed rows (fewer than two fields, non-integer start) are skipped
/// and counted rather than failing the run.
pub fn filter_reader<R: BufRead>(
    reader: R,
    chroms: &ChromosomeSet,
) -> io::Result<(Vec<IntervalRecord>, FilterStats)> {
    let mut stats = FilterStats::default();
    let mut records = Vec::new();
    let mut lines = LineIterator::new(reader);

    while let Some(line) = lines.next_line() {
        let line = line?;
        if is_skippable_line(line) {
            continue;
        }
        stats.total += 1;

        match IntervalRecord::parse(line) {
            Ok(record) => records.push(record),
            Err(reason) => {
                log::debug!("Skipping malformed row ({:?}): {}", reason, line);
                stats.malformed += 1;
            }
        }
    }

    sort_records(&mut records);
    records.retain(|r| chroms.contains(&r.chrom));

    stats.kept = records.len();
    stats.off_set = stats.total - stats.malformed - stats.kept;
    Ok((records, stats))
}

/// Read, sort and restrict an interval file to the chromosome set
pub fn filter_to_chromosomes<P: AsRef<Path>>(
    input: P,
    chroms: &ChromosomeSet,
) -> io::Result<(Vec<IntervalRecord>, FilterStats)> {
    filter_reader(open_input(input)?, chroms)
}

/// Write rows tab-delimited, one per line
pub fn write_records<W: Write>(writer: &mut W, records: &[IntervalRecord]) -> io::Result<()> {
    for record in records {
        writeln!(writer, "{}", record.to_line())?;
    }
    Ok(())
}

/// Write rows to a new file
pub fn write_records_to<P: AsRef<Path>>(path: P, records: &[IntervalRecord]) -> io::Result<()> {
    let mut writer = create_buf_writer(path)?;
    write_records(&mut writer, records)?;
    writer.flush()
}
