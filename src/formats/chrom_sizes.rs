//! Chromosome-size file reader
//!
//! The first whitespace-delimited token of every line names a chromosome.
//! The resulting set restricts every other input of the run. The second
//! token, when present, is the chromosome length handed to bedtools.

use crate::core::io::{create_buf_writer, is_skippable_line, open_input, LineIterator};
use std::collections::{BTreeMap, HashSet};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Set of chromosome names shared by all inputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChromosomeSet {
    names: HashSet<String>,
}

impl ChromosomeSet {
    /// Build a set from any iterator of names; duplicates collapse
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// O(1) membership test
    pub fn contains(&self, chrom: &str) -> bool {
        self.names.contains(chrom)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in ascending order
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Read a chromosome set from a reader
pub fn read_chromosome_set<R: BufRead>(reader: R) -> io::Result<ChromosomeSet> {
    let mut names = HashSet::new();
    let mut lines = LineIterator::new(reader);

    while let Some(line) = lines.next_line() {
        let line = line?;
        if is_skippable_line(line) {
            continue;
        }
        if let Some(name) = line.split_whitespace().next() {
            if !names.contains(name) {
                names.insert(name.to_string());
            }
        }
    }

    Ok(ChromosomeSet { names })
}

/// Build the chromosome set from a chromosome-size file
///
/// An empty result is returned as-is; callers treat it as a
/// configuration error.
pub fn build_chromosome_set<P: AsRef<Path>>(path: P) -> io::Result<ChromosomeSet> {
    read_chromosome_set(open_input(path)?)
}

/// One length per chromosome, as written to the genome file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenomeSizes {
    lengths: BTreeMap<String, u64>,
    /// Repeated names; the first length seen is kept
    pub duplicates: usize,
    /// Lines with a name but no integer length
    pub without_length: usize,
}

impl GenomeSizes {
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn length(&self, chrom: &str) -> Option<u64> {
        self.lengths.get(chrom).copied()
    }

    /// Write `name<TAB>length` lines in name order
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (name, length) in &self.lengths {
            writeln!(writer, "{}\t{}", name, length)?;
        }
        Ok(())
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut writer = create_buf_writer(path)?;
        self.write(&mut writer)?;
        writer.flush()
    }
}

/// Read chromosome lengths, collapsing repeated names
pub fn read_genome_sizes<R: BufRead>(reader: R) -> io::Result<GenomeSizes> {
    let mut sizes = GenomeSizes::default();
    let mut lines = LineIterator::new(reader);

    while let Some(line) = lines.next_line() {
        let line = line?;
        if is_skippable_line(line) {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let (Some(name), length) = (tokens.next(), tokens.next()) else {
            continue;
        };
        let Some(length) = length.and_then(|l| l.parse::<u64>().ok()) else {
            sizes.without_length += 1;
            continue;
        };
        if sizes.lengths.contains_key(name) {
            sizes.duplicates += 1;
            log::warn!("Chromosome {} listed more than once; keeping the first length", name);
        } else {
            sizes.lengths.insert(name.to_string(), length);
        }
    }

    Ok(sizes)
}

/// Read chromosome lengths from a chromosome-size file
pub fn build_genome_sizes<P: AsRef<Path>>(path: P) -> io::Result<GenomeSizes> {
    read_genome_sizes(open_input(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_token_only() {
        let set = read_chromosome_set(&b"chr1\t248956422\nchr2 242193529 extra\n"[..]).unwrap();
        assert_eq!(set.sorted_names(), vec!["chr1", "chr2"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = read_chromosome_set(&b"chr1\t10\nchr1\t20\nchrX\t5\n"[..]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("chr1"));
        assert!(set.contains("chrX"));
        assert!(!set.contains("chr2"));
    }

    #[test]
    fn test_blank_and_comment_lines_ignored() {
        let set = read_chromosome_set(&b"# header\n\nchr3\t100\n"[..]).unwrap();
        assert_eq!(set.sorted_names(), vec!["chr3"]);
    }

    #[test]
    fn test_empty_input() {
        let set = read_chromosome_set(&b""[..]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(build_chromosome_set("/definitely/not/here.sizes").is_err());
    }

    #[test]
    fn test_genome_sizes_keep_first_length() {
        let sizes = read_genome_sizes(&b"chr2\t500\nchr1\t1000\nchr1\t2000\n"[..]).unwrap();
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes.length("chr1"), Some(1000));
        assert_eq!(sizes.duplicates, 1);

        let mut out = Vec::new();
        sizes.write(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "chr1\t1000\nchr2\t500\n");
    }

    #[test]
    fn test_genome_sizes_names_only() {
        let sizes = read_genome_sizes(&b"chr1\nchr2\nchr3\tlong\n"[..]).unwrap();
        assert!(sizes.is_empty());
        assert_eq!(sizes.without_length, 3);
    }
}
