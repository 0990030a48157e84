//! Input/output helpers
//!
//! Buffered readers that transparently decompress gzip/bzip2 inputs,
//! plus a line iterator that reuses its buffer.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read};
use std::path::Path;

/// Default buffer size for BufReader/BufWriter (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Compression format of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain text (uncompressed)
    Plain,
    /// Gzip compressed (.gz)
    Gzip,
    /// Bzip2 compressed (.bz2)
    Bzip2,
}

/// Detect compression format from file extension, falling back to magic bytes
pub fn detect_compression(path: &Path) -> io::Result<CompressionFormat> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    if extension == "gz" {
        return Ok(CompressionFormat::Gzip);
    }
    if extension == "bz2" {
        return Ok(CompressionFormat::Bzip2);
    }

    let mut file = File::open(path)?;
    let mut magic = [0u8; 3];
    let bytes_read = file.read(&mut magic)?;

    if bytes_read >= 2 && magic[0] == 0x1f && magic[1] == 0x8b {
        return Ok(CompressionFormat::Gzip);
    }
    // BZ2 magic: "BZh"
    if bytes_read >= 3 && magic[0] == 0x42 && magic[1] == 0x5a && magic[2] == 0x68 {
        return Ok(CompressionFormat::Bzip2);
    }

    Ok(CompressionFormat::Plain)
}

/// Open an input file as a buffered reader, decompressing if needed
pub fn open_input<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let format = detect_compression(path)?;
    let file = File::open(path)?;

    Ok(match format {
        CompressionFormat::Gzip => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            flate2::read::MultiGzDecoder::new(file),
        )),
        CompressionFormat::Bzip2 => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            bzip2::read::BzDecoder::new(file),
        )),
        CompressionFormat::Plain => Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file)),
    })
}

/// Create a buffered writer for an output file
pub fn create_buf_writer<P: AsRef<Path>>(path: P) -> io::Result<BufWriter<File>> {
    let file = File::create(path)?;
    Ok(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file))
}

/// True for blank lines and BED comment/header lines
pub fn is_skippable_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || starts_with_keyword(trimmed, "track")
        || starts_with_keyword(trimmed, "browser")
}

/// `keyword` as a whole word: followed by whitespace or the end of line
fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    line.strip_prefix(keyword)
        .map_or(false, |rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

/// Line iterator that reuses a buffer to avoid allocations
pub struct LineIterator<R: BufRead> {
    reader: R,
    buffer: String,
}

impl<R: BufRead> LineIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::with_capacity(1024),
        }
    }

    /// Read the next line into the internal buffer
    /// Returns None at EOF, Some(Ok(&str)) on success, Some(Err) on error
    pub fn next_line(&mut self) -> Option<io::Result<&str>> {
        self.buffer.clear();
        match self.reader.read_line(&mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                if self.buffer.ends_with('\n') {
                    self.buffer.pop();
                    if self.buffer.ends_with('\r') {
                        self.buffer.pop();
                    }
                }
                Some(Ok(&self.buffer))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_detect_plain() -> io::Result<()> {
        let mut temp = NamedTempFile::new()?;
        writeln!(temp, "chr1\t1000")?;
        temp.flush()?;
        assert_eq!(detect_compression(temp.path())?, CompressionFormat::Plain);
        Ok(())
    }

    #[test]
    fn test_detect_gzip_by_magic() -> io::Result<()> {
        let mut temp = NamedTempFile::new()?;
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"chr1\t1000\n")?;
        temp.write_all(&encoder.finish()?)?;
        temp.flush()?;
        assert_eq!(detect_compression(temp.path())?, CompressionFormat::Gzip);
        Ok(())
    }

    #[test]
    fn test_open_input_gzip_roundtrip() -> io::Result<()> {
        let mut temp = tempfile::Builder::new().suffix(".gz").tempfile()?;
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"chr1\t1000\nchr2\t2000\n")?;
        temp.write_all(&encoder.finish()?)?;
        temp.flush()?;

        let lines: Vec<String> = open_input(temp.path())?.lines().collect::<io::Result<_>>()?;
        assert_eq!(lines, vec!["chr1\t1000", "chr2\t2000"]);
        Ok(())
    }

    #[test]
    fn test_skippable_lines() {
        assert!(is_skippable_line(""));
        assert!(is_skippable_line("   "));
        assert!(is_skippable_line("# comment"));
        assert!(is_skippable_line("track name=x"));
        assert!(is_skippable_line("browser position chr1"));
        assert!(!is_skippable_line("chr1\t10\t20"));
    }

    #[test]
    fn test_header_keyword_must_be_whole_word() {
        assert!(is_skippable_line("track"));
        assert!(is_skippable_line("browser\thide all"));
        assert!(!is_skippable_line("trackA\t1\t2"));
        assert!(!is_skippable_line("browser_chr\t5\t9"));
    }

    #[test]
    fn test_line_iterator() -> io::Result<()> {
        let mut iter = LineIterator::new(&b"line1\r\nline2\nline3"[..]);
        assert_eq!(iter.next_line().unwrap()?, "line1");
        assert_eq!(iter.next_line().unwrap()?, "line2");
        assert_eq!(iter.next_line().unwrap()?, "line3");
        assert!(iter.next_line().is_none());
        Ok(())
    }
}
