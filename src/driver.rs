//! Corpus driver
//!
//! Walks the requested paths, extracts every filing, and streams one row per
//! successful filing. A failing filing is logged with its cause chain and
//! skipped; it never emits a partial row and never stops the batch.

use crate::filing::extract_file;
use crate::output::{OutputFormat, RowWriter};
use crate::{Error, Result};
use std::error::Error as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub format: OutputFormat,
    /// Scanned one level deep when no paths are given
    pub data_root: PathBuf,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            data_root: PathBuf::from("data"),
        }
    }
}

impl ExtractorConfig {
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_data_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.data_root = root.into();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub written: usize,
    pub failed: usize,
}

pub struct Extractor<W: Write> {
    writer: RowWriter<W>,
    config: ExtractorConfig,
    failed: usize,
}

impl<W: Write> Extractor<W> {
    pub fn new(out: W, config: ExtractorConfig) -> Result<Self> {
        Ok(Self {
            writer: RowWriter::new(out, config.format)?,
            config,
            failed: 0,
        })
    }

    /// Processes each path (directories one level deep), or every
    /// subdirectory of the data root when `paths` is empty.
    pub fn run(&mut self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            let root = self.config.data_root.clone();
            return self.process_data_root(&root);
        }
        for path in paths {
            self.process_path(path)?;
        }
        Ok(())
    }

    pub fn process_path(&mut self, path: &Path) -> Result<()> {
        if path.is_dir() {
            self.process_dir(path)
        } else {
            self.process_file(path)
        }
    }

    pub fn process_data_root(&mut self, root: &Path) -> Result<()> {
        for dir in sorted_entries(root)? {
            if dir.is_dir() {
                self.process_dir(&dir)?;
            }
        }
        Ok(())
    }

    /// Immediate children only; subdirectories are skipped.
    pub fn process_dir(&mut self, dir: &Path) -> Result<()> {
        info!(dir = %dir.display(), "processing directory");
        for path in sorted_entries(dir)? {
            if path.is_dir() {
                debug!(path = %path.display(), "skipping subdirectory");
                continue;
            }
            self.process_file(&path)?;
        }
        Ok(())
    }

    /// Extraction failures are logged and counted; only output errors are
    /// returned.
    pub fn process_file(&mut self, path: &Path) -> Result<()> {
        match extract_file(path) {
            Ok(row) => self.writer.write_row(&row),
            Err(err) => {
                self.failed += 1;
                log_failure(path, &err);
                Ok(())
            }
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            written: self.writer.rows_written(),
            failed: self.failed,
        }
    }

    pub fn finish(self) -> Result<(RunSummary, W)> {
        let summary = self.summary();
        let out = self.writer.into_inner()?;
        Ok((summary, out))
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        match entry {
            Ok(entry) => entries.push(entry.path()),
            Err(err) => warn!(dir = %dir.display(), error = %err, "unreadable directory entry"),
        }
    }
    entries.sort();
    Ok(entries)
}

fn log_failure(path: &Path, err: &Error) {
    error!(path = %path.display(), error = %err, "failed to process filing");
    let mut source = err.source();
    while let Some(cause) = source {
        error!(cause = %cause, "caused by");
        source = cause.source();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const LEGACY: &str = r#"<xbrl xmlns="http://www.xbrl.org/2003/instance"
      xmlns:pt="http://www.xbrl.org/uk/fr/gaap/pt/2004-12-01"
      xmlns:gcd="http://www.xbrl.org/uk/fr/gcd/2004-12-01">
  <context id="c1">
    <entity><identifier scheme="http://www.companieshouse.gov.uk/">1234567</identifier></entity>
    <period><instant>2012-03-31</instant></period>
  </context>
  <gcd:EntityCurrentLegalName>Acme Limited</gcd:EntityCurrentLegalName>
  <pt:TurnoverGrossOperatingRevenue contextRef="c1" scale="3">1,234</pt:TurnoverGrossOperatingRevenue>
</xbrl>"#;

    fn run_batch(paths: &[PathBuf], config: ExtractorConfig) -> (RunSummary, Vec<String>) {
        let mut extractor = Extractor::new(Vec::new(), config).unwrap();
        extractor.run(paths).unwrap();
        let (summary, out) = extractor.finish().unwrap();
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        (summary, lines)
    }

    #[test]
    fn test_bad_file_does_not_stop_the_batch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Prod224_0001_1111111_20120331.xml"), "<xbrl><broken").unwrap();
        fs::write(dir.path().join("Prod224_1234567_20120331.xml"), LEGACY).unwrap();

        let (summary, lines) = run_batch(&[dir.path().to_path_buf()], ExtractorConfig::default());

        assert_eq!(summary, RunSummary { written: 1, failed: 1 });
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("1234567,20120331,Acme Limited,"));
        assert!(lines[1].contains(",2012-03-31,2012-03-31,1234000.0,"));
    }

    #[test]
    fn test_unrecognised_names_produce_no_row() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("accounts.xml"), LEGACY).unwrap();

        let (summary, lines) = run_batch(&[dir.path().to_path_buf()], ExtractorConfig::default());
        assert_eq!(summary, RunSummary { written: 0, failed: 2 });
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_directories_are_not_recursed() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("Prod224_1234567_20120331.xml"), LEGACY).unwrap();

        let (summary, _) = run_batch(&[dir.path().to_path_buf()], ExtractorConfig::default());
        assert_eq!(summary, RunSummary::default());

        // passing the file directly still works
        let (summary, _) = run_batch(
            &[nested.join("Prod224_1234567_20120331.xml")],
            ExtractorConfig::default(),
        );
        assert_eq!(summary.written, 1);
    }

    #[test]
    fn test_data_root_scans_one_level_of_subdirectories() {
        let root = TempDir::new().unwrap();
        for batch in ["2012-03", "2012-04"] {
            let dir = root.path().join(batch);
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join(format!("Prod224_{}_20120331.xml", batch.replace('-', ""))), LEGACY).unwrap();
        }
        // loose files in the root itself are ignored
        fs::write(root.path().join("Prod224_9999999_20120331.xml"), LEGACY).unwrap();

        let config = ExtractorConfig::default().with_data_root(root.path());
        let (summary, lines) = run_batch(&[], config);

        assert_eq!(summary, RunSummary { written: 2, failed: 0 });
        assert!(lines[1].starts_with("201203,"));
        assert!(lines[2].starts_with("201204,"));
    }

    #[test]
    fn test_missing_data_root_is_fatal() {
        let root = TempDir::new().unwrap();
        let config = ExtractorConfig::default().with_data_root(root.path().join("absent"));
        let mut extractor = Extractor::new(Vec::new(), config).unwrap();
        assert!(matches!(extractor.run(&[]), Err(Error::Io(_))));
    }

    #[test]
    fn test_jsonl_rows() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Prod224_1234567_20120331.xml");
        fs::write(&file, LEGACY).unwrap();

        let config = ExtractorConfig::default().with_format(OutputFormat::Jsonl);
        let (summary, lines) = run_batch(&[file], config);
        assert_eq!(summary.written, 1);
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["registered_name"], "Acme Limited");
    }
}
