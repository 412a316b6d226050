//! Vendor readers and the dispatcher that runs them over a directory.
//!
//! Each reader knows the file it needs, how its headers carry sample
//! names and which columns hold which intensity kind. The heavy lifting
//! shared by all of them lives in [`assembler`].

pub mod assembler;
pub mod maxquant;
pub mod spectronaut;

use crate::config::{ConfigError, ReaderConfig, RunConfig};
use crate::design::{AnalysisDesign, CollisionPolicy, NamingError};
use crate::io::numeric::DecimalConvention;
use crate::io::sniffer::SniffError;
use crate::matrix::{IntensityKind, IntensityMatrix};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use maxquant::MaxQuantReader;
pub use spectronaut::SpectronautReader;

#[derive(Error, Debug)]
pub enum ReaderError {
    /// The directory does not hold this reader's input.
    #[error("{reader} not applicable: {reason}")]
    InputNotApplicable { reader: String, reason: String },

    #[error("Naming error: {0}")]
    Naming(#[from] NamingError),

    #[error("Input error: {0}")]
    Sniff(SniffError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing required column '{column}' in {}", .path.display())]
    MissingColumn { column: String, path: PathBuf },
}

impl ReaderError {
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, ReaderError::InputNotApplicable { .. })
    }

    /// Wrap a sniffing failure, downgrading "wrong input" to
    /// [`ReaderError::InputNotApplicable`].
    pub fn from_sniff(reader: &str, err: SniffError) -> Self {
        if err.is_not_applicable() {
            ReaderError::InputNotApplicable {
                reader: reader.to_string(),
                reason: err.to_string(),
            }
        } else {
            ReaderError::Sniff(err)
        }
    }
}

/// Per-invocation options shared by every reader.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Keep values the vendor marks as not identified.
    pub use_imputed: bool,
    /// Rename duplicated row identifiers with `_1`, `_2`, ...
    pub resolve_duplicate_ids: bool,
    pub collision_policy: CollisionPolicy,
    /// `None` sniffs the convention from the data.
    pub decimal: Option<DecimalConvention>,
    pub kinds: Vec<IntensityKind>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            use_imputed: false,
            resolve_duplicate_ids: true,
            collision_policy: CollisionPolicy::Strict,
            decimal: None,
            kinds: IntensityKind::ALL.to_vec(),
        }
    }
}

impl ReadOptions {
    pub fn wants(&self, kind: IntensityKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Everything one reader produced for a directory.
#[derive(Debug, Clone)]
pub struct ReaderData {
    pub sample_names: Vec<String>,
    /// Column the matrices are indexed by.
    pub id_column: String,
    pub design: AnalysisDesign,
    pub matrices: IndexMap<IntensityKind, IntensityMatrix>,
    pub source: PathBuf,
}

pub trait Reader {
    /// Section name in the run configuration.
    fn name(&self) -> &'static str;

    /// Files this reader looks for, for diagnostics.
    fn required_files(&self) -> &'static [&'static str];

    fn read(&self, start_dir: &Path, config: &mut ReaderConfig, options: &ReadOptions) -> Result<ReaderData, ReaderError>;
}

/// All readers, in the order they are tried.
pub fn registry() -> Vec<Box<dyn Reader>> {
    vec![Box::new(SpectronautReader::new()), Box::new(MaxQuantReader::new())]
}

/// Run every applicable reader over `start_dir`.
///
/// Readers whose input is absent are skipped. Their stored
/// [`ReaderConfig`] is written back into `run_config` on success; saving
/// the file is left to the caller.
///
/// # Arguments
///
/// * `start_dir` - The data directory.
/// * `run_config` - The loaded run configuration, updated in place.
/// * `options` - Options shared by every reader.
///
/// # Returns
///
/// * `Result<IndexMap<String, ReaderData>, ReaderError>` - The data of each
///   reader that applied, keyed by reader name in registry order. A
///   structural error in any accepted file aborts the whole run.
pub fn read_data(
    start_dir: &Path,
    run_config: &mut RunConfig,
    options: &ReadOptions,
) -> Result<IndexMap<String, ReaderData>, ReaderError> {
    read_with(&registry(), start_dir, run_config, options)
}

pub fn read_with(
    readers: &[Box<dyn Reader>],
    start_dir: &Path,
    run_config: &mut RunConfig,
    options: &ReadOptions,
) -> Result<IndexMap<String, ReaderData>, ReaderError> {
    let mut results = IndexMap::new();

    for reader in readers {
        let mut reader_config = run_config.reader_config(reader.name())?;
        match reader.read(start_dir, &mut reader_config, options) {
            Ok(data) => {
                info!(
                    "{} read {} samples from {}",
                    reader.name(),
                    data.sample_names.len(),
                    data.source.display()
                );
                run_config.set_reader_config(reader.name(), &reader_config)?;
                results.insert(reader.name().to_string(), data);
            }
            Err(e) if e.is_not_applicable() => {
                debug!("Skipping {}: {}", reader.name(), e);
            }
            Err(e) => return Err(e),
        }
    }

    if results.is_empty() {
        let expected: Vec<String> = readers
            .iter()
            .map(|r| format!("{}: {}", r.name(), r.required_files().join(", ")))
            .collect();
        warn!(
            "No reader could read {}. Expected one of [{}]",
            start_dir.display(),
            expected.join("; ")
        );
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    struct Failing;

    impl Reader for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn required_files(&self) -> &'static [&'static str] {
            &["nothing"]
        }
        fn read(&self, _: &Path, _: &mut ReaderConfig, _: &ReadOptions) -> Result<ReaderData, ReaderError> {
            Err(ReaderError::Naming(NamingError::DuplicateSample("A_1".to_string())))
        }
    }

    #[test]
    fn test_empty_directory_yields_no_readers() {
        let dir = tempdir().unwrap();
        let mut run = RunConfig::empty(dir.path());
        let data = read_data(dir.path(), &mut run, &ReadOptions::default()).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_structural_error_aborts() {
        let dir = tempdir().unwrap();
        let mut run = RunConfig::empty(dir.path());
        let readers: Vec<Box<dyn Reader>> = vec![Box::new(Failing)];
        let err = read_with(&readers, dir.path(), &mut run, &ReadOptions::default()).unwrap_err();
        assert!(!err.is_not_applicable());
        assert!(matches!(err, ReaderError::Naming(_)));
    }

    #[test]
    fn test_spectronaut_directory_is_read_and_config_updated() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("report.csv"),
            "PG.ProteinGroups,PG.Genes,[1] WT_1.PG.Quantity,[2] KO_1.PG.Quantity\nP1,G1,1,2\n",
        )
        .unwrap();
        let mut run = RunConfig::empty(dir.path());
        let data = read_data(dir.path(), &mut run, &ReadOptions::default()).unwrap();
        assert_eq!(data.len(), 1);
        let spectro = &data[SpectronautReader::NAME];
        assert_eq!(spectro.sample_names, vec!["WT_1", "KO_1"]);

        let stored = run.reader_config(SpectronautReader::NAME).unwrap();
        assert_eq!(stored.levels, 2);
        assert_eq!(stored.all_replicates, vec!["WT_1", "KO_1"]);
    }
}
