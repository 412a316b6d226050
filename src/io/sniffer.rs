//! Locating and parsing vendor exports with an unknown field delimiter.
//!
//! A reader describes what its file looks like through [`SnifferOptions`];
//! [`locate_and_load`] then converts legacy files, finds the single
//! candidate and tries each delimiter until the header validates.

use crate::io::table::RawTable;
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SniffError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No file with extension {extensions:?} found in {}", .dir.display())]
    NoMatchingFile { dir: PathBuf, extensions: Vec<String> },

    #[error("Expected exactly one input file in {}, found {}: {files:?}", .dir.display(), .files.len())]
    AmbiguousFiles { dir: PathBuf, files: Vec<PathBuf> },

    #[error("No delimiter of {tried:?} produced a recognized table from {}", .path.display())]
    NoValidDelimiter { path: PathBuf, tried: Vec<char> },
}

impl SniffError {
    /// Whether the error only means that the directory does not hold this
    /// reader's input, as opposed to a genuine IO failure.
    pub fn is_not_applicable(&self) -> bool {
        !matches!(self, SniffError::Io(_))
    }
}

/// Shape a header row must have to be accepted.
#[derive(Debug, Clone)]
pub struct HeaderCheck {
    /// The parse needs at least this many columns.
    pub min_columns: usize,
    /// If set, the first header must equal this name.
    pub first_column: Option<String>,
    /// If non-empty, at least one header must contain one of these markers.
    pub markers: Vec<String>,
}

impl Default for HeaderCheck {
    fn default() -> Self {
        HeaderCheck {
            min_columns: 2,
            first_column: None,
            markers: Vec::new(),
        }
    }
}

impl HeaderCheck {
    pub fn accepts(&self, headers: &[String]) -> bool {
        if headers.len() < self.min_columns {
            return false;
        }
        if let Some(first) = &self.first_column {
            if headers.first().map(|h| h.trim()) != Some(first.as_str()) {
                return false;
            }
        }
        self.markers.is_empty()
            || headers
                .iter()
                .any(|h| self.markers.iter().any(|m| h.contains(m.as_str())))
    }
}

/// Per-reader description of the input file.
#[derive(Debug, Clone)]
pub struct SnifferOptions {
    /// Sub-directories searched before the start directory itself.
    pub subdirs: Vec<String>,
    /// Accepted extensions, without the dot, compared case-insensitively.
    pub extensions: Vec<String>,
    /// If set, only files with exactly this name are candidates.
    pub file_name: Option<String>,
    /// Legacy extensions and the extension they are renamed to.
    pub legacy: Vec<(String, String)>,
    /// Delimiters in priority order.
    pub delimiters: Vec<u8>,
    pub header: HeaderCheck,
}

impl Default for SnifferOptions {
    fn default() -> Self {
        SnifferOptions {
            subdirs: Vec::new(),
            extensions: vec!["csv".to_string(), "tsv".to_string()],
            file_name: None,
            legacy: Vec::new(),
            delimiters: vec![b',', b'\t', b';'],
            header: HeaderCheck::default(),
        }
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(ext))
}

/// Rename legacy spreadsheet exports to their delimited-text extension.
///
/// Vendor "xls" exports are tab-separated text, so a rename is all the
/// conversion they need. Files whose target already exists are left alone,
/// which makes repeated runs a no-op.
pub fn convert_legacy_files(dir: &Path, legacy: &[(String, String)]) -> Result<Vec<PathBuf>, SniffError> {
    let mut converted = Vec::new();
    if legacy.is_empty() || !dir.is_dir() {
        return Ok(converted);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        for (from, to) in legacy {
            if !has_extension(&path, from) {
                continue;
            }
            let target = path.with_extension(to);
            if target.exists() {
                warn!(
                    "Not converting {}: {} already exists",
                    path.display(),
                    target.display()
                );
                continue;
            }
            fs::rename(&path, &target)?;
            info!("Converted {} to {}", path.display(), target.display());
            converted.push(target);
        }
    }
    Ok(converted)
}

/// Find the single file matching `options`, searching the configured
/// sub-directories before `dir` itself.
pub fn locate(dir: &Path, options: &SnifferOptions) -> Result<PathBuf, SniffError> {
    let search_dirs = options
        .subdirs
        .iter()
        .map(|s| dir.join(s))
        .chain(std::iter::once(dir.to_path_buf()));

    for search_dir in search_dirs {
        if !search_dir.is_dir() {
            continue;
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&search_dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && options.extensions.iter().any(|ext| has_extension(path, ext))
                    && options.file_name.as_ref().map_or(true, |name| {
                        path.file_name().and_then(|n| n.to_str()) == Some(name.as_str())
                    })
            })
            .collect();
        files.sort();

        match files.len() {
            0 => continue,
            1 => return Ok(files.remove(0)),
            _ => {
                return Err(SniffError::AmbiguousFiles {
                    dir: search_dir,
                    files,
                })
            }
        }
    }

    Err(SniffError::NoMatchingFile {
        dir: dir.to_path_buf(),
        extensions: options.extensions.clone(),
    })
}

/// Parse `path` with one delimiter. `Ok(None)` means the parse failed or
/// the header was not accepted.
fn try_delimiter(path: &Path, delimiter: u8, check: &HeaderCheck) -> Result<Option<RawTable>, SniffError> {
    let mut reader = match csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_path(path)
    {
        Ok(r) => r,
        Err(e) => {
            return match e.into_kind() {
                csv::ErrorKind::Io(io_err) => Err(SniffError::Io(io_err)),
                other => {
                    debug!("Cannot open {} with {:?}: {:?}", path.display(), delimiter as char, other);
                    Ok(None)
                }
            }
        }
    };

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(|s| s.trim().to_string()).collect(),
        Err(e) => {
            debug!("Header row unreadable with {:?}: {}", delimiter as char, e);
            return Ok(None);
        }
    };
    if !check.accepts(&headers) {
        debug!(
            "Header of {} not recognized with delimiter {:?} ({} columns)",
            path.display(),
            delimiter as char,
            headers.len()
        );
        return Ok(None);
    }

    let mut rows = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        match record {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) => {
                debug!(
                    "Row {} of {} does not parse with delimiter {:?}: {}",
                    row_no + 1,
                    path.display(),
                    delimiter as char,
                    e
                );
                return Ok(None);
            }
        }
    }

    Ok(Some(RawTable::new(headers, rows, delimiter, path)))
}

/// Parse `path`, trying each delimiter in priority order.
pub fn load_table(path: &Path, options: &SnifferOptions) -> Result<RawTable, SniffError> {
    for &delimiter in &options.delimiters {
        if let Some(table) = try_delimiter(path, delimiter, &options.header)? {
            info!(
                "Opened {} with delimiter {:?}: {} rows, {} columns",
                path.display(),
                delimiter as char,
                table.n_rows(),
                table.n_cols()
            );
            return Ok(table);
        }
        warn!(
            "Cannot read {} with ({:?}) separator",
            path.display(),
            delimiter as char
        );
    }
    Err(SniffError::NoValidDelimiter {
        path: path.to_path_buf(),
        tried: options.delimiters.iter().map(|&d| d as char).collect(),
    })
}

/// Convert legacy files, locate the single candidate and load it.
///
/// # Arguments
///
/// * `dir` - The data directory; `options.subdirs` are searched first.
/// * `options` - Legacy renames, accepted extensions, delimiters and the
///   header shape of the reader's file.
///
/// # Returns
///
/// * `Result<RawTable, SniffError>` - The parsed table, or why the
///   directory does not hold exactly one readable candidate.
pub fn locate_and_load(dir: &Path, options: &SnifferOptions) -> Result<RawTable, SniffError> {
    convert_legacy_files(dir, &options.legacy)?;
    for sub in &options.subdirs {
        convert_legacy_files(&dir.join(sub), &options.legacy)?;
    }
    let path = locate(dir, options)?;
    load_table(&path, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(path: &Path, content: &str) {
        let mut file = File::create(path).unwrap();
        write!(file, "{}", content).unwrap();
    }

    fn quantity_options() -> SnifferOptions {
        SnifferOptions {
            legacy: vec![("xls".to_string(), "csv".to_string())],
            header: HeaderCheck {
                markers: vec![".Quantity".to_string()],
                ..HeaderCheck::default()
            },
            ..SnifferOptions::default()
        }
    }

    #[test]
    fn test_legacy_conversion_is_idempotent() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("export.xls"), "a\tb\n1\t2\n");

        let converted = convert_legacy_files(dir.path(), &quantity_options().legacy).unwrap();
        assert_eq!(converted, vec![dir.path().join("export.csv")]);
        assert!(!dir.path().join("export.xls").exists());

        let again = convert_legacy_files(dir.path(), &quantity_options().legacy).unwrap();
        assert!(again.is_empty());
        assert!(dir.path().join("export.csv").exists());
    }

    #[test]
    fn test_tab_file_falls_through_to_tab() {
        let dir = tempdir().unwrap();
        write_file(
            &dir.path().join("export.tsv"),
            "PG.Genes\tS1.Quantity\tS2.Quantity\nA\t1,5\t2\nB\t3\t4\n",
        );
        let table = locate_and_load(dir.path(), &quantity_options()).unwrap();
        assert_eq!(table.delimiter, b'\t');
        assert_eq!(table.n_cols(), 3);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.cell(0, 1), "1,5");
    }

    #[test]
    fn test_semicolon_file() {
        let dir = tempdir().unwrap();
        write_file(
            &dir.path().join("export.csv"),
            "PG.Genes;S1.Quantity;S2.Quantity\nA;1,5;2\n",
        );
        let table = locate_and_load(dir.path(), &quantity_options()).unwrap();
        assert_eq!(table.delimiter, b';');
        assert_eq!(table.headers[1], "S1.Quantity");
    }

    #[test]
    fn test_missing_marker_is_not_applicable() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("other.csv"), "x,y\n1,2\n");
        let err = locate_and_load(dir.path(), &quantity_options()).unwrap_err();
        assert!(matches!(err, SniffError::NoValidDelimiter { .. }));
        assert!(err.is_not_applicable());
    }

    #[test]
    fn test_zero_or_many_files() {
        let dir = tempdir().unwrap();
        let err = locate(dir.path(), &quantity_options()).unwrap_err();
        assert!(matches!(err, SniffError::NoMatchingFile { .. }));

        write_file(&dir.path().join("a.csv"), "x,y\n");
        write_file(&dir.path().join("b.tsv"), "x\ty\n");
        let err = locate(dir.path(), &quantity_options()).unwrap_err();
        assert!(matches!(err, SniffError::AmbiguousFiles { ref files, .. } if files.len() == 2));
        assert!(err.is_not_applicable());
    }

    #[test]
    fn test_named_file_in_subdir() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("txt")).unwrap();
        write_file(
            &dir.path().join("txt").join("proteinGroups.txt"),
            "Protein IDs\tIntensity S1\nP1\t10\n",
        );
        write_file(&dir.path().join("txt").join("peptides.txt"), "x\n");
        let options = SnifferOptions {
            subdirs: vec!["txt".to_string()],
            extensions: vec!["txt".to_string()],
            file_name: Some("proteinGroups.txt".to_string()),
            delimiters: vec![b'\t'],
            header: HeaderCheck {
                first_column: Some("Protein IDs".to_string()),
                ..HeaderCheck::default()
            },
            ..SnifferOptions::default()
        };
        let table = locate_and_load(dir.path(), &options).unwrap();
        assert_eq!(table.headers, vec!["Protein IDs", "Intensity S1"]);
    }
}
