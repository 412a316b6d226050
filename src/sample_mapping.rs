//! Optional sample rename mapping.
//!
//! A `sample_mapping.txt` next to the vendor export lets users fix sample
//! names without editing the export. It is tab-separated with a header line:
//!
//! ```text
//! old name	new name
//! Ctrl-1	Ctrl_Rep1
//! ```
//!
//! Every occurrence of an old name inside a normalized sample name is
//! replaced by the new name.

use indexmap::IndexMap;
use log::{debug, info, warn};
use std::path::Path;

pub const SAMPLE_MAPPING_FILE: &str = "sample_mapping.txt";

/// Ordered substring replacements applied to normalized sample names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleMapping {
    pub replacements: IndexMap<String, String>,
}

impl SampleMapping {
    pub fn new() -> Self {
        SampleMapping::default()
    }

    pub fn add(&mut self, original: &str, new_name: &str) {
        self.replacements
            .insert(original.to_string(), new_name.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Apply every replacement, in file order.
    pub fn apply(&self, name: &str) -> String {
        let mut out = name.to_string();
        for (original, new_name) in &self.replacements {
            if out.contains(original.as_str()) {
                out = out.replace(original.as_str(), new_name);
            }
        }
        out
    }
}

/// Loads the mapping from `path`. A missing file yields an empty mapping.
pub fn load_sample_mapping(path: &Path) -> Result<SampleMapping, csv::Error> {
    let mut mapping = SampleMapping::new();
    if !path.is_file() {
        debug!("No sample mapping at {}, keeping names as found", path.display());
        return Ok(mapping);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    for (line_no, result) in rdr.records().enumerate() {
        let record = result?;
        let original = record.get(0).map(str::trim).unwrap_or("");
        let new_name = record.get(1).map(str::trim).unwrap_or("");

        if record.len() < 2 || original.is_empty() || new_name.is_empty() {
            warn!(
                "Skipping malformed line {} in {}",
                line_no + 2,
                path.display()
            );
            continue;
        }
        mapping.add(original, new_name);
    }

    info!(
        "Loaded {} sample rename(s) from {}",
        mapping.replacements.len(),
        path.display()
    );
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_mapping_file(path: &Path, content: &str) {
        let mut file = File::create(path).unwrap();
        write!(file, "{}", content).unwrap();
    }

    #[test]
    fn test_load_mapping_basic() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SAMPLE_MAPPING_FILE);
        create_mapping_file(
            &file_path,
            "old name\tnew name\nCtrl-1\tCtrl_Rep1\nbroken line\nKO-1\tKO_Rep1\n",
        );

        let mapping = load_sample_mapping(&file_path).unwrap();
        assert_eq!(mapping.replacements.len(), 2);
        assert_eq!(mapping.apply("Ctrl-1"), "Ctrl_Rep1");
        assert_eq!(mapping.apply("Day1_KO-1"), "Day1_KO_Rep1");
        assert_eq!(mapping.apply("WT_Rep1"), "WT_Rep1");
    }

    #[test]
    fn test_missing_file_is_noop() {
        let dir = tempdir().unwrap();
        let mapping = load_sample_mapping(&dir.path().join(SAMPLE_MAPPING_FILE)).unwrap();
        assert!(mapping.is_empty());
        assert_eq!(mapping.apply("A_B"), "A_B");
    }
}
