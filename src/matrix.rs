//! Intensity matrices handed to downstream grouping and statistics.
//!
//! Rows are proteins (indexed by a resolved, duplicate-free identifier)
//! and columns are samples, labelled `"<kind label> <sample name>"`.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The quantitative measurement types found in proteomics exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityKind {
    Raw,
    Lfq,
    Ibaq,
}

impl IntensityKind {
    pub const ALL: [IntensityKind; 3] = [IntensityKind::Raw, IntensityKind::Lfq, IntensityKind::Ibaq];

    /// Short name used in file names and config keys.
    pub fn as_str(self) -> &'static str {
        match self {
            IntensityKind::Raw => "raw",
            IntensityKind::Lfq => "lfq",
            IntensityKind::Ibaq => "ibaq",
        }
    }
}

impl fmt::Display for IntensityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A proteins x samples intensity matrix for one [`IntensityKind`].
///
/// `0.0` marks a value that was not observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntensityMatrix {
    pub kind: IntensityKind,

    /// The intensity values (rows x samples).
    pub values: Array2<f64>,

    /// Row identifiers, never empty. Unique unless duplicate resolution
    /// was turned off when reading; lookups then return the first row.
    pub row_names: Vec<String>,
    pub row_map: HashMap<String, usize>,

    /// Display-labelled column names, e.g. `Intensity Grp1_Rep1`.
    pub column_names: Vec<String>,
    /// Normalized sample name behind each column.
    pub sample_names: Vec<String>,
    pub sample_map: HashMap<String, usize>,
}

impl IntensityMatrix {
    /// Assemble a matrix; `values` must be `row_names.len() x sample_names.len()`.
    pub fn new(
        kind: IntensityKind,
        label: &str,
        values: Array2<f64>,
        row_names: Vec<String>,
        sample_names: Vec<String>,
    ) -> Self {
        debug_assert_eq!(values.dim(), (row_names.len(), sample_names.len()));
        // reversed so that the first of repeated identifiers wins
        let row_map = row_names
            .iter()
            .enumerate()
            .rev()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        let sample_map = sample_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        let column_names = sample_names
            .iter()
            .map(|s| format!("{} {}", label, s))
            .collect();
        IntensityMatrix {
            kind,
            values,
            row_names,
            row_map,
            column_names,
            sample_names,
            sample_map,
        }
    }

    /// Intensities of one protein across all samples.
    pub fn get_row(&self, row_name: &str) -> Option<ArrayView1<f64>> {
        self.row_map.get(row_name).map(|&idx| self.values.row(idx))
    }

    /// Intensities of one sample, looked up by its normalized name.
    pub fn get_sample(&self, sample_name: &str) -> Option<ArrayView1<f64>> {
        self.sample_map
            .get(sample_name)
            .map(|&idx| self.values.column(idx))
    }

    /// Value at a protein/sample pair.
    pub fn get(&self, row_name: &str, sample_name: &str) -> Option<f64> {
        let r = *self.row_map.get(row_name)?;
        let c = *self.sample_map.get(sample_name)?;
        Some(self.values[[r, c]])
    }

    /// Returns the dimensions of the matrix (rows, samples).
    pub fn dimensions(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Number of observed (non-zero) values per sample.
    pub fn observed_per_sample(&self) -> Vec<usize> {
        self.values
            .columns()
            .into_iter()
            .map(|col| col.iter().filter(|&&v| v > 0.0).count())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn create_test_matrix() -> IntensityMatrix {
        IntensityMatrix::new(
            IntensityKind::Raw,
            "Intensity",
            arr2(&[[10.0, 0.0], [5.0, 7.5]]),
            vec!["GeneA".to_string(), "GeneB".to_string()],
            vec!["Grp1_Rep1".to_string(), "Grp1_Rep2".to_string()],
        )
    }

    #[test]
    fn test_lookup() {
        let m = create_test_matrix();
        assert_eq!(m.dimensions(), (2, 2));
        assert_eq!(
            m.column_names,
            vec!["Intensity Grp1_Rep1", "Intensity Grp1_Rep2"]
        );
        assert_eq!(m.get("GeneB", "Grp1_Rep2"), Some(7.5));
        assert_eq!(m.get("GeneC", "Grp1_Rep2"), None);
        assert_eq!(m.get_row("GeneA").unwrap().to_vec(), vec![10.0, 0.0]);
        assert_eq!(m.get_sample("Grp1_Rep1").unwrap().to_vec(), vec![10.0, 5.0]);
    }

    #[test]
    fn test_observed_per_sample() {
        let m = create_test_matrix();
        assert_eq!(m.observed_per_sample(), vec![2, 1]);
    }

    #[test]
    fn test_repeated_row_names_resolve_to_first() {
        let m = IntensityMatrix::new(
            IntensityKind::Raw,
            "Intensity",
            arr2(&[[1.0], [2.0]]),
            vec!["GeneA".to_string(), "GeneA".to_string()],
            vec!["Grp1_Rep1".to_string()],
        );
        assert_eq!(m.get("GeneA", "Grp1_Rep1"), Some(1.0));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(IntensityKind::Lfq.to_string(), "lfq");
        assert_eq!(IntensityKind::ALL.len(), 3);
    }
}
