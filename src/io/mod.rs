//! Input/Output operations module.
//!
//! Handles reading vendor exports (sniffing delimiters, coercing numbers)
//! and writing results (intensity matrices, analysis designs).

pub mod numeric;
pub mod sniffer;
pub mod table;

use crate::design::hierarchy::AnalysisDesign;
use crate::matrix::IntensityMatrix;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes an IntensityMatrix to a CSV file.
///
/// The first column holds the row identifiers under `index_name`, followed
/// by one column per display-labelled sample.
pub fn write_matrix(matrix: &IntensityMatrix, index_name: &str, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("creating {}", output_path.display()))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    let mut header = vec![index_name.to_string()];
    header.extend(matrix.column_names.iter().cloned());
    writer.write_record(&header)?;

    for (r, name) in matrix.row_names.iter().enumerate() {
        let mut record = Vec::with_capacity(matrix.sample_names.len() + 1);
        record.push(name.clone());
        record.extend(matrix.values.row(r).iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the nested analysis design as pretty-printed JSON.
pub fn write_design(design: &AnalysisDesign, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("creating {}", output_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), design)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::hierarchy::{build_design, CollisionPolicy};
    use crate::matrix::IntensityKind;
    use ndarray::arr2;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_write_matrix_csv() {
        let matrix = IntensityMatrix::new(
            IntensityKind::Raw,
            "Intensity",
            arr2(&[[10.0, 20.0], [5.0, 0.0]]),
            vec!["GeneA".to_string(), "GeneB".to_string()],
            vec!["S_1".to_string(), "S_2".to_string()],
        );
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("raw.csv");

        write_matrix(&matrix, "PG.Genes", &file_path).unwrap();

        let content = fs::read_to_string(file_path).unwrap();
        let expected_content = "\
PG.Genes,Intensity S_1,Intensity S_2\n\
GeneA,10,20\n\
GeneB,5,0\n";
        assert_eq!(content, expected_content);
    }

    #[test]
    fn test_write_design_json() {
        let names = vec!["Grp1_Rep1".to_string(), "Grp1_Rep2".to_string()];
        let design = build_design(&names, CollisionPolicy::Strict).unwrap();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("design.json");

        write_design(&design, &file_path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(file_path).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"Grp1": {"Rep1": "Grp1_Rep1", "Rep2": "Grp1_Rep2"}})
        );
    }
}
