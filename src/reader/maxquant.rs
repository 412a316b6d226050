//! Reader for MaxQuant `proteinGroups.txt`.

use crate::config::ReaderConfig;
use crate::design::{build_design, ColumnMatcher, NamingScheme};
use crate::io::sniffer::{locate_and_load, HeaderCheck, SnifferOptions};
use crate::io::table::RawTable;
use crate::matrix::IntensityKind;
use crate::reader::assembler::{assemble, IntensityColumnGroup, TableLayout};
use crate::reader::{ReadOptions, Reader, ReaderData, ReaderError};
use crate::sample_mapping::{load_sample_mapping, SAMPLE_MAPPING_FILE};
use log::info;
use std::path::Path;

pub const PROTEIN_GROUPS_FILE: &str = "proteinGroups.txt";
pub const PROTEIN_COLUMN: &str = "Protein IDs";
pub const ID_COLUMN: &str = "Gene names";

/// Rows MaxQuant marks with `+` in any of these columns are decoys,
/// contaminants or site-only identifications.
pub const EXCLUSION_COLUMNS: [&str; 3] = ["Reverse", "Potential contaminant", "Only identified by site"];

#[derive(Debug, Clone)]
pub struct MaxQuantReader {
    sniffer: SnifferOptions,
    layout: TableLayout,
    drop_flagged_rows: bool,
}

impl Default for MaxQuantReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove rows flagged `+` in any of `columns`.
pub fn drop_flagged_rows(table: &RawTable, columns: &[&str]) -> RawTable {
    let flag_cols: Vec<usize> = columns.iter().filter_map(|c| table.column_index(c)).collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .filter(|row| {
            !flag_cols
                .iter()
                .any(|&c| row.get(c).map(|v| v.trim() == "+").unwrap_or(false))
        })
        .cloned()
        .collect();
    if rows.len() < table.n_rows() {
        info!(
            "Removed {} reverse/contaminant/site-only rows from {}",
            table.n_rows() - rows.len(),
            table.path.display()
        );
    }
    RawTable::new(table.headers.clone(), rows, table.delimiter, &table.path)
}

impl MaxQuantReader {
    pub const NAME: &'static str = "mqreader";

    pub fn new() -> Self {
        let prefix = |p: &str| vec![ColumnMatcher::Prefix(p.to_string())];
        MaxQuantReader {
            sniffer: SnifferOptions {
                subdirs: vec!["txt".to_string()],
                extensions: vec!["txt".to_string()],
                file_name: Some(PROTEIN_GROUPS_FILE.to_string()),
                delimiters: vec![b'\t'],
                header: HeaderCheck {
                    first_column: Some(PROTEIN_COLUMN.to_string()),
                    ..HeaderCheck::default()
                },
                ..SnifferOptions::default()
            },
            layout: TableLayout {
                id_column: ID_COLUMN.to_string(),
                multi_id_column: None,
                flag_marker: None,
                scheme: NamingScheme::Verbatim,
                groups: vec![
                    IntensityColumnGroup::new(IntensityKind::Raw, prefix("Intensity "), "Intensity"),
                    IntensityColumnGroup::new(IntensityKind::Lfq, prefix("LFQ intensity "), "LFQ intensity"),
                    IntensityColumnGroup::new(IntensityKind::Ibaq, prefix("iBAQ "), "iBAQ intensity"),
                ],
            },
            drop_flagged_rows: true,
        }
    }

    /// Keep reverse hits and contaminants.
    pub fn keep_flagged_rows(mut self) -> Self {
        self.drop_flagged_rows = false;
        self
    }
}

impl Reader for MaxQuantReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_files(&self) -> &'static [&'static str] {
        &[PROTEIN_GROUPS_FILE]
    }

    fn read(&self, start_dir: &Path, config: &mut ReaderConfig, options: &ReadOptions) -> Result<ReaderData, ReaderError> {
        let mut table = locate_and_load(start_dir, &self.sniffer).map_err(|e| ReaderError::from_sniff(Self::NAME, e))?;
        if self.drop_flagged_rows {
            table = drop_flagged_rows(&table, &EXCLUSION_COLUMNS);
        }

        let mapping = load_sample_mapping(&start_dir.join(SAMPLE_MAPPING_FILE))?;
        let mapping = (!mapping.is_empty()).then_some(&mapping);

        let assembled = assemble(&table, &self.layout, mapping, options)?;
        let design = build_design(&assembled.sample_names, options.collision_policy)?;
        info!(
            "MaxQuant design for {}: {} samples over {} levels",
            table.path.display(),
            assembled.sample_names.len(),
            design.depth()
        );
        config.update_from(&assembled.sample_names, &design);

        Ok(ReaderData {
            sample_names: assembled.sample_names,
            id_column: self.layout.id_column.clone(),
            design,
            matrices: assembled.matrices,
            source: table.path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;
    use tempfile::tempdir;

    fn write_protein_groups(dir: &Path) {
        let header = [
            "Protein IDs",
            "Gene names",
            "Intensity WT_1",
            "Intensity KO_1",
            "LFQ intensity WT_1",
            "LFQ intensity KO_1",
            "iBAQ peptides",
            "iBAQ WT_1",
            "Reverse",
            "Potential contaminant",
        ]
        .join("\t");
        let rows = [
            "P1\tGeneA\t100\t200\t90\t190\t3\t10\t\t",
            "P2;P3\tGeneB\t0\t50\t0\t45\t2\t5\t\t",
            "REV__P9\t\t1\t1\t1\t1\t1\t1\t+\t",
            "CON__P8\tKRT1\t1\t1\t1\t1\t1\t1\t\t+",
            "P4\t\t5\t6\t5\t6\t1\t2\t\t",
        ];
        fs::create_dir_all(dir.join("txt")).unwrap();
        fs::write(
            dir.join("txt").join(PROTEIN_GROUPS_FILE),
            format!("{}\n{}\n", header, rows.join("\n")),
        )
        .unwrap();
    }

    #[test]
    fn test_read_protein_groups() {
        let dir = tempdir().unwrap();
        write_protein_groups(dir.path());

        let mut config = ReaderConfig::default();
        let data = MaxQuantReader::new()
            .read(dir.path(), &mut config, &ReadOptions::default())
            .unwrap();

        assert_eq!(data.sample_names, vec!["WT_1", "KO_1"]);
        assert_eq!(data.design.depth(), 2);
        assert_eq!(data.design.groups_at_level(0).len(), 2);

        let raw = &data.matrices[&IntensityKind::Raw];
        assert_eq!(raw.row_names, vec!["GeneA", "GeneB", "nan"]);
        assert_eq!(raw.column_names, vec!["Intensity WT_1", "Intensity KO_1"]);
        assert_relative_eq!(raw.get("GeneB", "KO_1").unwrap(), 50.0);

        let lfq = &data.matrices[&IntensityKind::Lfq];
        assert_relative_eq!(lfq.get("GeneA", "WT_1").unwrap(), 90.0);

        // "iBAQ peptides" is a summary column, not a sample
        let ibaq = &data.matrices[&IntensityKind::Ibaq];
        assert_eq!(ibaq.sample_names, vec!["WT_1"]);
        assert_relative_eq!(ibaq.get("GeneB", "WT_1").unwrap(), 5.0);

        assert_eq!(config.levels, 2);
    }

    #[test]
    fn test_keep_flagged_rows() {
        let dir = tempdir().unwrap();
        write_protein_groups(dir.path());
        let data = MaxQuantReader::new()
            .keep_flagged_rows()
            .read(dir.path(), &mut ReaderConfig::default(), &ReadOptions::default())
            .unwrap();
        assert_eq!(
            data.matrices[&IntensityKind::Raw].row_names,
            vec!["GeneA", "GeneB", "nan_1", "KRT1", "nan_2"]
        );
    }

    #[test]
    fn test_wrong_first_column_not_applicable() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(PROTEIN_GROUPS_FILE),
            "Majority protein IDs\tIntensity A_1\nP1\t1\n",
        )
        .unwrap();
        let err = MaxQuantReader::new()
            .read(dir.path(), &mut ReaderConfig::default(), &ReadOptions::default())
            .unwrap_err();
        assert!(err.is_not_applicable());
    }
}
