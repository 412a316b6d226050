//! Reader for Spectronaut protein group reports.
//!
//! Spectronaut writes one wide table per experiment. Sample columns look
//! like `[3] 20200101_QE_Ctrl_T1_rep2.PG.Quantity`, each with a companion
//! `.PG.IsIdentified` flag column. Older exports carry an `.xls` extension
//! although their content is delimited text.

use crate::config::ReaderConfig;
use crate::design::{build_design, ColumnMatcher, NamingScheme};
use crate::io::sniffer::{locate_and_load, HeaderCheck, SnifferOptions};
use crate::matrix::IntensityKind;
use crate::reader::assembler::{assemble, IntensityColumnGroup, TableLayout};
use crate::reader::{ReadOptions, Reader, ReaderData, ReaderError};
use crate::sample_mapping::{load_sample_mapping, SAMPLE_MAPPING_FILE};
use log::info;
use std::path::Path;

pub const QUANTITY_MARKER: &str = ".Quantity";
pub const IDENTIFIED_MARKER: &str = ".IsIdentified";
pub const ID_COLUMN: &str = "PG.Genes";
pub const PROTEIN_COLUMN: &str = "PG.ProteinGroups";

#[derive(Debug, Clone)]
pub struct SpectronautReader {
    sniffer: SnifferOptions,
    layout: TableLayout,
}

impl Default for SpectronautReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectronautReader {
    pub const NAME: &'static str = "spectroReader";

    pub fn new() -> Self {
        let contains = |m: &str| ColumnMatcher::Contains(m.to_string());
        SpectronautReader {
            sniffer: SnifferOptions {
                legacy: vec![("xls".to_string(), "csv".to_string())],
                header: HeaderCheck {
                    markers: vec![QUANTITY_MARKER.to_string()],
                    ..HeaderCheck::default()
                },
                ..SnifferOptions::default()
            },
            layout: TableLayout {
                id_column: ID_COLUMN.to_string(),
                multi_id_column: Some(PROTEIN_COLUMN.to_string()),
                flag_marker: Some(IDENTIFIED_MARKER.to_string()),
                scheme: NamingScheme::Spectronaut,
                groups: vec![
                    IntensityColumnGroup::new(IntensityKind::Raw, vec![contains(QUANTITY_MARKER)], "Intensity"),
                    IntensityColumnGroup::new(IntensityKind::Lfq, vec![contains(".LFQ")], "LFQ intensity"),
                    IntensityColumnGroup::new(
                        IntensityKind::Ibaq,
                        vec![contains(".IBAQ"), contains(".iBAQ")],
                        "iBAQ intensity",
                    ),
                ],
            },
        }
    }

    /// Index the matrices by another column, e.g. `PG.ProteinGroups`.
    pub fn with_id_column(mut self, column: &str) -> Self {
        self.layout.id_column = column.to_string();
        self
    }
}

impl Reader for SpectronautReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_files(&self) -> &'static [&'static str] {
        &[".xls, .tsv, or .csv file"]
    }

    fn read(&self, start_dir: &Path, config: &mut ReaderConfig, options: &ReadOptions) -> Result<ReaderData, ReaderError> {
        let table = locate_and_load(start_dir, &self.sniffer).map_err(|e| ReaderError::from_sniff(Self::NAME, e))?;
        let mapping = load_sample_mapping(&start_dir.join(SAMPLE_MAPPING_FILE))?;
        let mapping = (!mapping.is_empty()).then_some(&mapping);

        let assembled = assemble(&table, &self.layout, mapping, options)?;
        let design = build_design(&assembled.sample_names, options.collision_policy)?;
        info!(
            "Spectronaut design for {}: {} samples over {} levels",
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
