//! Turning a sniffed [`RawTable`] into per-kind intensity matrices.
//!
//! The steps, in order:
//!
//! 1. rows whose protein field lists several `;`-joined proteins are
//!    expanded into one row per protein,
//! 2. the defining kind's columns are normalized into sample names,
//! 3. every requested kind is sliced out and coerced to numbers,
//! 4. values not flagged as identified are zeroed (unless imputed values
//!    are wanted),
//! 5. the row identifiers are made unique.

use crate::design::naming::{normalize_columns, ColumnMatcher, NamingScheme};
use crate::design::{resolve_duplicates, CollisionPolicy, NamingError};
use crate::io::numeric::{coerce_intensity, is_missing, is_true_like, sniff_decimal_convention, DecimalConvention, SNIFF_ROWS};
use crate::io::table::RawTable;
use crate::matrix::{IntensityKind, IntensityMatrix};
use crate::reader::{ReadOptions, ReaderError};
use crate::sample_mapping::SampleMapping;
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info, warn};
use ndarray::Array2;
use std::collections::HashMap;

/// Placeholder for rows without an identifier.
pub const MISSING_ID: &str = "nan";

const MULTI_ID_SEPARATOR: char = ';';

/// Columns of one intensity kind.
#[derive(Debug, Clone)]
pub struct IntensityColumnGroup {
    pub kind: IntensityKind,
    /// A column belongs to the group if any matcher accepts its header.
    pub matchers: Vec<ColumnMatcher>,
    /// Prefix of the display column names, e.g. `LFQ intensity`.
    pub label: String,
}

impl IntensityColumnGroup {
    pub fn new(kind: IntensityKind, matchers: Vec<ColumnMatcher>, label: &str) -> Self {
        IntensityColumnGroup {
            kind,
            matchers,
            label: label.to_string(),
        }
    }

    pub fn matches(&self, header: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(header))
    }

    /// First matcher accepting `header`.
    fn matcher_for(&self, header: &str) -> Option<&ColumnMatcher> {
        self.matchers.iter().find(|m| m.matches(header))
    }
}

/// Where a vendor export keeps its identifiers, quantities and flags.
#[derive(Debug, Clone)]
pub struct TableLayout {
    /// Column used as the matrix index.
    pub id_column: String,
    /// Column whose `;`-joined entries are expanded into separate rows.
    pub multi_id_column: Option<String>,
    /// Marker of the identification flag columns.
    pub flag_marker: Option<String>,
    pub scheme: NamingScheme,
    /// The first group defines the samples; the others are optional.
    pub groups: Vec<IntensityColumnGroup>,
}

/// Output of [`assemble`].
#[derive(Debug, Clone)]
pub struct Assembled {
    pub sample_names: Vec<String>,
    pub row_names: Vec<String>,
    pub decimal: DecimalConvention,
    pub matrices: IndexMap<IntensityKind, IntensityMatrix>,
}

/// Expand rows listing several proteins into one row per protein.
///
/// The row order is kept: the parts of an expanded row replace it in
/// place. Empty parts left by a trailing or doubled `;` are ignored. When
/// the id column holds the same number of parts it is split alongside;
/// all other cells are copied.
pub fn expand_multi_ids(table: &RawTable, multi_col: usize, id_col: Option<usize>) -> RawTable {
    let mut rows = Vec::with_capacity(table.n_rows());
    let mut expanded = 0usize;

    for row in &table.rows {
        let field = row.get(multi_col).map(String::as_str).unwrap_or("");
        if !field.contains(MULTI_ID_SEPARATOR) {
            rows.push(row.clone());
            continue;
        }

        let parts = split_parts(field);
        if parts.is_empty() {
            rows.push(row.clone());
            continue;
        }
        let id_parts: Option<Vec<&str>> = id_col
            .filter(|&c| c != multi_col)
            .and_then(|c| row.get(c))
            .map(|cell| split_parts(cell))
            .filter(|p| p.len() == parts.len());

        for (i, part) in parts.iter().enumerate() {
            let mut new_row = row.clone();
            new_row[multi_col] = part.to_string();
            if let (Some(c), Some(ids)) = (id_col, id_parts.as_ref()) {
                new_row[c] = ids[i].to_string();
            }
            rows.push(new_row);
        }
        if parts.len() > 1 {
            expanded += 1;
        }
    }

    if expanded > 0 {
        debug!(
            "Expanded {} multi-protein rows of {} into {} rows",
            expanded,
            table.path.display(),
            rows.len()
        );
    }
    RawTable::new(table.headers.clone(), rows, table.delimiter, &table.path)
}

fn split_parts(field: &str) -> Vec<&str> {
    field
        .split(MULTI_ID_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// The flag column sharing a quantity column's sample label, i.e. the
/// header text before the first `.`.
fn companion_flags(table: &RawTable, columns: &[usize], marker: &str) -> Vec<Option<usize>> {
    let by_label: HashMap<&str, usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.contains(marker))
        .map(|(i, h)| (sample_label(h), i))
        .collect();
    columns
        .iter()
        .map(|&c| by_label.get(sample_label(&table.headers[c])).copied())
        .collect()
}

fn sample_label(header: &str) -> &str {
    header.split('.').next().unwrap_or(header)
}

/// Resolved row index: missing identifiers become [`MISSING_ID`], then
/// duplicates are numbered if requested.
fn row_index(table: &RawTable, id_col: usize, resolve: bool) -> Vec<String> {
    let ids: Vec<String> = table
        .column(id_col)
        .map(|id| {
            if is_missing(id) {
                MISSING_ID.to_string()
            } else {
                id.trim().to_string()
            }
        })
        .collect();
    if resolve {
        return resolve_duplicates(&ids);
    }
    let repeated = ids.iter().duplicates().count();
    if repeated > 0 {
        warn!(
            "{} row identifier(s) of {} occur more than once; lookups by identifier return the first row",
            repeated,
            table.path.display()
        );
    }
    ids
}

/// Build one matrix from the given columns. `flags` holds the companion
/// flag column of each value column when masking applies.
fn build_matrix(
    table: &RawTable,
    group: &IntensityColumnGroup,
    columns: &[usize],
    sample_names: Vec<String>,
    flags: Option<&[Option<usize>]>,
    decimal: DecimalConvention,
    row_names: &[String],
) -> IntensityMatrix {
    let mut values = Array2::<f64>::zeros((table.n_rows(), columns.len()));
    for (j, &c) in columns.iter().enumerate() {
        let header = &table.headers[c];
        let flag_col = flags.and_then(|f| f[j]);
        for r in 0..table.n_rows() {
            let cell = table.cell(r, c);
            let value = coerce_intensity(cell, decimal, r, header);
            let keep = match (flags, flag_col) {
                (None, _) => true,
                (Some(_), Some(fc)) => !is_missing(cell) && is_true_like(table.cell(r, fc)),
                // no flag column for this sample: nothing to mask with
                (Some(_), None) => true,
            };
            values[[r, j]] = if keep { value } else { 0.0 };
        }
    }
    IntensityMatrix::new(group.kind, &group.label, values, row_names.to_vec(), sample_names)
}

/// Assemble every requested intensity kind of `table`.
///
/// # Arguments
///
/// * `table` - The sniffed vendor table.
/// * `layout` - Where the reader's identifiers, quantities and flags live.
/// * `mapping` - Optional sample renames, applied after normalization.
/// * `options` - Masking, duplicate, collision and decimal handling.
///
/// # Returns
///
/// * `Result<Assembled, ReaderError>` - The sample names, the resolved row
///   index and one matrix per requested kind present in the table.
pub fn assemble(
    table: &RawTable,
    layout: &TableLayout,
    mapping: Option<&SampleMapping>,
    options: &ReadOptions,
) -> Result<Assembled, ReaderError> {
    let missing_column = |column: &str| ReaderError::MissingColumn {
        column: column.to_string(),
        path: table.path.clone(),
    };

    let id_col = table
        .column_index(&layout.id_column)
        .ok_or_else(|| missing_column(layout.id_column.as_str()))?;

    let expanded;
    let table = match &layout.multi_id_column {
        Some(name) => {
            let multi_col = table.column_index(name).ok_or_else(|| missing_column(name.as_str()))?;
            expanded = expand_multi_ids(table, multi_col, Some(id_col));
            &expanded
        }
        None => table,
    };

    let (defining, others) = layout
        .groups
        .split_first()
        .ok_or_else(|| missing_column("intensity columns"))?;
    let defining_cols = table.column_indices(|h| defining.matches(h));
    if defining_cols.is_empty() {
        return Err(missing_column(defining.label.as_str()));
    }

    let defining_headers: Vec<&str> = defining_cols.iter().map(|&c| table.headers[c].as_str()).collect();
    let first_matcher = defining
        .matcher_for(defining_headers[0])
        .ok_or_else(|| missing_column(defining.label.as_str()))?;
    let all_names = normalize_columns(
        &defining_headers,
        layout.scheme,
        first_matcher,
        mapping,
        options.collision_policy,
    )?;
    let (defining_cols, sample_names): (Vec<usize>, Vec<String>) = defining_cols
        .iter()
        .copied()
        .zip(all_names)
        .unique_by(|(_, name)| name.clone())
        .unzip();
    if sample_names.len() < defining_headers.len() {
        warn!(
            "{} column(s) of {} repeat a sample name and were dropped",
            defining_headers.len() - sample_names.len(),
            table.path.display()
        );
    }

    let decimal = options.decimal.unwrap_or_else(|| {
        let sniff_rows = table.n_rows().min(SNIFF_ROWS);
        let cells = (0..sniff_rows).flat_map(|r| defining_cols.iter().map(move |&c| table.cell(r, c)));
        sniff_decimal_convention(cells)
    });
    debug!("Using decimal convention {:?} for {}", decimal, table.path.display());

    let row_names = row_index(table, id_col, options.resolve_duplicate_ids);
    let mask = |cols: &[usize]| -> Option<Vec<Option<usize>>> {
        match (&layout.flag_marker, options.use_imputed) {
            (Some(marker), false) => Some(companion_flags(table, cols, marker)),
            _ => None,
        }
    };

    let mut matrices = IndexMap::new();
    if options.wants(defining.kind) {
        let flags = mask(&defining_cols);
        let matrix = build_matrix(
            table,
            defining,
            &defining_cols,
            sample_names.clone(),
            flags.as_deref(),
            decimal,
            &row_names,
        );
        matrices.insert(defining.kind, matrix);
    }

    let sample_pos: HashMap<&str, usize> = sample_names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();

    for group in others.iter().filter(|g| options.wants(g.kind)) {
        // columns of this kind belonging to a known sample, in sample order
        let mut found: Vec<(usize, usize, String)> = Vec::new();
        for c in table.column_indices(|h| group.matches(h)) {
            let header = &table.headers[c];
            let Some(matcher) = group.matcher_for(header) else { continue };
            let mut name = layout.scheme.normalize_header(header, matcher)?;
            if let Some(mapping) = mapping {
                name = mapping.apply(&name);
            }
            match sample_pos.get(name.as_str()) {
                Some(&pos) => found.push((pos, c, name)),
                None => debug!("Column '{}' does not belong to any sample, skipped", header),
            }
        }
        if found.is_empty() {
            debug!("No {} columns in {}, skipped", group.kind, table.path.display());
            continue;
        }
        found.sort_by_key(|(pos, _, _)| *pos);
        if let Some(w) = found.windows(2).find(|w| w[0].0 == w[1].0) {
            if options.collision_policy == CollisionPolicy::Strict {
                return Err(NamingError::Collision {
                    name: w[0].2.clone(),
                    first: table.headers[w[0].1].clone(),
                    second: table.headers[w[1].1].clone(),
                }
                .into());
            }
            // stable sort: the first column of each sample comes first
            found.dedup_by_key(|(pos, _, _)| *pos);
        }

        let cols: Vec<usize> = found.iter().map(|(_, c, _)| *c).collect();
        let names: Vec<String> = found.into_iter().map(|(_, _, n)| n).collect();
        let flags = mask(&cols);
        let matrix = build_matrix(table, group, &cols, names, flags.as_deref(), decimal, &row_names);
        matrices.insert(group.kind, matrix);
    }

    info!(
        "Assembled {} matrices ({} rows, {} samples) from {}",
        matrices.len(),
        row_names.len(),
        sample_names.len(),
        table.path.display()
    );
    Ok(Assembled {
        sample_names,
        row_names,
        decimal,
        matrices,
    })
}
