//! In-memory representation of a sniffed vendor export.

use std::path::{Path, PathBuf};

/// A delimited table loaded from a single discovered file.
///
/// Cells are kept as text; numeric coercion happens when intensity
/// matrices are assembled, because the decimal convention is only known
/// after the quantity columns have been inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column headers in file order.
    pub headers: Vec<String>,
    /// Data rows, each exactly `headers.len()` cells wide.
    pub rows: Vec<Vec<String>>,
    /// Field delimiter that produced an accepted parse.
    pub delimiter: u8,
    /// File the table was read from.
    pub path: PathBuf,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>, delimiter: u8, path: &Path) -> Self {
        RawTable {
            headers,
            rows,
            delimiter,
            path: path.to_path_buf(),
        }
    }

    /// Number of data rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    /// Position of the column named exactly `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Indices of every column whose header satisfies `pred`, in file order.
    pub fn column_indices<F>(&self, pred: F) -> Vec<usize>
    where
        F: Fn(&str) -> bool,
    {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| pred(h))
            .map(|(i, _)| i)
            .collect()
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(idx).map(String::as_str).unwrap_or(""))
    }

    /// Cell at `(row, col)`; out-of-range positions read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> RawTable {
        RawTable::new(
            vec!["id".into(), "a.Quantity".into(), "b.Quantity".into()],
            vec![
                vec!["P1".into(), "1".into(), "2".into()],
                vec!["P2".into(), "3".into(), "4".into()],
            ],
            b',',
            Path::new("table.csv"),
        )
    }

    #[test]
    fn test_column_lookup() {
        let table = small_table();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.n_cols(), 3);
        assert_eq!(table.column_index("b.Quantity"), Some(2));
        assert_eq!(table.column_index("missing"), None);
        assert_eq!(
            table.column_indices(|h| h.contains(".Quantity")),
            vec![1, 2]
        );
    }

    #[test]
    fn test_cells() {
        let table = small_table();
        assert_eq!(table.column(0).collect::<Vec<_>>(), vec!["P1", "P2"]);
        assert_eq!(table.cell(1, 2), "4");
        assert_eq!(table.cell(5, 0), "");
    }
}
