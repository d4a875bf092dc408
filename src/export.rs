//! Spreadsheet export.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Column-oriented table: one named column per field, one cell per city.
///
/// Every column always holds the same number of cells.
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    columns: Vec<Column>,
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    cells: Vec<Option<String>>,
}

impl DataTable {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: names
                .into_iter()
                .map(|name| Column {
                    name: name.into(),
                    cells: Vec::new(),
                })
                .collect(),
        }
    }

    /// Append one row. Missing trailing cells are blank; extra cells are
    /// ignored.
    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        let mut row = row.into_iter();
        for column in &mut self.columns {
            column.cells.push(row.next().flatten());
        }
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.cells.as_slice())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |c| c.cells.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn row(&self, i: usize) -> impl Iterator<Item = &str> {
        self.columns.iter().map(move |c| c.cells[i].as_deref().unwrap_or(""))
    }
}

/// Write `table` as CSV with a header row. Blank cells are empty strings.
pub fn export_csv(table: &DataTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }

    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.headers())?;
    for i in 0..table.len() {
        wtr.write_record(table.row(i))?;
    }
    wtr.flush().map_err(|e| Error::io(path, e))?;

    info!(path = %path.display(), rows = table.len(), "data saved");
    Ok(())
}
