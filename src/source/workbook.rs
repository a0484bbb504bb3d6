use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::task;
use umya_spreadsheet::reader::xlsx;

use super::{CellRange, SheetSource};
use crate::error::SourceError;
use crate::schema::CellGrid;

/// Reads sheets from `.xlsx` files. The spreadsheet id is the workbook path,
/// relative to the source root unless absolute.
#[derive(Debug, Clone)]
pub struct WorkbookSource {
    root: PathBuf,
    range: CellRange,
}

impl WorkbookSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            range: CellRange::default(),
        }
    }

    pub fn with_range(mut self, range: CellRange) -> Self {
        self.range = range;
        self
    }

    fn resolve(&self, spreadsheet_id: &str) -> PathBuf {
        let path = Path::new(spreadsheet_id);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl SheetSource for WorkbookSource {
    async fn fetch(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<CellGrid, SourceError> {
        let path = self.resolve(spreadsheet_id);
        let range = self.range;
        let spreadsheet = spreadsheet_id.to_string();
        let sheet = sheet_name.to_string();

        task::spawn_blocking(move || read_grid(&path, &spreadsheet, &sheet, range))
            .await
            .map_err(|err| SourceError::Workbook {
                path: PathBuf::from(spreadsheet_id),
                message: err.to_string(),
            })?
    }
}

fn read_grid(
    path: &Path,
    spreadsheet_id: &str,
    sheet_name: &str,
    range: CellRange,
) -> Result<CellGrid, SourceError> {
    let book = xlsx::read(path).map_err(|err| SourceError::Workbook {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let sheet = book
        .get_sheet_by_name(sheet_name)
        .ok_or_else(|| SourceError::NotFound {
            spreadsheet: spreadsheet_id.to_string(),
            sheet: sheet_name.to_string(),
        })?;

    let last_row = range.last_row.unwrap_or_else(|| sheet.get_highest_row());
    let mut rows = Vec::new();
    for row in range.first_row..=last_row {
        let mut cells: Vec<String> = (range.first_column..=range.last_column)
            .map(|column| {
                sheet
                    .get_cell((column, row))
                    .map(|cell| cell.get_value().to_string())
                    .unwrap_or_default()
            })
            .collect();
        while cells.last().is_some_and(|cell| cell.is_empty()) {
            cells.pop();
        }
        rows.push(cells);
    }
    while rows.last().is_some_and(|row| row.is_empty()) {
        rows.pop();
    }

    tracing::debug!(
        workbook = %path.display(),
        sheet = sheet_name,
        rows = rows.len(),
        "read workbook sheet"
    );
    Ok(CellGrid::new(rows))
}
