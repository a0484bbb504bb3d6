use async_trait::async_trait;
use indexmap::IndexMap;

use super::SheetSource;
use crate::error::SourceError;
use crate::schema::CellGrid;

/// Grids held in memory, keyed by spreadsheet id and sheet name.
#[derive(Debug, Clone, Default)]
pub struct GridSource {
    sheets: IndexMap<(String, String), CellGrid>,
}

impl GridSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, spreadsheet_id: &str, sheet_name: &str, grid: CellGrid) -> Self {
        self.insert(spreadsheet_id, sheet_name, grid);
        self
    }

    pub fn insert(&mut self, spreadsheet_id: &str, sheet_name: &str, grid: CellGrid) {
        self.sheets
            .insert((spreadsheet_id.to_string(), sheet_name.to_string()), grid);
    }
}

#[async_trait]
impl SheetSource for GridSource {
    async fn fetch(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<CellGrid, SourceError> {
        self.sheets
            .get(&(spreadsheet_id.to_string(), sheet_name.to_string()))
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                spreadsheet: spreadsheet_id.to_string(),
                sheet: sheet_name.to_string(),
            })
    }
}
