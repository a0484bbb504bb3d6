//! Where cell grids come from.
//!
//! A source maps `(spreadsheet id, sheet name)` to a [`CellGrid`] read over a
//! rectangular range. All sources default to `A1:Z`: columns A through Z,
//! every row.

pub mod google;
pub mod memory;
pub mod workbook;

pub use google::GoogleSheetsSource;
pub use memory::GridSource;
pub use workbook::WorkbookSource;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use crate::error::SourceError;
use crate::schema::CellGrid;

pub const DEFAULT_RANGE: &str = "A1:Z";

#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<CellGrid, SourceError>;
}

/// An A1-style range, 1-based and inclusive. A missing end row means "to the
/// last populated row".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_column: u32,
    pub first_row: u32,
    pub last_column: u32,
    pub last_row: Option<u32>,
}

impl Default for CellRange {
    fn default() -> Self {
        Self {
            first_column: 1,
            first_row: 1,
            last_column: 26,
            last_row: None,
        }
    }
}

impl CellRange {
    pub fn column_count(&self) -> usize {
        (self.last_column - self.first_column + 1) as usize
    }
}

impl FromStr for CellRange {
    type Err = SourceError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SourceError::InvalidRange {
            range: text.to_string(),
            reason: reason.to_string(),
        };
        let (start, end) = text
            .trim()
            .split_once(':')
            .ok_or_else(|| invalid("expected START:END"))?;
        let (first_column, first_row) = parse_reference(start).ok_or_else(|| invalid("bad start cell"))?;
        let first_row = first_row.ok_or_else(|| invalid("start cell needs a row"))?;
        let (last_column, last_row) = parse_reference(end).ok_or_else(|| invalid("bad end cell"))?;

        if last_column < first_column || last_row.is_some_and(|row| row < first_row) {
            return Err(invalid("end precedes start"));
        }
        Ok(Self {
            first_column,
            first_row,
            last_column,
            last_row,
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", column_letters(self.first_column), self.first_row, column_letters(self.last_column))?;
        if let Some(row) = self.last_row {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

/// `"AB12"` → `(28, Some(12))`, `"C"` → `(3, None)`.
fn parse_reference(text: &str) -> Option<(u32, Option<u32>)> {
    let text = text.trim().trim_start_matches('$');
    let split = text.find(|ch: char| !ch.is_ascii_alphabetic()).unwrap_or(text.len());
    let (letters, digits) = text.split_at(split);
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let column = letters
        .chars()
        .fold(0u32, |acc, ch| acc * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1));
    let digits = digits.trim_start_matches('$');
    let row = if digits.is_empty() {
        None
    } else {
        match digits.parse::<u32>() {
            Ok(row) if row > 0 => Some(row),
            _ => return None,
        }
    };
    Some((column, row))
}

fn column_letters(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}
