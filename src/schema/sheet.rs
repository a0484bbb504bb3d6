//! Raw cell grid to schema + rows.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::SchemaError;
use crate::schema::{TypeDescriptor, identifier};

/// How a sheet maps onto records.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SheetMode {
    /// Row 1 holds types, row 2 holds names, every further row is a record.
    #[default]
    Table,
    /// Each row is a `(type, name, value)` triple; the sheet is one record.
    Const,
}

/// Rectangular-ish grid of cell text as returned by a source.
///
/// Rows may have different lengths; missing cells read as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellGrid {
    rows: Vec<Vec<String>>,
}

impl CellGrid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Trimmed cell text, `""` when the cell does not exist.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(|cell| cell.trim())
            .unwrap_or("")
    }

    fn trimmed_row(&self, row: usize) -> Vec<String> {
        self.rows
            .get(row)
            .map(|cells| cells.iter().map(|cell| cell.trim().to_string()).collect())
            .unwrap_or_default()
    }
}

/// Field names paired positionally with raw type tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSchema {
    pub field_names: Vec<String>,
    pub field_types: Vec<String>,
}

/// One usable schema column after type resolution and naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// Position of the field in the data rows.
    pub column: usize,
    pub name: String,
    pub type_token: String,
    pub descriptor: TypeDescriptor,
    /// Member name in generated code and key in generated JSON.
    pub member: String,
}

impl SheetSchema {
    /// Number of usable columns: names beyond the last type token are dropped,
    /// as are type tokens beyond the last name.
    pub fn usable_len(&self) -> usize {
        self.field_names.len().min(self.field_types.len())
    }

    pub fn is_empty(&self) -> bool {
        self.field_names.iter().all(|name| name.trim().is_empty())
    }

    /// Resolve every usable field. Blank header cells are skipped; any other
    /// name must normalize, and no two fields may share a member name.
    pub fn resolve(&self) -> Result<Vec<ResolvedField>, SchemaError> {
        let mut fields: Vec<ResolvedField> = Vec::with_capacity(self.usable_len());
        for column in 0..self.usable_len() {
            let name = self.field_names[column].trim();
            if name.is_empty() {
                continue;
            }
            let type_token = self.field_types[column].trim();
            let descriptor = TypeDescriptor::resolve(type_token);
            let member = identifier::member_name(name, &descriptor)?;

            if let Some(existing) = fields.iter().find(|field| field.member == member) {
                return Err(SchemaError::DuplicateMember {
                    member,
                    first: existing.name.clone(),
                    second: name.to_string(),
                });
            }

            fields.push(ResolvedField {
                column,
                name: name.to_string(),
                type_token: type_token.to_string(),
                descriptor,
                member,
            });
        }
        Ok(fields)
    }
}

/// Ordered raw cell values aligned with the schema.
pub type DataRow = Vec<String>;

/// Output of [`parse_sheet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSheet {
    pub sheet_name: String,
    pub mode: SheetMode,
    pub schema: SheetSchema,
    pub rows: Vec<DataRow>,
}

impl ParsedSheet {
    pub fn empty(sheet_name: &str, mode: SheetMode) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            mode,
            schema: SheetSchema::default(),
            rows: Vec::new(),
        }
    }
}

/// Interpret a cell grid according to `mode`.
///
/// Never fails: a grid too small to carry a schema yields an empty schema,
/// which callers treat as "nothing to generate".
pub fn parse_sheet(sheet_name: &str, grid: &CellGrid, mode: SheetMode) -> ParsedSheet {
    match mode {
        SheetMode::Table => parse_table(sheet_name, grid),
        SheetMode::Const => parse_const(sheet_name, grid),
    }
}

fn parse_table(sheet_name: &str, grid: &CellGrid) -> ParsedSheet {
    if grid.row_count() < 2 {
        return ParsedSheet::empty(sheet_name, SheetMode::Table);
    }

    let schema = SheetSchema {
        field_types: grid.trimmed_row(0),
        field_names: grid.trimmed_row(1),
    };
    let rows = (2..grid.row_count()).map(|row| grid.trimmed_row(row)).collect();

    ParsedSheet {
        sheet_name: sheet_name.to_string(),
        mode: SheetMode::Table,
        schema,
        rows,
    }
}

fn parse_const(sheet_name: &str, grid: &CellGrid) -> ParsedSheet {
    let mut schema = SheetSchema::default();
    let mut values = DataRow::new();

    for row in 0..grid.row_count() {
        let name = grid.cell(row, 1);
        if name.is_empty() {
            continue;
        }
        schema.field_types.push(grid.cell(row, 0).to_string());
        schema.field_names.push(name.to_string());
        values.push(grid.cell(row, 2).to_string());
    }

    let rows = if schema.field_names.is_empty() {
        Vec::new()
    } else {
        vec![values]
    };

    ParsedSheet {
        sheet_name: sheet_name.to_string(),
        mode: SheetMode::Const,
        schema,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn table_sheet_splits_header_rows() {
        let grid = CellGrid::from_rows(vec![
            vec!["int", " string "],
            vec!["Count", "Label"],
            vec!["", "x"],
        ]);
        let parsed = parse_sheet("Items", &grid, SheetMode::Table);
        assert_eq!(parsed.schema.field_types, vec!["int", "string"]);
        assert_eq!(parsed.schema.field_names, vec!["Count", "Label"]);
        assert_eq!(parsed.rows, vec![vec!["".to_string(), "x".to_string()]]);
    }

    #[test]
    fn table_sheet_with_one_row_has_empty_schema() {
        let grid = CellGrid::from_rows(vec![vec!["int"]]);
        let parsed = parse_sheet("Items", &grid, SheetMode::Table);
        assert!(parsed.schema.is_empty());
        assert!(parsed.rows.is_empty());
    }

    #[test]
    fn const_sheet_collects_named_rows_into_one_record() {
        let grid = CellGrid::from_rows(vec![
            vec!["int", "Hp", "100"],
            vec!["string", "", "ignored"],
            vec!["string", "Name", "Hero"],
            vec!["bool", "Boss"],
        ]);
        let parsed = parse_sheet("Config", &grid, SheetMode::Const);
        assert_eq!(parsed.schema.field_names, vec!["Hp", "Name", "Boss"]);
        assert_eq!(parsed.schema.field_types, vec!["int", "string", "bool"]);
        assert_eq!(
            parsed.rows,
            vec![vec!["100".to_string(), "Hero".to_string(), String::new()]]
        );
    }

    #[test]
    fn resolve_drops_trailing_types_and_blank_names() {
        let schema = SheetSchema {
            field_names: vec!["Id".into(), "".into(), "Tags".into()],
            field_types: vec!["int".into(), "int".into(), "string[]".into(), "bool".into()],
        };
        let fields = schema.resolve().unwrap();
        let members: Vec<_> = fields.iter().map(|f| f.member.as_str()).collect();
        assert_eq!(members, vec!["Id", "Tags"]);
        assert_eq!(fields[1].column, 2);
    }

    #[test]
    fn resolve_rejects_colliding_members() {
        let schema = SheetSchema {
            field_names: vec!["item name".into(), "Item_Name".into()],
            field_types: vec!["int".into(), "int".into()],
        };
        assert_matches!(schema.resolve(), Err(SchemaError::DuplicateMember { .. }));
    }

    #[test]
    fn sheet_mode_parses_from_text() {
        assert_eq!("CONST".parse::<SheetMode>().unwrap(), SheetMode::Const);
        assert_eq!(SheetMode::Table.to_string(), "table");
    }
}
