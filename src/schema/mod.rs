//! Sheet interpretation: type tokens, identifiers, and grid parsing.

pub mod descriptor;
pub mod identifier;
pub mod sheet;

pub use descriptor::{PrimitiveKind, TypeDescriptor};
pub use identifier::{member_name, normalize, normalize_type_name, pluralize};
pub use sheet::{CellGrid, DataRow, ParsedSheet, ResolvedField, SheetMode, SheetSchema, parse_sheet};
