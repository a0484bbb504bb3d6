//! Row data to typed JSON.
//!
//! The JSON produced here is the wire contract the binder deserializes into
//! generated records: Table sheets become an array of objects, Const sheets a
//! single object, keys are member names, and pairs are `[key, value]`.
//!
//! Cell text is best effort. Empty or malformed cells become the zero value of
//! the declared type; `null` is reserved for opaque types and invalid pairs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::schema::{DataRow, ParsedSheet, PrimitiveKind, ResolvedField, SheetMode, TypeDescriptor};

/// Matches one parenthesized pair literal inside an array-of-pairs cell.
static PAIR_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]*)\)").expect("pair group pattern is valid"));

/// Canonical empty document for a mode.
pub fn empty_document(mode: SheetMode) -> Value {
    match mode {
        SheetMode::Table => Value::Array(Vec::new()),
        SheetMode::Const => Value::Object(Map::new()),
    }
}

/// Build the JSON document for a parsed sheet.
///
/// Only schema errors fail; any missing schema or row data yields the mode's
/// empty document.
pub fn generate_value(sheet: &ParsedSheet) -> Result<Value, SchemaError> {
    let fields = sheet.schema.resolve()?;
    if fields.is_empty() {
        return Ok(empty_document(sheet.mode));
    }

    let document = match sheet.mode {
        SheetMode::Const => match sheet.rows.first() {
            Some(row) => Value::Object(row_object(row, &fields)),
            None => empty_document(SheetMode::Const),
        },
        SheetMode::Table => Value::Array(
            sheet
                .rows
                .iter()
                .map(|row| Value::Object(row_object(row, &fields)))
                .collect(),
        ),
    };
    Ok(document)
}

/// Serialized payload stored on a generation job.
pub fn to_payload(document: &Value) -> String {
    format!("{document:#}")
}

fn row_object(row: &DataRow, fields: &[ResolvedField]) -> Map<String, Value> {
    let mut object = Map::with_capacity(fields.len());
    for field in fields {
        let text = row.get(field.column).map(|cell| cell.trim()).unwrap_or("");
        object.insert(field.member.clone(), convert_cell(text, &field.descriptor));
    }
    object
}

/// Convert one cell's text against its declared type.
pub fn convert_cell(text: &str, descriptor: &TypeDescriptor) -> Value {
    match descriptor {
        TypeDescriptor::Primitive(kind) => convert_primitive(text, *kind),
        TypeDescriptor::Array(element) => convert_array(text, element),
        TypeDescriptor::Pair(key, value) => convert_pair(text, key, value),
    }
}

fn convert_primitive(text: &str, kind: PrimitiveKind) -> Value {
    let trimmed = text.trim();
    match kind {
        PrimitiveKind::Int => Value::from(trimmed.parse::<i32>().unwrap_or(0)),
        PrimitiveKind::Float => {
            // Go through the shortest f32 representation so "1.1" stays 1.1.
            let parsed = trimmed
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .and_then(|value| value.to_string().parse::<f64>().ok())
                .unwrap_or(0.0);
            Value::from(parsed)
        }
        PrimitiveKind::Double => {
            let parsed = trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .unwrap_or(0.0);
            Value::from(parsed)
        }
        PrimitiveKind::Bool => Value::Bool(trimmed.eq_ignore_ascii_case("true")),
        PrimitiveKind::String => Value::String(text.to_string()),
        PrimitiveKind::Opaque => Value::Null,
    }
}

fn convert_array(text: &str, element: &TypeDescriptor) -> Value {
    if element.contains_opaque() {
        return Value::Null;
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Array(Vec::new());
    }

    if let TypeDescriptor::Pair(key, value) = element {
        // Pair members may contain commas, so flat splitting is ambiguous here.
        let items = PAIR_GROUP
            .captures_iter(trimmed)
            .filter_map(|captures| captures.get(1))
            .map(|inner| convert_pair(inner.as_str(), key, value))
            .collect();
        return Value::Array(items);
    }

    let body = strip_enclosing(trimmed, '[', ']');
    let items = split_top_level(body)
        .into_iter()
        .map(str::trim)
        .filter(|component| !component.is_empty())
        .map(|component| convert_cell(component, element))
        .collect();
    Value::Array(items)
}

fn convert_pair(text: &str, key: &TypeDescriptor, value: &TypeDescriptor) -> Value {
    if key.contains_opaque() || value.contains_opaque() {
        return Value::Null;
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Array(vec![convert_cell("", key), convert_cell("", value)]);
    }

    let body = strip_enclosing(trimmed, '(', ')');
    let Some((key_text, value_text)) = split_once_top_level(body) else {
        return Value::Null;
    };

    let key = convert_cell(key_text.trim(), key);
    let value = convert_cell(value_text.trim(), value);
    if key.is_null() || value.is_null() {
        return Value::Null;
    }
    Value::Array(vec![key, value])
}

/// Remove one bracket pair, but only when the opening bracket closes at the
/// very end (`[1],[2]` is left alone).
fn strip_enclosing(text: &str, open: char, close: char) -> &str {
    if !(text.starts_with(open) && text.ends_with(close)) {
        return text;
    }
    let mut depth = 0usize;
    for (index, ch) in text.char_indices() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return if index + close.len_utf8() == text.len() {
                    &text[open.len_utf8()..index]
                } else {
                    text
                };
            }
        }
    }
    text
}

fn nesting_delta(ch: char) -> isize {
    match ch {
        '(' | '[' => 1,
        ')' | ']' => -1,
        _ => 0,
    }
}

/// Split on commas outside any `(...)` or `[...]` group.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0isize;
    let mut start = 0;
    for (index, ch) in text.char_indices() {
        if ch == ',' && depth <= 0 {
            parts.push(&text[start..index]);
            start = index + 1;
        } else {
            depth += nesting_delta(ch);
        }
    }
    parts.push(&text[start..]);
    parts
}

fn split_once_top_level(text: &str) -> Option<(&str, &str)> {
    let mut depth = 0isize;
    for (index, ch) in text.char_indices() {
        if ch == ',' && depth <= 0 {
            return Some((&text[..index], &text[index + 1..]));
        }
        depth += nesting_delta(ch);
    }
    None
}
