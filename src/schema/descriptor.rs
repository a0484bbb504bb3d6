//! Header type tokens (`int`, `string[]`, `pair<int,string>`) and their
//! recursive representation.
//!
//! Every downstream component works from a parsed [`TypeDescriptor`]; the
//! token text is parsed exactly once per field.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar kinds a header cell may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Int,
    Float,
    Double,
    Bool,
    String,
    /// Any token the grammar does not recognize.
    Opaque,
}

impl PrimitiveKind {
    fn from_keyword(lower: &str) -> Self {
        match lower {
            "int" | "integer" => PrimitiveKind::Int,
            "float" | "number" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            "bool" | "boolean" => PrimitiveKind::Bool,
            "string" => PrimitiveKind::String,
            _ => PrimitiveKind::Opaque,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::String => "string",
            PrimitiveKind::Opaque => "object",
        }
    }

    fn rust_type(self) -> &'static str {
        match self {
            PrimitiveKind::Int => "i32",
            PrimitiveKind::Float => "f32",
            PrimitiveKind::Double => "f64",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::String => "String",
            PrimitiveKind::Opaque => "serde_json::Value",
        }
    }

    fn default_literal(self) -> &'static str {
        match self {
            PrimitiveKind::Int => "0",
            PrimitiveKind::Float | PrimitiveKind::Double => "0.0",
            PrimitiveKind::Bool => "false",
            PrimitiveKind::String => "String::new()",
            PrimitiveKind::Opaque => "serde_json::Value::Null",
        }
    }
}

/// Parsed shape of a field type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Array(Box<TypeDescriptor>),
    Pair(Box<TypeDescriptor>, Box<TypeDescriptor>),
}

const ARRAY_SUFFIX: &str = "[]";
const PAIR_PREFIX: &str = "pair<";

impl TypeDescriptor {
    pub const OPAQUE: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Opaque);

    /// Parse a header token. Keywords are matched case-insensitively.
    ///
    /// Returns `None` when the token is structurally unresolvable, e.g. a pair
    /// with anything other than two arguments. Unknown words are not a failure:
    /// they parse to [`PrimitiveKind::Opaque`].
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();

        if let Some(element) = token.strip_suffix(ARRAY_SUFFIX) {
            return Self::parse(element).map(|element| TypeDescriptor::Array(Box::new(element)));
        }

        let lower = token.to_ascii_lowercase();
        if lower.starts_with(PAIR_PREFIX) && lower.ends_with('>') {
            let arguments = &token[PAIR_PREFIX.len()..token.len() - 1];
            let parts = split_type_arguments(arguments)?;
            let [key, value] = <[&str; 2]>::try_from(parts.as_slice()).ok()?;
            let key = Self::parse_argument(key)?;
            let value = Self::parse_argument(value)?;
            return Some(TypeDescriptor::Pair(Box::new(key), Box::new(value)));
        }

        Some(TypeDescriptor::Primitive(PrimitiveKind::from_keyword(&lower)))
    }

    /// Parse for declaration purposes: unresolvable tokens degrade to opaque.
    pub fn resolve(token: &str) -> Self {
        Self::parse(token).unwrap_or(Self::OPAQUE)
    }

    fn parse_argument(argument: &str) -> Option<Self> {
        let argument = argument.trim();
        if argument.is_empty() {
            return None;
        }
        Self::parse(argument)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeDescriptor::Array(_))
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, TypeDescriptor::Primitive(PrimitiveKind::Opaque))
    }

    /// True when an opaque kind appears anywhere in the shape.
    pub fn contains_opaque(&self) -> bool {
        match self {
            TypeDescriptor::Primitive(kind) => *kind == PrimitiveKind::Opaque,
            TypeDescriptor::Array(element) => element.contains_opaque(),
            TypeDescriptor::Pair(key, value) => key.contains_opaque() || value.contains_opaque(),
        }
    }

    /// True when a pair appears anywhere in the shape.
    pub fn contains_pair(&self) -> bool {
        match self {
            TypeDescriptor::Primitive(_) => false,
            TypeDescriptor::Array(element) => element.contains_pair(),
            TypeDescriptor::Pair(..) => true,
        }
    }

    /// True when the generated declaration names `Pair`.
    pub fn declares_pair(&self) -> bool {
        self.contains_pair() && !self.contains_opaque()
    }

    /// Rust type used in generated declarations. Any shape with an opaque
    /// part is declared untyped, since its values are always `null`.
    pub fn render(&self) -> String {
        if self.contains_opaque() {
            return PrimitiveKind::Opaque.rust_type().to_string();
        }
        match self {
            TypeDescriptor::Primitive(kind) => kind.rust_type().to_string(),
            TypeDescriptor::Array(element) => format!("Vec<{}>", element.render()),
            TypeDescriptor::Pair(key, value) => {
                format!("Pair<{}, {}>", key.render(), value.render())
            }
        }
    }

    /// Rust expression used to initialize a generated field.
    pub fn default_literal(&self) -> String {
        if self.contains_opaque() {
            return PrimitiveKind::Opaque.default_literal().to_string();
        }
        match self {
            TypeDescriptor::Primitive(kind) => kind.default_literal().to_string(),
            TypeDescriptor::Array(_) => "Vec::new()".to_string(),
            TypeDescriptor::Pair(key, value) => format!(
                "Pair::new({}, {})",
                key.default_literal(),
                value.default_literal()
            ),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(kind) => f.write_str(kind.keyword()),
            TypeDescriptor::Array(element) => write!(f, "{element}{ARRAY_SUFFIX}"),
            TypeDescriptor::Pair(key, value) => write!(f, "{PAIR_PREFIX}{key},{value}>"),
        }
    }
}

/// Split generic arguments on commas that are not nested inside `<...>`.
/// Returns `None` for unbalanced brackets.
fn split_type_arguments(arguments: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, ch) in arguments.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(&arguments[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&arguments[start..]);
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prim(kind: PrimitiveKind) -> TypeDescriptor {
        TypeDescriptor::Primitive(kind)
    }

    #[test]
    fn parses_primitives_case_insensitively() {
        assert_eq!(TypeDescriptor::parse("INT"), Some(prim(PrimitiveKind::Int)));
        assert_eq!(TypeDescriptor::parse(" Bool "), Some(prim(PrimitiveKind::Bool)));
        assert_eq!(TypeDescriptor::parse("integer"), Some(prim(PrimitiveKind::Int)));
        assert_eq!(TypeDescriptor::parse("Vector3"), Some(TypeDescriptor::OPAQUE));
    }

    #[test]
    fn parses_nested_arrays_and_pairs() {
        let parsed = TypeDescriptor::parse("pair<int,string[]>[]").unwrap();
        assert_eq!(
            parsed,
            TypeDescriptor::Array(Box::new(TypeDescriptor::Pair(
                Box::new(prim(PrimitiveKind::Int)),
                Box::new(TypeDescriptor::Array(Box::new(prim(PrimitiveKind::String)))),
            )))
        );

        let nested = TypeDescriptor::parse("Pair<pair<int,bool>, double>").unwrap();
        assert_eq!(nested.to_string(), "pair<pair<int,bool>,double>");
    }

    #[test]
    fn pair_with_wrong_argument_count_is_unresolvable() {
        assert_eq!(TypeDescriptor::parse("pair<int>"), None);
        assert_eq!(TypeDescriptor::parse("pair<int,string,bool>"), None);
        assert_eq!(TypeDescriptor::parse("pair<int,>"), None);
        assert_eq!(TypeDescriptor::parse("pair<int>[]"), None);
        assert_eq!(TypeDescriptor::resolve("pair<int>"), TypeDescriptor::OPAQUE);
    }

    #[test]
    fn renders_rust_types_and_defaults() {
        let descriptor = TypeDescriptor::parse("pair<int,string>[]").unwrap();
        assert_eq!(descriptor.render(), "Vec<Pair<i32, String>>");
        assert_eq!(descriptor.default_literal(), "Vec::new()");

        let pair = TypeDescriptor::parse("pair<float,bool>").unwrap();
        assert_eq!(pair.default_literal(), "Pair::new(0.0, false)");
        assert_eq!(TypeDescriptor::OPAQUE.render(), "serde_json::Value");
    }

    #[test]
    fn shapes_with_opaque_parts_render_untyped() {
        for token in ["Vector3[]", "pair<int,Color>", "pair<Color,int>[]", "Vector3[][]"] {
            let descriptor = TypeDescriptor::resolve(token);
            assert_eq!(descriptor.render(), "serde_json::Value", "{token}");
            assert_eq!(descriptor.default_literal(), "serde_json::Value::Null", "{token}");
            assert!(!descriptor.declares_pair(), "{token}");
        }
        assert!(TypeDescriptor::resolve("pair<int,string>[]").declares_pair());
    }
}
