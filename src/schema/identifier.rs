//! Header text to identifier conversion.
//!
//! Normalization is a hard gate: anything that could corrupt generated source
//! is rejected instead of sanitized.

use crate::error::{InvalidNameReason, SchemaError};
use crate::schema::TypeDescriptor;

/// Identifiers that are keywords even in PascalCase.
const RESERVED: &[&str] = &["Self"];

/// Convert raw header text into a PascalCase identifier.
///
/// `"Item Name"` becomes `"ItemName"`, `"2nd_place"` becomes `"_2NdPlace"`.
pub fn normalize(raw: &str) -> Result<String, SchemaError> {
    normalize_with(raw).map_err(|reason| SchemaError::InvalidFieldName {
        name: raw.to_string(),
        reason,
    })
}

/// Same algorithm as [`normalize`], reported as a type-name failure.
pub fn normalize_type_name(raw: &str) -> Result<String, SchemaError> {
    normalize_with(raw).map_err(|reason| SchemaError::InvalidTypeName {
        name: raw.to_string(),
        reason,
    })
}

fn normalize_with(raw: &str) -> Result<String, InvalidNameReason> {
    if raw.trim().is_empty() {
        return Err(InvalidNameReason::Empty);
    }
    if let Some(ch) = raw
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '_' || ch.is_whitespace()))
    {
        return Err(InvalidNameReason::IllegalCharacter(ch));
    }

    let mut identifier = String::with_capacity(raw.len());
    for token in raw
        .split_whitespace()
        .flat_map(|word| word.split('_'))
        .filter(|token| !token.is_empty())
    {
        identifier.push_str(&capitalize_first_letter(token));
    }

    if identifier.is_empty() {
        return Err(InvalidNameReason::NoIdentifierCharacters);
    }
    if identifier.starts_with(|ch: char| ch.is_ascii_digit()) {
        identifier.insert(0, '_');
    }
    if RESERVED.contains(&identifier.as_str()) {
        identifier.push('_');
    }
    Ok(identifier)
}

/// Upper-case the first alphabetic character, keep everything else as written.
fn capitalize_first_letter(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut done = false;
    for ch in token.chars() {
        if !done && ch.is_ascii_alphabetic() {
            out.push(ch.to_ascii_uppercase());
            done = true;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Suffix-rule English pluralization.
pub fn pluralize(identifier: &str) -> String {
    if identifier.is_empty() {
        return String::new();
    }

    let lower = identifier.to_lowercase();
    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{identifier}es");
    }

    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if before.is_alphabetic() && !"aeiou".contains(before) {
            let stem = &identifier[..identifier.len() - 1];
            return format!("{stem}ies");
        }
    }

    format!("{identifier}s")
}

/// Member name / JSON key for a field. Array fields are pluralized.
///
/// Code generation and value generation both go through this function, so a
/// generated member and its JSON key can never disagree.
pub fn member_name(raw_name: &str, descriptor: &TypeDescriptor) -> Result<String, SchemaError> {
    let identifier = normalize(raw_name)?;
    if descriptor.is_array() {
        Ok(pluralize(&identifier))
    } else {
        Ok(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn normalizes_spaced_and_underscored_names() {
        assert_eq!(normalize("Item Name").unwrap(), "ItemName");
        assert_eq!(normalize("  max   hp ").unwrap(), "MaxHp");
        assert_eq!(normalize("drop_rate").unwrap(), "DropRate");
        assert_eq!(normalize("itemID").unwrap(), "ItemID");
    }

    #[test]
    fn prefixes_leading_digit() {
        assert_eq!(normalize("2nd_place").unwrap(), "_2NdPlace");
        assert_eq!(normalize("3").unwrap(), "_3");
    }

    #[test]
    fn rejects_empty_and_illegal_names() {
        assert_matches!(
            normalize(""),
            Err(SchemaError::InvalidFieldName {
                reason: InvalidNameReason::Empty,
                ..
            })
        );
        assert_matches!(
            normalize("bad*name"),
            Err(SchemaError::InvalidFieldName {
                reason: InvalidNameReason::IllegalCharacter('*'),
                ..
            })
        );
        assert_matches!(
            normalize("__"),
            Err(SchemaError::InvalidFieldName {
                reason: InvalidNameReason::NoIdentifierCharacters,
                ..
            })
        );
    }

    #[test]
    fn rejects_characters_outside_ascii_identifiers() {
        for (raw, bad) in [("hp²", '²'), ("½ price", '½'), ("café", 'é'), ("Ⅻ", 'Ⅻ')] {
            assert_matches!(
                normalize(raw),
                Err(SchemaError::InvalidFieldName {
                    reason: InvalidNameReason::IllegalCharacter(ch),
                    ..
                }) if ch == bad
            );
        }
    }

    #[test]
    fn reserved_words_get_suffix() {
        assert_eq!(normalize("self").unwrap(), "Self_");
    }

    #[test]
    fn pluralizes_by_suffix() {
        assert_eq!(pluralize("Box"), "Boxes");
        assert_eq!(pluralize("Bonus"), "Bonuses");
        assert_eq!(pluralize("Match"), "Matches");
        assert_eq!(pluralize("Enemy"), "Enemies");
        assert_eq!(pluralize("Key"), "Keys");
        assert_eq!(pluralize("Item"), "Items");
    }

    #[test]
    fn member_name_pluralizes_only_arrays() {
        let array = TypeDescriptor::resolve("int[]");
        let scalar = TypeDescriptor::resolve("int");
        assert_eq!(member_name("reward item", &array).unwrap(), "RewardItems");
        assert_eq!(member_name("reward item", &scalar).unwrap(), "RewardItem");
    }
}
