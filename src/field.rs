//! Per-track metadata fields and the label/key codec.
//!
//! Every track carries a dynamic map of named fields (title, genre, release
//! year, ...). Keys are camel-case identifiers derived from display labels;
//! the reverse derivation used on import is a lossy heuristic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The inferred type of a field, driving how values are parsed and edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free-form text value
    Text,
    /// A year, stored as an integer when it parses as one
    Year,
}

/// A field value: either free text or an integer year.
///
/// Year-typed fields fall back to [`FieldValue::Text`] when the raw value
/// does not parse as an integer, preserving whatever the source provided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integer year value
    Year(i64),
    /// Text value
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Year(year) => write!(f, "{year}"),
            FieldValue::Text(text) => write!(f, "{text}"),
        }
    }
}

/// One named, typed metadata attribute on a track.
///
/// `mandatory` is the inverse of the "bonus" classification: mandatory
/// fields become `point_fields` on export, bonus fields become
/// `bonus_fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Normalized camel-case identifier, unique within a track's field map
    pub key: String,
    /// Human-readable display label the key was derived from
    pub label: String,
    /// Inferred type, fixed at creation
    pub field_type: FieldType,
    /// The field's value
    pub value: FieldValue,
    /// Whether this field is mandatory (not a bonus question)
    pub mandatory: bool,
}

impl Field {
    /// Create a field from a display label and raw value.
    ///
    /// The key is derived with [`to_key`], the type with [`infer_type`].
    /// Year-typed values are integer-parsed with a raw-string fallback.
    pub fn new(label: &str, value: &str, bonus: bool) -> Self {
        let label = label.trim().to_string();
        let key = to_key(&label);
        let field_type = infer_type(&key, &label);
        Self {
            key,
            value: coerce_value(field_type, value),
            label,
            field_type,
            mandatory: !bonus,
        }
    }

    /// Create a field from a bare key, reconstructing the label with the
    /// lossy [`key_to_label`] inverse. Used when importing documents that
    /// only persist keys.
    pub fn from_key(key: &str, value: &str, bonus: bool) -> Self {
        let field_type = infer_type(key, key);
        Self {
            key: key.to_string(),
            label: key_to_label(key),
            field_type,
            value: coerce_value(field_type, value),
            mandatory: !bonus,
        }
    }
}

fn coerce_value(field_type: FieldType, raw: &str) -> FieldValue {
    match field_type {
        FieldType::Year => raw
            .trim()
            .parse::<i64>()
            .map(FieldValue::Year)
            .unwrap_or_else(|_| FieldValue::Text(raw.to_string())),
        FieldType::Text => FieldValue::Text(raw.to_string()),
    }
}

/// Derive a camel-case key from a display label.
///
/// The first word is lower-cased, subsequent words are title-cased, and all
/// whitespace is stripped: `"Release Year"` becomes `"releaseYear"`.
pub fn to_key(label: &str) -> String {
    label
        .split_whitespace()
        .enumerate()
        .map(|(index, word)| {
            if index == 0 {
                word.to_lowercase()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            }
        })
        .collect()
}

/// Infer a field's type from its key and label.
///
/// Case-insensitive: any occurrence of "year" in either makes it
/// [`FieldType::Year`], everything else is [`FieldType::Text`].
pub fn infer_type(key: &str, label: &str) -> FieldType {
    if key.to_lowercase().contains("year") || label.to_lowercase().contains("year") {
        FieldType::Year
    } else {
        FieldType::Text
    }
}

/// Best-effort inverse of [`to_key`]: uppercase the first letter and insert
/// a space before every internal uppercase letter.
///
/// This is lossy. `"releaseYear"` round-trips to `"Release Year"`, but an
/// original label like `"MTV Award"` will not be recovered exactly.
pub fn key_to_label(key: &str) -> String {
    let mut label = String::with_capacity(key.len() + 4);
    for (index, ch) in key.chars().enumerate() {
        if index == 0 {
            label.extend(ch.to_uppercase());
        } else if ch.is_uppercase() {
            label.push(' ');
            label.push(ch);
        } else {
            label.push(ch);
        }
    }
    label
}

/// An insertion-ordered map of fields keyed by their normalized key.
///
/// Order is the order fields were first inserted and carries no semantic
/// meaning; it is preserved so exports and prompts render fields the way
/// the user arranged them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    fields: Vec<Field>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing any existing entry with the same key in
    /// place (the original position is kept).
    pub fn insert(&mut self, field: Field) {
        match self.fields.iter_mut().find(|f| f.key == field.key) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Field> {
        let index = self.fields.iter().position(|f| f.key == key)?;
        Some(self.fields.remove(index))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }
}

impl FromIterator<Field> for FieldMap {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for field in iter {
            map.insert(field);
        }
        map
    }
}

impl IntoIterator for FieldMap {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_key_camel_cases_labels() {
        assert_eq!(to_key("Release Year"), "releaseYear");
        assert_eq!(to_key("title"), "title");
        assert_eq!(to_key("  Movie or video game  "), "movieOrVideoGame");
        assert_eq!(to_key("GENRE"), "genre");
    }

    #[test]
    fn test_key_derivation_idempotent_through_label_inverse() {
        for label in ["Release Year", "Genre", "Album Name", "movie title", "X"] {
            let key = to_key(label);
            assert_eq!(to_key(&key_to_label(&key)), key, "label: {label}");
        }
    }

    #[test]
    fn test_key_to_label_is_lossy_for_acronyms() {
        // "MTV Award" -> "mtvAward" -> "Mtv Award"; documented asymmetry.
        assert_eq!(key_to_label(&to_key("MTV Award")), "Mtv Award");
    }

    #[test]
    fn test_infer_type_matches_year_substring() {
        assert_eq!(infer_type("releaseYear", "Release Year"), FieldType::Year);
        assert_eq!(infer_type("year", "year"), FieldType::Year);
        assert_eq!(infer_type("genre", "Genre"), FieldType::Text);
        // Label alone is enough.
        assert_eq!(infer_type("rY", "release YEAR"), FieldType::Year);
    }

    #[test]
    fn test_year_value_parses_to_integer() {
        let field = Field::new("Release Year", "1984", false);
        assert_eq!(field.field_type, FieldType::Year);
        assert_eq!(field.value, FieldValue::Year(1984));
    }

    #[test]
    fn test_year_value_falls_back_to_raw_string() {
        let field = Field::new("Release Year", "early 80s", false);
        assert_eq!(field.field_type, FieldType::Year);
        assert_eq!(field.value, FieldValue::Text("early 80s".to_string()));
    }

    #[test]
    fn test_field_map_preserves_insertion_order_and_replaces_in_place() {
        let mut map = FieldMap::new();
        map.insert(Field::new("Title", "Song", false));
        map.insert(Field::new("Genre", "Pop", false));
        map.insert(Field::new("Title", "Renamed", false));

        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["title", "genre"]);
        assert_eq!(
            map.get("title").unwrap().value,
            FieldValue::Text("Renamed".to_string())
        );
    }

    #[test]
    fn test_field_map_remove() {
        let mut map = FieldMap::new();
        map.insert(Field::new("Title", "Song", false));
        map.insert(Field::new("Genre", "Pop", true));
        assert!(map.remove("genre").is_some());
        assert!(!map.contains_key("genre"));
        assert!(map.remove("genre").is_none());
    }
}
