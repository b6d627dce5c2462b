//! Helpers for reading and normalizing attribute bags

use serde_yaml::{Mapping, Sequence, Value};

use crate::error::ConfigError;

use super::EntityKind;

/// An ordered mapping from field name to an arbitrary value tree
pub type Attributes = Mapping;

/// Textual form of a scalar value (string, number or boolean)
///
/// Returns `None` for null, sequences and mappings.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Whether a value counts as empty: null, an empty string, sequence or mapping
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Tagged(tagged) => is_blank(&tagged.value),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Read a required field that must be present and non-empty
pub(crate) fn required<'a>(
    attrs: &'a Attributes,
    field: &str,
    kind: EntityKind,
    id: Option<&str>,
) -> Result<&'a Value, ConfigError> {
    let value = attrs
        .get(field)
        .ok_or_else(|| ConfigError::missing(kind, id, field))?;
    if is_blank(value) {
        return Err(ConfigError::empty(kind, id, field));
    }
    Ok(value)
}

/// Read a required field whose value is a string or a number
pub(crate) fn required_identifier(
    attrs: &Attributes,
    kind: EntityKind,
) -> Result<String, ConfigError> {
    let value = required(attrs, "id", kind, None)?;
    scalar_text(value).ok_or_else(|| ConfigError::InvalidField {
        kind,
        id: String::new(),
        field: "id".to_string(),
        reason: "expected a string".to_string(),
    })
}

/// Read a required field whose value must be a string
pub(crate) fn required_string(
    attrs: &Attributes,
    field: &str,
    kind: EntityKind,
    id: &str,
) -> Result<String, ConfigError> {
    match required(attrs, field, kind, Some(id))? {
        Value::String(s) => Ok(s.clone()),
        _ => Err(ConfigError::invalid(kind, id, field, "expected a string")),
    }
}

/// Read an optional field that, when present, must be a sequence
///
/// A null value is treated as absent.
pub(crate) fn optional_sequence<'a>(
    attrs: &'a Attributes,
    field: &str,
    kind: EntityKind,
    id: &str,
) -> Result<Option<&'a Sequence>, ConfigError> {
    match attrs.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Sequence(seq)) => Ok(Some(seq)),
        Some(_) => Err(ConfigError::invalid(kind, id, field, "expected a list")),
    }
}

/// Take a copy of a sequence field so new entries can be appended to it
pub(crate) fn extendable_sequence(
    attrs: &Attributes,
    field: &str,
    kind: EntityKind,
    id: &str,
) -> Result<Sequence, ConfigError> {
    Ok(optional_sequence(attrs, field, kind, id)?
        .cloned()
        .unwrap_or_default())
}

/// Read an optional field that must be a non-empty list of strings when present
pub(crate) fn optional_string_list(
    attrs: &Attributes,
    field: &str,
    kind: EntityKind,
    id: &str,
) -> Result<Option<Vec<String>>, ConfigError> {
    let Some(value) = attrs.get(field) else {
        return Ok(None);
    };
    if is_blank(value) {
        return Err(ConfigError::empty(kind, Some(id), field));
    }
    let Value::Sequence(seq) = value else {
        return Err(ConfigError::invalid(kind, id, field, "expected a list"));
    };
    seq.iter()
        .map(|entry| match entry {
            Value::String(s) => Ok(s.clone()),
            _ => Err(ConfigError::invalid(kind, id, field, "expected a list of strings")),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Overwrite a field, keeping its original position if it already exists
pub(crate) fn set(attrs: &mut Attributes, field: &str, value: impl Into<Value>) {
    attrs.insert(Value::String(field.to_string()), value.into());
}

/// Set a field only if it is not declared
pub(crate) fn set_default(attrs: &mut Attributes, field: &str, value: impl Into<Value>) {
    if !attrs.contains_key(field) {
        set(attrs, field, value);
    }
}

/// Build a sequence value out of strings
pub(crate) fn string_sequence<I, S>(items: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::Sequence(items.into_iter().map(|s| Value::String(s.into())).collect())
}
