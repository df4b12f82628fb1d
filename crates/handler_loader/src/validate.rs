//! Handler shape validation

use crate::error::LoadError;
use crate::options::KeyAliasMap;
use crate::value::{EventName, Execute, PropertyValue};
use compact_str::CompactString;
use std::path::Path;

/// A validated handler, ready for binding
#[derive(Debug, Clone)]
pub struct NormalizedHandler {
    pub event_name: EventName,
    pub once: bool,
    pub prepend: bool,
    pub execute: Execute,
}

/// Validate `candidate` against the aliases in `keys`.
///
/// Checks run in a fixed order and stop at the first failure: presence of
/// the name and execute properties, then the name, once, prepend and
/// execute values.
pub fn normalize(
    candidate: &PropertyValue,
    keys: &KeyAliasMap,
    file: &Path,
) -> Result<NormalizedHandler, LoadError> {
    let missing = |alias: &str| LoadError::MissingProperty {
        alias: alias.to_string(),
        file: file.to_path_buf(),
    };
    let invalid = |alias: &str, value: &PropertyValue, expected: &'static str| LoadError::InvalidType {
        alias: alias.to_string(),
        value: value.to_string(),
        expected,
        file: file.to_path_buf(),
    };

    let object = candidate.as_object().ok_or_else(|| missing(&keys.name))?;
    let name_value = object.get(&keys.name).ok_or_else(|| missing(&keys.name))?;
    let execute_value = object.get(&keys.execute).ok_or_else(|| missing(&keys.execute))?;

    let event_name = match name_value {
        PropertyValue::String(name) if !name.is_empty() => EventName::Name(CompactString::new(name)),
        PropertyValue::Symbol(symbol) => EventName::Symbol(symbol.clone()),
        other => return Err(invalid(&keys.name, other, "a non-empty string or symbol")),
    };

    let flag = |alias: &str| match object.get(alias) {
        None => Ok(false),
        Some(PropertyValue::Bool(value)) => Ok(*value),
        Some(other) => Err(invalid(alias, other, "a boolean")),
    };
    let once = flag(&keys.is_once)?;
    let prepend = flag(&keys.is_prepend)?;

    let execute = match execute_value {
        PropertyValue::Function(execute) => execute.clone(),
        other => return Err(invalid(&keys.execute, other, "a function")),
    };

    Ok(NormalizedHandler {
        event_name,
        once,
        prepend,
        execute,
    })
}
