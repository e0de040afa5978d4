//! Field paths into read responses
//!
//! Paths use dot notation; numeric segments index into arrays:
//! `NetworkInterfaces.0.PrivateIpAddress`.

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;

const INDEX_PLACEHOLDER: &str = "{i}";

/// Dot-notation path into a JSON response
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::construction("field path is empty"));
        }
        if path.split('.').any(str::is_empty) {
            return Err(Error::construction(format!(
                "field path '{}' has an empty segment",
                path
            )));
        }
        Ok(Self(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Extract the scalar at this path
    pub fn extract(&self, response: &Value) -> std::result::Result<String, PathError> {
        let mut current = response;

        for part in self.segments() {
            let next = match current {
                Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
                Value::Object(map) => map.get(part),
                _ => None,
            };
            current = next.ok_or(PathError::Missing)?;
        }

        match current {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Err(PathError::Missing),
            Value::Array(_) | Value::Object(_) => Err(PathError::NotScalar),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a path could not be read from a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    Missing,
    NotScalar,
}

/// Path template with a single `{i}` index placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPathTemplate(String);

impl FieldPathTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        match template.matches(INDEX_PLACEHOLDER).count() {
            1 => {}
            0 => {
                return Err(Error::construction(format!(
                    "field path template '{}' has no {} placeholder",
                    template, INDEX_PLACEHOLDER
                )))
            }
            _ => {
                return Err(Error::construction(format!(
                    "field path template '{}' has more than one {} placeholder",
                    template, INDEX_PLACEHOLDER
                )))
            }
        }
        // Validate the shape once with a concrete index
        FieldPath::parse(&template.replace(INDEX_PLACEHOLDER, "0"))?;
        Ok(Self(template.to_string()))
    }

    pub fn render(&self, index: usize) -> FieldPath {
        FieldPath(self.0.replace(INDEX_PLACEHOLDER, &index.to_string()))
    }

    /// Paths for indices `0..count`
    pub fn expand(&self, count: usize) -> Vec<FieldPath> {
        (0..count).map(|i| self.render(i)).collect()
    }
}
