// ============================================================================
// Settings Schema - keys, values and their constraints
// ============================================================================

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a settings key (e.g. "show")
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SettingsKey(pub String);

impl From<&str> for SettingsKey {
    fn from(s: &str) -> Self {
        SettingsKey(s.to_string())
    }
}

impl fmt::Display for SettingsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value stored under a settings key
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingsValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl SettingsValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingsValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingsValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingsValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Short type name, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingsValue::Bool(_) => "bool",
            SettingsValue::Int(_) => "int",
            SettingsValue::Float(_) => "float",
        }
    }
}

impl fmt::Display for SettingsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsValue::Bool(v) => write!(f, "{}", v),
            SettingsValue::Int(v) => write!(f, "{}", v),
            SettingsValue::Float(v) => write!(f, "{:.2}", v),
        }
    }
}

/// Declaration of one key: its default and, for numbers, its range
#[derive(Debug, Clone)]
pub struct KeySpec {
    pub key: SettingsKey,
    pub summary: String,
    pub default_value: SettingsValue,
    pub range: Option<(SettingsValue, SettingsValue)>,
}

impl KeySpec {
    pub fn new_bool(key: &str, summary: &str, default: bool) -> Self {
        Self {
            key: SettingsKey::from(key),
            summary: summary.to_string(),
            default_value: SettingsValue::Bool(default),
            range: None,
        }
    }

    pub fn new_int(key: &str, summary: &str, default: i64, min: i64, max: i64) -> Self {
        Self {
            key: SettingsKey::from(key),
            summary: summary.to_string(),
            default_value: SettingsValue::Int(default),
            range: Some((SettingsValue::Int(min), SettingsValue::Int(max))),
        }
    }

    pub fn new_float(key: &str, summary: &str, default: f64, min: f64, max: f64) -> Self {
        Self {
            key: SettingsKey::from(key),
            summary: summary.to_string(),
            default_value: SettingsValue::Float(default),
            range: Some((SettingsValue::Float(min), SettingsValue::Float(max))),
        }
    }

    /// Check that `value` has the declared type and lies in the declared range
    pub fn validate(&self, value: &SettingsValue) -> Result<(), SettingsError> {
        let in_range = match (&self.default_value, value, &self.range) {
            (SettingsValue::Bool(_), SettingsValue::Bool(_), _) => true,
            (SettingsValue::Int(_), SettingsValue::Int(v), Some((min, max))) => {
                min.as_int().is_none_or(|min| *v >= min) && max.as_int().is_none_or(|max| *v <= max)
            }
            (SettingsValue::Float(_), SettingsValue::Float(v), Some((min, max))) => {
                min.as_float().is_none_or(|min| *v >= min)
                    && max.as_float().is_none_or(|max| *v <= max)
            }
            (SettingsValue::Int(_), SettingsValue::Int(_), None)
            | (SettingsValue::Float(_), SettingsValue::Float(_), None) => true,
            (expected, found, _) => {
                return Err(SettingsError::TypeMismatch {
                    key: self.key.0.clone(),
                    expected: expected.type_name(),
                    found: found.type_name(),
                });
            }
        };

        if in_range {
            return Ok(());
        }

        let (min, max) = self
            .range
            .map(|(min, max)| (min.to_string(), max.to_string()))
            .unwrap_or_default();

        Err(SettingsError::OutOfRange {
            key: self.key.0.clone(),
            value: value.to_string(),
            min,
            max,
        })
    }
}
