//! Resource state held by the controller during one lifecycle operation

use crate::error::{Result, TfcrudError};
use crate::types::{Dynamic, DynamicValue};
use std::collections::HashMap;

/// ResourceState mirrors the schema's attributes plus the external id
/// The host persists it between operations; tfcrud never does
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceState {
    pub id: Option<String>,
    pub values: HashMap<String, Dynamic>,
}

impl ResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            values: HashMap::new(),
        }
    }

    /// Attribute value, `Null` when unset
    pub fn get(&self, name: &str) -> &Dynamic {
        static NULL: Dynamic = Dynamic::Null;
        self.values.get(name).unwrap_or(&NULL)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Dynamic>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn is_created(&self) -> bool {
        self.id.is_some()
    }

    /// Host representation: an object with `id` alongside the attributes
    pub fn to_dynamic_value(&self) -> DynamicValue {
        let mut map = self.values.clone();
        map.insert(
            "id".to_string(),
            self.id.clone().map(Dynamic::String).unwrap_or(Dynamic::Null),
        );
        DynamicValue::new(Dynamic::Map(map))
    }

    pub fn from_dynamic_value(value: &DynamicValue) -> Result<Self> {
        let mut values = match &value.value {
            Dynamic::Null => return Ok(Self::new()),
            Dynamic::Map(m) => m.clone(),
            other => {
                return Err(TfcrudError::TypeMismatch {
                    expected: "object".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        };

        let id = match values.remove("id") {
            None | Some(Dynamic::Null) | Some(Dynamic::Unknown) => None,
            Some(Dynamic::String(id)) => Some(id),
            Some(other) => {
                return Err(TfcrudError::TypeMismatch {
                    expected: "string id".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        };

        Ok(Self { id, values })
    }
}
