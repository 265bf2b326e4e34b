//! Schema-checked records
//!
//! A [`Record`] starts from a class's defaults and only accepts writes to
//! fields the class declares, with values of the declared type and range.
//! [`Record::finish`] drops optional fields that were never set and fails
//! if a required field has no value.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::schema::{ClassDef, Schema};
use crate::{SchemaError, SchemaResult};

/// A record under construction for one schema class.
#[derive(Debug, Clone)]
pub struct Record<'s> {
    class: &'s ClassDef,
    values: IndexMap<String, Value>,
    set: HashSet<String>,
}

impl<'s> Record<'s> {
    pub(crate) fn new(class: &'s ClassDef) -> Self {
        let values = class
            .fields
            .iter()
            .map(|(name, def)| (name.clone(), def.default.clone()))
            .collect();
        Self {
            class,
            values,
            set: HashSet::new(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class.name
    }

    /// Current value of a field (default if never set).
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Whether a field was written explicitly.
    pub fn is_set(&self, field: &str) -> bool {
        self.set.contains(field)
    }

    /// Write a field, validating it against the schema.
    pub fn set(
        &mut self,
        schema: &Schema,
        field: &str,
        value: impl Into<Value>,
    ) -> SchemaResult<&mut Self> {
        let def = self
            .class
            .field(field)
            .ok_or_else(|| SchemaError::UnknownField {
                class: self.class.name.clone(),
                field: field.to_string(),
            })?;
        let value = value.into();
        schema.check_value(self.class, def, &value)?;
        self.values.insert(field.to_string(), value);
        self.set.insert(field.to_string());
        Ok(self)
    }

    /// Write a field only when a value is present.
    pub fn set_opt<V: Into<Value>>(
        &mut self,
        schema: &Schema,
        field: &str,
        value: Option<V>,
    ) -> SchemaResult<&mut Self> {
        match value {
            Some(v) => self.set(schema, field, v),
            None => Ok(self),
        }
    }

    /// Write several fields in order.
    pub fn set_all(
        &mut self,
        schema: &Schema,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) -> SchemaResult<&mut Self> {
        for (field, value) in fields {
            self.set(schema, &field, value)?;
        }
        Ok(self)
    }

    /// Produce the JSON object, `class` first, then fields in schema order.
    pub fn finish(self) -> SchemaResult<Value> {
        let mut out = Map::new();
        out.insert("class".to_string(), Value::from(self.class.name.clone()));
        for (name, def) in &self.class.fields {
            let explicit = self.set.contains(name);
            let value = self.values.get(name).cloned().unwrap_or(Value::Null);
            if !explicit && def.optional {
                continue;
            }
            if value.is_null() {
                if def.optional {
                    continue;
                }
                return Err(SchemaError::MissingField {
                    class: self.class.name.clone(),
                    field: name.clone(),
                });
            }
            out.insert(name.clone(), value);
        }
        Ok(Value::Object(out))
    }
}
