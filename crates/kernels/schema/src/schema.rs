//! Schema documents
//!
//! A schema groups engine classes under abstract types:
//!
//! ```json
//! {
//!   "idmTypes": {
//!     "idmAbstractType:IndividualIntervention": {
//!       "PMTCT": {
//!         "class": "PMTCT",
//!         "Efficacy": { "type": "float", "default": 0.5, "min": 0, "max": 1 }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Field types understood here: `float`, `integer`, `bool`, `string`,
//! `enum`, `Vector String`, `Vector Float`, `Vector Int`,
//! `Vector Vector String`, `object`, `Vector object`,
//! `idmType:InterpolatedValueMap`, `idmType:PropertyRestrictionsWithinNode`,
//! `idmAbstractType:<Group>` and `Vector idmAbstractType:<Group>`. A nested
//! type may list alternatives separated by `|`.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::record::Record;
use crate::{SchemaError, SchemaResult};

const ABSTRACT_PREFIX: &str = "idmAbstractType:";
const BUNDLED: &str = include_str!("../data/campaign_schema.json");

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Float,
    Integer,
    Bool,
    String,
    Enum,
    StringList,
    FloatList,
    IntList,
    StringMatrix,
    Object,
    ObjectList,
    ValueMap,
    PropertyGroups,
    /// A nested record whose class belongs to one of these abstract types.
    Nested(Vec<String>),
    /// A list of nested records.
    NestedList(Vec<String>),
}

impl FieldType {
    fn parse(raw: &str) -> SchemaResult<Self> {
        let ty = match raw {
            "float" => FieldType::Float,
            "integer" => FieldType::Integer,
            "bool" => FieldType::Bool,
            "string" => FieldType::String,
            "enum" => FieldType::Enum,
            "Vector String" => FieldType::StringList,
            "Vector Float" => FieldType::FloatList,
            "Vector Int" => FieldType::IntList,
            "Vector Vector String" => FieldType::StringMatrix,
            "object" => FieldType::Object,
            "Vector object" => FieldType::ObjectList,
            "idmType:InterpolatedValueMap" => FieldType::ValueMap,
            "idmType:PropertyRestrictionsWithinNode" => FieldType::PropertyGroups,
            other => {
                if let Some(inner) = other.strip_prefix("Vector ") {
                    FieldType::NestedList(parse_groups(inner)?)
                } else {
                    FieldType::Nested(parse_groups(other)?)
                }
            }
        };
        Ok(ty)
    }

    /// Human-readable name used in error messages.
    pub fn describe(&self) -> String {
        match self {
            FieldType::Float => "float".into(),
            FieldType::Integer => "integer".into(),
            FieldType::Bool => "bool".into(),
            FieldType::String => "string".into(),
            FieldType::Enum => "enum".into(),
            FieldType::StringList => "list of strings".into(),
            FieldType::FloatList => "list of floats".into(),
            FieldType::IntList => "list of integers".into(),
            FieldType::StringMatrix => "list of string lists".into(),
            FieldType::Object => "object".into(),
            FieldType::ObjectList => "list of objects".into(),
            FieldType::ValueMap => "time-value map".into(),
            FieldType::PropertyGroups => "list of property groups".into(),
            FieldType::Nested(groups) => groups.join(" or "),
            FieldType::NestedList(groups) => format!("list of {}", groups.join(" or ")),
        }
    }
}

fn parse_groups(raw: &str) -> SchemaResult<Vec<String>> {
    raw.split('|')
        .map(|g| {
            let g = g.trim();
            if g.starts_with(ABSTRACT_PREFIX) {
                Ok(g.to_string())
            } else {
                Err(SchemaError::Malformed(format!("unknown field type '{raw}'")))
            }
        })
        .collect()
}

#[derive(Deserialize)]
struct RawField {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    default: Value,
    min: Option<f64>,
    max: Option<f64>,
    #[serde(default)]
    optional: bool,
    #[serde(rename = "enum", default)]
    allowed: Vec<String>,
    description: Option<String>,
}

/// A declared field of a class.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
    /// Default value; `null` means the field has no default.
    pub default: Value,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Optional fields are omitted when never set.
    pub optional: bool,
    /// Allowed strings for enums and string lists.
    pub allowed: Vec<String>,
    pub description: Option<String>,
}

/// A concrete engine class.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    /// The abstract type this class belongs to.
    pub group: String,
    pub fields: IndexMap<String, FieldDef>,
}

impl ClassDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }
}

/// A loaded schema: every class the engine recognises, keyed by name.
#[derive(Debug, Clone)]
pub struct Schema {
    version: Option<String>,
    classes: IndexMap<String, ClassDef>,
}

impl Schema {
    /// Load a schema from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The schema shipped with the compiler, covering every class it emits.
    pub fn bundled() -> SchemaResult<Self> {
        Self::from_json(BUNDLED)
    }

    /// Parse a schema from a JSON string.
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        let doc: Value = serde_json::from_str(json)?;
        let types = doc
            .get("idmTypes")
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::Malformed("missing 'idmTypes' object".into()))?;

        let mut classes = IndexMap::new();
        for (group, members) in types {
            if !group.starts_with(ABSTRACT_PREFIX) {
                continue;
            }
            let members = members.as_object().ok_or_else(|| {
                SchemaError::Malformed(format!("abstract type '{group}' is not an object"))
            })?;
            for (class_name, body) in members {
                let class = parse_class(group, class_name, body)?;
                if classes.insert(class_name.clone(), class).is_some() {
                    return Err(SchemaError::Malformed(format!(
                        "class '{class_name}' declared more than once"
                    )));
                }
            }
        }

        let version = doc
            .pointer("/Version/schema")
            .and_then(Value::as_str)
            .map(str::to_string);
        debug!(classes = classes.len(), version = ?version, "loaded schema");
        Ok(Self { version, classes })
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn class(&self, name: &str) -> SchemaResult<&ClassDef> {
        self.classes
            .get(name)
            .ok_or_else(|| SchemaError::UnknownClass(name.to_string()))
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Every recognised class name.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Class names belonging to an abstract type.
    pub fn classes_in(&self, group: &str) -> Vec<&str> {
        self.classes
            .values()
            .filter(|c| c.group == group)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Start a record of `class` pre-populated with defaults.
    pub fn instantiate(&self, class: &str) -> SchemaResult<Record<'_>> {
        Ok(Record::new(self.class(class)?))
    }

    /// Check a value against a field declaration.
    pub fn check_value(&self, class: &ClassDef, field: &FieldDef, value: &Value) -> SchemaResult<()> {
        let ctx = Ctx {
            class: &class.name,
            field,
        };
        match &field.ty {
            FieldType::Float => ctx.number(value).and_then(|n| ctx.range(n)),
            FieldType::Integer => ctx.integer(value).and_then(|n| ctx.range(n)),
            FieldType::Bool => ctx.boolean(value),
            FieldType::String => ctx.string(value).map(|_| ()),
            FieldType::Enum => ctx.string(value).and_then(|s| ctx.member(s)),
            FieldType::StringList => {
                for item in ctx.array(value)? {
                    let s = ctx.string(item)?;
                    if !field.allowed.is_empty() {
                        ctx.member(s)?;
                    }
                }
                Ok(())
            }
            FieldType::FloatList => {
                for item in ctx.array(value)? {
                    ctx.range(ctx.number(item)?)?;
                }
                Ok(())
            }
            FieldType::IntList => {
                for item in ctx.array(value)? {
                    ctx.range(ctx.integer(item)?)?;
                }
                Ok(())
            }
            FieldType::StringMatrix => {
                for row in ctx.array(value)? {
                    for item in ctx.array(row)? {
                        let s = ctx.string(item)?;
                        if !field.allowed.is_empty() {
                            ctx.member(s)?;
                        }
                    }
                }
                Ok(())
            }
            FieldType::Object => ctx.object(value).map(|_| ()),
            FieldType::ObjectList => {
                for item in ctx.array(value)? {
                    ctx.object(item)?;
                }
                Ok(())
            }
            FieldType::ValueMap => ctx.value_map(value),
            FieldType::PropertyGroups => {
                for group in ctx.array(value)? {
                    for (_, v) in ctx.object(group)? {
                        ctx.string(v)?;
                    }
                }
                Ok(())
            }
            FieldType::Nested(groups) => self.check_nested(&ctx, groups, value),
            FieldType::NestedList(groups) => {
                for item in ctx.array(value)? {
                    self.check_nested(&ctx, groups, item)?;
                }
                Ok(())
            }
        }
    }

    fn check_nested(&self, ctx: &Ctx<'_>, groups: &[String], value: &Value) -> SchemaResult<()> {
        let obj = ctx.object(value)?;
        let found = obj
            .get("class")
            .and_then(Value::as_str)
            .ok_or_else(|| ctx.wrong_type(value))?;
        let class = self.class(found)?;
        if groups.iter().any(|g| *g == class.group) {
            Ok(())
        } else {
            Err(SchemaError::WrongClass {
                class: ctx.class.to_string(),
                field: ctx.field.name.clone(),
                expected: groups.join(" or "),
                found: found.to_string(),
            })
        }
    }
}

fn parse_class(group: &str, class_name: &str, body: &Value) -> SchemaResult<ClassDef> {
    let body = body
        .as_object()
        .ok_or_else(|| SchemaError::Malformed(format!("class '{class_name}' is not an object")))?;
    let mut fields = IndexMap::new();
    for (name, raw) in body {
        if name == "class" {
            continue;
        }
        let raw: RawField = serde_json::from_value(raw.clone()).map_err(|e| {
            SchemaError::Malformed(format!("{class_name}.{name}: {e}"))
        })?;
        let ty = FieldType::parse(&raw.ty)?;
        if ty == FieldType::Enum && raw.allowed.is_empty() {
            return Err(SchemaError::Malformed(format!(
                "{class_name}.{name}: enum without values"
            )));
        }
        fields.insert(
            name.clone(),
            FieldDef {
                name: name.clone(),
                ty,
                default: raw.default,
                min: raw.min,
                max: raw.max,
                optional: raw.optional,
                allowed: raw.allowed,
                description: raw.description,
            },
        );
    }
    Ok(ClassDef {
        name: class_name.to_string(),
        group: group.to_string(),
        fields,
    })
}

struct Ctx<'a> {
    class: &'a str,
    field: &'a FieldDef,
}

impl Ctx<'_> {
    fn wrong_type(&self, found: &Value) -> SchemaError {
        SchemaError::WrongType {
            class: self.class.to_string(),
            field: self.field.name.clone(),
            expected: self.field.ty.describe(),
            found: json_kind(found).to_string(),
        }
    }

    fn number(&self, value: &Value) -> SchemaResult<f64> {
        value.as_f64().ok_or_else(|| self.wrong_type(value))
    }

    fn integer(&self, value: &Value) -> SchemaResult<f64> {
        match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => self.number(value),
            Value::Number(n) if n.as_f64().is_some_and(|f| f.fract() == 0.0) => self.number(value),
            _ => Err(self.wrong_type(value)),
        }
    }

    fn boolean(&self, value: &Value) -> SchemaResult<()> {
        match value {
            Value::Bool(_) => Ok(()),
            Value::Number(n) if n.as_u64().is_some_and(|v| v <= 1) => Ok(()),
            _ => Err(self.wrong_type(value)),
        }
    }

    fn string<'v>(&self, value: &'v Value) -> SchemaResult<&'v str> {
        value.as_str().ok_or_else(|| self.wrong_type(value))
    }

    fn array<'v>(&self, value: &'v Value) -> SchemaResult<&'v Vec<Value>> {
        value.as_array().ok_or_else(|| self.wrong_type(value))
    }

    fn object<'v>(&self, value: &'v Value) -> SchemaResult<&'v serde_json::Map<String, Value>> {
        value.as_object().ok_or_else(|| self.wrong_type(value))
    }

    fn range(&self, n: f64) -> SchemaResult<()> {
        let min = self.field.min.unwrap_or(f64::NEG_INFINITY);
        let max = self.field.max.unwrap_or(f64::INFINITY);
        if n < min || n > max || n.is_nan() {
            return Err(SchemaError::OutOfRange {
                class: self.class.to_string(),
                field: self.field.name.clone(),
                value: n,
                min,
                max,
            });
        }
        Ok(())
    }

    fn member(&self, s: &str) -> SchemaResult<()> {
        if self.field.allowed.iter().any(|a| a == s) {
            Ok(())
        } else {
            Err(SchemaError::InvalidEnum {
                class: self.class.to_string(),
                field: self.field.name.clone(),
                value: s.to_string(),
                allowed: self.field.allowed.clone(),
            })
        }
    }

    fn value_map(&self, value: &Value) -> SchemaResult<()> {
        let obj = self.object(value)?;
        let times = obj.get("Times").and_then(Value::as_array);
        let values = obj.get("Values").and_then(Value::as_array);
        match (times, values) {
            (Some(t), Some(v))
                if t.len() == v.len() && t.iter().chain(v.iter()).all(Value::is_number) =>
            {
                Ok(())
            }
            _ => Err(self.wrong_type(value)),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
