//! Per-method metadata
//!
//! Registration can attach an optional description blob to any method:
//! a function description, a described return type, and per-parameter
//! name/default/description entries. Defaults are informative, served
//! through introspection, never applied by the dispatcher. A parameter
//! without a default carries the `Required` sentinel, which renders as
//! `optional: false` with a `null` default.

use serde_json::{json, Map, Value};

/// Default value of a described parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamDefault {
    /// The sender must supply this parameter; distinct from any JSON value.
    Required,
    /// Informative default served via introspection.
    Value(Value),
}

/// One described parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamMeta {
    /// Parameter name
    pub name: String,
    /// Default value or the `Required` sentinel
    pub default: ParamDefault,
    /// Human-readable description
    pub description: String,
}

impl ParamMeta {
    /// A parameter the sender must always supply.
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        ParamMeta {
            name: name.into(),
            default: ParamDefault::Required,
            description: description.into(),
        }
    }

    /// A parameter with an informative default.
    pub fn optional(
        name: impl Into<String>,
        default: impl serde::Serialize,
        description: impl Into<String>,
    ) -> Self {
        ParamMeta {
            name: name.into(),
            default: ParamDefault::Value(
                serde_json::to_value(default).unwrap_or(Value::Null),
            ),
            description: description.into(),
        }
    }

    fn to_value(&self) -> Value {
        let (optional, default) = match &self.default {
            ParamDefault::Required => (false, Value::Null),
            ParamDefault::Value(v) => (true, v.clone()),
        };
        json!({
            "name": self.name,
            "optional": optional,
            "default": default,
            "description": self.description,
        })
    }
}

/// Described return value.
#[derive(Debug, Clone, PartialEq)]
pub struct RetMeta {
    /// JSON type name of the return value (or `void`)
    pub type_name: String,
    /// Human-readable description
    pub description: String,
}

impl RetMeta {
    /// Describe a return value.
    pub fn new(type_name: impl Into<String>, description: impl Into<String>) -> Self {
        RetMeta {
            type_name: type_name.into(),
            description: description.into(),
        }
    }

    fn to_value(&self) -> Value {
        json!({ "type": self.type_name, "description": self.description })
    }
}

/// Metadata blob for one registered method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodMeta {
    /// Function description
    pub description: String,
    /// Described parameters, positionally
    pub params: Vec<ParamMeta>,
    /// Described return value
    pub ret: RetMeta,
}

impl MethodMeta {
    /// Render as the introspection JSON shape:
    /// `{description, params: [...], ret: {type, description}}`.
    pub fn to_value(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("description".into(), Value::String(self.description.clone()));
        fields.insert(
            "params".into(),
            Value::Array(self.params.iter().map(ParamMeta::to_value).collect()),
        );
        fields.insert("ret".into(), self.ret.to_value());
        Value::Object(fields)
    }
}
