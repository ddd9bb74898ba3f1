//! The wire envelope
//!
//! One JSON object carries a request, its response, or a callback event:
//!
//! - `c`: context, a class name or instance id (non-empty string)
//! - `f`: method base name (non-empty string)
//! - `a`: positional argument array
//! - `r`: return slot, present on success (JSON `null` for void returns)
//! - `e`: error slot, present on failure
//! - `i`: callback token, present only on callback-fire events
//!
//! `r` and `e` are mutually exclusive; the envelope is mutated in place so a
//! dispatched request comes back with exactly one of them set.

use serde_json::{Map, Value};

use crate::error::HostError;

/// Result slot of a dispatched envelope: either a return value or an error
/// message, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Successful return (`r`); `Value::Null` for void returns.
    Ret(Value),
    /// Failure (`e`), human-readable message.
    Err(String),
}

/// A single request, response or callback event.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Context: class name or instance id (`c`)
    pub context: String,
    /// Method base name (`f`)
    pub method: String,
    /// Positional arguments (`a`)
    pub args: Vec<Value>,
    /// Callback token (`i`), set only on callback events
    pub callback_id: Option<String>,
    outcome: Option<Outcome>,
}

impl Envelope {
    /// Build a request envelope.
    pub fn new(context: impl Into<String>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Envelope {
            context: context.into(),
            method: method.into(),
            args,
            callback_id: None,
            outcome: None,
        }
    }

    /// Parse an envelope from its JSON text form.
    pub fn parse(text: &str) -> Result<Self, HostError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| HostError::MalformedEnvelope(e.to_string()))?;
        Self::from_value(value)
    }

    /// Convert a JSON value into an envelope, validating the required fields.
    pub fn from_value(value: Value) -> Result<Self, HostError> {
        let Value::Object(mut fields) = value else {
            return Err(HostError::MalformedEnvelope(
                "expected a JSON object".into(),
            ));
        };

        let context = take_string(&mut fields, "c")?;
        let method = take_string(&mut fields, "f")?;
        let args = match fields.remove("a") {
            Some(Value::Array(args)) => args,
            Some(_) => {
                return Err(HostError::MalformedEnvelope(
                    "field \"a\" must be an array".into(),
                ))
            }
            None => return Err(HostError::MalformedEnvelope("missing field \"a\"".into())),
        };

        let outcome = match (fields.remove("r"), fields.remove("e")) {
            (Some(_), Some(_)) => {
                return Err(HostError::MalformedEnvelope(
                    "fields \"r\" and \"e\" are mutually exclusive".into(),
                ))
            }
            (Some(r), None) => Some(Outcome::Ret(r)),
            (None, Some(Value::String(e))) => Some(Outcome::Err(e)),
            (None, Some(_)) => {
                return Err(HostError::MalformedEnvelope(
                    "field \"e\" must be a string".into(),
                ))
            }
            (None, None) => None,
        };

        let callback_id = match fields.remove("i") {
            Some(Value::String(i)) => Some(i),
            Some(_) => {
                return Err(HostError::MalformedEnvelope(
                    "field \"i\" must be a string".into(),
                ))
            }
            None => None,
        };

        Ok(Envelope {
            context,
            method,
            args,
            callback_id,
            outcome,
        })
    }

    /// Render the envelope back into a JSON value.
    pub fn to_value(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("c".into(), Value::String(self.context.clone()));
        fields.insert("f".into(), Value::String(self.method.clone()));
        fields.insert("a".into(), Value::Array(self.args.clone()));
        match &self.outcome {
            Some(Outcome::Ret(r)) => {
                fields.insert("r".into(), r.clone());
            }
            Some(Outcome::Err(e)) => {
                fields.insert("e".into(), Value::String(e.clone()));
            }
            None => {}
        }
        if let Some(i) = &self.callback_id {
            fields.insert("i".into(), Value::String(i.clone()));
        }
        Value::Object(fields)
    }

    /// Render the envelope into JSON text.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Set the return slot, clearing any previous outcome.
    pub fn set_ret(&mut self, value: Value) {
        self.outcome = Some(Outcome::Ret(value));
    }

    /// Set the error slot, clearing any previous outcome.
    pub fn set_err(&mut self, message: impl Into<String>) {
        self.outcome = Some(Outcome::Err(message.into()));
    }

    /// The return value, if the envelope succeeded.
    pub fn ret(&self) -> Option<&Value> {
        match &self.outcome {
            Some(Outcome::Ret(r)) => Some(r),
            _ => None,
        }
    }

    /// The error message, if the envelope failed.
    pub fn err(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Err(e)) => Some(e),
            _ => None,
        }
    }

    /// Whether an outcome (return or error) has been recorded.
    pub fn is_answered(&self) -> bool {
        self.outcome.is_some()
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Result<String, HostError> {
    match fields.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(HostError::MalformedEnvelope(format!(
            "field \"{key}\" must be non-empty"
        ))),
        Some(_) => Err(HostError::MalformedEnvelope(format!(
            "field \"{key}\" must be a string"
        ))),
        None => Err(HostError::MalformedEnvelope(format!(
            "missing field \"{key}\""
        ))),
    }
}
