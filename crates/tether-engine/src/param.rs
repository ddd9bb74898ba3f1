//! Argument and return-value marshalling
//!
//! `Param` turns one slot of the envelope's argument array into the typed
//! value a target function expects; `Reply` turns the target's return value
//! back into the envelope's return slot. Both are marker-tagged so that the
//! blanket serde impl and the special cases (callbacks, fallible returns)
//! never collide; the marker is inferred at registration and carried through
//! the generated arity impls.
//!
//! The registration-time signature contribution of a value parameter is
//! derived by probing a default-constructed value: `String::default()`
//! serializes to `""` and contributes `string`, `Vec<T>` contributes `array`,
//! a payload struct contributes `object`, and so on. Callback parameters
//! contribute `string` regardless, because tokens travel as strings.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tether_core::{json_type_name, CallError, Envelope};

// ============================================================================
// Parameter decoding
// ============================================================================

/// Marker: a plain value parameter decoded through serde.
pub struct ValueParam;

/// Marker: a callback parameter (see [`crate::callback::Callback`]).
pub struct CallbackParam;

/// One declared parameter of a registered function.
pub trait Param<M>: Sized + Send + 'static {
    /// JSON type name this parameter contributes to the signature.
    fn json_type() -> &'static str;

    /// Decode the argument at `index` from the envelope.
    fn decode(env: &Envelope, index: usize) -> Result<Self, CallError>;
}

impl<T> Param<ValueParam> for T
where
    T: DeserializeOwned + Serialize + Default + Send + 'static,
{
    fn json_type() -> &'static str {
        json_type_name(&serde_json::to_value(T::default()).unwrap_or(Value::Null))
    }

    fn decode(env: &Envelope, index: usize) -> Result<Self, CallError> {
        let value = env.args.get(index).ok_or_else(|| CallError::Decode {
            index,
            expected: Self::json_type(),
            reason: "missing argument".into(),
        })?;
        serde_json::from_value(value.clone()).map_err(|e| CallError::Decode {
            index,
            expected: Self::json_type(),
            reason: e.to_string(),
        })
    }
}

// ============================================================================
// Return-value adaptation
// ============================================================================

/// Marker: an infallible return value.
pub struct ValueReply;

/// Marker: a `Result` return whose error becomes the envelope's `e` field.
pub struct FallibleReply;

/// Return value of a registered function.
pub trait Reply<M>: 'static {
    /// Convert into the envelope's return slot. `()` yields `Value::Null`.
    fn into_reply(self) -> Result<Value, CallError>;
}

impl<T> Reply<ValueReply> for T
where
    T: Serialize + 'static,
{
    fn into_reply(self) -> Result<Value, CallError> {
        serde_json::to_value(self).map_err(|e| CallError::Target(e.to_string()))
    }
}

impl<T, E> Reply<FallibleReply> for Result<T, E>
where
    T: Serialize + 'static,
    E: Display + 'static,
{
    fn into_reply(self) -> Result<Value, CallError> {
        match self {
            Ok(value) => serde_json::to_value(value).map_err(|e| CallError::Target(e.to_string())),
            Err(e) => Err(CallError::Target(e.to_string())),
        }
    }
}

// ============================================================================
// Client-side packing
// ============================================================================

/// Serialize one value into an argument slot. Values that cannot be
/// serialized pack as `null`.
pub fn pack_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Pack an ordered list of values into the envelope's argument array.
/// Callback-typed values pack as the empty string; the receiving side fills
/// in the real token.
#[macro_export]
macro_rules! pack {
    () => { Vec::<serde_json::Value>::new() };
    ($($arg:expr),+ $(,)?) => {
        vec![ $( $crate::param::pack_value(&$arg) ),+ ]
    };
}
