//! Canonical signature encoding
//!
//! A signature is derived from an ordered list of JSON type names: the names
//! joined with `:` and prefixed with `-`, or the empty string for an empty
//! list. Appending the signature to a method's base name yields the full
//! lookup key, which is what disambiguates overloads.
//!
//! The same encoding is produced from two directions: at registration time
//! from the declared parameter types (the engine probes a default-constructed
//! value per parameter; callback parameters contribute `string` because
//! tokens travel as strings), and at call time from the incoming argument
//! array. Both directions must agree for dispatch to work, which is why the
//! type set is closed and numeric subtypes collapse to `number`.

use serde_json::Value;

/// JSON type name of a value. The closed set is `null`, `boolean`, `number`,
/// `string`, `array`, `object`; integer/float distinctions are collapsed.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Join type names into a signature: empty input yields `""`, otherwise
/// `-T1[:T2...]`.
pub fn signature_from_types<'a, I>(types: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut signature = String::new();
    for name in types {
        if signature.is_empty() {
            signature.push('-');
        } else {
            signature.push(':');
        }
        signature.push_str(name);
    }
    signature
}

/// Signature of a positional argument array.
pub fn signature_of(args: &[Value]) -> String {
    signature_from_types(args.iter().map(json_type_name))
}

/// Full lookup key for a call: method base name plus argument signature.
pub fn full_method_key(method: &str, args: &[Value]) -> String {
    let mut key = String::with_capacity(method.len() + 16);
    key.push_str(method);
    key.push_str(&signature_of(args));
    key
}
