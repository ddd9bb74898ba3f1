//! Error taxonomy
//!
//! `CallError` covers failures that travel inside an envelope's `e` field;
//! their `Display` strings are the wire messages. `HostError` covers failures
//! raised through the host's native error channel, where no envelope exists
//! to carry them.

use thiserror::Error;

/// A failure surfaced through the envelope's `e` field.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    /// The envelope's context matches no class and no live instance.
    #[error("Could not find context: {0}")]
    ContextNotFound(String),

    /// The context resolved but no method + signature matched the lookup key.
    #[error("Could not find function: {0}")]
    MethodNotFound(String),

    /// An argument could not be decoded at its declared parameter type.
    #[error("Could not decode argument {index} as {expected}: {reason}")]
    Decode {
        /// Zero-based position in the argument array
        index: usize,
        /// JSON type name the parameter was registered with
        expected: &'static str,
        /// Underlying decode failure
        reason: String,
    },

    /// The target function itself failed; the message is captured verbatim.
    #[error("{0}")]
    Target(String),
}

/// A failure raised through the host's native error channel.
#[derive(Debug, Error)]
pub enum HostError {
    /// The request is not a usable envelope (missing or mistyped `c`, `f`
    /// or `a`, or not a JSON object at all).
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The fan-out sink bank is at capacity.
    #[error("Callback sink bank is full ({capacity} sinks)")]
    SinkBankFull {
        /// Fixed bank capacity
        capacity: usize,
    },

    /// A binding library could not be loaded.
    #[error("Problem loading bindings: {0}")]
    Load(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_messages_match_the_protocol() {
        assert_eq!(
            CallError::ContextNotFound("ghost".into()).to_string(),
            "Could not find context: ghost"
        );
        assert_eq!(
            CallError::MethodNotFound("crazy-number".into()).to_string(),
            "Could not find function: crazy-number"
        );
        assert_eq!(
            CallError::Target("Sorry, this bottle is not in our selection".into()).to_string(),
            "Sorry, this bottle is not in our selection"
        );
    }

    #[test]
    fn decode_error_names_position_and_type() {
        let e = CallError::Decode {
            index: 2,
            expected: "number",
            reason: "invalid type: string".into(),
        };
        assert!(e.to_string().contains("argument 2"));
        assert!(e.to_string().contains("number"));
    }
}
