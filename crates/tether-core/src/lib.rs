//! Tether wire model
//!
//! Foundational types shared by the engine and by binding authors: the JSON
//! envelope that carries every request, response and callback event, the
//! signature encoding that disambiguates overloads, the error taxonomy, and
//! the optional per-method metadata model.
//!
//! This crate deliberately knows nothing about dispatch; it can be used to
//! build or inspect envelopes on either side of a transport.

#![warn(missing_docs)]

mod envelope;
mod error;
mod meta;
mod signature;

pub use envelope::{Envelope, Outcome};
pub use error::{CallError, HostError};
pub use meta::{MethodMeta, ParamDefault, ParamMeta, RetMeta};
pub use signature::{full_method_key, json_type_name, signature_from_types, signature_of};
