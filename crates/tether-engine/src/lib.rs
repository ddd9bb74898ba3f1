//! Tether engine: non-intrusive RPC adaptation
//!
//! Exposes plain Rust types and functions as remotely callable endpoints.
//! Callers submit one self-describing JSON envelope naming a *context* (a
//! class for static and factory calls, an instance id for member calls), a
//! *method* and a positional argument array; the engine resolves the
//! overload by signature, dispatches to the real function and writes the
//! marshalled return value (or error) back into the envelope. Function-typed
//! parameters travel as string tokens and come back as asynchronous callback
//! events, safely across threads.
//!
//! The pieces, bottom up:
//!
//! - [`holder`]: type-erased shared cell for instance handles
//! - [`param`]: argument decoding and return-value adaptation
//! - [`callback`]: the callback bridge (tokens, sinks, cross-thread queue)
//! - [`invoker`]: uniform envelope-in/envelope-out function adapters
//! - [`registry`]: dispatch tables and the instance factory
//! - [`bind`]: the registration DSL run at startup
//! - [`host`]: the string-in/string-out facade for language hosts
//! - [`loader`]: optional loading of self-registering binding libraries
//!
//! Registration is a single-threaded write-phase at startup; `call` runs
//! synchronously on the caller's thread. Targets may spawn threads at will
//! and talk back exclusively through the callback bridge, which owns the
//! only cross-thread synchronization in the crate.

#![warn(missing_docs)]

pub mod bind;
pub mod callback;
pub mod holder;
pub mod host;
pub mod invoker;
pub mod loader;
pub mod param;
pub mod registry;

pub use bind::{expose, ClassBinder};
pub use callback::{Callback, CallbackBridge, SINK_BANK_CAPACITY};
pub use holder::Holder;
pub use invoker::Invoke;
pub use loader::LoadError;
pub use registry::Registry;

// Wire model, re-exported so binding authors need only this crate.
pub use tether_core::{
    full_method_key, json_type_name, signature_from_types, signature_of, CallError, Envelope,
    HostError, MethodMeta, ParamDefault, ParamMeta, RetMeta,
};
