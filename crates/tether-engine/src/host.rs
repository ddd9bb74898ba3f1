//! Host facade
//!
//! The small surface a language-host shim (or a transport agent) talks to:
//! JSON strings in, JSON strings out, plus sink registration for callback
//! events. Malformed requests never reach the dispatcher; they surface as
//! [`HostError`] through the host's native error channel, because no
//! envelope exists to carry an `e` field.

use tether_core::{Envelope, HostError};

use crate::callback::CallbackBridge;
use crate::loader;
use crate::registry::Registry;

/// Dispatch one request envelope synchronously; returns the response
/// envelope with exactly one of `r`/`e` set.
pub fn call(request: &str) -> Result<String, HostError> {
    let mut env = Envelope::parse(request)?;
    Registry::global().call(&mut env);
    Ok(env.to_json())
}

/// JSON array of all bound classes.
pub fn get_classes() -> String {
    to_json_array(Registry::global().classes())
}

/// JSON array of the shared instances of a class.
pub fn get_instances(class_name: &str) -> String {
    to_json_array(Registry::global().instances_of(class_name))
}

/// JSON array of a class's member-function keys (name plus signature).
pub fn get_member_functions(class_name: &str) -> String {
    to_json_array(Registry::global().member_functions(class_name))
}

/// JSON array of a class's static-function keys, including the synthetic
/// constructor and destructor endpoints.
pub fn get_static_functions(class_name: &str) -> String {
    to_json_array(Registry::global().static_functions(class_name))
}

/// JSON object with the metadata of a class; `{}` when none was registered.
pub fn get_meta_data(class_name: &str) -> String {
    Registry::global().meta_data(class_name).to_string()
}

/// Install the primary callback sink. The calling thread becomes the host
/// thread; see [`CallbackBridge`] for the delivery contract.
pub fn on_callback(sink: impl Fn(&Envelope) + Send + Sync + 'static) {
    CallbackBridge::global().set_primary(sink);
}

/// Add a fan-out sink to the fixed-size bank.
pub fn add_callback_sink(
    sink: impl Fn(&Envelope) + Send + Sync + 'static,
) -> Result<usize, HostError> {
    CallbackBridge::global().add_sink(sink)
}

/// Install the wake hook fired when a callback event is queued from a
/// non-host thread.
pub fn on_callback_wake(hook: impl Fn() + Send + Sync + 'static) {
    CallbackBridge::global().set_wake(hook);
}

/// Drain queued callback events on the host thread, in FIFO order.
pub fn drain_callbacks() {
    CallbackBridge::global().drain();
}

/// Open a binding library that registers its classes on load.
pub fn load_bindings(path: &str) -> Result<(), HostError> {
    loader::load_bindings(path).map_err(|e| HostError::Load(e.to_string()))
}

fn to_json_array(items: Vec<String>) -> String {
    serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string())
}
