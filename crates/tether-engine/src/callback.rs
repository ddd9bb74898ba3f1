//! Callback bridge
//!
//! A function-typed parameter is transported as an opaque string token. At
//! unpack time the engine synthesizes a [`Callback`] in its place; whenever
//! the target invokes it, immediately or long after the originating call
//! returned, the bridge builds a callback event envelope (original `c` and
//! `f`, packed callback arguments in `a`, the token in `i`) and delivers it
//! to the registered sinks.
//!
//! Delivery is thread-aware. The thread that installs the primary sink is
//! recorded as the host thread: firings on that thread invoke the sinks
//! synchronously, firings on any other thread append to a mutex-guarded FIFO
//! queue and trigger the host-supplied wake hook. The host drains the queue
//! on its own thread via [`CallbackBridge::drain`], which swaps the queue out
//! under the lock and dispatches without holding it, preserving FIFO order.
//!
//! Sinks run while the originating instance may still be locked by the call
//! that fired synchronously; a sink must not call back into that instance
//! on the same thread.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use serde_json::Value;
use tether_core::{CallError, Envelope, HostError};

use crate::param::{pack_value, CallbackParam, Param};

/// Size of the fan-out sink bank.
pub const SINK_BANK_CAPACITY: usize = 32;

/// A registered callback sink.
pub type CallbackSink = Arc<dyn Fn(&Envelope) + Send + Sync>;

// ============================================================================
// Callback parameter
// ============================================================================

/// Typed handle standing in for a callback parameter.
///
/// `A` is the tuple of argument types the callback carries, e.g.
/// `Callback<(Bottle,)>` for a listener receiving one `Bottle`. The handle
/// owns the token and the originating call's context and method, nothing
/// else. It is cheap to clone, `Send`, and outlives the call that produced
/// it. Once the target drops its last clone, no further events are produced.
pub struct Callback<A> {
    token: String,
    context: String,
    method: String,
    _args: PhantomData<fn(A)>,
}

impl<A: CallbackArgs> Callback<A> {
    /// Fire the callback: packs `args`, stamps the token into `i` and hands
    /// the event to the bridge.
    pub fn fire(&self, args: A) {
        let mut event = Envelope::new(self.context.clone(), self.method.clone(), args.pack());
        event.callback_id = Some(self.token.clone());
        CallbackBridge::global().emit(event);
    }

    /// The caller-chosen correlation token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Callback {
            token: self.token.clone(),
            context: self.context.clone(),
            method: self.method.clone(),
            _args: PhantomData,
        }
    }
}

impl<A> std::fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback").field("token", &self.token).finish()
    }
}

// A callback-typed value packs as the empty string on the sending side; the
// receiving side substitutes the real token.
impl<A> serde::Serialize for Callback<A> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("")
    }
}

impl<A: CallbackArgs> Param<CallbackParam> for Callback<A> {
    fn json_type() -> &'static str {
        // Tokens travel as strings; the signature counts callbacks as such.
        "string"
    }

    fn decode(env: &Envelope, index: usize) -> Result<Self, CallError> {
        match env.args.get(index) {
            Some(Value::String(token)) => Ok(Callback {
                token: token.clone(),
                context: env.context.clone(),
                method: env.method.clone(),
                _args: PhantomData,
            }),
            _ => Err(CallError::Decode {
                index,
                expected: "string",
                reason: "callback token must be a string".into(),
            }),
        }
    }
}

/// Argument tuple of a callback.
pub trait CallbackArgs: Send + 'static {
    /// Pack into the event's argument array.
    fn pack(self) -> Vec<Value>;
}

macro_rules! impl_callback_args {
    ($( ($($T:ident),*) )*) => {$(
        impl<$($T),*> CallbackArgs for ($($T,)*)
        where
            $($T: serde::Serialize + Send + 'static,)*
        {
            #[allow(non_snake_case)]
            fn pack(self) -> Vec<Value> {
                let ($($T,)*) = self;
                vec![$(pack_value(&$T)),*]
            }
        }
    )*};
}

impl_callback_args!(
    ()
    (T0)
    (T0, T1)
    (T0, T1, T2)
    (T0, T1, T2, T3)
    (T0, T1, T2, T3, T4)
    (T0, T1, T2, T3, T4, T5)
    (T0, T1, T2, T3, T4, T5, T6)
    (T0, T1, T2, T3, T4, T5, T6, T7)
);

// ============================================================================
// Bridge
// ============================================================================

struct Sinks {
    primary: Option<CallbackSink>,
    bank: Vec<CallbackSink>,
    host_thread: Option<ThreadId>,
    wake: Option<Arc<dyn Fn() + Send + Sync>>,
}

/// Process-wide delivery point for callback events.
pub struct CallbackBridge {
    sinks: Mutex<Sinks>,
    queue: Mutex<VecDeque<Envelope>>,
}

static BRIDGE: LazyLock<CallbackBridge> = LazyLock::new(|| CallbackBridge {
    sinks: Mutex::new(Sinks {
        primary: None,
        bank: Vec::new(),
        host_thread: None,
        wake: None,
    }),
    queue: Mutex::new(VecDeque::new()),
});

impl CallbackBridge {
    /// The process-wide bridge.
    pub fn global() -> &'static CallbackBridge {
        &BRIDGE
    }

    /// Install the primary sink, replacing any previous one. The calling
    /// thread becomes the host thread.
    pub fn set_primary(&self, sink: impl Fn(&Envelope) + Send + Sync + 'static) {
        let mut sinks = self.sinks.lock();
        sinks.primary = Some(Arc::new(sink));
        sinks.host_thread = Some(thread::current().id());
    }

    /// Install the wake hook invoked when an event is queued from a
    /// non-host thread. The host owns the wake; the bridge owns the queue.
    pub fn set_wake(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.sinks.lock().wake = Some(Arc::new(hook));
    }

    /// Add a fan-out sink to the fixed-size bank.
    pub fn add_sink(
        &self,
        sink: impl Fn(&Envelope) + Send + Sync + 'static,
    ) -> Result<usize, HostError> {
        let mut sinks = self.sinks.lock();
        if sinks.bank.len() >= SINK_BANK_CAPACITY {
            return Err(HostError::SinkBankFull {
                capacity: SINK_BANK_CAPACITY,
            });
        }
        sinks.bank.push(Arc::new(sink));
        Ok(sinks.bank.len() - 1)
    }

    /// Deliver one event: synchronously when on the host thread, otherwise
    /// enqueued for the host to drain. Events with no registered sink are
    /// discarded.
    pub fn emit(&self, event: Envelope) {
        let (has_sink, on_host, wake) = {
            let sinks = self.sinks.lock();
            (
                sinks.primary.is_some() || !sinks.bank.is_empty(),
                sinks.host_thread == Some(thread::current().id()),
                sinks.wake.clone(),
            )
        };
        if !has_sink {
            return;
        }
        if on_host {
            self.dispatch(&event);
        } else {
            self.queue.lock().push_back(event);
            if let Some(wake) = wake {
                wake();
            }
        }
    }

    /// Drain queued events in FIFO order, invoking the sinks once per event.
    /// Intended to run on the host thread, typically from the wake hook.
    pub fn drain(&self) {
        let drained = std::mem::take(&mut *self.queue.lock());
        for event in drained {
            self.dispatch(&event);
        }
    }

    /// Number of events waiting to be drained.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    fn dispatch(&self, event: &Envelope) {
        let (primary, bank) = {
            let sinks = self.sinks.lock();
            (sinks.primary.clone(), sinks.bank.clone())
        };
        if let Some(sink) = primary {
            sink(event);
        }
        for sink in bank {
            sink(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn callbacks_pack_as_empty_string() {
        let env = Envelope::new("bar1", "onAdd", vec![json!("cb-7")]);
        let cb = <Callback<(String,)> as Param<CallbackParam>>::decode(&env, 0)
            .expect("token decodes");
        assert_eq!(cb.token(), "cb-7");
        assert_eq!(pack_value(&cb), json!(""));
    }

    #[test]
    fn callback_signature_contribution_is_string() {
        assert_eq!(
            <Callback<(String, i32)> as Param<CallbackParam>>::json_type(),
            "string"
        );
    }

    #[test]
    fn non_string_token_is_a_decode_error() {
        let env = Envelope::new("bar1", "onAdd", vec![json!(42)]);
        let err = <Callback<()> as Param<CallbackParam>>::decode(&env, 0)
            .expect_err("token must be a string");
        assert!(matches!(err, CallError::Decode { index: 0, .. }));
    }

    #[test]
    fn args_pack_positionally() {
        let packed = ("late".to_string(), 7i32).pack();
        assert_eq!(packed, vec![json!("late"), json!(7)]);
        assert!(().pack().is_empty());
    }
}
