//! Function adapters
//!
//! Every registered callable (static, member, constructor or destructor)
//! is wrapped as a uniform [`Invoke`] object that consumes one envelope and
//! mutates it in place: arguments are decoded per the declared parameter
//! list, the target runs, and exactly one of the return or error slots is
//! written back.
//!
//! The adaptation from a strongly typed `Fn` to the uniform shape is done by
//! the `StaticFn` / `MemberFn` / `CtorFn` traits, implemented for function
//! arities 0 through 8 by a single macro. Each impl also reports the
//! registration-time signature contribution of its parameter list, so the
//! lookup key used at registration always matches the one derived from a
//! well-typed argument array.
//!
//! A panicking target is contained here and surfaced through the error slot;
//! the registry stays usable afterwards.

use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tether_core::{signature_from_types, CallError, Envelope};

use crate::holder::Holder;
use crate::param::{Param, Reply};
use crate::registry::Registry;

// ============================================================================
// Uniform invoker shape
// ============================================================================

/// A registered function behind the uniform `invoke(envelope)` shape.
pub trait Invoke: Send + Sync {
    /// Dispatch the envelope: decode arguments, run the target, write the
    /// return or error slot in place.
    fn invoke(&self, env: &mut Envelope);

    /// Clone this invoker (used to stamp per-instance copies from a class
    /// template).
    fn clone_invoker(&self) -> Box<dyn Invoke>;

    /// Bind to a concrete instance. A no-op for everything but member
    /// invokers.
    fn bind(&mut self, _instance: &Holder) {}
}

// ============================================================================
// Typed call traits (macro-implemented per arity)
// ============================================================================

/// A free or associated function without instance binding.
pub trait StaticFn<A, M>: Clone + Send + Sync + 'static {
    /// JSON type names of the declared parameters, in order.
    fn arg_types() -> Vec<&'static str>;

    /// Decode the arguments and run the target.
    fn call(&self, env: &Envelope) -> Result<Value, CallError>;

    /// Signature contribution of the parameter list.
    fn signature() -> String {
        signature_from_types(Self::arg_types())
    }
}

/// Marker: member function taking `&mut K`.
pub struct ByMut;

/// Marker: member function taking `&K`.
pub struct ByRef;

/// A member function of `K`.
pub trait MemberFn<K, A, M>: Clone + Send + Sync + 'static {
    /// JSON type names of the declared parameters, in order (receiver
    /// excluded).
    fn arg_types() -> Vec<&'static str>;

    /// Decode the arguments and run the target against `target`.
    fn call_on(&self, target: &mut K, env: &Envelope) -> Result<Value, CallError>;

    /// Signature contribution of the parameter list.
    fn signature() -> String {
        signature_from_types(Self::arg_types())
    }
}

/// A constructor producing `K`. The envelope's first argument is the
/// instance id; constructor arguments follow it.
pub trait CtorFn<K, A, M>: Clone + Send + Sync + 'static {
    /// JSON type names of the constructor parameters (instance id excluded).
    fn arg_types() -> Vec<&'static str>;

    /// Decode the constructor arguments (offset past the instance id) and
    /// build the instance.
    fn construct(&self, env: &Envelope) -> Result<K, CallError>;
}

/// Marker: constructor returning `K` directly.
pub struct InstanceReply;

/// Marker: fallible constructor returning `Result<K, E>`.
pub struct TryInstanceReply;

/// Constructor return adaptation.
pub trait IntoInstance<K, M>: 'static {
    /// Unwrap into the constructed instance.
    fn into_instance(self) -> Result<K, CallError>;
}

impl<K: 'static> IntoInstance<K, InstanceReply> for K {
    fn into_instance(self) -> Result<K, CallError> {
        Ok(self)
    }
}

impl<K: 'static, E: std::fmt::Display + 'static> IntoInstance<K, TryInstanceReply>
    for Result<K, E>
{
    fn into_instance(self) -> Result<K, CallError> {
        self.map_err(|e| CallError::Target(e.to_string()))
    }
}

macro_rules! impl_call_traits {
    ($( [ $($idx:tt $A:ident $M:ident)* ] )*) => {$(
        impl<Func, Ret, RetM $(, $A, $M)*> StaticFn<($($A,)*), (RetM, $($M,)*)> for Func
        where
            Func: Fn($($A),*) -> Ret + Clone + Send + Sync + 'static,
            Ret: Reply<RetM>,
            RetM: 'static,
            $($A: Param<$M>, $M: 'static,)*
        {
            fn arg_types() -> Vec<&'static str> {
                vec![$(<$A as Param<$M>>::json_type()),*]
            }

            #[allow(non_snake_case)]
            fn call(&self, env: &Envelope) -> Result<Value, CallError> {
                let _ = env;
                $(let $A = <$A as Param<$M>>::decode(env, $idx)?;)*
                (self)($($A),*).into_reply()
            }
        }

        impl<Func, Klass, Ret, RetM $(, $A, $M)*> MemberFn<Klass, ($($A,)*), (ByMut, (RetM, $($M,)*))> for Func
        where
            Func: Fn(&mut Klass, $($A),*) -> Ret + Clone + Send + Sync + 'static,
            Klass: 'static,
            Ret: Reply<RetM>,
            RetM: 'static,
            $($A: Param<$M>, $M: 'static,)*
        {
            fn arg_types() -> Vec<&'static str> {
                vec![$(<$A as Param<$M>>::json_type()),*]
            }

            #[allow(non_snake_case)]
            fn call_on(&self, target: &mut Klass, env: &Envelope) -> Result<Value, CallError> {
                let _ = env;
                $(let $A = <$A as Param<$M>>::decode(env, $idx)?;)*
                (self)(target, $($A),*).into_reply()
            }
        }

        impl<Func, Klass, Ret, RetM $(, $A, $M)*> MemberFn<Klass, ($($A,)*), (ByRef, (RetM, $($M,)*))> for Func
        where
            Func: Fn(&Klass, $($A),*) -> Ret + Clone + Send + Sync + 'static,
            Klass: 'static,
            Ret: Reply<RetM>,
            RetM: 'static,
            $($A: Param<$M>, $M: 'static,)*
        {
            fn arg_types() -> Vec<&'static str> {
                vec![$(<$A as Param<$M>>::json_type()),*]
            }

            #[allow(non_snake_case)]
            fn call_on(&self, target: &mut Klass, env: &Envelope) -> Result<Value, CallError> {
                let _ = env;
                $(let $A = <$A as Param<$M>>::decode(env, $idx)?;)*
                (self)(&*target, $($A),*).into_reply()
            }
        }

        impl<Func, Klass, Out, OutM $(, $A, $M)*> CtorFn<Klass, ($($A,)*), (OutM, $($M,)*)> for Func
        where
            Func: Fn($($A),*) -> Out + Clone + Send + Sync + 'static,
            Klass: 'static,
            Out: IntoInstance<Klass, OutM>,
            OutM: 'static,
            $($A: Param<$M>, $M: 'static,)*
        {
            fn arg_types() -> Vec<&'static str> {
                vec![$(<$A as Param<$M>>::json_type()),*]
            }

            #[allow(non_snake_case)]
            fn construct(&self, env: &Envelope) -> Result<Klass, CallError> {
                let _ = env;
                // Constructor arguments sit after the instance id.
                $(let $A = <$A as Param<$M>>::decode(env, $idx + 1)?;)*
                (self)($($A),*).into_instance()
            }
        }
    )*};
}

impl_call_traits!(
    []
    [0 A0 M0]
    [0 A0 M0 1 A1 M1]
    [0 A0 M0 1 A1 M1 2 A2 M2]
    [0 A0 M0 1 A1 M1 2 A2 M2 3 A3 M3]
    [0 A0 M0 1 A1 M1 2 A2 M2 3 A3 M3 4 A4 M4]
    [0 A0 M0 1 A1 M1 2 A2 M2 3 A3 M3 4 A4 M4 5 A5 M5]
    [0 A0 M0 1 A1 M1 2 A2 M2 3 A3 M3 4 A4 M4 5 A5 M5 6 A6 M6]
    [0 A0 M0 1 A1 M1 2 A2 M2 3 A3 M3 4 A4 M4 5 A5 M5 6 A6 M6 7 A7 M7]
);

// ============================================================================
// Invoker variants
// ============================================================================

fn run_target<T>(f: impl FnOnce() -> Result<T, CallError>) -> Result<T, CallError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(CallError::Target(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "target function panicked".to_string()
    }
}

fn write_outcome(env: &mut Envelope, result: Result<Value, CallError>) {
    match result {
        Ok(value) => env.set_ret(value),
        Err(e) => env.set_err(e.to_string()),
    }
}

/// Invoker for a static function; ignores instance binding.
pub struct StaticInvoker<F, A, M> {
    func: F,
    _marker: PhantomData<fn(A, M)>,
}

impl<F, A, M> StaticInvoker<F, A, M> {
    pub(crate) fn new(func: F) -> Self {
        StaticInvoker {
            func,
            _marker: PhantomData,
        }
    }
}

impl<F, A, M> Invoke for StaticInvoker<F, A, M>
where
    F: StaticFn<A, M>,
    A: 'static,
    M: 'static,
{
    fn invoke(&self, env: &mut Envelope) {
        let result = run_target(|| self.func.call(env));
        write_outcome(env, result);
    }

    fn clone_invoker(&self) -> Box<dyn Invoke> {
        Box::new(StaticInvoker::new(self.func.clone()))
    }
}

/// Invoker for a member function. The class-level template is unbound;
/// instance creation clones it and binds the clone to the new instance cell.
pub struct MemberInvoker<K, F, A, M> {
    func: F,
    instance: Option<Arc<Mutex<K>>>,
    _marker: PhantomData<fn(A, M)>,
}

impl<K, F, A, M> MemberInvoker<K, F, A, M> {
    pub(crate) fn unbound(func: F) -> Self {
        MemberInvoker {
            func,
            instance: None,
            _marker: PhantomData,
        }
    }
}

impl<K, F, A, M> Invoke for MemberInvoker<K, F, A, M>
where
    F: MemberFn<K, A, M>,
    K: Send + 'static,
    A: 'static,
    M: 'static,
{
    fn invoke(&self, env: &mut Envelope) {
        let Some(cell) = self.instance.clone() else {
            env.set_err("Function is not bound to an instance");
            return;
        };
        let result = run_target(|| {
            let mut guard = cell.lock();
            self.func.call_on(&mut guard, env)
        });
        write_outcome(env, result);
    }

    fn clone_invoker(&self) -> Box<dyn Invoke> {
        Box::new(MemberInvoker {
            func: self.func.clone(),
            instance: self.instance.clone(),
            _marker: PhantomData,
        })
    }

    fn bind(&mut self, instance: &Holder) {
        self.instance = Some(instance.get::<Mutex<K>>());
    }
}

/// Invoker for the synthetic `__createIsolated__` / `__createShared__`
/// endpoints. Takes `(instance_id, ...ctor args)`; creation is idempotent in
/// the id.
pub struct CtorInvoker<K, F, A, M> {
    class_name: String,
    shared: bool,
    func: F,
    _marker: PhantomData<fn(A, M) -> K>,
}

impl<K, F, A, M> CtorInvoker<K, F, A, M> {
    pub(crate) fn new(class_name: &str, shared: bool, func: F) -> Self {
        CtorInvoker {
            class_name: class_name.to_string(),
            shared,
            func,
            _marker: PhantomData,
        }
    }
}

impl<K, F, A, M> Invoke for CtorInvoker<K, F, A, M>
where
    F: CtorFn<K, A, M>,
    K: Send + 'static,
    A: 'static,
    M: 'static,
{
    fn invoke(&self, env: &mut Envelope) {
        let instance_id = match env.args.first() {
            Some(Value::String(id)) => id.clone(),
            _ => {
                env.set_err(
                    CallError::Decode {
                        index: 0,
                        expected: "string",
                        reason: "instance id must be a string".into(),
                    }
                    .to_string(),
                );
                return;
            }
        };

        let registry = Registry::global();

        // An existing id wins before the constructor runs.
        if !instance_id.is_empty() && registry.has_instance(&instance_id) {
            env.set_ret(Value::String(instance_id));
            return;
        }

        let instance = match run_target(|| self.func.construct(env)) {
            Ok(instance) => instance,
            Err(e) => {
                env.set_err(e.to_string());
                return;
            }
        };

        let cell = Arc::new(Mutex::new(instance));
        let instance_id = if instance_id.is_empty() && !self.shared {
            // Isolated creation without a caller-minted id: derive one from
            // the address of the new cell.
            (Arc::as_ptr(&cell) as usize).to_string()
        } else {
            instance_id
        };

        registry.install_instance(&self.class_name, &instance_id, cell, self.shared);
        env.set_ret(Value::String(instance_id));
    }

    fn clone_invoker(&self) -> Box<dyn Invoke> {
        Box::new(CtorInvoker {
            class_name: self.class_name.clone(),
            shared: self.shared,
            func: self.func.clone(),
            _marker: PhantomData,
        })
    }
}

/// Invoker for the synthetic `__delete__` endpoint: removes the instance,
/// its bound invokers and any shared-instance record; reports whether an
/// instance existed.
pub struct DeleteInvoker;

impl Invoke for DeleteInvoker {
    fn invoke(&self, env: &mut Envelope) {
        let instance_id = match env.args.first() {
            Some(Value::String(id)) => id.clone(),
            _ => {
                env.set_err(
                    CallError::Decode {
                        index: 0,
                        expected: "string",
                        reason: "instance id must be a string".into(),
                    }
                    .to_string(),
                );
                return;
            }
        };
        let removed = Registry::global().remove_instance(&instance_id);
        env.set_ret(Value::Bool(removed));
    }

    fn clone_invoker(&self) -> Box<dyn Invoke> {
        Box::new(DeleteInvoker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn static_invoker_writes_the_return_slot() {
        let invoker = StaticInvoker::new(|a: i32, b: i32| a + b);
        let mut env = Envelope::new("Math", "add", vec![json!(2), json!(3)]);
        invoker.invoke(&mut env);
        assert_eq!(env.ret(), Some(&json!(5)));
        assert!(env.err().is_none());
    }

    #[test]
    fn void_returns_write_null() {
        let invoker = StaticInvoker::new(|_: String| ());
        let mut env = Envelope::new("C", "f", vec![json!("x")]);
        invoker.invoke(&mut env);
        assert_eq!(env.ret(), Some(&Value::Null));
    }

    #[test]
    fn fallible_targets_write_the_error_slot() {
        let invoker =
            StaticInvoker::new(|| -> Result<String, std::io::Error> {
                Err(std::io::Error::other("backend gone"))
            });
        let mut env = Envelope::new("C", "f", vec![]);
        invoker.invoke(&mut env);
        assert!(env.ret().is_none());
        assert_eq!(env.err(), Some("backend gone"));
    }

    #[test]
    fn decode_failures_abort_the_call() {
        let invoker = StaticInvoker::new(|n: i32| n * 2);
        let mut env = Envelope::new("C", "f", vec![json!("seven")]);
        invoker.invoke(&mut env);
        assert!(env.ret().is_none());
        assert!(env.err().expect("decode error").contains("argument 0"));
    }

    #[test]
    fn panicking_targets_are_contained() {
        let invoker = StaticInvoker::new(|| -> String { panic!("target blew up") });
        let mut env = Envelope::new("C", "f", vec![]);
        invoker.invoke(&mut env);
        assert_eq!(env.err(), Some("target blew up"));
    }

    #[test]
    fn member_invoker_binds_and_calls() {
        struct Counter {
            count: i64,
        }
        let template = MemberInvoker::unbound(|c: &mut Counter, by: i64| {
            c.count += by;
            c.count
        });
        let holder = Holder::from_arc(Arc::new(Mutex::new(Counter { count: 10 })));
        let mut bound = template.clone_invoker();
        bound.bind(&holder);

        let mut env = Envelope::new("counter1", "increment", vec![json!(5)]);
        bound.invoke(&mut env);
        assert_eq!(env.ret(), Some(&json!(15)));

        // The template itself stays unbound.
        let mut env = Envelope::new("counter1", "increment", vec![json!(1)]);
        template.invoke(&mut env);
        assert!(env.err().expect("unbound").contains("not bound"));
    }

    #[test]
    fn const_member_functions_adapt_too() {
        struct Named {
            name: String,
        }
        let template = MemberInvoker::unbound(|n: &Named| n.name.clone());
        let holder = Holder::from_arc(Arc::new(Mutex::new(Named {
            name: "gin".into(),
        })));
        let mut bound = template.clone_invoker();
        bound.bind(&holder);
        let mut env = Envelope::new("n1", "name", vec![]);
        bound.invoke(&mut env);
        assert_eq!(env.ret(), Some(&json!("gin")));
    }

    #[test]
    fn signatures_come_from_declared_parameter_types() {
        assert_eq!(
            <fn(String, f64, Vec<u8>) -> bool as StaticFn<_, _>>::signature(),
            "-string:number:array"
        );
        assert_eq!(<fn() -> String as StaticFn<_, _>>::signature(), "");
    }
}
