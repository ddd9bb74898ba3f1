//! Binding DSL
//!
//! Explicit registration entry points, run once at startup (or when a
//! binding library is loaded). Binding a class means naming it, handing over
//! its constructors, members and statics as plain Rust functions, and
//! optionally describing them for introspection:
//!
//! ```no_run
//! use tether_engine::{expose, Callback};
//! # #[derive(Default, serde::Serialize, serde::Deserialize)]
//! # struct Bottle;
//! # #[derive(Default)]
//! # struct Bar;
//! # impl Bar {
//! #     fn philosophy() -> String { String::new() }
//! #     fn add_bottle(&mut self, _n: String, _c: String, _k: String) {}
//! #     fn get_selection(&self) -> Vec<Bottle> { vec![] }
//! #     fn on_add(&mut self, _cb: Callback<(Bottle,)>) {}
//! # }
//!
//! expose::<Bar>("Bar")
//!     .constructor(Bar::default)
//!     .member("addBottle", Bar::add_bottle)
//!     .member_const("getSelection", Bar::get_selection)
//!     .member("onAdd", Bar::on_add)
//!     .static_fn("philosophy", || Bar::philosophy());
//! ```
//!
//! Registering a constructor injects three synthetic endpoints under the
//! class name: `__createIsolated__`, `__createShared__` (both keyed with the
//! instance-id `string` prepended to the constructor signature) and a single
//! `__delete__-string`. Member keys are the function name plus the signature
//! derived from the declared parameter types.
//!
//! Duplicate keys (same context, method and signature) silently replace the
//! earlier registration; last one wins.

use std::marker::PhantomData;
use std::sync::Arc;

use tether_core::{signature_from_types, MethodMeta, ParamMeta, RetMeta};

use crate::invoker::{
    ByRef, CtorFn, CtorInvoker, DeleteInvoker, MemberFn, MemberInvoker, StaticFn, StaticInvoker,
};
use crate::registry::Registry;

/// Start binding a class under its remotely visible name.
pub fn expose<K: Send + 'static>(class_name: &str) -> ClassBinder<K> {
    Registry::global().ensure_class(class_name);
    ClassBinder {
        class_name: class_name.to_string(),
        _class: PhantomData,
    }
}

/// Fluent registration of one class's endpoints.
pub struct ClassBinder<K> {
    class_name: String,
    _class: PhantomData<fn(K)>,
}

impl<K: Send + 'static> ClassBinder<K> {
    /// Register a constructor, injecting the synthetic creation and deletion
    /// endpoints for this class.
    pub fn constructor<A, M, F>(self, ctor: F) -> Self
    where
        F: CtorFn<K, A, M>,
        A: 'static,
        M: 'static,
    {
        let registry = Registry::global();
        let ctor_signature = signature_from_types(
            std::iter::once("string").chain(F::arg_types()),
        );

        registry.add_target_function(
            &self.class_name,
            format!("__createIsolated__{ctor_signature}"),
            Arc::new(CtorInvoker::new(&self.class_name, false, ctor.clone())),
        );
        registry.add_target_function(
            &self.class_name,
            format!("__createShared__{ctor_signature}"),
            Arc::new(CtorInvoker::new(&self.class_name, true, ctor)),
        );
        registry.add_target_function(
            &self.class_name,
            format!("__delete__{}", signature_from_types(["string"])),
            Arc::new(DeleteInvoker),
        );
        self
    }

    /// Register a constructor with a description served via introspection.
    /// The metadata lands under the `__createShared__` key.
    pub fn constructor_described<A, M, F>(
        self,
        ctor: F,
        description: &str,
        params: Vec<ParamMeta>,
    ) -> Self
    where
        F: CtorFn<K, A, M>,
        A: 'static,
        M: 'static,
    {
        let key = format!(
            "__createShared__{}",
            signature_from_types(std::iter::once("string").chain(F::arg_types()))
        );
        Registry::global().add_meta(
            &self.class_name,
            key,
            MethodMeta {
                description: description.to_string(),
                params,
                ret: RetMeta::new("string", "returns the id of the created instance"),
            },
        );
        self.constructor(ctor)
    }

    /// Register a member function (taking `&K` or `&mut K`) as an unbound
    /// class template; instance creation binds a clone per instance.
    pub fn member<A, M, F>(self, name: &str, func: F) -> Self
    where
        F: MemberFn<K, A, M>,
        A: 'static,
        M: 'static,
    {
        Registry::global().add_class_template(
            &self.class_name,
            format!("{name}{}", F::signature()),
            Arc::new(MemberInvoker::unbound(func)),
        );
        self
    }

    /// Register a member function taking `&K` only. `member` accepts these
    /// too; this entry point rejects `&mut K` receivers at compile time.
    pub fn member_const<A, M, F>(self, name: &str, func: F) -> Self
    where
        F: MemberFn<K, A, (ByRef, M)>,
        A: 'static,
        M: 'static,
    {
        self.member::<A, (ByRef, M), F>(name, func)
    }

    /// Register a member function together with its metadata.
    pub fn member_described<A, M, F>(
        self,
        name: &str,
        func: F,
        description: &str,
        ret: RetMeta,
        params: Vec<ParamMeta>,
    ) -> Self
    where
        F: MemberFn<K, A, M>,
        A: 'static,
        M: 'static,
    {
        Registry::global().add_meta(
            &self.class_name,
            format!("{name}{}", F::signature()),
            MethodMeta {
                description: description.to_string(),
                params,
                ret,
            },
        );
        self.member(name, func)
    }

    /// Register a static function under the class name.
    pub fn static_fn<A, M, F>(self, name: &str, func: F) -> Self
    where
        F: StaticFn<A, M>,
        A: 'static,
        M: 'static,
    {
        Registry::global().add_target_function(
            &self.class_name,
            format!("{name}{}", F::signature()),
            Arc::new(StaticInvoker::new(func)),
        );
        self
    }

    /// Register a static function together with its metadata.
    pub fn static_described<A, M, F>(
        self,
        name: &str,
        func: F,
        description: &str,
        ret: RetMeta,
        params: Vec<ParamMeta>,
    ) -> Self
    where
        F: StaticFn<A, M>,
        A: 'static,
        M: 'static,
    {
        Registry::global().add_meta(
            &self.class_name,
            format!("{name}{}", F::signature()),
            MethodMeta {
                description: description.to_string(),
                params,
                ret,
            },
        );
        self.static_fn(name, func)
    }
}

/// Declare the registration entry point of a binding library built as a
/// `cdylib`, loadable via `host::load_bindings`.
///
/// ```ignore
/// fn register() {
///     tether_engine::expose::<Bar>("Bar")
///         .constructor(Bar::default)
///         .member("getSelection", Bar::get_selection);
/// }
///
/// tether_engine::binding_library!(register);
/// ```
#[macro_export]
macro_rules! binding_library {
    ($register:expr) => {
        #[no_mangle]
        pub extern "C" fn tether_register_bindings() {
            let register: fn() = $register;
            register();
        }
    };
}
