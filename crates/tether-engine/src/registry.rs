//! Registry and instance factory
//!
//! Two invoker tables plus two lifecycle side tables:
//!
//! | Table              | Key                       | Value                  |
//! |--------------------|---------------------------|------------------------|
//! | class templates    | class → method+signature  | unbound member invoker |
//! | target functions   | context → method+signature| ready-to-call invoker  |
//! | instances          | instance id               | holder owning the cell |
//! | shared instances   | instance id               | class name             |
//!
//! Statics and the synthetic constructor/destructor endpoints live in the
//! target table under the class name; bound member invokers live under the
//! instance id. `call` resolves context first, then the full method key;
//! the two failure modes keep the argument array intact.
//!
//! Registration is a startup write-phase; dispatch is the read-heavy
//! call-phase. The tables sit behind one lock, and `call` clones the invoker
//! handle out before invoking so that constructor and destructor targets can
//! re-enter the registry to install or remove instances.

use std::sync::{Arc, LazyLock};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tether_core::{full_method_key, CallError, Envelope, MethodMeta};

use crate::holder::Holder;
use crate::invoker::Invoke;

type InvokerTable = FxHashMap<String, Arc<dyn Invoke>>;

#[derive(Default)]
struct Tables {
    class_functions: FxHashMap<String, InvokerTable>,
    target_functions: FxHashMap<String, InvokerTable>,
    instances: FxHashMap<String, Holder>,
    shared_instances: FxHashMap<String, String>,
    meta: FxHashMap<String, FxHashMap<String, MethodMeta>>,
}

/// The process-wide dispatch table and instance factory.
pub struct Registry {
    tables: RwLock<Tables>,
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(|| Registry {
    tables: RwLock::new(Tables::default()),
});

impl Registry {
    /// The process-wide registry. Tables start empty; the binding DSL fills
    /// them at startup.
    pub fn global() -> &'static Registry {
        &REGISTRY
    }

    // ========================================================================
    // Registration (write-phase)
    // ========================================================================

    /// Make a class enumerable even before any member function is added.
    pub(crate) fn ensure_class(&self, class_name: &str) {
        self.tables
            .write()
            .class_functions
            .entry(class_name.to_string())
            .or_default();
    }

    /// Register an unbound member template. Last registration wins on a
    /// duplicate key.
    pub(crate) fn add_class_template(
        &self,
        class_name: &str,
        key: String,
        invoker: Arc<dyn Invoke>,
    ) {
        self.tables
            .write()
            .class_functions
            .entry(class_name.to_string())
            .or_default()
            .insert(key, invoker);
    }

    /// Register a ready-to-call invoker under a context (class name for
    /// statics and synthetics). Last registration wins on a duplicate key.
    pub(crate) fn add_target_function(
        &self,
        context: &str,
        key: String,
        invoker: Arc<dyn Invoke>,
    ) {
        self.tables
            .write()
            .target_functions
            .entry(context.to_string())
            .or_default()
            .insert(key, invoker);
    }

    /// Attach metadata to a method of a class.
    pub(crate) fn add_meta(&self, class_name: &str, key: String, meta: MethodMeta) {
        self.tables
            .write()
            .meta
            .entry(class_name.to_string())
            .or_default()
            .insert(key, meta);
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Dispatch one envelope in place: resolve the context, then the full
    /// method key, then run the invoker. On failure exactly the error slot
    /// is written and the arguments stay untouched.
    pub fn call(&self, env: &mut Envelope) {
        let key = full_method_key(&env.method, &env.args);
        let invoker = {
            let tables = self.tables.read();
            let Some(functions) = tables.target_functions.get(&env.context) else {
                env.set_err(CallError::ContextNotFound(env.context.clone()).to_string());
                return;
            };
            match functions.get(&key) {
                Some(invoker) => Arc::clone(invoker),
                None => {
                    env.set_err(CallError::MethodNotFound(key).to_string());
                    return;
                }
            }
        };
        // The lock is released: the invoker may re-enter the registry
        // (constructors install instances, destructors remove them).
        invoker.invoke(env);
    }

    // ========================================================================
    // Instance lifecycle
    // ========================================================================

    /// Whether an instance id is live.
    pub fn has_instance(&self, instance_id: &str) -> bool {
        self.tables.read().instances.contains_key(instance_id)
    }

    /// Install a freshly constructed instance: park the cell in a holder,
    /// clone every class template, bind the clones to the cell and publish
    /// them under the instance id. Shared instances additionally become
    /// enumerable by class.
    pub(crate) fn install_instance<K: Send + 'static>(
        &self,
        class_name: &str,
        instance_id: &str,
        cell: Arc<Mutex<K>>,
        shared: bool,
    ) {
        let holder = Holder::from_arc(cell);
        let mut tables = self.tables.write();

        let mut bound: InvokerTable = FxHashMap::default();
        if let Some(templates) = tables.class_functions.get(class_name) {
            for (key, template) in templates {
                let mut clone = template.clone_invoker();
                clone.bind(&holder);
                bound.insert(key.clone(), Arc::from(clone));
            }
        }

        tables
            .target_functions
            .insert(instance_id.to_string(), bound);
        tables.instances.insert(instance_id.to_string(), holder);
        if shared {
            tables
                .shared_instances
                .insert(instance_id.to_string(), class_name.to_string());
        }
    }

    /// Remove an instance, its bound invokers and any shared-instance
    /// record, atomically. Returns whether an instance existed.
    pub(crate) fn remove_instance(&self, instance_id: &str) -> bool {
        let mut tables = self.tables.write();
        if tables.instances.remove(instance_id).is_none() {
            return false;
        }
        tables.target_functions.remove(instance_id);
        tables.shared_instances.remove(instance_id);
        true
    }

    // ========================================================================
    // Introspection (read-phase)
    // ========================================================================

    /// All classes that registered members or constructors. Order is
    /// unspecified.
    pub fn classes(&self) -> Vec<String> {
        self.tables.read().class_functions.keys().cloned().collect()
    }

    /// Shared instances of a class. Isolated instances are private to their
    /// creator and never listed.
    pub fn instances_of(&self, class_name: &str) -> Vec<String> {
        self.tables
            .read()
            .shared_instances
            .iter()
            .filter(|(_, class)| class.as_str() == class_name)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Full member-function keys (name plus signature) of a class.
    pub fn member_functions(&self, class_name: &str) -> Vec<String> {
        self.tables
            .read()
            .class_functions
            .get(class_name)
            .map(|functions| functions.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Full static-function keys of a class, including the synthetic
    /// constructor and destructor endpoints.
    pub fn static_functions(&self, class_name: &str) -> Vec<String> {
        self.tables
            .read()
            .target_functions
            .get(class_name)
            .map(|functions| functions.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Metadata blob of a class; an empty object when none was registered.
    pub fn meta_data(&self, class_name: &str) -> Value {
        let tables = self.tables.read();
        let mut blob = Map::new();
        if let Some(methods) = tables.meta.get(class_name) {
            for (key, meta) in methods {
                blob.insert(key.clone(), meta.to_value());
            }
        }
        Value::Object(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::{MemberInvoker, StaticInvoker};
    use serde_json::json;

    // Unit tests here share the process-wide registry with every other test
    // in the binary, so each one works against its own class name.

    #[test]
    fn unknown_context_and_method_report_in_order() {
        let registry = Registry::global();
        registry.add_target_function(
            "reg_unit_Greeter",
            "greet".into(),
            Arc::from(StaticInvoker::new(|| "hello".to_string()).clone_invoker()),
        );

        let mut env = Envelope::new("reg_unit_Nobody", "greet", vec![]);
        registry.call(&mut env);
        assert_eq!(env.err(), Some("Could not find context: reg_unit_Nobody"));
        assert!(env.args.is_empty());

        let mut env = Envelope::new("reg_unit_Greeter", "greet", vec![json!(1)]);
        registry.call(&mut env);
        assert_eq!(env.err(), Some("Could not find function: greet-number"));

        let mut env = Envelope::new("reg_unit_Greeter", "greet", vec![]);
        registry.call(&mut env);
        assert_eq!(env.ret(), Some(&json!("hello")));
    }

    #[test]
    fn install_binds_templates_and_delete_is_atomic() {
        struct Tally {
            total: i64,
        }
        let registry = Registry::global();
        registry.add_class_template(
            "reg_unit_Tally",
            "add-number".into(),
            Arc::from(
                MemberInvoker::unbound(|t: &mut Tally, by: i64| {
                    t.total += by;
                    t.total
                })
                .clone_invoker(),
            ),
        );

        registry.install_instance(
            "reg_unit_Tally",
            "reg_unit_tally1",
            Arc::new(Mutex::new(Tally { total: 0 })),
            true,
        );
        assert!(registry.has_instance("reg_unit_tally1"));
        assert_eq!(
            registry.instances_of("reg_unit_Tally"),
            vec!["reg_unit_tally1".to_string()]
        );

        let mut env = Envelope::new("reg_unit_tally1", "add", vec![json!(4)]);
        registry.call(&mut env);
        assert_eq!(env.ret(), Some(&json!(4)));

        assert!(registry.remove_instance("reg_unit_tally1"));
        assert!(!registry.has_instance("reg_unit_tally1"));
        assert!(registry.instances_of("reg_unit_Tally").is_empty());

        // The bound invokers went with the instance.
        let mut env = Envelope::new("reg_unit_tally1", "add", vec![json!(4)]);
        registry.call(&mut env);
        assert_eq!(env.err(), Some("Could not find context: reg_unit_tally1"));

        // Second delete reports nothing to remove.
        assert!(!registry.remove_instance("reg_unit_tally1"));
    }

    #[test]
    fn meta_data_defaults_to_an_empty_object() {
        assert_eq!(
            Registry::global().meta_data("reg_unit_NoSuchClass"),
            json!({})
        );
    }
}
