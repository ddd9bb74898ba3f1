//! Type-erased instance cell
//!
//! `Holder` parks one value of any registered type behind a shared owning
//! handle so that instances of different classes can live in a single table.
//! Cloning bumps the reference count; the payload is never deep-copied.
//! A holder never crosses the wire.

use std::any::Any;
use std::sync::Arc;

/// Shared, type-erased container for a single value.
///
/// The runtime type is preserved alongside the erased handle; `get` recovers
/// the typed `Arc`. Asking for the wrong type is a programmer error in the
/// registration code, not a runtime condition, and panics with both type
/// names.
#[derive(Clone)]
pub struct Holder {
    cell: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Holder {
    /// Park a value behind a fresh shared handle.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Park an already-shared value; the holder owns one strong reference.
    pub fn from_arc<T: Send + Sync + 'static>(cell: Arc<T>) -> Self {
        Holder {
            cell,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Recover the typed handle.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the stored type.
    pub fn get<T: Send + Sync + 'static>(&self) -> Arc<T> {
        match Arc::clone(&self.cell).downcast::<T>() {
            Ok(typed) => typed,
            Err(_) => panic!(
                "holder type mismatch: stored {}, requested {}",
                self.type_name,
                std::any::type_name::<T>()
            ),
        }
    }

    /// Name of the stored type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Address of the shared cell; stable for the cell's lifetime.
    pub fn address(&self) -> usize {
        Arc::as_ptr(&self.cell) as *const () as usize
    }
}

impl std::fmt::Debug for Holder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Holder")
            .field("type", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn stores_and_recovers_typed_handles() {
        let holder = Holder::new(Mutex::new(vec![1u32, 2, 3]));
        let cell = holder.get::<Mutex<Vec<u32>>>();
        assert_eq!(cell.lock().len(), 3);
    }

    #[test]
    fn clone_shares_the_payload() {
        let holder = Holder::new(Mutex::new(0u64));
        let copy = holder.clone();
        *holder.get::<Mutex<u64>>().lock() = 42;
        assert_eq!(*copy.get::<Mutex<u64>>().lock(), 42);
        assert_eq!(holder.address(), copy.address());
    }

    #[test]
    #[should_panic(expected = "holder type mismatch")]
    fn wrong_type_is_a_programmer_error() {
        let holder = Holder::new(5u8);
        let _ = holder.get::<String>();
    }
}
