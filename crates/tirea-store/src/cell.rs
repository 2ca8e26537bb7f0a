//! Shared live state cell.
//!
//! `StateCell` wraps an `Arc<Mutex<Map>>` so that writes made by mutations
//! immediately update the document and every view reading through the cell
//! sees the latest values. The field set is captured once at creation.

use crate::error::value_type_name;
use crate::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static NULL: Value = Value::Null;

/// Live, mutable holder of the raw state object.
///
/// Clones share the same underlying document.
#[derive(Clone)]
pub struct StateCell {
    doc: Arc<Mutex<Map<String, Value>>>,
    fields: Arc<[String]>,
}

impl StateCell {
    /// Create a cell from a state factory.
    ///
    /// Fails with [`StoreError::Construction`] when the factory does not
    /// produce an object.
    pub fn create<S, F>(factory: F) -> StoreResult<Self>
    where
        S: Serialize,
        F: FnOnce() -> S,
    {
        let value = serde_json::to_value(factory())?;
        Self::from_value(value)
    }

    /// Create a cell from an already serialized state value.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Object(map) => {
                let fields: Arc<[String]> = map.keys().cloned().collect();
                Ok(Self {
                    doc: Arc::new(Mutex::new(map)),
                    fields,
                })
            }
            other => Err(StoreError::construction(format!(
                "state factory must return an object, got {}",
                value_type_name(&other)
            ))),
        }
    }

    /// Field names recorded at creation.
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub(crate) fn fields(&self) -> Arc<[String]> {
        self.fields.clone()
    }

    /// Whether `name` is one of the tracked fields.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    /// Whether two handles refer to the same cell.
    pub fn same_cell(&self, other: &StateCell) -> bool {
        Arc::ptr_eq(&self.doc, &other.doc)
    }

    #[inline]
    fn lock(&self) -> StoreResult<MutexGuard<'_, Map<String, Value>>> {
        self.doc.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Read the current value of a tracked field.
    pub fn read(&self, name: &str) -> StoreResult<Value> {
        if !self.has_field(name) {
            return Err(StoreError::unknown_member(name));
        }
        Ok(self.lock()?.get(name).cloned().unwrap_or(Value::Null))
    }

    /// Clone the current document.
    ///
    /// Reads through a poisoned lock, returning whatever a panicking
    /// mutation left behind.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.doc
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take one consistent copy of the document for a multi-field read.
    pub(crate) fn pin(&self) -> StoreResult<Arc<Map<String, Value>>> {
        Ok(Arc::new(self.lock()?.clone()))
    }

    /// Run `f` with exclusive write access to the document.
    ///
    /// The lock is held for the duration of `f`; `f` must not reach back
    /// into this cell.
    pub fn with_draft<R>(&self, f: impl FnOnce(&mut StateDraft<'_>) -> R) -> StoreResult<R> {
        let mut guard = self.lock()?;
        let mut draft = StateDraft {
            doc: &mut *guard,
            fields: &self.fields,
        };
        Ok(f(&mut draft))
    }

    /// Overwrite a single tracked field in place.
    pub fn assign(&self, name: &str, value: Value) -> StoreResult<()> {
        if !self.has_field(name) {
            return Err(StoreError::unknown_field(name));
        }
        self.lock()?.insert(name.to_string(), value);
        Ok(())
    }
}

impl std::fmt::Debug for StateCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCell")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Writable handle over the state document, handed to mutations.
///
/// Reads and writes are limited to the fields recorded at construction.
pub struct StateDraft<'a> {
    doc: &'a mut Map<String, Value>,
    fields: &'a [String],
}

impl<'a> StateDraft<'a> {
    fn check(&self, name: &str) -> StoreResult<()> {
        if self.fields.iter().any(|f| f == name) {
            Ok(())
        } else {
            Err(StoreError::unknown_field(name))
        }
    }

    /// Raw value of a field.
    pub fn get(&self, name: &str) -> StoreResult<&Value> {
        self.check(name)?;
        Ok(self.doc.get(name).unwrap_or(&NULL))
    }

    /// Typed value of a field.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> StoreResult<T> {
        Ok(T::deserialize(self.get(name)?)?)
    }

    /// Replace a field.
    pub fn set(&mut self, name: &str, value: impl Serialize) -> StoreResult<()> {
        self.check(name)?;
        let value = serde_json::to_value(value)?;
        self.doc.insert(name.to_string(), value);
        Ok(())
    }

    /// Read, transform and write back a field.
    pub fn update<T, F>(&mut self, name: &str, f: F) -> StoreResult<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(T) -> T,
    {
        let current = self.get_as::<T>(name)?;
        self.set(name, f(current))
    }

    /// Field names of the document.
    pub fn field_names(&self) -> &[String] {
        self.fields
    }
}
