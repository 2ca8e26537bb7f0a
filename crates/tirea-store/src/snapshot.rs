//! Whole-state export and import.

use crate::error::value_type_name;
use crate::{Accessor, StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Immutable point-in-time copy of an accessor's state.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    doc: Map<String, Value>,
}

impl Snapshot {
    /// Value of a field at the time of the dump.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.doc.get(name)
    }

    /// Value of a field, decoded.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> StoreResult<T> {
        let value = self
            .doc
            .get(name)
            .ok_or_else(|| StoreError::unknown_member(name))?;
        Ok(T::deserialize(value)?)
    }

    /// Field names in the snapshot.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.doc.keys().map(String::as_str)
    }

    /// Borrow the snapshot as an object map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.doc
    }

    /// Convert into a plain JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.doc)
    }

    /// Decode the whole snapshot into a typed model.
    pub fn to_model<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(T::deserialize(Value::Object(self.doc.clone()))?)
    }
}

impl PartialEq<Value> for Snapshot {
    fn eq(&self, other: &Value) -> bool {
        other.as_object() == Some(&self.doc)
    }
}

/// Copy out the current state.
pub fn dump(accessor: &Accessor) -> Snapshot {
    let doc = accessor.cell().snapshot();
    tracing::trace!(store = %accessor.label(), fields = doc.len(), "state dumped");
    Snapshot { doc }
}

/// Overwrite tracked fields from `state`.
///
/// Only fields recorded at construction are written. Fields missing from
/// `state` keep their current value, extra fields are ignored. The state
/// cell itself is reused, so existing views keep observing it.
///
/// Fields are assigned one at a time; an error partway leaves earlier
/// fields updated.
pub fn load(accessor: &Accessor, state: impl Serialize) -> StoreResult<()> {
    let state = match serde_json::to_value(state)? {
        Value::Object(map) => map,
        other => {
            return Err(StoreError::InvalidSnapshot {
                found: value_type_name(&other),
            })
        }
    };

    let cell = accessor.cell();
    let mut applied = 0usize;
    for name in cell.field_names() {
        if let Some(value) = state.get(name) {
            cell.assign(name, value.clone())?;
            applied += 1;
        }
    }

    tracing::debug!(
        store = %accessor.label(),
        applied,
        ignored = state.len() - applied,
        "state loaded"
    );
    Ok(())
}
