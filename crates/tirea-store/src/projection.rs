//! Read-only projections over live backing objects.
//!
//! A projection holds a handle to its backing object plus a fixed list of
//! names it forwards. It never copies data: every read goes to the backing
//! object at call time. Projections have no setters; [`ReadOnlyProjection::assign`]
//! always fails with [`StoreError::ImmutableWrite`].
//!
//! Views handed to a getter are pinned to one copy of the document taken
//! when the outermost getter starts, so a getter reading several fields (or
//! other getters) never sees a commit land halfway through.

use crate::accessor::AccessorInner;
use crate::{MemberKind, StateCell, StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};

/// Object a projection forwards to.
pub trait Backing {
    /// What the projected names are on the accessor.
    const KIND: MemberKind;
}

/// Backing object whose names can be read as values.
pub trait FieldSource: Backing {
    /// Read the current value of `name`.
    fn read_field(&self, name: &str) -> StoreResult<Value>;
}

/// State behind a [`StateView`].
#[derive(Clone)]
pub enum StateSource {
    /// Every read locks the cell and sees the latest value.
    Live(StateCell),
    /// Reads come from one copy taken for a getter evaluation.
    Pinned(Arc<Map<String, Value>>),
}

impl From<StateCell> for StateSource {
    fn from(cell: StateCell) -> Self {
        StateSource::Live(cell)
    }
}

impl Backing for StateSource {
    const KIND: MemberKind = MemberKind::State;
}

impl FieldSource for StateSource {
    fn read_field(&self, name: &str) -> StoreResult<Value> {
        match self {
            StateSource::Live(cell) => cell.read(name),
            StateSource::Pinned(doc) => Ok(doc.get(name).cloned().unwrap_or(Value::Null)),
        }
    }
}

/// Getter side of an accessor, seen from inside a view.
#[derive(Clone)]
pub struct FacadeGetters {
    inner: Weak<AccessorInner>,
    pinned: Option<Arc<Map<String, Value>>>,
}

impl FacadeGetters {
    pub(crate) fn new(inner: Weak<AccessorInner>) -> Self {
        Self {
            inner,
            pinned: None,
        }
    }
}

impl Backing for FacadeGetters {
    const KIND: MemberKind = MemberKind::Getter;
}

impl FieldSource for FacadeGetters {
    fn read_field(&self, name: &str) -> StoreResult<Value> {
        let inner = self
            .inner
            .upgrade()
            .ok_or_else(|| StoreError::detached(name))?;
        inner.evaluate_getter(name, self.pinned.clone())
    }
}

/// Mutation side of an accessor, seen from inside a view.
#[derive(Clone)]
pub struct FacadeMutations(pub(crate) Weak<AccessorInner>);

impl Backing for FacadeMutations {
    const KIND: MemberKind = MemberKind::Mutation;
}

/// Sealed, get-only view over a backing object.
#[derive(Clone)]
pub struct ReadOnlyProjection<B> {
    backing: B,
    names: Arc<[String]>,
}

/// Read-only view of the state fields.
pub type StateView = ReadOnlyProjection<StateSource>;

/// Live read-only view of the getters, recomputed on each read.
pub type GetterView = ReadOnlyProjection<FacadeGetters>;

/// Call-only view of the mutations.
pub type MutationView = ReadOnlyProjection<FacadeMutations>;

impl<B: Backing> ReadOnlyProjection<B> {
    pub(crate) fn new(backing: B, names: Arc<[String]>) -> Self {
        Self { backing, names }
    }

    /// Names exposed by this view.
    pub fn field_names(&self) -> &[String] {
        &self.names
    }

    /// Whether this view exposes `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    fn ensure(&self, name: &str) -> StoreResult<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(StoreError::unknown_member(name))
        }
    }

    /// Attempt to write through the view. Always fails.
    pub fn assign(&self, name: &str, _value: impl Serialize) -> StoreResult<()> {
        self.ensure(name)?;
        let kind = B::KIND;
        tracing::warn!(member = %name, kind = %kind, "rejected write through read-only view");
        Err(StoreError::immutable_write(name, kind))
    }
}

impl<B: FieldSource> ReadOnlyProjection<B> {
    /// Current value of `name`.
    pub fn get(&self, name: &str) -> StoreResult<Value> {
        self.ensure(name)?;
        self.backing.read_field(name)
    }

    /// Current value of `name`, decoded.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> StoreResult<T> {
        Ok(serde_json::from_value(self.get(name)?)?)
    }
}

impl StateView {
    /// Same names, reading from `doc` instead of the live cell.
    pub(crate) fn pinned(&self, doc: Arc<Map<String, Value>>) -> Self {
        Self::new(StateSource::Pinned(doc), self.names.clone())
    }
}

impl GetterView {
    /// Same names, evaluating nested getters against `doc`.
    pub(crate) fn pinned(&self, doc: Arc<Map<String, Value>>) -> Self {
        let backing = FacadeGetters {
            inner: self.backing.inner.clone(),
            pinned: Some(doc),
        };
        Self::new(backing, self.names.clone())
    }
}

impl MutationView {
    /// Invoke a mutation through the accessor's call wrapper.
    pub fn commit<P: Serialize>(&self, name: &str, payload: P) -> StoreResult<()> {
        self.ensure(name)?;
        let inner = self
            .backing
            .0
            .upgrade()
            .ok_or_else(|| StoreError::detached(name))?;
        let payload = serde_json::to_value(payload)?;
        inner.commit_value(name, payload)
    }
}

impl<B> std::fmt::Debug for ReadOnlyProjection<B>
where
    B: Backing,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOnlyProjection")
            .field("kind", &B::KIND)
            .field("names", &self.names)
            .finish()
    }
}

/// Restricted store handed to actions.
///
/// Actions read state and getters and commit mutations through it, but
/// cannot write state directly.
#[derive(Clone, Debug)]
pub struct ActionStore {
    /// Read-only state fields.
    pub state: StateView,
    /// Read-only getters.
    pub getters: GetterView,
    /// Callable mutations.
    pub mutations: MutationView,
}
