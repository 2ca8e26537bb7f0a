//! Named handler registries for getters, mutations and actions.
//!
//! Each tree erases typed closures into `Value`-based handlers. Payloads are
//! decoded into the handler's parameter type on every call; results are
//! encoded back to `Value`.

use crate::cell::StateDraft;
use crate::projection::{ActionStore, GetterView, StateView};
use crate::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub(crate) type GetterFn =
    Arc<dyn Fn(&StateView, &GetterView) -> StoreResult<Value> + Send + Sync>;
pub(crate) type MutationFn =
    Arc<dyn Fn(&mut StateDraft<'_>, Value) -> StoreResult<()> + Send + Sync>;
pub(crate) type ActionFn = Arc<dyn Fn(&ActionStore, Value) -> StoreResult<Value> + Send + Sync>;

/// Ordered name → handler list. Re-registering a name replaces the handler
/// in place.
struct Entries<H> {
    items: Vec<(String, H)>,
}

impl<H> Default for Entries<H> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<H> Entries<H> {
    fn insert(&mut self, name: String, handler: H) {
        match self.items.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = handler,
            None => self.items.push((name, handler)),
        }
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|(n, _)| n.as_str())
    }
}

fn decode_payload<P: DeserializeOwned>(member: &str, payload: Value) -> StoreResult<P> {
    serde_json::from_value(payload).map_err(|e| StoreError::payload(member, e))
}

/// Computed, read-only values derived from state.
///
/// ```
/// use tirea_store::GetterTree;
///
/// let getters = GetterTree::new().getter("double", |state, _| {
///     Ok(state.get_as::<i64>("value")? * 2)
/// });
/// assert_eq!(getters.names().collect::<Vec<_>>(), vec!["double"]);
/// ```
#[derive(Default)]
pub struct GetterTree {
    entries: Entries<GetterFn>,
}

impl GetterTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a getter.
    pub fn getter<T, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        T: Serialize,
        F: Fn(&StateView, &GetterView) -> StoreResult<T> + Send + Sync + 'static,
    {
        let handler: GetterFn = Arc::new(
            move |state: &StateView, getters: &GetterView| -> StoreResult<Value> {
                Ok(serde_json::to_value(f(state, getters)?)?)
            },
        );
        self.entries.insert(name.into(), handler);
        self
    }

    /// Registered names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.names()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, GetterFn)> {
        self.entries.items
    }
}

/// State-transition functions; the only way state changes.
#[derive(Default)]
pub struct MutationTree {
    entries: Entries<MutationFn>,
}

impl MutationTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mutation taking a payload of type `P`.
    ///
    /// Use `()` for mutations without a payload.
    pub fn mutation<P, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        P: DeserializeOwned,
        F: Fn(&mut StateDraft<'_>, P) -> StoreResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let member = name.clone();
        let handler: MutationFn = Arc::new(
            move |draft: &mut StateDraft<'_>, payload: Value| -> StoreResult<()> {
                let payload = decode_payload(&member, payload)?;
                f(draft, payload)
            },
        );
        self.entries.insert(name, handler);
        self
    }

    /// Registered names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.names()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, MutationFn)> {
        self.entries.items
    }
}

/// Orchestration functions run against a restricted [`ActionStore`].
#[derive(Default)]
pub struct ActionTree {
    entries: Entries<ActionFn>,
}

impl ActionTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action taking a payload of type `P` and returning `R`.
    pub fn action<P, R, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        P: DeserializeOwned,
        R: Serialize,
        F: Fn(&ActionStore, P) -> StoreResult<R> + Send + Sync + 'static,
    {
        let name = name.into();
        let member = name.clone();
        let handler: ActionFn = Arc::new(
            move |store: &ActionStore, payload: Value| -> StoreResult<Value> {
                let payload = decode_payload(&member, payload)?;
                Ok(serde_json::to_value(f(store, payload)?)?)
            },
        );
        self.entries.insert(name, handler);
        self
    }

    /// Registered names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.names()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, ActionFn)> {
        self.entries.items
    }
}

/// Group getters next to the state factory they read. Returns `tree` as is.
pub fn getter_tree<S, F>(_state: &F, tree: GetterTree) -> GetterTree
where
    F: Fn() -> S,
{
    tree
}

/// Group mutations next to the state factory they write. Returns `tree` as is.
pub fn mutation_tree<S, F>(_state: &F, tree: MutationTree) -> MutationTree
where
    F: Fn() -> S,
{
    tree
}

/// Group actions next to the state, getters and mutations they use.
/// Returns `tree` as is.
pub fn action_tree<S, F>(
    _state: &F,
    _getters: &GetterTree,
    _mutations: &MutationTree,
    tree: ActionTree,
) -> ActionTree
where
    F: Fn() -> S,
{
    tree
}
