//! Accessor construction.
//!
//! [`AccessorBuilder`] merges a state factory with getter, mutation and
//! action trees into one [`Accessor`]. Every name lives in exactly one group:
//!
//! - state fields and getters are read with [`Accessor::get`]
//! - mutations are invoked with [`Accessor::commit`]
//! - actions are invoked with [`Accessor::dispatch`]
//!
//! Nothing on the accessor writes state directly. [`Accessor::assign`]
//! exists only to reject such writes with [`StoreError::ImmutableWrite`].

use crate::projection::{ActionStore, FacadeGetters, FacadeMutations};
use crate::tree::{ActionFn, GetterFn, MutationFn};
use crate::{
    ActionTree, GetterTree, GetterView, MemberKind, MutationTree, MutationView, StateCell,
    StateView, StoreError, StoreResult,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

type StateFactory = Box<dyn FnOnce() -> StoreResult<Value>>;

/// Builder for an [`Accessor`].
///
/// # Example
///
/// ```
/// use tirea_store::{Accessor, GetterTree, MutationTree};
/// use serde_json::json;
///
/// let counter = Accessor::builder(|| json!({"value": 0}))
///     .mutations(MutationTree::new().mutation("increase", |state, _: ()| {
///         state.update::<i64, _>("value", |v| v + 1)
///     }))
///     .getters(GetterTree::new().getter("double", |state, _| {
///         Ok(state.get_as::<i64>("value")? * 2)
///     }))
///     .build()
///     .unwrap();
///
/// counter.commit("increase", ()).unwrap();
/// assert_eq!(counter.get_as::<i64>("value").unwrap(), 1);
/// assert_eq!(counter.get_as::<i64>("double").unwrap(), 2);
/// ```
pub struct AccessorBuilder {
    label: String,
    state: StateFactory,
    getters: GetterTree,
    mutations: MutationTree,
    actions: ActionTree,
}

impl AccessorBuilder {
    fn new<S, F>(state: F) -> Self
    where
        S: Serialize,
        F: FnOnce() -> S + 'static,
    {
        Self {
            label: "store".to_string(),
            state: Box::new(move || -> StoreResult<Value> {
                Ok(serde_json::to_value(state())?)
            }),
            getters: GetterTree::new(),
            mutations: MutationTree::new(),
            actions: ActionTree::new(),
        }
    }

    /// Label used in log fields and `Debug` output.
    pub fn name(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the getter tree.
    pub fn getters(mut self, getters: GetterTree) -> Self {
        self.getters = getters;
        self
    }

    /// Set the mutation tree.
    pub fn mutations(mut self, mutations: MutationTree) -> Self {
        self.mutations = mutations;
        self
    }

    /// Set the action tree.
    pub fn actions(mut self, actions: ActionTree) -> Self {
        self.actions = actions;
        self
    }

    /// Create the state cell and assemble the accessor.
    ///
    /// Fails with [`StoreError::Construction`] when the factory does not
    /// produce an object, or when a name is declared in more than one group.
    pub fn build(self) -> StoreResult<Accessor> {
        let cell = StateCell::from_value((self.state)()?)?;

        let mutations: Vec<(String, MutationFn)> = self.mutations.into_entries();
        let actions: Vec<(String, ActionFn)> = self.actions.into_entries();
        let getters: Vec<(String, GetterFn)> = self.getters.into_entries();

        let mut members = BTreeMap::new();
        let declared = mutations
            .iter()
            .map(|(n, _)| (n.as_str(), MemberKind::Mutation))
            .chain(actions.iter().map(|(n, _)| (n.as_str(), MemberKind::Action)))
            .chain(cell.field_names().iter().map(|n| (n.as_str(), MemberKind::State)))
            .chain(getters.iter().map(|(n, _)| (n.as_str(), MemberKind::Getter)));
        for (name, kind) in declared {
            if let Some(previous) = members.insert(name.to_string(), kind) {
                return Err(StoreError::construction(format!(
                    "`{name}` is declared as both {previous} and {kind}"
                )));
            }
        }

        let getter_names: Arc<[String]> = getters.iter().map(|(n, _)| n.clone()).collect();
        let mutation_names: Arc<[String]> = mutations.iter().map(|(n, _)| n.clone()).collect();
        let state_names = cell.fields();

        let inner = Arc::new_cyclic(|weak: &Weak<AccessorInner>| AccessorInner {
            store: ActionStore {
                state: StateView::new(cell.clone().into(), state_names),
                getters: GetterView::new(FacadeGetters::new(weak.clone()), getter_names),
                mutations: MutationView::new(FacadeMutations(weak.clone()), mutation_names),
            },
            label: self.label,
            cell,
            members,
            getters: getters.into_iter().collect(),
            mutations: mutations.into_iter().collect(),
            actions: actions.into_iter().collect(),
        });

        tracing::debug!(
            store = %inner.label,
            fields = inner.cell.field_names().len(),
            getters = inner.getters.len(),
            mutations = inner.mutations.len(),
            actions = inner.actions.len(),
            "accessor built"
        );

        Ok(Accessor { inner })
    }
}

pub(crate) struct AccessorInner {
    label: String,
    cell: StateCell,
    members: BTreeMap<String, MemberKind>,
    getters: HashMap<String, GetterFn>,
    mutations: HashMap<String, MutationFn>,
    actions: HashMap<String, ActionFn>,
    store: ActionStore,
}

impl AccessorInner {
    fn misuse(&self, name: &str, usage: &'static str) -> StoreError {
        match self.members.get(name) {
            Some(kind) => StoreError::wrong_kind(name, *kind, usage),
            None => StoreError::unknown_member(name),
        }
    }

    /// Evaluate a getter. The outermost evaluation pins one copy of the
    /// state; nested getter reads reuse it.
    pub(crate) fn evaluate_getter(
        &self,
        name: &str,
        pinned: Option<Arc<Map<String, Value>>>,
    ) -> StoreResult<Value> {
        let getter = self
            .getters
            .get(name)
            .ok_or_else(|| StoreError::unknown_member(name))?;
        let doc = match pinned {
            Some(doc) => doc,
            None => self.cell.pin()?,
        };
        tracing::trace!(store = %self.label, member = %name, "evaluating getter");
        let state = self.store.state.pinned(doc.clone());
        let getters = self.store.getters.pinned(doc);
        getter(&state, &getters)
    }

    pub(crate) fn commit_value(&self, name: &str, payload: Value) -> StoreResult<()> {
        let mutation = self
            .mutations
            .get(name)
            .ok_or_else(|| self.misuse(name, "committed"))?;
        tracing::debug!(store = %self.label, member = %name, "commit");
        self.cell.with_draft(|draft| mutation(draft, payload))?
    }

    fn dispatch_value(&self, name: &str, payload: Value) -> StoreResult<Value> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| self.misuse(name, "dispatched"))?;
        tracing::debug!(store = %self.label, member = %name, "dispatch");
        action(&self.store, payload)
    }
}

/// Unified façade over state, getters, mutations and actions.
///
/// Cloning an accessor yields another handle to the same store.
#[derive(Clone)]
pub struct Accessor {
    inner: Arc<AccessorInner>,
}

impl Accessor {
    /// Start building an accessor from a state factory.
    pub fn builder<S, F>(state: F) -> AccessorBuilder
    where
        S: Serialize,
        F: FnOnce() -> S + 'static,
    {
        AccessorBuilder::new(state)
    }

    /// Label given at construction.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Read a state field or evaluate a getter.
    ///
    /// Getters are recomputed on every call.
    pub fn get(&self, name: &str) -> StoreResult<Value> {
        match self.inner.members.get(name) {
            Some(MemberKind::State) => self.inner.cell.read(name),
            Some(MemberKind::Getter) => self.inner.evaluate_getter(name, None),
            Some(kind) => Err(StoreError::wrong_kind(name, *kind, "read")),
            None => Err(StoreError::unknown_member(name)),
        }
    }

    /// Read a state field or evaluate a getter, decoded as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> StoreResult<T> {
        Ok(serde_json::from_value(self.get(name)?)?)
    }

    /// Invoke a mutation against the live state.
    pub fn commit<P: Serialize>(&self, name: &str, payload: P) -> StoreResult<()> {
        let payload = serde_json::to_value(payload)?;
        self.inner.commit_value(name, payload)
    }

    /// Invoke an action with the restricted store.
    pub fn dispatch<P: Serialize>(&self, name: &str, payload: P) -> StoreResult<Value> {
        let payload = serde_json::to_value(payload)?;
        self.inner.dispatch_value(name, payload)
    }

    /// Invoke an action and decode its result as `R`.
    pub fn dispatch_as<P: Serialize, R: DeserializeOwned>(
        &self,
        name: &str,
        payload: P,
    ) -> StoreResult<R> {
        Ok(serde_json::from_value(self.dispatch(name, payload)?)?)
    }

    /// Attempt a direct write. Always fails: state changes only through
    /// mutations.
    pub fn assign(&self, name: &str, _value: impl Serialize) -> StoreResult<()> {
        match self.inner.members.get(name) {
            Some(kind) => {
                tracing::warn!(
                    store = %self.inner.label,
                    member = %name,
                    kind = %kind,
                    "rejected direct write"
                );
                Err(StoreError::immutable_write(name, *kind))
            }
            None => Err(StoreError::unknown_member(name)),
        }
    }

    /// Every exposed name, sorted.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.inner.members.keys().map(String::as_str)
    }

    /// What `name` is, if it exists.
    pub fn member_kind(&self, name: &str) -> Option<MemberKind> {
        self.inner.members.get(name).copied()
    }

    /// Whether `name` is exposed.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.members.contains_key(name)
    }

    /// State field names, fixed at construction.
    pub fn field_names(&self) -> &[String] {
        self.inner.cell.field_names()
    }

    pub(crate) fn cell(&self) -> &StateCell {
        &self.inner.cell
    }
}

impl std::fmt::Debug for Accessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("label", &self.inner.label)
            .field("members", &self.inner.members)
            .finish()
    }
}
