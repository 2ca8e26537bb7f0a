//! Typed state accessor over a live JSON state cell.
//!
//! `tirea-store` merges a piece of state, a set of derived getters, a set of
//! mutations and a set of actions into one [`Accessor`]. State can only be
//! changed by mutations; everything else sees it read-only.
//!
//! # Core Concepts
//!
//! - **StateCell**: live, mutable holder of the state object; its field set
//!   is fixed at construction
//! - **Getter**: pure, uncached value computed from state on every read
//! - **Mutation**: the only sanctioned way to change state
//! - **Action**: orchestration run against an [`ActionStore`] of read-only
//!   projections; it may commit mutations but cannot write state
//! - **Snapshot**: [`dump`] and [`load`] for whole-state save and restore
//!
//! # Quick Start
//!
//! ```
//! use tirea_store::{dump, load, Accessor, ActionTree, GetterTree, MutationTree};
//! use serde_json::json;
//!
//! let accessor = Accessor::builder(|| json!({"value": 0}))
//!     .mutations(
//!         MutationTree::new()
//!             .mutation("increase", |state, _: ()| {
//!                 state.update::<i64, _>("value", |v| v + 1)
//!             })
//!             .mutation("add_up", |state, delta: i64| {
//!                 state.update::<i64, _>("value", |v| v + delta)
//!             }),
//!     )
//!     .getters(GetterTree::new().getter("double", |state, _| {
//!         Ok(state.get_as::<i64>("value")? * 2)
//!     }))
//!     .actions(ActionTree::new().action("rock_payload", |store, delta: i64| {
//!         store.mutations.commit("add_up", delta)
//!     }))
//!     .build()
//!     .unwrap();
//!
//! accessor.commit("increase", ()).unwrap();
//! accessor.dispatch("rock_payload", 5).unwrap();
//! assert_eq!(accessor.get_as::<i64>("double").unwrap(), 12);
//!
//! // Direct writes are rejected.
//! assert!(accessor.assign("value", 1).is_err());
//!
//! assert_eq!(dump(&accessor), json!({"value": 6}));
//! load(&accessor, json!({"value": 2})).unwrap();
//! assert_eq!(accessor.get_as::<i64>("double").unwrap(), 4);
//! ```

mod accessor;
mod cell;
mod error;
mod projection;
mod snapshot;
mod tree;

pub use accessor::{Accessor, AccessorBuilder};
pub use cell::{StateCell, StateDraft};
pub use error::{value_type_name, MemberKind, StoreError, StoreResult};
pub use projection::{
    ActionStore, Backing, FacadeGetters, FacadeMutations, FieldSource, GetterView,
    MutationView, ReadOnlyProjection, StateSource, StateView,
};
pub use snapshot::{dump, load, Snapshot};
pub use tree::{action_tree, getter_tree, mutation_tree, ActionTree, GetterTree, MutationTree};

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
