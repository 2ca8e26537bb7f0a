//! Integration tests for accessor construction, read/write partitioning and
//! snapshot round trips.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tirea_store::{
    action_tree, dump, getter_tree, load, mutation_tree, Accessor, ActionTree, GetterTree,
    MemberKind, MutationTree, StoreError,
};

// ============================================================================
// Fixtures
// ============================================================================

fn counter_state() -> serde_json::Value {
    json!({"value": 0})
}

fn counter() -> Accessor {
    let mutations = mutation_tree(
        &counter_state,
        MutationTree::new()
            .mutation("increase", |state, _: ()| {
                state.update::<i64, _>("value", |v| v + 1)
            })
            .mutation("addUp", |state, delta: i64| {
                state.update::<i64, _>("value", |v| v + delta)
            }),
    );

    let getters = getter_tree(
        &counter_state,
        GetterTree::new().getter("double", |state, _| Ok(state.get_as::<i64>("value")? * 2)),
    );

    let actions = action_tree(
        &counter_state,
        &getters,
        &mutations,
        ActionTree::new()
            .action("rock", |store, _: ()| {
                // change value through mutations, then read the latest values
                store.mutations.commit("increase", ())?;
                let value = store.state.get_as::<i64>("value")?;
                let double = store.getters.get_as::<i64>("double")?;
                Ok(json!({"value": value, "double": double}))
            })
            .action("rockPayload", |store, delta: i64| {
                store.mutations.commit("addUp", delta)
            }),
    );

    Accessor::builder(counter_state)
        .name("counter")
        .mutations(mutations)
        .getters(getters)
        .actions(actions)
        .build()
        .unwrap()
}

// ============================================================================
// End-to-end scenario
// ============================================================================

#[test]
fn test_counter_scenario() {
    let accessor = counter();

    assert_eq!(accessor.get_as::<i64>("value").unwrap(), 0);
    assert_eq!(accessor.get_as::<i64>("double").unwrap(), 0);

    accessor.commit("increase", ()).unwrap();
    assert_eq!(accessor.get_as::<i64>("value").unwrap(), 1);
    assert_eq!(accessor.get_as::<i64>("double").unwrap(), 2);

    accessor.commit("addUp", 5).unwrap();
    assert_eq!(accessor.get_as::<i64>("value").unwrap(), 6);
    assert_eq!(accessor.get_as::<i64>("double").unwrap(), 12);

    // Not allowed to modify state directly
    let err = accessor.assign("value", 7).unwrap_err();
    assert!(err.is_immutable_write());
    assert_eq!(accessor.get_as::<i64>("value").unwrap(), 6);

    assert_eq!(dump(&accessor), json!({"value": 6}));

    load(&accessor, json!({"value": 2})).unwrap();
    assert_eq!(accessor.get_as::<i64>("value").unwrap(), 2);
    assert_eq!(accessor.get_as::<i64>("double").unwrap(), 4);
}

#[test]
fn test_actions_commit_through_store() {
    let accessor = counter();

    accessor.dispatch("rockPayload", 3).unwrap();
    assert_eq!(accessor.get_as::<i64>("value").unwrap(), 3);

    let seen = accessor.dispatch("rock", ()).unwrap();
    assert_eq!(seen, json!({"value": 4, "double": 8}));
    assert_eq!(dump(&accessor), json!({"value": 4}));
}

#[test]
fn test_accessor_exposes_exactly_declared_names() {
    let accessor = counter();
    let names: Vec<&str> = accessor.member_names().collect();
    assert_eq!(names, vec!["addUp", "double", "increase", "rock", "rockPayload", "value"]);
    assert_eq!(accessor.field_names(), &["value".to_string()]);
}

#[test]
fn test_getter_writes_rejected() {
    let accessor = counter();
    let err = accessor.assign("double", 100).unwrap_err();
    assert!(matches!(
        err,
        StoreError::ImmutableWrite { kind: MemberKind::Getter, .. }
    ));
    assert_eq!(accessor.get_as::<i64>("double").unwrap(), 0);

    assert!(matches!(
        accessor.assign("increase", 1),
        Err(StoreError::ImmutableWrite { kind: MemberKind::Mutation, .. })
    ));
    assert!(matches!(
        accessor.assign("nothing", 1),
        Err(StoreError::UnknownMember { .. })
    ));
}

// ============================================================================
// Restricted action store
// ============================================================================

#[test]
fn test_action_cannot_write_state_or_replace_members() {
    let accessor = Accessor::builder(|| json!({"value": 1}))
        .mutations(MutationTree::new().mutation("noop", |_, _: ()| Ok(())))
        .getters(GetterTree::new().getter("same", |state, _| state.get("value")))
        .actions(ActionTree::new().action("sneaky", |store, _: ()| {
            let state = store.state.assign("value", 99).unwrap_err();
            let getter = store.getters.assign("same", 99).unwrap_err();
            let mutation = store.mutations.assign("noop", 99).unwrap_err();
            Ok(vec![
                state.is_immutable_write(),
                getter.is_immutable_write(),
                mutation.is_immutable_write(),
            ])
        }))
        .build()
        .unwrap();

    let rejected: Vec<bool> = accessor.dispatch_as("sneaky", ()).unwrap();
    assert_eq!(rejected, vec![true, true, true]);
    assert_eq!(accessor.get_as::<i64>("value").unwrap(), 1);
}

#[test]
fn test_action_views_are_sealed() {
    let accessor = Accessor::builder(|| json!({"value": 1}))
        .getters(GetterTree::new().getter("same", |state, _| state.get("value")))
        .actions(ActionTree::new().action("inspect", |store, _: ()| {
            let unknown_getter = store.getters.get("value").is_err();
            let unknown_mutation = store.mutations.commit("inspect", ()).is_err();
            Ok((unknown_getter, unknown_mutation))
        }))
        .build()
        .unwrap();

    let (unknown_getter, unknown_mutation): (bool, bool) =
        accessor.dispatch_as("inspect", ()).unwrap();
    assert!(unknown_getter);
    assert!(unknown_mutation);
}

#[test]
fn test_action_error_propagates() {
    let accessor = Accessor::builder(|| json!({"value": 1}))
        .actions(ActionTree::new().action("fail", |store, _: ()| {
            store.mutations.commit("missing", ())
        }))
        .build()
        .unwrap();

    assert!(matches!(
        accessor.dispatch("fail", ()),
        Err(StoreError::UnknownMember { name }) if name == "missing"
    ));
}

// ============================================================================
// Getter freshness
// ============================================================================

#[test]
fn test_getters_recompute_on_every_read() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let accessor = Accessor::builder(|| json!({"items": [1, 2]}))
        .mutations(MutationTree::new().mutation("push", |state, item: i64| {
            state.update::<Vec<i64>, _>("items", |mut items| {
                items.push(item);
                items
            })
        }))
        .getters(GetterTree::new().getter("count", move |state, _| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(state.get_as::<Vec<i64>>("items")?.len())
        }))
        .build()
        .unwrap();

    assert_eq!(accessor.get_as::<usize>("count").unwrap(), 2);
    assert_eq!(accessor.get_as::<usize>("count").unwrap(), 2);
    accessor.commit("push", 3).unwrap();
    assert_eq!(accessor.get_as::<usize>("count").unwrap(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_getters_read_other_getters() {
    let accessor = Accessor::builder(|| json!({"value": 3}))
        .mutations(MutationTree::new().mutation("set", |state, v: i64| state.set("value", v)))
        .getters(
            GetterTree::new()
                .getter("double", |state, _| Ok(state.get_as::<i64>("value")? * 2))
                .getter("quadruple", |_, getters| {
                    Ok(getters.get_as::<i64>("double")? * 2)
                }),
        )
        .build()
        .unwrap();

    assert_eq!(accessor.get_as::<i64>("quadruple").unwrap(), 12);
    accessor.commit("set", 5).unwrap();
    assert_eq!(accessor.get_as::<i64>("quadruple").unwrap(), 20);
}

// ============================================================================
// Construction
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Todo {
    items: Vec<String>,
    done: usize,
}

#[test]
fn test_typed_state_factory() {
    let accessor = Accessor::builder(|| Todo {
        items: vec![],
        done: 0,
    })
    .mutations(MutationTree::new().mutation("add", |state, item: String| {
        state.update::<Vec<String>, _>("items", |mut items| {
            items.push(item);
            items
        })
    }))
    .build()
    .unwrap();

    accessor.commit("add", "write tests").unwrap();
    let todo: Todo = dump(&accessor).to_model().unwrap();
    assert_eq!(todo.items, vec!["write tests".to_string()]);
    assert_eq!(todo.done, 0);
}

#[test]
fn test_non_object_state_is_construction_error() {
    let err = Accessor::builder(|| 42).build().unwrap_err();
    assert!(matches!(err, StoreError::Construction { .. }));
}

#[test]
fn test_overlapping_names_rejected() {
    let err = Accessor::builder(|| json!({"value": 0}))
        .mutations(MutationTree::new().mutation("bump", |_, _: ()| Ok(())))
        .actions(ActionTree::new().action("bump", |_, _: ()| Ok(())))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("both mutation and action"));
}

#[test]
fn test_mutation_cannot_add_fields() {
    let accessor = Accessor::builder(|| json!({"value": 0}))
        .mutations(MutationTree::new().mutation("grow", |state, _: ()| state.set("extra", 1)))
        .build()
        .unwrap();

    assert!(matches!(
        accessor.commit("grow", ()),
        Err(StoreError::UnknownField { .. })
    ));
    assert_eq!(dump(&accessor), json!({"value": 0}));
}

#[test]
fn test_bad_payload_reported() {
    let accessor = counter();
    assert!(matches!(
        accessor.commit("addUp", "five"),
        Err(StoreError::Payload { .. })
    ));
    assert_eq!(accessor.get_as::<i64>("value").unwrap(), 0);
}

// ============================================================================
// Snapshot
// ============================================================================

#[test]
fn test_load_preserves_identity_and_usability() {
    let accessor = counter();
    let handle = accessor.clone();

    load(&accessor, json!({"value": 10, "unrelated": "x"})).unwrap();
    assert_eq!(handle.get_as::<i64>("value").unwrap(), 10);

    handle.dispatch("rockPayload", 1).unwrap();
    assert_eq!(accessor.get_as::<i64>("double").unwrap(), 22);

    load(&accessor, json!({})).unwrap();
    assert_eq!(accessor.get_as::<i64>("value").unwrap(), 11);
}

#[test]
fn test_dump_round_trips_through_load() {
    let source = counter();
    source.commit("addUp", 41).unwrap();

    let target = counter();
    load(&target, dump(&source)).unwrap();
    assert_eq!(target.get_as::<i64>("value").unwrap(), 41);
}
