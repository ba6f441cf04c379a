//! Tests for the transform and draft operation families.
//!
//! These tests verify that:
//! 1. `update` hands the callback the current value, or null when only the
//!    final link is absent, and is a no-op across broken intermediate links
//! 2. `mutate` drafts are shallow, `edit` drafts are deep, and both are
//!    no-ops on absent targets
//! 3. computed assignment and add/remove-by-value behave per their families

use graft::{
    add_in, delete_in, edit_in, fork, mutate_in, path, set_in, update_in, Value,
};
use serde_json::json;

// ============================================================================
// update: transform by value
// ============================================================================

#[test]
fn test_update_transforms_current_value() {
    let root = Value::from_json(json!({"user": {"name": "john"}}));
    let next = update_in(&root)
        .field("user")
        .field("name")
        .apply(|v| Value::from(v.as_str().unwrap_or("").to_uppercase()))
        .unwrap()
        .unwrap();
    assert_eq!(next.get_at(&path!("user", "name")), Some(&Value::from("JOHN")));
}

#[test]
fn test_update_missing_final_link_sees_null() {
    let root = Value::from_json(json!({"stats": {}}));
    let next = update_in(&root)
        .field("stats")
        .field("visits")
        .apply(|v| {
            assert!(v.is_null());
            Value::Int(1)
        })
        .unwrap()
        .unwrap();
    assert_eq!(next.get_at(&path!("stats", "visits")), Some(&Value::Int(1)));
}

#[test]
fn test_update_broken_intermediate_is_noop() {
    let root = Value::from_json(json!({"stats": {}}));
    let out = update_in(&root)
        .field("ghost")
        .field("visits")
        .apply(|_| Value::Int(1))
        .unwrap();
    assert!(out.is_none());
}

#[test]
fn test_update_counter_increment() {
    let root = Value::from_json(json!({"counter": {"n": 41}}));
    let next = update_in(&root)
        .field("counter")
        .field("n")
        .apply(|v| Value::Int(v.as_int().unwrap_or(0) + 1))
        .unwrap()
        .unwrap();
    assert_eq!(next.get_at(&path!("counter", "n")), Some(&Value::Int(42)));
}

// ============================================================================
// mutate / edit: transform by draft
// ============================================================================

#[test]
fn test_mutate_draft_edits_own_entries() {
    let root = Value::from_json(json!({"user": {"name": "a", "age": 1}}));
    let next = mutate_in(&root)
        .field("user")
        .mutate(|draft| {
            draft.set_field("name", "b").unwrap();
            draft.remove_field("age").unwrap();
        })
        .unwrap()
        .unwrap();
    assert_eq!(next.get_at(&path!("user", "name")), Some(&Value::from("b")));
    assert!(next.get_at(&path!("user", "age")).is_none());
}

#[test]
fn test_mutate_absent_target_is_noop() {
    let root = Value::from_json(json!({}));
    assert!(mutate_in(&root).field("ghost").mutate(|_| {}).unwrap().is_none());
    assert!(edit_in(&root).field("ghost").mutate(|_| {}).unwrap().is_none());
}

#[test]
fn test_mutate_scalar_draft() {
    let root = Value::from_json(json!({"n": 1}));
    let next = mutate_in(&root)
        .field("n")
        .mutate(|draft| *draft = Value::Int(2))
        .unwrap()
        .unwrap();
    assert_eq!(next.get_field("n"), Some(&Value::Int(2)));
}

#[test]
fn test_edit_draft_can_restructure_deeply() {
    let root = Value::from_json(json!({"doc": {"sections": [{"title": "a"}]}}));
    let next = edit_in(&root)
        .field("doc")
        .mutate(|draft| {
            draft
                .set_at(&path!("sections", 0, "title"), "b")
                .unwrap();
            draft.set_field("revision", 2).unwrap();
        })
        .unwrap()
        .unwrap();
    assert_eq!(
        next.get_at(&path!("doc", "sections", 0, "title")),
        Some(&Value::from("b"))
    );
    assert_eq!(
        root.get_at(&path!("doc", "sections", 0, "title")),
        Some(&Value::from("a"))
    );
}

// ============================================================================
// Computed assignment
// ============================================================================

#[test]
fn test_assign_with_computes_from_current() {
    let root = Value::from_json(json!({"greeting": "hello"}));
    let next = fork(&root)
        .field("greeting")
        .assign_with(|v| Value::from(format!("{}!", v.as_str().unwrap_or(""))))
        .unwrap();
    assert_eq!(next.get_field("greeting"), Some(&Value::from("hello!")));
}

#[test]
fn test_assign_with_absent_final_sees_null() {
    let root = Value::from_json(json!({}));
    let next = set_in(&root)
        .field("created")
        .assign_with(|v| Value::Bool(v.is_null()))
        .unwrap();
    assert_eq!(next.get_field("created"), Some(&Value::Bool(true)));
}

// ============================================================================
// add / remove-by-value
// ============================================================================

#[test]
fn test_add_all_to_list() {
    let root = Value::from_json(json!({"items": [1]}));
    let next = add_in(&root).field("items").add_all([2, 3]).unwrap();
    assert_eq!(next.get_field("items").unwrap().len(), Some(3));
}

#[test]
fn test_set_add_is_idempotent() {
    let root = Value::record([("tags", Value::set(["a"]))]);
    let next = add_in(&root).field("tags").add_all(["a", "b"]).unwrap();
    assert_eq!(next.get_field("tags").unwrap().len(), Some(2));
}

#[test]
fn test_remove_value_noop_when_absent() {
    let root = Value::from_json(json!({"items": [1, 2]}));
    let next = delete_in(&root).field("items").remove_value(9).unwrap();
    assert!(next.get_field("items").unwrap().ptr_eq(root.get_field("items").unwrap()));

    let same = delete_in(&root).field("ghost").remove_value(1).unwrap();
    assert!(same.ptr_eq(&root));
}

// ============================================================================
// Sequence edges
// ============================================================================

#[test]
fn test_index_equal_to_len_appends() {
    let root = Value::from_json(json!({"items": []}));
    let next = set_in(&root).field("items").index(0).assign("first").unwrap();
    assert_eq!(next.get_at(&path!("items", 0)), Some(&Value::from("first")));
}

#[test]
fn test_delete_list_element_shifts() {
    let root = Value::from_json(json!({"items": [1, 2, 3]}));
    let next = delete_in(&root).field("items").index(1).delete().unwrap();
    assert_eq!(next.get_field("items").unwrap().to_json(), json!([1, 3]));
}

#[test]
fn test_map_entry_created_on_set() {
    let root = Value::record([("scores", Value::map([("a", 1i64)]))]);
    let next = set_in(&root).field("scores").key("b").assign(2).unwrap();
    assert_eq!(
        next.get_field("scores").unwrap().get_key(&"b".into()),
        Some(&Value::Int(2))
    );
}
