use serde_json::Value;

use crate::tree::{merge_into, PropertyTree};

/// Returns `true` if any key of `tree`, at any depth, would be expanded by
/// [`expand`].
pub fn has_dotted_keys(tree: &PropertyTree) -> bool {
    tree.iter().any(|(key, value)| is_expandable(key) || value_has_dotted_keys(value))
}

fn value_has_dotted_keys(value: &Value) -> bool {
    match value {
        Value::Object(nested) => has_dotted_keys(nested),
        Value::Array(items) => items.iter().any(value_has_dotted_keys),
        _ => false,
    }
}

/// Expand dot-separated keys into nested trees.
///
/// Keys are applied in the tree's own order. Each key is turned into a
/// chain of single-key trees (`"a.b.c": v` becomes `{a: {b: {c: v}}}`) and
/// deep-merged into the accumulator, so keys sharing a prefix end up as
/// siblings in one subtree instead of replacing each other. Nested values,
/// including objects inside arrays, are expanded recursively before they are
/// merged.
///
/// A key with an empty segment (`".a"`, `"a..b"`, `"a."`) is not a path and
/// is kept verbatim.
pub fn expand(flat: PropertyTree) -> PropertyTree {
    if !has_dotted_keys(&flat) {
        return flat;
    }

    let mut nested = PropertyTree::new();
    for (key, value) in flat {
        merge_into(&mut nested, build_chain(&key, expand_value(value)));
    }
    nested
}

fn expand_value(value: Value) -> Value {
    match value {
        Value::Object(inner) => Value::Object(expand(inner)),
        Value::Array(items) => Value::Array(items.into_iter().map(expand_value).collect()),
        other => other,
    }
}

fn is_expandable(key: &str) -> bool {
    key.contains('.') && key.split('.').all(|segment| !segment.is_empty())
}

fn build_chain(key: &str, value: Value) -> PropertyTree {
    if !is_expandable(key) {
        let mut leaf = PropertyTree::new();
        leaf.insert(key.to_string(), value);
        return leaf;
    }

    let mut segments = key.rsplit('.');
    // `rsplit` on a non-empty key always yields at least one segment.
    let innermost = segments.next().unwrap_or(key);
    let mut chain = PropertyTree::new();
    chain.insert(innermost.to_string(), value);
    for segment in segments {
        let mut outer = PropertyTree::new();
        outer.insert(segment.to_string(), Value::Object(chain));
        chain = outer;
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> PropertyTree {
        crate::tree::into_tree(value).unwrap()
    }

    fn expanded(value: Value) -> Value {
        Value::Object(expand(tree(value)))
    }

    #[test]
    fn siblings_accumulate() {
        assert_eq!(expanded(json!({"a.b": 1, "a.c": 2})), json!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn arbitrary_depth() {
        assert_eq!(expanded(json!({"a.b.c": 1})), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn plain_keys_pass_through() {
        let input = json!({"message": "hi", "pet": {"name": "Barker"}});
        assert_eq!(expanded(input.clone()), input);
    }

    #[test]
    fn dotted_leaf_joins_existing_subtree() {
        let out = expanded(json!({
            "pet": {"name": "Barker", "breed": "Bitsa"},
            "pet.species": "dog",
        }));
        assert_eq!(out, json!({"pet": {"name": "Barker", "breed": "Bitsa", "species": "dog"}}));
    }

    #[test]
    fn nested_subtree_after_dotted_key_merges_too() {
        let out = expanded(json!({
            "pet.species": "dog",
            "pet": {"name": "Barker"},
        }));
        assert_eq!(out, json!({"pet": {"species": "dog", "name": "Barker"}}));
    }

    #[test]
    fn later_keys_win_on_conflict() {
        let out = expanded(json!({"pet.name": "Barker", "pet": {"name": "Rex"}}));
        assert_eq!(out, json!({"pet": {"name": "Rex"}}));
    }

    #[test]
    fn dotted_keys_inside_nested_values_are_expanded() {
        let out = expanded(json!({"http": {"request.method": "get", "request.id": 7}}));
        assert_eq!(out, json!({"http": {"request": {"method": "get", "id": 7}}}));
    }

    #[test]
    fn objects_inside_arrays_are_expanded() {
        let out = expanded(json!({"items": [{"a.b": 1}, 2, [{"c.d": 3}]]}));
        assert_eq!(out, json!({"items": [{"a": {"b": 1}}, 2, [{"c": {"d": 3}}]]}));
        assert!(has_dotted_keys(&tree(json!({"items": [{"a.b": 1}]}))));
    }

    #[test]
    fn keys_with_empty_segments_are_kept_verbatim() {
        let input = json!({".hidden": 1, "a..b": 2, "trailing.": 3});
        assert_eq!(expanded(input.clone()), input);
    }

    #[test]
    fn detects_dotted_keys_at_any_depth() {
        assert!(has_dotted_keys(&tree(json!({"a": {"b.c": 1}}))));
        assert!(!has_dotted_keys(&tree(json!({"a": {"b": 1}}))));
    }
}
