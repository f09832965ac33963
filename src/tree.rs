use serde_json::{Map, Value};

/// Canonical key-value structure every log entry is reduced to before it
/// is serialized. Values are JSON scalars, arrays or nested trees.
///
/// Backed by an insertion-ordered map so emitted lines keep a stable field
/// order (envelope first, then the layers in the order they were merged).
pub type PropertyTree = Map<String, Value>;

/// Deep-merge `overlay` on top of `base` and return the result.
///
/// Where both sides hold a tree under the same key the two trees are merged
/// recursively; in every other case (scalars, arrays, type mismatches) the
/// overlay value wins. Keys only present in `base` are kept, keys only
/// present in `overlay` are added. Neither input is modified.
pub fn merge(base: &PropertyTree, overlay: &PropertyTree) -> PropertyTree {
    let mut merged = base.clone();
    merge_into(&mut merged, overlay.clone());
    merged
}

/// In-place variant of [`merge`] that consumes the overlay.
///
/// Used by the pipeline to fold successive layers into one accumulator
/// without cloning the accumulator for every layer.
pub fn merge_into(base: &mut PropertyTree, overlay: PropertyTree) {
    for (key, incoming) in overlay {
        match (base.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_into(existing, nested),
            (_, incoming) => {
                base.insert(key, incoming);
            }
        }
    }
}

/// Fold a sequence of layers left to right into a single tree.
pub fn merge_all<I>(layers: I) -> PropertyTree
where
    I: IntoIterator<Item = PropertyTree>,
{
    layers.into_iter().fold(PropertyTree::new(), |mut acc, layer| {
        merge_into(&mut acc, layer);
        acc
    })
}

/// Look up a value by a dotted path (`"service.name"`) in a nested tree.
pub fn get_path<'a>(tree: &'a PropertyTree, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = tree.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Convert a JSON value into a tree, or `None` if it is not an object.
pub fn into_tree(value: Value) -> Option<PropertyTree> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
