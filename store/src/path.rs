//! Slash-separated tree paths and structural helpers over
//! `serde_json::Value` trees. Empty segments are ignored, so `"a//b"` and
//! `"/a/b/"` address the same node as `"a/b"`.

use serde_json::{Map, Value};

pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Whether a change at `written` is visible from a watch at `watched`
/// (either path is an ancestor of the other, or they are equal).
pub fn overlaps(watched: &str, written: &str) -> bool {
    let mut a = segments(watched);
    let mut b = segments(written);
    loop {
        match (a.next(), b.next()) {
            (Some(x), Some(y)) if x == y => continue,
            (Some(_), Some(_)) => return false,
            _ => return true,
        }
    }
}

/// Value at `path`, `None` when any segment is missing. An empty path
/// addresses the root.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for seg in segments(path) {
        node = node.as_object()?.get(seg)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Set `path` to `value`, creating intermediate maps as needed. Setting
/// `Value::Null` is a removal, matching the tree's no-null convention.
pub fn set(root: &mut Value, path: &str, value: Value) {
    if value.is_null() {
        remove(root, path);
        return;
    }
    let segs: Vec<&str> = segments(path).collect();
    if segs.is_empty() {
        *root = value;
        return;
    }
    let mut node = root;
    for seg in &segs[..segs.len() - 1] {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = node
            .as_object_mut()
            .unwrap()
            .entry(seg.to_string())
            .or_insert(Value::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    node.as_object_mut()
        .unwrap()
        .insert(segs[segs.len() - 1].to_string(), value);
}

/// Remove the node at `path`, pruning map ancestors it leaves empty.
pub fn remove(root: &mut Value, path: &str) {
    let segs: Vec<&str> = segments(path).collect();
    if segs.is_empty() {
        *root = Value::Object(Map::new());
        return;
    }
    remove_inner(root, &segs);
}

fn remove_inner(node: &mut Value, segs: &[&str]) -> bool {
    let Some(map) = node.as_object_mut() else {
        return false;
    };
    if segs.len() == 1 {
        map.remove(segs[0]);
    } else if let Some(child) = map.get_mut(segs[0]) {
        if remove_inner(child, &segs[1..]) {
            map.remove(segs[0]);
        }
    }
    map.is_empty()
}
