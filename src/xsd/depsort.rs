//! Dependency (topological) sort
//!
//! Orders schema components 'dependencies first' so type definitions are
//! processed after everything they depend on. Cycles are tolerated: members
//! of a dependency cycle may come out in either order. Dependencies that
//! are not themselves keys of the input mapping are logged and dropped.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::debug;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Sort items 'dependencies first' in a given dependency tree.
///
/// The tree maps each key to the collection of keys it depends on. The
/// result lists every key after all of its transitive dependencies, except
/// among members of the same cycle where either order is acceptable. Ties
/// among independent keys preserve the input's insertion order.
pub fn dependency_sort<K>(tree: &IndexMap<K, Vec<K>>) -> Vec<(K, Vec<K>)>
where
    K: Clone + Eq + Hash + Debug,
{
    let mut sorted = Vec::with_capacity(tree.len());
    let mut marks: HashMap<&K, Mark> = tree.keys().map(|k| (k, Mark::Unvisited)).collect();
    for key in tree.keys() {
        sort_r(&mut sorted, &mut marks, key, tree);
    }
    sorted
        .into_iter()
        .map(|k| (k.clone(), tree[k].clone()))
        .collect()
}

fn sort_r<'t, K>(
    sorted: &mut Vec<&'t K>,
    marks: &mut HashMap<&'t K, Mark>,
    key: &'t K,
    tree: &'t IndexMap<K, Vec<K>>,
) where
    K: Clone + Eq + Hash + Debug,
{
    // An InProgress key is a cycle back-edge, a Done key a shared subtree;
    // both are skipped, only the marking distinguishes them.
    match marks.get(key) {
        Some(Mark::Unvisited) => {}
        _ => return,
    }
    marks.insert(key, Mark::InProgress);
    for dep in &tree[key] {
        match tree.get_key_value(dep) {
            Some((dep_key, _)) => sort_r(sorted, marks, dep_key, tree),
            None => debug!(?dep, "dependency not found, skipped"),
        }
    }
    marks.insert(key, Mark::Done);
    sorted.push(key);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(edges: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
        edges
            .iter()
            .map(|(k, deps)| {
                (
                    k.to_string(),
                    deps.iter().map(|d| d.to_string()).collect(),
                )
            })
            .collect()
    }

    fn position(result: &[(String, Vec<String>)], key: &str) -> usize {
        result.iter().position(|(k, _)| k == key).unwrap()
    }

    #[test]
    fn test_chain() {
        let t = tree(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]);
        let result = dependency_sort(&t);
        assert_eq!(result.len(), 3);
        assert!(position(&result, "a") < position(&result, "b"));
        assert!(position(&result, "b") < position(&result, "c"));
    }

    #[test]
    fn test_cycle_neither_lost_nor_duplicated() {
        let t = tree(&[("a", &["b"]), ("b", &["a"])]);
        let result = dependency_sort(&t);
        assert_eq!(result.len(), 2);
        let keys: Vec<&str> = result.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"a"));
        assert!(keys.contains(&"b"));
    }

    #[test]
    fn test_missing_dependency_dropped() {
        let t = tree(&[("a", &["ghost"]), ("b", &["a"])]);
        let result = dependency_sort(&t);
        assert_eq!(result.len(), 2);
        assert!(position(&result, "a") < position(&result, "b"));
    }

    #[test]
    fn test_independent_keys_keep_insertion_order() {
        let t = tree(&[("x", &[]), ("y", &[]), ("z", &[])]);
        let result = dependency_sort(&t);
        let keys: Vec<&str> = result.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_deps_returned_with_keys() {
        let t = tree(&[("b", &["a"]), ("a", &[])]);
        let result = dependency_sort(&t);
        let (_, deps) = &result[position(&result, "b")];
        assert_eq!(deps, &vec!["a".to_string()]);
    }

    #[test]
    fn test_diamond() {
        let t = tree(&[("d", &["b", "c"]), ("b", &["a"]), ("c", &["a"]), ("a", &[])]);
        let result = dependency_sort(&t);
        assert_eq!(result.len(), 4);
        assert!(position(&result, "a") < position(&result, "b"));
        assert!(position(&result, "a") < position(&result, "c"));
        assert!(position(&result, "b") < position(&result, "d"));
        assert!(position(&result, "c") < position(&result, "d"));
    }
}
