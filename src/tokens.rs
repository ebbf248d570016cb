// Copyright 2025 Cowboy AI, LLC.

//! Token trees and token-mapping expressions
//!
//! Tokens are nested namespaces whose leaves carry values. A JSON object with a
//! `value` or `$value` key is a leaf, any other object is a namespace group and
//! anything that is not an object is a leaf as well.
//!
//! Semantic fields reference tokens through `tokenMap(<namespace>)` (exact path)
//! or `tokenMap(<namespace>.*)` (any path below the namespace). Only existence
//! is checked; resolving values is a renderer concern.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::definitions::TokenTree;

/// Whether a token value is a leaf rather than a namespace group
pub fn is_token_leaf(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key("value") || map.contains_key("$value"),
        _ => true,
    }
}

/// Flatten a token tree into dotted leaf paths, in declaration order
pub fn flatten_tokens(tree: &TokenTree) -> IndexMap<String, Value> {
    let mut leaves = IndexMap::new();
    for (key, value) in tree {
        collect_leaves(key.clone(), value, &mut leaves);
    }
    leaves
}

fn collect_leaves(path: String, value: &Value, leaves: &mut IndexMap<String, Value>) {
    match value {
        Value::Object(map) if !is_token_leaf(value) => {
            for (key, child) in map {
                collect_leaves(format!("{path}.{key}"), child, leaves);
            }
        }
        _ => {
            leaves.insert(path, value.clone());
        }
    }
}

/// Leaf paths that also have leaves nested below them
///
/// `color.primary` and `color.primary.hover` cannot both be plain leaves of
/// one tree; [`unflatten_tokens`] folds such pairs into a single node.
pub fn nested_leaf_paths(leaves: &IndexMap<String, Value>) -> Vec<&str> {
    leaves
        .keys()
        .filter(|path| {
            leaves
                .keys()
                .any(|other| other.strip_prefix(path.as_str()).is_some_and(|rest| rest.starts_with('.')))
        })
        .map(String::as_str)
        .collect()
}

/// Rebuild a token tree from dotted leaf paths
///
/// A leaf that also has nested leaves keeps both: a scalar value moves under
/// `$value` and the children are added next to the leaf's own keys. The
/// resulting node reads as a leaf, so [`flatten_tokens`] on the rebuilt tree
/// no longer reports the nested paths. Callers needing every path keep the
/// flattened map.
pub fn unflatten_tokens(leaves: &IndexMap<String, Value>) -> TokenTree {
    let mut root = serde_json::Map::new();
    for (path, value) in leaves {
        let segments: Vec<&str> = path.split('.').collect();
        insert_path(&mut root, &segments, value.clone());
    }
    root.into_iter().collect()
}

/// Turn a leaf into an object that can also hold children
fn into_node(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        scalar => {
            let mut map = serde_json::Map::new();
            map.insert("$value".to_string(), scalar);
            map
        }
    }
}

fn insert_path(node: &mut serde_json::Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            let key = (*last).to_string();
            let into_group = node.get(&key).is_some_and(|existing| !is_token_leaf(existing));
            match node.get_mut(&key) {
                Some(Value::Object(group)) if into_group => {
                    for (leaf_key, leaf_value) in into_node(value) {
                        group.insert(leaf_key, leaf_value);
                    }
                }
                _ => {
                    node.insert(key, value);
                }
            }
        }
        [head, rest @ ..] => {
            let child = node
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if !matches!(child, Value::Object(_)) {
                *child = Value::Object(into_node(child.take()));
            }
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}

/// A parsed `tokenMap(...)` expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenMapping {
    /// Dotted namespace, without any wildcard suffix
    pub namespace: String,

    /// `true` for `namespace.*`
    pub wildcard: bool,
}

impl TokenMapping {
    /// Parse a `tokenMap(<namespace>[.*])` expression
    pub fn parse(expression: &str) -> Option<Self> {
        let inner = expression
            .trim()
            .strip_prefix("tokenMap(")?
            .strip_suffix(')')?
            .trim();

        let (namespace, wildcard) = match inner.strip_suffix(".*") {
            Some(namespace) => (namespace, true),
            None => (inner, false),
        };

        let well_formed = !namespace.is_empty()
            && namespace
                .split('.')
                .all(|segment| !segment.is_empty() && !segment.contains(['*', '(', ')', ' ']));
        if !well_formed {
            return None;
        }

        Some(Self {
            namespace: namespace.to_string(),
            wildcard,
        })
    }

    /// Whether a single flattened token path satisfies this mapping
    pub fn matches(&self, path: &str) -> bool {
        if self.wildcard {
            path.strip_prefix(self.namespace.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
        } else {
            path == self.namespace
        }
    }

    /// Whether any of the given paths satisfies this mapping
    pub fn is_satisfied_by<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> bool {
        paths.into_iter().any(|path| self.matches(path))
    }
}

impl fmt::Display for TokenMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wildcard {
            write!(f, "{}.*", self.namespace)
        } else {
            write!(f, "{}", self.namespace)
        }
    }
}
