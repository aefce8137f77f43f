//! Generic property tree and the handler that builds it
//!
//! [`PropertyTreeHandler`] accepts every name segment and every leaf, so
//! reading with it keeps the whole input. [`PropertyTree::flatten`] turns
//! the tree back into dotted keys.

use crate::context::LeafProperty;
use crate::error::Result;
use crate::handler::{ConfigHandler, NestedHandler, Target, downcast_target};
use indexmap::IndexMap;
use serde::Serialize;

/// Children of a tree node, in insertion order
pub type PropertyChildren = IndexMap<String, PropertyTree>;

/// A node holding an optional value and named child nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropertyTree {
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    children: PropertyChildren,
}

impl PropertyTree {
    /// Creates an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node holding only `value`
    pub fn leaf(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            children: IndexMap::new(),
        }
    }

    /// Value stored at this node
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Replaces the value stored at this node
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }

    /// Child nodes
    pub fn children(&self) -> &PropertyChildren {
        &self.children
    }

    /// Child node named `name`
    pub fn child(&self, name: &str) -> Option<&PropertyTree> {
        self.children.get(name)
    }

    /// True when the node has neither a value nor children
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    /// Node at the dotted `path`
    pub fn get(&self, path: &str) -> Option<&PropertyTree> {
        path.split('.')
            .try_fold(self, |node, element| node.children.get(element))
    }

    /// Value at the dotted `path`
    pub fn get_value(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(PropertyTree::value)
    }

    /// Stores `value` at the dotted `path`, creating intermediate nodes
    pub fn insert(&mut self, path: &str, value: impl Into<String>) {
        let elements: Vec<&str> = path.split('.').collect();
        self.insert_elements(&elements, value);
    }

    fn insert_elements<S: AsRef<str>>(&mut self, elements: &[S], value: impl Into<String>) {
        let node = elements.iter().fold(self, |node, element| {
            node.children.entry(element.as_ref().to_string()).or_default()
        });
        node.value = Some(value.into());
    }

    /// Merges `other` into this node; values from `other` win
    pub fn merge(&mut self, other: PropertyTree) {
        if other.value.is_some() {
            self.value = other.value;
        }
        for (name, child) in other.children {
            self.children.entry(name).or_default().merge(child);
        }
    }

    /// Dotted names and values of every node that holds a value
    pub fn flatten(&self) -> IndexMap<String, String> {
        let mut flat = IndexMap::new();
        self.flatten_into(None, &mut flat);
        flat
    }

    // `path` is `None` only for the root; empty segments yield `Some("")`
    fn flatten_into(&self, path: Option<&str>, flat: &mut IndexMap<String, String>) {
        if let (Some(path), Some(value)) = (path, &self.value) {
            flat.insert(path.to_string(), value.clone());
        }
        for (name, child) in &self.children {
            let child_path = match path {
                Some(parent) => format!("{}.{}", parent, name),
                None => name.clone(),
            };
            child.flatten_into(Some(&child_path), flat);
        }
    }

    /// Splits the node into its value and children
    pub fn into_parts(self) -> (Option<String>, PropertyChildren) {
        (self.value, self.children)
    }
}

/// Handler that accepts every property into a [`PropertyTree`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyTreeHandler;

impl ConfigHandler for PropertyTreeHandler {
    type Target = PropertyTree;

    fn produce(&self) -> Result<PropertyTree> {
        Ok(PropertyTree::new())
    }

    fn nested(&self, _segments: &[String]) -> Option<NestedHandler> {
        Some(NestedHandler::new(PropertyTreeHandler))
    }

    fn set(&self, target: &mut PropertyTree, property: &LeafProperty<'_>) -> Result<bool> {
        target.insert_elements(property.relative_elements(), property.value());
        Ok(true)
    }

    fn attach(&self, target: &mut PropertyTree, name: &str, nested: Target) -> Result<()> {
        let nested = downcast_target::<PropertyTree>(nested, name)?;
        let elements: Vec<&str> = name.split('.').collect();
        let node = elements.iter().fold(target, |node, element| {
            node.children.entry(element.to_string()).or_default()
        });
        node.merge(nested);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::PropertiesConfigReader;

    #[test]
    fn test_insert_and_get() {
        let mut tree = PropertyTree::new();
        tree.insert("db.host", "localhost");
        tree.insert("db.port", "5432");
        tree.insert("db", "primary");

        assert_eq!(tree.get_value("db.host"), Some("localhost"));
        assert_eq!(tree.get_value("db"), Some("primary"));
        assert_eq!(tree.get("db").unwrap().children().len(), 2);
        assert!(tree.get("db.user").is_none());
    }

    #[test]
    fn test_merge_prefers_incoming_values() {
        let mut tree = PropertyTree::leaf("a");
        tree.insert("x", "1");

        let mut other = PropertyTree::leaf("b");
        other.insert("y", "2");
        tree.merge(other);

        assert_eq!(tree.value(), Some("b"));
        assert_eq!(tree.get_value("x"), Some("1"));
        assert_eq!(tree.get_value("y"), Some("2"));
    }

    #[test]
    fn test_flatten_skips_valueless_nodes() {
        let mut tree = PropertyTree::new();
        tree.insert("a.b.c", "1");
        tree.insert("a.d", "2");

        let flat = tree.flatten();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat["a.b.c"], "1");
        assert_eq!(flat["a.d"], "2");
    }

    #[test]
    fn test_flatten_keeps_empty_segments() {
        let mut tree = PropertyTree::new();
        tree.insert(".a", "1");
        tree.insert(".", "2");
        tree.insert("a.", "3");

        let flat = tree.flatten();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[".a"], "1");
        assert_eq!(flat["."], "2");
        assert_eq!(flat["a."], "3");
    }

    #[test]
    fn test_handler_keeps_value_and_children_of_same_name() {
        let tree = PropertiesConfigReader::new(PropertyTreeHandler)
            .read_str("a.b=2\na=1\na.c.d=3")
            .unwrap();

        assert_eq!(tree.get_value("a"), Some("1"));
        assert_eq!(tree.get_value("a.b"), Some("2"));
        assert_eq!(tree.get_value("a.c.d"), Some("3"));
    }

    #[test]
    fn test_serialize_to_json() {
        let mut tree = PropertyTree::new();
        tree.insert("server.port", "8080");
        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(json, r#"{"children":{"server":{"children":{"port":{"value":"8080"}}}}}"#);
    }
}
