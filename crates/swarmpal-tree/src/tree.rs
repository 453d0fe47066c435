use std::collections::BTreeMap;

use crate::model::{AttrMap, AttrValue, Dataset};

/// A node in a hierarchical dataset tree.
///
/// Every node carries a dataset (possibly empty) and named children.
/// Paths are slash-separated (`"a/b/c"`); a leading slash and the empty
/// path both address the node itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTree {
    dataset: Dataset,
    children: BTreeMap<String, DataTree>,
}

impl DataTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            dataset,
            children: BTreeMap::new(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn dataset_mut(&mut self) -> &mut Dataset {
        &mut self.dataset
    }

    /// Node attributes are the attributes of the node's dataset.
    pub fn attrs(&self) -> &AttrMap {
        &self.dataset.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut AttrMap {
        &mut self.dataset.attrs
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.dataset.set_attr(key, value);
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &DataTree)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_children(self) -> impl Iterator<Item = (String, DataTree)> {
        self.children.into_iter()
    }

    pub fn child(&self, name: &str) -> Option<&DataTree> {
        self.children.get(name)
    }

    /// Attach a child, replacing (last write wins) any existing child of
    /// the same name. Returns true when an existing child was replaced.
    pub fn set_child(&mut self, name: &str, node: DataTree) -> bool {
        self.children.insert(name.to_string(), node).is_some()
    }

    fn split_path(path: &str) -> impl Iterator<Item = &str> {
        path.split('/').filter(|segment| !segment.is_empty())
    }

    /// Resolve a slash-separated path to a node.
    pub fn get(&self, path: &str) -> Option<&DataTree> {
        let mut node = self;
        for segment in Self::split_path(path) {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut DataTree> {
        let mut node = self;
        for segment in Self::split_path(path) {
            node = node.children.get_mut(segment)?;
        }
        Some(node)
    }

    /// Insert a node at a path, creating empty intermediate nodes as
    /// needed. An existing node at the path is silently replaced.
    pub fn insert(&mut self, path: &str, node: DataTree) {
        let segments: Vec<&str> = Self::split_path(path).collect();
        if segments.is_empty() {
            *self = node;
            return;
        }
        let mut parent = self;
        for segment in &segments[..segments.len() - 1] {
            parent = parent
                .children
                .entry(segment.to_string())
                .or_insert_with(DataTree::new);
        }
        parent
            .children
            .insert(segments[segments.len() - 1].to_string(), node);
    }

    /// Detach and return the subtree at a path.
    pub fn take(&mut self, path: &str) -> Option<DataTree> {
        let segments: Vec<&str> = Self::split_path(path).collect();
        let (last, ancestors) = segments.split_last()?;
        let mut parent = self;
        for segment in ancestors {
            parent = parent.children.get_mut(*segment)?;
        }
        parent.children.remove(*last)
    }

    /// Visit this node and all descendants, depth-first, with their
    /// relative paths (`"."` for the node itself).
    pub fn walk(&self) -> Vec<(String, &DataTree)> {
        let mut out = Vec::new();
        out.push((".".to_string(), self));
        fn descend<'t>(prefix: &str, node: &'t DataTree, out: &mut Vec<(String, &'t DataTree)>) {
            for (name, child) in node.children() {
                let path = if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{prefix}/{name}")
                };
                out.push((path.clone(), child));
                descend(&path, child, out);
            }
        }
        descend("", self, &mut out);
        out
    }

    /// Apply a closure to every dataset in the tree, this node included.
    pub fn for_each_dataset_mut(&mut self, f: &mut impl FnMut(&mut Dataset)) {
        f(&mut self.dataset);
        for child in self.children.values_mut() {
            child.for_each_dataset_mut(f);
        }
    }
}
