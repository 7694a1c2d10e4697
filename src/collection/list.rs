//! Ordered sequence collection.

use std::{fmt::Debug, hash::Hash, ops::Index};

use rustc_hash::FxHashMap;

use super::DictionaryCollection;
use crate::{
    error::{Error, Result},
    node::Node,
};

/// An ordered, immutable sequence of items.
#[derive(Debug, Clone)]
pub struct ListCollection<T> {
    node: Node,
    items: Vec<T>,
}

impl<T> ListCollection<T> {
    /// Wrap items into a root collection.
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self::derived(Node::root("list"), items)
    }

    pub(crate) fn derived(node: Node, items: impl IntoIterator<Item = T>) -> Self {
        Self {
            node,
            items: items.into_iter().collect(),
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// All items, in order.
    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Apply `f` to every item, preserving order and count.
    pub fn map<U, F>(&self, f: F) -> ListCollection<U>
    where
        F: FnMut(&T) -> U,
    {
        ListCollection::derived(self.node.derive("map"), self.items.iter().map(f))
    }

    /// Like [`map`](Self::map), but the first error aborts the whole
    /// transformation and no partial collection is produced.
    pub fn try_map<U, E, F>(&self, f: F) -> Result<ListCollection<U>, E>
    where
        F: FnMut(&T) -> Result<U, E>,
    {
        let items = self.items.iter().map(f).collect::<Result<Vec<_>, E>>()?;
        Ok(ListCollection::derived(self.node.derive("map"), items))
    }

    /// Group items by the keys `f` yields for each of them.
    ///
    /// Each bucket keeps the input order, keys appear in first-seen order, and
    /// an item lands in a bucket at most once even if `f` repeats a key.
    pub fn reverse_dict<K, I, F>(&self, mut f: F) -> DictionaryCollection<K, Vec<T>>
    where
        K: Eq + Hash + Clone,
        T: Clone,
        I: IntoIterator<Item = K>,
        F: FnMut(&T) -> I,
    {
        let mut entries: Vec<(K, Vec<T>)> = Vec::new();
        let mut last_item: Vec<usize> = Vec::new();
        let mut index: FxHashMap<K, usize> = FxHashMap::default();

        for (pos, item) in self.items.iter().enumerate() {
            for key in f(item) {
                match index.get(&key) {
                    Some(&i) if last_item[i] == pos => {}
                    Some(&i) => {
                        entries[i].1.push(item.clone());
                        last_item[i] = pos;
                    }
                    None => {
                        index.insert(key.clone(), entries.len());
                        entries.push((key, vec![item.clone()]));
                        last_item.push(pos);
                    }
                }
            }
        }

        DictionaryCollection::from_parts(self.node.derive("reverse_dict"), entries, index)
    }

    /// Key every item by an injective `f`.
    ///
    /// Fails with [`Error::DuplicateKey`] on the first collision.
    pub fn reverse_dict1<K, F>(&self, mut f: F) -> Result<DictionaryCollection<K, T>>
    where
        K: Eq + Hash + Clone + Debug,
        T: Clone,
        F: FnMut(&T) -> K,
    {
        let mut entries = Vec::with_capacity(self.items.len());
        let mut index = FxHashMap::default();

        for item in &self.items {
            let key = f(item);
            if index.contains_key(&key) {
                return Err(Error::DuplicateKey(format!("{key:?}")));
            }
            index.insert(key.clone(), entries.len());
            entries.push((key, item.clone()));
        }

        Ok(DictionaryCollection::from_parts(
            self.node.derive("reverse_dict1"),
            entries,
            index,
        ))
    }
}

impl<T: Clone> ListCollection<T> {
    /// Keep the items satisfying `predicate`, in order.
    pub fn filter<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        Self::derived(
            self.node.derive("filter"),
            self.items.iter().filter(|x| predicate(x)).cloned(),
        )
    }
}

impl<T: Clone> ListCollection<Option<T>> {
    /// Drop absent items.
    pub fn filter_not_none(&self) -> ListCollection<T> {
        ListCollection::derived(
            self.node.derive("filter_not_none"),
            self.items.iter().flatten().cloned(),
        )
    }
}

impl<T: Clone> ListCollection<Vec<T>> {
    /// Concatenate the inner sequences in order.
    pub fn flatten(&self) -> ListCollection<T> {
        ListCollection::derived(
            self.node.derive("flatten"),
            self.items.iter().flatten().cloned(),
        )
    }
}

impl<T> Index<usize> for ListCollection<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a ListCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
