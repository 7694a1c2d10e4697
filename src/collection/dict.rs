//! Keyed collection with unique keys and insertion order.

use std::{fmt::Debug, hash::Hash};

use rustc_hash::FxHashMap;

use super::ListCollection;
use crate::{
    error::{Error, Result},
    log,
    node::Node,
};

/// A mapping with unique keys that remembers insertion order.
///
/// Operations that can make two entries land on the same key either take an
/// explicit merge function or fail; nothing is silently overwritten.
#[derive(Debug, Clone)]
pub struct DictionaryCollection<K, V> {
    node: Node,
    entries: Vec<(K, V)>,
    index: FxHashMap<K, usize>,
}

impl<K, V> DictionaryCollection<K, V>
where
    K: Eq + Hash + Clone,
{
    /// A root dictionary with no entries.
    pub fn empty() -> Self {
        Self::from_parts(Node::root("dict"), Vec::new(), FxHashMap::default())
    }

    /// Build a root dictionary, rejecting repeated keys.
    pub fn from_entries(entries: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Debug,
    {
        let mut dict = Self::empty();
        for (key, value) in entries {
            if dict.index.contains_key(&key) {
                return Err(Error::DuplicateKey(format!("{key:?}")));
            }
            dict.push(key, value);
        }
        Ok(dict)
    }

    pub(crate) fn from_parts(
        node: Node,
        entries: Vec<(K, V)>,
        index: FxHashMap<K, usize>,
    ) -> Self {
        Self { node, entries, index }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// All entries, in insertion order.
    pub fn all(&self) -> &[(K, V)] {
        &self.entries
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, key: K, value: V) {
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
    }

    /// Insert `value` under `key`, resolving a collision with
    /// `merge(existing, incoming)`.
    fn fold<M>(&mut self, key: K, value: V, merge: &mut M, warn: bool)
    where
        K: Debug,
        V: Clone,
        M: FnMut(V, V) -> V,
    {
        match self.index.get(&key) {
            Some(&i) => {
                if warn {
                    log!("warn"; "Duplicate key: {key:?}");
                }
                let slot = &mut self.entries[i].1;
                *slot = merge(slot.clone(), value);
            }
            None => self.push(key, value),
        }
    }

    /// Transform every value; keys are untouched.
    pub fn map_values<U, F>(&self, mut f: F) -> DictionaryCollection<K, U>
    where
        F: FnMut(&V) -> U,
    {
        self.map_values_with_keys(|_, v| f(v))
    }

    /// Transform every value with access to its key; keys are untouched.
    pub fn map_values_with_keys<U, F>(&self, mut f: F) -> DictionaryCollection<K, U>
    where
        F: FnMut(&K, &V) -> U,
    {
        let entries = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), f(k, v)))
            .collect();
        DictionaryCollection::from_parts(
            self.node.derive("map_values"),
            entries,
            self.index.clone(),
        )
    }

    /// Wrap every value into a one-element list, ready for concatenating merges.
    pub fn map_values_as_list(&self) -> DictionaryCollection<K, Vec<V>>
    where
        V: Clone,
    {
        self.map_values(|v| vec![v.clone()])
    }

    /// Re-key every entry; any collision fails with
    /// [`Error::UniqueConstraintViolation`].
    pub fn map_keys_unique<K2, F>(&self, mut f: F) -> Result<DictionaryCollection<K2, V>>
    where
        K2: Eq + Hash + Clone,
        V: Clone,
        F: FnMut(&K) -> K2,
    {
        let mut out = DictionaryCollection::from_parts(
            self.node.derive("map_keys_unique"),
            Vec::with_capacity(self.entries.len()),
            FxHashMap::default(),
        );
        for (k, v) in &self.entries {
            out.push(f(k), v.clone());
        }

        if out.index.len() == self.entries.len() {
            Ok(out)
        } else {
            Err(Error::UniqueConstraintViolation {
                input: self.entries.len(),
                distinct: out.index.len(),
            })
        }
    }

    /// Re-key every entry via `f(key)`, folding collisions with
    /// `merge(existing, incoming)`. With `warn` set, each collision is
    /// reported as a warning.
    pub fn map_keys<K2, F, M>(&self, mut f: F, merge: M, warn: bool) -> DictionaryCollection<K2, V>
    where
        K2: Eq + Hash + Clone + Debug,
        V: Clone,
        F: FnMut(&K) -> K2,
        M: FnMut(V, V) -> V,
    {
        self.rekey("map_keys", |k, _| f(k), merge, warn)
    }

    /// Re-key every entry via `f(key, value)`, folding collisions with
    /// `merge(existing, incoming)`.
    pub fn map_keys_with_values<K2, F, M>(
        &self,
        f: F,
        merge: M,
        warn: bool,
    ) -> DictionaryCollection<K2, V>
    where
        K2: Eq + Hash + Clone + Debug,
        V: Clone,
        F: FnMut(&K, &V) -> K2,
        M: FnMut(V, V) -> V,
    {
        self.rekey("map_keys_with_values", f, merge, warn)
    }

    fn rekey<K2, F, M>(
        &self,
        label: &'static str,
        mut f: F,
        mut merge: M,
        warn: bool,
    ) -> DictionaryCollection<K2, V>
    where
        K2: Eq + Hash + Clone + Debug,
        V: Clone,
        F: FnMut(&K, &V) -> K2,
        M: FnMut(V, V) -> V,
    {
        let mut out =
            DictionaryCollection::from_parts(self.node.derive(label), Vec::new(), FxHashMap::default());
        for (k, v) in &self.entries {
            out.fold(f(k, v), v.clone(), &mut merge, warn);
        }
        out
    }

    /// Fold `other` into this dictionary **in place**.
    ///
    /// Keys present on both sides become `merge(existing, incoming)`; keys
    /// only in `other` are taken as-is. `other` is left intact.
    pub fn merge_with<M>(&mut self, other: &Self, mut merge: M)
    where
        K: Debug,
        V: Clone,
        M: FnMut(V, V) -> V,
    {
        for (k, v) in &other.entries {
            self.fold(k.clone(), v.clone(), &mut merge, false);
        }
    }

    /// Project to the values, keeping insertion order.
    pub fn values(&self) -> ListCollection<V>
    where
        V: Clone,
    {
        ListCollection::derived(
            self.node.derive("values"),
            self.entries.iter().map(|(_, v)| v.clone()),
        )
    }
}

impl<K, V> DictionaryCollection<K, Option<V>>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Drop the entries whose value is absent.
    pub fn filter_values_not_none(&self) -> DictionaryCollection<K, V> {
        let mut out = DictionaryCollection::from_parts(
            self.node.derive("filter_values_not_none"),
            Vec::new(),
            FxHashMap::default(),
        );
        for (k, v) in &self.entries {
            if let Some(v) = v {
                out.push(k.clone(), v.clone());
            }
        }
        out
    }
}
