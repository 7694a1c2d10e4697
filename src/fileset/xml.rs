//! XML file sets and the per-item structured access context.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tera::Context;

use super::FileSet;
use crate::{
    collection::ListCollection,
    error::{Error, Result},
    log,
    node::Node,
    xml::{self, Document, Query, Selected, TransformCache},
};

/// A set of XML documents.
///
/// Compiled transform programs are cached here and reused for every item.
#[derive(Debug)]
pub struct XmlFileSet {
    set: FileSet,
    transforms: TransformCache,
}

impl XmlFileSet {
    pub(super) fn new(set: FileSet) -> Self {
        Self {
            set,
            transforms: TransformCache::new(),
        }
    }

    pub fn node(&self) -> &Node {
        self.set.node()
    }

    pub fn all(&self) -> Result<Vec<PathBuf>> {
        self.set.all()
    }

    /// Keep the documents whose path satisfies `predicate`.
    pub fn filter(self, predicate: impl Fn(&Path) -> bool + 'static) -> Self {
        Self {
            set: self.set.filter(predicate),
            transforms: self.transforms,
        }
    }

    /// Number of transform programs compiled so far.
    pub fn compiled_transforms(&self) -> usize {
        self.transforms.len()
    }

    /// Run `f` on every document in order.
    ///
    /// Each call gets a fresh [`XmlItem`]: a document is parsed at most once
    /// and only while its item is under processing.
    pub fn map<T, F>(&mut self, mut f: F) -> Result<ListCollection<T>>
    where
        F: FnMut(&mut XmlItem<'_>) -> Result<T>,
    {
        let paths = self.set.all()?;
        let mut items = Vec::with_capacity(paths.len());
        for path in &paths {
            let mut item = XmlItem::new(path, &mut self.transforms);
            items.push(f(&mut item)?);
        }
        Ok(ListCollection::derived(self.set.node().derive("map"), items))
    }

    /// Run `f` on every document; the set is returned for further chaining.
    pub fn for_each<F>(mut self, mut f: F) -> Result<Self>
    where
        F: FnMut(&mut XmlItem<'_>) -> Result<()>,
    {
        self.map(|item| f(item))?;
        Ok(self)
    }
}

/// The document under processing.
pub struct XmlItem<'a> {
    path: &'a Path,
    document: Option<Arc<Document>>,
    transforms: &'a mut TransformCache,
    parses: usize,
}

impl<'a> XmlItem<'a> {
    pub(crate) fn new(path: &'a Path, transforms: &'a mut TransformCache) -> Self {
        Self {
            path,
            document: None,
            transforms,
            parses: 0,
        }
    }

    pub fn path(&self) -> &Path {
        self.path
    }

    /// How many times the document has been parsed (0 or 1).
    pub fn parses(&self) -> usize {
        self.parses
    }

    /// The parsed document, parsing it on first access.
    pub fn document(&mut self) -> Result<Arc<Document>> {
        if let Some(document) = &self.document {
            return Ok(document.clone());
        }
        let document = Arc::new(xml::parse_file(self.path)?);
        self.parses += 1;
        self.document = Some(document.clone());
        Ok(document)
    }

    /// Every node selected by `query`, possibly none.
    pub fn query_list(&mut self, query: &str) -> Result<Vec<Selected>> {
        let compiled = Query::parse(query)?;
        Ok(self.document()?.select(&compiled))
    }

    /// The single node selected by `query`, or `None`.
    ///
    /// Fails with [`Error::AmbiguousQuery`] if several nodes match.
    pub fn query_optional(&mut self, query: &str) -> Result<Option<Selected>> {
        let mut selected = self.query_list(query)?;
        match selected.len() {
            0 => Ok(None),
            1 => Ok(selected.pop()),
            count => Err(Error::AmbiguousQuery {
                query: query.to_owned(),
                count,
            }),
        }
    }

    /// Exactly one node selected by `query`.
    ///
    /// Fails with [`Error::NoMatch`] or [`Error::AmbiguousQuery`].
    pub fn query_required(&mut self, query: &str) -> Result<Selected> {
        self.query_optional(query)?
            .ok_or_else(|| Error::NoMatch(query.to_owned()))
    }

    /// Apply the transform program at `program` to the document.
    ///
    /// Messages emitted by the program are reported as warnings.
    pub fn transform(&mut self, program: &Path, params: &Context) -> Result<String> {
        let document = self.document()?;
        let output = self
            .transforms
            .get_or_compile(program)?
            .apply(document, params)?;

        for message in &output.messages {
            log!("warn"; "{}: {message}", program.display());
        }
        Ok(output.text)
    }
}
