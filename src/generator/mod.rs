//! Terminal pipeline stage: stage output files, then commit them.
//!
//! A [`Generator`] is bound to the items of one collection. Every output file
//! is first written into a private staging directory; [`Generator::copy_to`]
//! then commits the whole staging tree to a destination under the run's
//! overwrite policy.
//!
//! ```text
//! Created ──generate/render──► Rendering ──copy_to──► Committed
//!    │                                                   │
//!    └─────────────────────copy_to───────────────────────┘ (repeatable)
//! ```
//!
//! [`RenderingEngine`] adds template rendering on top of a generator.

mod render;
pub mod templates;

use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

use crate::{
    collection::{DictionaryCollection, ListCollection},
    debug,
    error::{Error, Result},
    node::Node,
    session::Session,
    utils::fs::{copy_file, copy_tree, write_file},
    xml::Document,
};
pub use render::RenderingEngine;
pub use templates::Templates;

/// Lifecycle of a generator's staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Created,
    Rendering,
    /// Last destination the staging area was committed to.
    Committed(PathBuf),
}

/// Writes one output file per item into a staging area.
///
/// Items are handed to callbacks by value: `&T` for lists, `(&K, &V)` for
/// dictionaries.
pub struct Generator<'a, I> {
    node: Node,
    session: &'a Session,
    items: Vec<I>,
    staging: TempDir,
    state: State,
}

impl<'a, I: Copy> Generator<'a, I> {
    pub(crate) fn new(node: Node, session: &'a Session, items: Vec<I>) -> Result<Self> {
        let staging = TempDir::new().map_err(|e| Error::io(std::env::temp_dir(), e))?;
        debug!(session.verbose(), "stage"; "using {}", staging.path().display());
        Ok(Self {
            node,
            session,
            items,
            staging,
            state: State::Created,
        })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn session(&self) -> &'a Session {
        self.session
    }

    pub fn items(&self) -> &[I] {
        &self.items
    }

    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    /// Resolve an output name inside the staging area.
    ///
    /// Names are relative paths that must stay below the output root.
    fn output_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let valid = relative.components().next().is_some()
            && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(Error::InvalidOutputName(name.to_owned()));
        }
        Ok(self.staging.path().join(relative))
    }

    /// Move to `Rendering`, refusing once committed.
    fn begin(&mut self) -> Result<()> {
        if let State::Committed(dest) = &self.state {
            return Err(Error::AlreadyCommitted(dest.clone()));
        }
        self.state = State::Rendering;
        Ok(())
    }

    pub(crate) fn stage(&mut self, name: &str, contents: &[u8]) -> Result<()> {
        self.begin()?;
        let path = self.output_path(name)?;
        write_file(&path, contents, self.session)?;
        Ok(())
    }

    /// Write `contents_fn(item)` to `name_fn(item)` for every item.
    pub fn generate_all<N, C, B>(&mut self, mut name_fn: N, mut contents_fn: C) -> Result<&mut Self>
    where
        N: FnMut(I) -> String,
        C: FnMut(I) -> Result<B>,
        B: AsRef<[u8]>,
    {
        for i in 0..self.items.len() {
            let item = self.items[i];
            let name = name_fn(item);
            let contents = contents_fn(item)?;
            self.stage(&name, contents.as_ref())?;
        }
        Ok(self)
    }

    /// Copy `src_fn(item)` to `dst_fn(item)` for every item.
    pub fn generate_all_copy<S, D>(&mut self, mut src_fn: S, mut dst_fn: D) -> Result<&mut Self>
    where
        S: FnMut(I) -> PathBuf,
        D: FnMut(I) -> String,
    {
        for i in 0..self.items.len() {
            let item = self.items[i];
            let src = src_fn(item);
            self.begin()?;
            let dst = self.output_path(&dst_fn(item))?;
            copy_file(&src, &dst, self.session)?;
        }
        Ok(self)
    }

    /// Write the document `dom_fn(item)` as pretty XML with a declaration.
    pub fn generate_xml_all<N, D>(&mut self, name_fn: N, mut dom_fn: D) -> Result<&mut Self>
    where
        N: FnMut(I) -> String,
        D: FnMut(I) -> Result<Document>,
    {
        self.generate_all(name_fn, |item| Ok(dom_fn(item)?.to_pretty_xml()))
    }

    /// Commit the staging area into `dest`, file by file.
    ///
    /// The staging area is left intact and may be committed again.
    pub fn copy_to(&mut self, dest: &Path) -> Result<&mut Self> {
        copy_tree(self.staging.path(), dest, &[], self.session)?;
        self.state = State::Committed(dest.to_path_buf());
        Ok(self)
    }
}

impl<I> std::fmt::Debug for Generator<'_, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("node", &self.node.to_string())
            .field("items", &self.items.len())
            .field("staging", &self.staging.path())
            .field("state", &self.state)
            .finish()
    }
}

// ============================================================================
// Collection entry points
// ============================================================================

impl<T> ListCollection<T> {
    /// A generator over the items of this list.
    pub fn with_generator<'a>(&'a self, session: &'a Session) -> Result<Generator<'a, &'a T>> {
        Generator::new(self.node().derive("generator"), session, self.iter().collect())
    }

    /// A rendering engine over the items of this list.
    pub fn with_rendering_engine<'a>(
        &'a self,
        session: &'a Session,
        templates: &'a Templates,
    ) -> Result<RenderingEngine<'a, &'a T>> {
        Ok(RenderingEngine::new(self.with_generator(session)?, templates))
    }
}

impl<K, V> DictionaryCollection<K, V>
where
    K: Eq + std::hash::Hash + Clone,
{
    /// A generator over the entries of this dictionary, as `(key, value)` pairs.
    pub fn with_generator<'a>(
        &'a self,
        session: &'a Session,
    ) -> Result<Generator<'a, (&'a K, &'a V)>> {
        Generator::new(self.node().derive("generator"), session, self.iter().collect())
    }

    /// A rendering engine over the entries of this dictionary.
    pub fn with_rendering_engine<'a>(
        &'a self,
        session: &'a Session,
        templates: &'a Templates,
    ) -> Result<RenderingEngine<'a, (&'a K, &'a V)>> {
        Ok(RenderingEngine::new(self.with_generator(session)?, templates))
    }
}
