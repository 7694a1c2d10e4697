//! Lazily enumerated sets of file paths.
//!
//! A [`FileSet`] describes where paths come from; nothing touches the disk
//! until [`FileSet::all`] is called, and every call enumerates again.
//! Narrowing filters return wrapper types that add capabilities:
//! [`HtmlFileSet`] knows its paths are templates, [`XmlFileSet`] can parse
//! and query the item under processing.
//!
//! ```text
//! FileSet::listdir("posts")          Directory
//!     .filter_xml()                  Filtered ──► XmlFileSet
//!     .map(|item| make_post(item))   ListCollection<Post>
//! ```

mod xml;

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    collection::ListCollection,
    error::{Error, Result},
    node::Node,
};
pub use xml::{XmlFileSet, XmlItem};

type Predicate = Box<dyn Fn(&Path) -> bool>;

/// Where the paths of a set come from.
enum Kind {
    Empty,
    Paths(Vec<PathBuf>),
    /// One directory level, entries sorted by file name.
    Directory(PathBuf),
    Filtered { inner: Box<FileSet>, predicate: Predicate },
}

/// A lazily enumerated set of file paths.
pub struct FileSet {
    node: Node,
    kind: Kind,
}

impl FileSet {
    /// A set with no paths.
    pub fn empty() -> Self {
        Self {
            node: Node::root("empty"),
            kind: Kind::Empty,
        }
    }

    /// A fixed list of paths, made absolute on enumeration.
    pub fn from_paths(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            node: Node::root("paths"),
            kind: Kind::Paths(paths.into_iter().map(Into::into).collect()),
        }
    }

    /// The entries of `dir`, not recursive.
    pub fn listdir(dir: impl Into<PathBuf>) -> Self {
        Self {
            node: Node::root("listdir"),
            kind: Kind::Directory(dir.into()),
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Enumerate the set.
    pub fn all(&self) -> Result<Vec<PathBuf>> {
        match &self.kind {
            Kind::Empty => Ok(Vec::new()),
            Kind::Paths(paths) => paths
                .iter()
                .map(|p| std::path::absolute(p).map_err(|e| Error::io(p, e)))
                .collect(),
            Kind::Directory(dir) => {
                let mut names = fs::read_dir(dir)
                    .map_err(|e| Error::io(dir, e))?
                    .map(|entry| entry.map(|e| e.file_name()).map_err(|e| Error::io(dir, e)))
                    .collect::<Result<Vec<_>>>()?;
                names.sort();
                Ok(names.into_iter().map(|name| dir.join(name)).collect())
            }
            Kind::Filtered { inner, predicate } => Ok(inner
                .all()?
                .into_iter()
                .filter(|p| predicate(p))
                .collect()),
        }
    }

    /// Keep the paths satisfying `predicate`, re-checked on every enumeration.
    pub fn filter(self, predicate: impl Fn(&Path) -> bool + 'static) -> Self {
        Self {
            node: self.node.derive("filter"),
            kind: Kind::Filtered {
                inner: Box::new(self),
                predicate: Box::new(predicate),
            },
        }
    }

    /// Keep the paths whose name ends with one of `suffixes` (`".png"`, `".jpg"`).
    pub fn filter_extension<S: AsRef<str>>(self, suffixes: &[S]) -> Self {
        let suffixes: Vec<String> = suffixes.iter().map(|s| s.as_ref().to_owned()).collect();
        self.filter(move |p| {
            let name = p.to_string_lossy();
            suffixes.iter().any(|s| name.ends_with(s.as_str()))
        })
    }

    /// Narrow to `.html` files.
    pub fn filter_html(self) -> HtmlFileSet {
        HtmlFileSet {
            set: self.filter_extension(&[".html"]),
        }
    }

    /// Narrow to `.xml` files, gaining structured access.
    pub fn filter_xml(self) -> XmlFileSet {
        XmlFileSet::new(self.filter_extension(&[".xml"]))
    }

    /// Apply `f` to every path, in enumeration order.
    pub fn map<T, F>(&self, mut f: F) -> Result<ListCollection<T>>
    where
        F: FnMut(&Path) -> T,
    {
        self.try_map(|p| Ok(f(p)))
    }

    /// Like [`map`](Self::map); the first error aborts with no partial result.
    pub fn try_map<T, F>(&self, f: F) -> Result<ListCollection<T>>
    where
        F: FnMut(&Path) -> Result<T>,
    {
        let items = self
            .all()?
            .iter()
            .map(|p| p.as_path())
            .map(f)
            .collect::<Result<Vec<_>>>()?;
        Ok(ListCollection::derived(self.node.derive("map"), items))
    }

    /// Run `f` for every path; the set is returned for further chaining.
    pub fn for_each<F>(self, mut f: F) -> Result<Self>
    where
        F: FnMut(&Path) -> Result<()>,
    {
        for path in self.all()? {
            f(&path)?;
        }
        Ok(self)
    }
}

impl std::fmt::Debug for FileSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSet")
            .field("node", &self.node.to_string())
            .finish_non_exhaustive()
    }
}

/// A set known to contain HTML templates.
#[derive(Debug)]
pub struct HtmlFileSet {
    set: FileSet,
}

impl HtmlFileSet {
    pub fn node(&self) -> &Node {
        self.set.node()
    }

    pub fn all(&self) -> Result<Vec<PathBuf>> {
        self.set.all()
    }

    pub fn filter(self, predicate: impl Fn(&Path) -> bool + 'static) -> Self {
        Self {
            set: self.set.filter(predicate),
        }
    }

    pub fn map<T, F>(&self, f: F) -> Result<ListCollection<T>>
    where
        F: FnMut(&Path) -> T,
    {
        self.set.map(f)
    }

    /// Template names: each path's file name, for loading from a search path.
    pub fn template_names(&self) -> Result<ListCollection<String>> {
        self.set
            .map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .map(|names| names.filter_not_none())
    }
}
