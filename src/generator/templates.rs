//! Template loading over a search path.
//!
//! Every directory of the search path contributes the template files below
//! it, named by their `/`-separated path relative to that directory. When
//! two directories provide the same name, the earlier directory wins.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use rustc_hash::FxHashMap;
use tera::{Context, Tera, Value};
use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    utils::text::{DIGITS, int2str, string2id},
};

/// File extensions loaded as templates; anything else in a template
/// directory is ignored.
const TEMPLATE_EXTENSIONS: &[&str] = &["html", "htm", "xml", "txt", "tera"];

/// Helper registered as both a filter and a function in every template.
const STRING2ID: &str = "string2id";
/// Filter formatting an integer in another base.
const INT2STR: &str = "int2str";

/// Templates loaded from a search path.
pub struct Templates {
    tera: Tera,
    search_path: Vec<PathBuf>,
    sources: FxHashMap<String, PathBuf>,
}

impl Templates {
    /// Load every template below the directories of `search_path`.
    pub fn new(search_path: &[PathBuf]) -> Result<Self> {
        let search_path = search_path
            .iter()
            .map(|dir| std::path::absolute(dir).map_err(|e| Error::io(dir, e)))
            .collect::<Result<Vec<_>>>()?;

        let mut sources: FxHashMap<String, PathBuf> = FxHashMap::default();
        for dir in &search_path {
            for (name, path) in discover(dir)? {
                sources.entry(name).or_insert(path);
            }
        }

        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        register_helpers(&mut tera);
        tera.add_template_files(
            sources
                .iter()
                .map(|(name, path)| (path.as_path(), Some(name.as_str()))),
        )?;

        Ok(Self {
            tera,
            search_path,
            sources,
        })
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// All template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The file a template was loaded from.
    pub fn source_path(&self, name: &str) -> Option<&Path> {
        self.sources.get(name).map(PathBuf::as_path)
    }

    /// Render the template `name`; an unknown name is an error.
    pub fn render(&self, name: &str, args: &Context) -> Result<String> {
        Ok(self.tera.render(name, args)?)
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("search_path", &self.search_path)
            .field("templates", &self.names())
            .finish()
    }
}

/// Template files below `dir` with their names.
fn discover(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            Error::io(path, err.into())
        })?;
        let is_template = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| TEMPLATE_EXTENSIONS.contains(&e));
        if !is_template {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        found.push((name, entry.path().to_path_buf()));
    }
    Ok(found)
}

// ============================================================================
// Helpers
// ============================================================================

/// Register the helpers every template and transform program can use.
pub(crate) fn register_helpers(tera: &mut Tera) {
    tera.register_filter(STRING2ID, string2id_filter);
    tera.register_function(STRING2ID, string2id_function);
    tera.register_filter(INT2STR, int2str_filter);
}

fn string2id_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("string2id expects a string"))?;
    Ok(Value::String(string2id(s)))
}

fn string2id_function(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = args
        .get("s")
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg("string2id expects a string argument `s`"))?;
    Ok(Value::String(string2id(s)))
}

/// `{{ n | int2str(base=16, min_length=4) }}`; the base defaults to all
/// of [`DIGITS`].
fn int2str_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let k = value
        .as_i64()
        .ok_or_else(|| tera::Error::msg("int2str expects an integer"))?;
    let base = match args.get("base") {
        Some(base) => base
            .as_u64()
            .and_then(|b| u32::try_from(b).ok())
            .ok_or_else(|| tera::Error::msg("int2str: `base` must be a positive integer"))?,
        None => DIGITS.len() as u32,
    };
    let min_length = match args.get("min_length") {
        Some(len) => len
            .as_u64()
            .and_then(|l| usize::try_from(l).ok())
            .ok_or_else(|| tera::Error::msg("int2str: `min_length` must be a positive integer"))?,
        None => 0,
    };
    int2str(k, base, min_length)
        .map(Value::String)
        .ok_or_else(|| tera::Error::msg(format!("int2str: base out of range ({base})")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, source: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }

    #[test]
    fn test_first_directory_wins() {
        let site = TempDir::new().unwrap();
        let theme = TempDir::new().unwrap();
        write(site.path(), "post.html", "site post");
        write(theme.path(), "post.html", "theme post");
        write(theme.path(), "tag.html", "theme tag");

        let templates =
            Templates::new(&[site.path().to_path_buf(), theme.path().to_path_buf()]).unwrap();
        let ctx = Context::new();
        assert_eq!(templates.render("post.html", &ctx).unwrap(), "site post");
        assert_eq!(templates.render("tag.html", &ctx).unwrap(), "theme tag");
        assert_eq!(
            templates.source_path("tag.html"),
            Some(theme.path().join("tag.html").as_path())
        );
    }

    #[test]
    fn test_nested_names_and_inheritance() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "layout/base.html", "<main>{% block content %}{% endblock %}</main>");
        write(
            dir.path(),
            "index.html",
            r#"{% extends "layout/base.html" %}{% block content %}hi{% endblock %}"#,
        );
        write(dir.path(), "logo.png", "not a template");

        let templates = Templates::new(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(templates.names(), ["index.html", "layout/base.html"]);
        assert_eq!(
            templates.render("index.html", &Context::new()).unwrap(),
            "<main>hi</main>"
        );
    }

    #[test]
    fn test_no_autoescape() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "post.html", "{{ body }}");
        let templates = Templates::new(&[dir.path().to_path_buf()]).unwrap();

        let mut ctx = Context::new();
        ctx.insert("body", "<p>a & b</p>");
        assert_eq!(templates.render("post.html", &ctx).unwrap(), "<p>a & b</p>");
    }

    #[test]
    fn test_unknown_template() {
        let dir = TempDir::new().unwrap();
        let templates = Templates::new(&[dir.path().to_path_buf()]).unwrap();
        assert!(!templates.contains("post.html"));
        let err = templates.render("post.html", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn test_helpers() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "ids.html",
            r#"{{ tag | string2id }} {{ string2id(s="Zürich Straße") }} {{ 255 | int2str(base=16, min_length=4) }}"#,
        );
        let templates = Templates::new(&[dir.path().to_path_buf()]).unwrap();

        let mut ctx = Context::new();
        ctx.insert("tag", "C++ & Rust");
        assert_eq!(
            templates.render("ids.html", &ctx).unwrap(),
            "C-Rust Zuerich-Strasse 00FF"
        );
    }

    #[test]
    fn test_missing_directory() {
        let err = Templates::new(&[PathBuf::from("/nonexistent/templates")]).unwrap_err();
        assert!(matches!(err, Error::Io(..)));
    }

    #[test]
    fn test_syntax_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "broken.html", "{% for %}");
        let err = Templates::new(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }
}
