//! Transform programs: Tera templates evaluated against one document.
//!
//! A program sees its named parameters plus three functions bound to the
//! document being transformed:
//!
//! - `select(path="...")`: array with the string value of every match
//! - `select_xml(path="...")`: markup of all matches, concatenated
//! - `message(text="...")`: append to the diagnostic log, render nothing
//!
//! ```text
//! <article lang="{{ lang }}">
//!   <h1>{{ select(path="/post/title/text()") | first }}</h1>
//!   {{ select_xml(path="/post/body/*") }}
//! </article>
//! ```

use std::{
    collections::{HashMap, hash_map::Entry},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use rustc_hash::FxHashMap;
use tera::{Context, Tera, Value};

use super::{Document, Query, Selected};
use crate::{
    error::{Error, Result},
    generator::templates::register_helpers,
};

/// Name the program source is registered under inside its Tera instance.
const PROGRAM: &str = "__program__";

type Diagnostics = Arc<Mutex<Vec<String>>>;

/// Result of one transform invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub text: String,
    /// Messages the program emitted during this invocation only.
    pub messages: Vec<String>,
}

/// A compiled transform program.
pub struct Transform {
    program: PathBuf,
    tera: Tera,
}

impl Transform {
    /// Read and compile the program at `program`.
    pub fn compile(program: &Path) -> Result<Self> {
        let source = fs::read_to_string(program).map_err(|e| Error::io(program, e))?;
        Self::from_source(program, &source)
    }

    /// Compile a program from source; `program` only names it in errors.
    pub fn from_source(program: &Path, source: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        register_helpers(&mut tera);
        tera.add_raw_template(PROGRAM, source)
            .map_err(|source| Error::Transform {
                program: program.to_path_buf(),
                source,
            })?;

        Ok(Self {
            program: program.to_path_buf(),
            tera,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Render the program against `document`.
    ///
    /// The diagnostic log starts empty on every call.
    pub fn apply(&mut self, document: Arc<Document>, params: &Context) -> Result<TransformOutput> {
        let diagnostics: Diagnostics = Arc::default();

        self.tera
            .register_function("select", query_function(document.clone(), false));
        self.tera
            .register_function("select_xml", query_function(document, true));
        self.tera
            .register_function("message", message_function(diagnostics.clone()));

        let text = self
            .tera
            .render(PROGRAM, params)
            .map_err(|source| Error::Transform {
                program: self.program.clone(),
                source,
            })?;

        let messages = std::mem::take(
            &mut *diagnostics.lock().unwrap_or_else(PoisonError::into_inner),
        );
        Ok(TransformOutput { text, messages })
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

fn string_arg<'a>(args: &'a HashMap<String, Value>, name: &str) -> tera::Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("missing string argument `{name}`")))
}

fn query_function(
    document: Arc<Document>,
    markup: bool,
) -> impl Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static {
    move |args: &HashMap<String, Value>| {
        let query = Query::parse(string_arg(args, "path")?)
            .map_err(|e| tera::Error::msg(e.to_string()))?;
        let selected = document.select(&query);

        Ok(if markup {
            Value::String(selected.iter().map(Selected::to_xml).collect())
        } else {
            Value::Array(
                selected
                    .iter()
                    .map(|s| Value::String(s.string_value()))
                    .collect(),
            )
        })
    }
}

fn message_function(
    diagnostics: Diagnostics,
) -> impl Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static {
    move |args: &HashMap<String, Value>| {
        let text = string_arg(args, "text")?;
        diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_owned());
        Ok(Value::String(String::new()))
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Compiled programs keyed by absolute path, kept for the whole run.
#[derive(Debug, Default)]
pub struct TransformCache {
    programs: FxHashMap<PathBuf, Transform>,
}

impl TransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled program at `program`, compiling it on first use.
    pub fn get_or_compile(&mut self, program: &Path) -> Result<&mut Transform> {
        let key = std::path::absolute(program).map_err(|e| Error::io(program, e))?;
        match self.programs.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let transform = Transform::compile(entry.key())?;
                Ok(entry.insert(transform))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const POST: &str = r#"<post lang="en"><title>Hi &amp; bye</title><body><p>One</p><p>Two</p></body></post>"#;

    fn document() -> Arc<Document> {
        Arc::new(Document::parse_str(POST).unwrap())
    }

    fn program(source: &str) -> Transform {
        Transform::from_source(Path::new("test.tera"), source).unwrap()
    }

    #[test]
    fn test_select_and_params() {
        let mut t = program(
            r#"<h1 lang="{{ lang }}">{{ select(path="/post/title/text()") | first }}</h1>"#,
        );
        let mut ctx = Context::new();
        ctx.insert("lang", "en");

        let out = t.apply(document(), &ctx).unwrap();
        assert_eq!(out.text, r#"<h1 lang="en">Hi & bye</h1>"#);
        assert!(out.messages.is_empty());
    }

    #[test]
    fn test_select_xml() {
        let mut t = program(r#"{{ select_xml(path="/post/body/p") }}"#);
        let out = t.apply(document(), &Context::new()).unwrap();
        assert_eq!(out.text, "<p>One</p><p>Two</p>");
    }

    #[test]
    fn test_loop_over_matches() {
        let mut t = program(r#"{% for p in select(path="//p") %}[{{ p }}]{% endfor %}"#);
        let out = t.apply(document(), &Context::new()).unwrap();
        assert_eq!(out.text, "[One][Two]");
    }

    #[test]
    fn test_messages_reset_per_call() {
        let mut t = program(r#"{{ message(text="no summary") }}ok"#);

        let first = t.apply(document(), &Context::new()).unwrap();
        assert_eq!(first.text, "ok");
        assert_eq!(first.messages, ["no summary"]);

        let second = t.apply(document(), &Context::new()).unwrap();
        assert_eq!(second.messages, ["no summary"]);
    }

    #[test]
    fn test_functions_follow_the_document() {
        let mut t = program(r#"{{ select(path="/post/@lang") | first }}"#);
        let other = Arc::new(Document::parse_str(r#"<post lang="pl"/>"#).unwrap());

        assert_eq!(t.apply(document(), &Context::new()).unwrap().text, "en");
        assert_eq!(t.apply(other, &Context::new()).unwrap().text, "pl");
    }

    #[test]
    fn test_invalid_query_fails_render() {
        let mut t = program(r#"{{ select(path="/post[") }}"#);
        let err = t.apply(document(), &Context::new()).unwrap_err();
        assert!(matches!(err, Error::Transform { .. }));
    }

    #[test]
    fn test_compile_error() {
        let err = Transform::from_source(Path::new("bad.tera"), "{% if %}").unwrap_err();
        assert!(matches!(err, Error::Transform { program, .. } if program == Path::new("bad.tera")));
    }

    #[test]
    fn test_cache_compiles_once_per_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("post.tera");
        fs::write(&path, "{{ select(path=\"/post/title/text()\") | first }}").unwrap();

        let mut cache = TransformCache::new();
        cache.get_or_compile(&path).unwrap();
        // source changes are not picked up once compiled
        fs::write(&path, "changed").unwrap();
        let out = cache
            .get_or_compile(&path)
            .unwrap()
            .apply(document(), &Context::new())
            .unwrap();

        assert_eq!(out.text, "Hi & bye");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_missing_program() {
        let mut cache = TransformCache::new();
        let err = cache.get_or_compile(Path::new("/nonexistent/post.tera")).unwrap_err();
        assert!(matches!(err, Error::Io(..)));
        assert!(cache.is_empty());
    }
}
