//! Site building orchestration.
//!
//! # Pipeline
//!
//! ```text
//! build_site()
//!     │
//!     ├── parse_posts()    posts/*.xml ──make_post──► [Post]
//!     ├── group_tags()     [Post] ──reverse_dict──► [Tag]
//!     ├── copy_tree()      input/ ──────────────────► output/
//!     ├── post.html        [Post] ──render──► output/post/<basename>
//!     ├── tag.html         [Tag]  ──render──► output/tag/<filename>
//!     └── other templates  names  ──render──► output/<name>
//! ```
//!
//! Each rendering stage stages its files first and only then copies them
//! into the output, prompting before any existing file is replaced.

use crate::{
    collection::{DictionaryCollection, ListCollection},
    config::SiteConfig,
    data::{Post, PostOptions, Tag, group_tags, make_post},
    debug,
    fileset::FileSet,
    generator::Templates,
    log,
    session::Session,
    utils::fs::copy_tree,
};
use anyhow::{Context as _, Result, bail};
use std::path::{Path, PathBuf};
use tera::Context;

/// What one build produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub posts: usize,
    pub tags: usize,
    /// Names of the templates rendered at the output root.
    pub pages: Vec<String>,
}

/// Build the whole blog described by `config`.
pub fn build_site(config: &SiteConfig, session: &Session) -> Result<BuildSummary> {
    let output = &config.build.output;
    let templates = Templates::new(&config.build.templates)
        .context("Failed to load templates")?;
    debug!(session.verbose(), "build"; "templates: {:?}", templates.names());

    // ========================================================================
    // Posts and tags
    // ========================================================================
    let posts = parse_posts(config, session)?;
    let tags = group_tags(&posts);
    log!("build"; "{} posts, {} tags", posts.len(), tags.len());

    // ========================================================================
    // Static files
    // ========================================================================
    copy_tree(&config.build.input, output, &static_exclusions(config), session)
        .with_context(|| format!("Failed to copy {}", config.build.input.display()))?;

    // ========================================================================
    // Rendering
    // ========================================================================
    let mut shared = Context::new();
    shared.insert("posts_all", posts.all());
    shared.insert("tags_all", tags.all());
    shared.insert("site", &config.site);
    shared.insert("extra", &config.extra);

    posts
        .with_rendering_engine(session, &templates)?
        .with_template(&config.build.post_template)?
        .render_all(|post| format!("post/{}", post.basename), |post| post_args(post, &shared))?
        .copy_to(output)?;

    tags.with_rendering_engine(session, &templates)?
        .with_template(&config.build.tag_template)?
        .render_all(|tag| format!("tag/{}", tag.filename), |tag| Ok(tag_args(tag, &shared)))?
        .copy_to(output)?;

    let pages = page_templates(config)?;
    let mut fixed = shared.clone();
    fixed.insert("path_to_root", ".");
    pages
        .with_rendering_engine(session, &templates)?
        .render_all_templates(&fixed)?
        .copy_to(output)?;

    log!("build"; "done: {}", output.display());
    Ok(BuildSummary {
        posts: posts.len(),
        tags: tags.len(),
        pages: pages.into_items(),
    })
}

/// Parse every post of the post directory; no directory means no posts.
fn parse_posts(config: &SiteConfig, session: &Session) -> Result<ListCollection<Post>> {
    let Some(dir) = &config.build.posts else {
        return Ok(ListCollection::new([]));
    };
    let Some(transform) = &config.build.transform else {
        bail!("[build.posts] requires [build.transform] to be set");
    };

    let mut params = Context::new();
    params.insert("extra", &config.extra);
    let options = PostOptions {
        transform,
        date_format: &config.build.date_format,
        params,
    };

    let mut sources = FileSet::listdir(dir).filter_xml();
    let posts = sources
        .map(|item| make_post(item, &options, session.verbose()))
        .with_context(|| format!("Failed to parse posts in {}", dir.display()))?;
    debug!(
        session.verbose(), "build";
        "compiled {} transform program(s)", sources.compiled_transforms()
    );
    Ok(posts)
}

/// Directories below the input that are sources, not static files.
fn static_exclusions(config: &SiteConfig) -> Vec<PathBuf> {
    let mut exclude = config.build.templates.clone();
    if let Some(dir) = config.build.transform.as_deref().and_then(Path::parent) {
        exclude.push(dir.to_path_buf());
    }
    exclude.extend(config.build.posts.iter().cloned());
    exclude.push(config.build.output.clone());
    exclude
}

/// Parameters of `post.html`. Absent post fields are left out entirely.
fn post_args(post: &Post, shared: &Context) -> crate::error::Result<Context> {
    let optional = DictionaryCollection::from_entries([
        ("lang", post.lang.clone()),
        ("date_orig", Some(post.orig_date.clone())),
        ("date_year", post.year.clone()),
        ("date_month", post.month.clone()),
        ("date_day", post.day.clone()),
        ("date_cmt", post.date_comment.clone()),
        ("date_fmt", post.formatted_date.clone()),
    ])?
    .filter_values_not_none();

    let mut args = shared.clone();
    for (key, value) in optional.iter() {
        args.insert(*key, value);
    }
    args.insert("tags", &post.tags);
    args.insert("path_to_root", "..");
    args.insert("post_body", &post.body);
    args.insert("post_title", &post.title);
    Ok(args)
}

/// Parameters of `tag.html`.
fn tag_args(tag: &Tag, shared: &Context) -> Context {
    let mut args = shared.clone();
    args.insert("path_to_root", "..");
    args.insert("post_list", &tag.posts);
    args.insert("tag", &tag.value);
    args
}

/// HTML templates of the first template directory other than the post and
/// tag templates.
fn page_templates(config: &SiteConfig) -> Result<ListCollection<String>> {
    let Some(dir) = config.build.templates.first() else {
        return Ok(ListCollection::new([]));
    };
    let post = config.build.post_template.clone();
    let tag = config.build.tag_template.clone();
    let names = FileSet::listdir(dir)
        .filter_html()
        .template_names()?
        .filter(|name| *name != post && *name != tag);
    Ok(names)
}

// ============================================================================
// Tests
// ============================================================================
