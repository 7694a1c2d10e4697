//! Blog posts parsed from XML sources.
//!
//! ```xml
//! <post lang="en" orig-date="2021-03-04;approximately">
//!   <title>Hello</title>
//!   <tags>rust; travel</tags>
//!   <body>...</body>
//! </post>
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tera::Context;

use crate::{
    debug,
    error::{Error, Result},
    fileset::XmlItem,
    log,
    utils::{
        date::{OrigDate, format_date},
        text::normalize,
    },
};

const TITLE: &str = "/post/title/text()";
const LANG: &str = "/post/@lang";
const TAGS: &str = "/post/tags/text()";
const ORIG_DATE: &str = "/post/@orig-date";

/// One blog post, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    /// Output file name: the source name with `.xml` replaced by `.html`.
    pub basename: String,
    pub title: String,
    /// Date as written in the source, comment included.
    pub orig_date: String,
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    pub date_comment: Option<String>,
    pub formatted_date: Option<String>,
    pub date: Option<NaiveDate>,
    pub lang: Option<String>,
    /// Rendered body markup.
    pub body: String,
    pub tags: Vec<String>,
}

/// How posts are turned into records.
#[derive(Debug, Clone)]
pub struct PostOptions<'a> {
    /// Transform program rendering the post body.
    pub transform: &'a Path,
    /// `strftime` format for [`Post::formatted_date`].
    pub date_format: &'a str,
    /// Parameters passed to every transform invocation.
    pub params: Context,
}

/// Output name for a post source: `hello.xml` → `hello.html`.
pub fn html_basename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.html")
}

/// Split a `;`-separated tag list, normalizing each entry and dropping empties.
pub fn split_tags(text: &str) -> Vec<String> {
    text.split(';')
        .map(|t| normalize(t.trim(), true))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Build a [`Post`] from the document under processing.
///
/// A missing title, tag list or date is fatal, as is a date naming a day
/// that does not exist. A date of another shape is only reported and leaves
/// the date fields empty.
pub fn make_post(item: &mut XmlItem<'_>, options: &PostOptions<'_>, verbose: bool) -> Result<Post> {
    log!("post"; "{}", item.path().display());

    let title = item.query_required(TITLE)?.string_value();
    debug!(verbose, "post"; "title: {title}");
    let lang = item.query_optional(LANG)?.map(|s| s.string_value());
    debug!(verbose, "post"; "lang: {lang:?}");
    let tags = split_tags(&item.query_required(TAGS)?.string_value());
    debug!(verbose, "post"; "tags: {tags:?}");
    let orig_date = item.query_required(ORIG_DATE)?.string_value();
    debug!(verbose, "post"; "orig date: {orig_date}");

    let parsed = OrigDate::parse(&orig_date);
    let date = match &parsed {
        Some(OrigDate { date: None, .. }) => {
            return Err(Error::Parse {
                path: item.path().to_path_buf(),
                message: format!("no such calendar day: {orig_date}"),
            });
        }
        Some(d) => d.date,
        None => {
            log!("warn"; "Invalid date format: {orig_date}");
            None
        }
    };
    let formatted_date = date
        .map(|d| format_date(d, options.date_format))
        .transpose()?;
    match &formatted_date {
        Some(f) => debug!(verbose, "post"; "date_fmt: {f}"),
        None => log!(
            "warn";
            "unable to format post creation date; lang={lang:?} date={orig_date}"
        ),
    }

    let mut params = options.params.clone();
    if let Some(lang) = &lang {
        params.insert("lang", lang);
    }
    let body = item.transform(options.transform, &params)?;

    let (year, month, day, date_comment) = match parsed {
        Some(d) => (Some(d.year), Some(d.month), Some(d.day), d.comment),
        None => (None, None, None, None),
    };

    Ok(Post {
        basename: html_basename(item.path()),
        title,
        orig_date,
        year,
        month,
        day,
        date_comment,
        formatted_date,
        date,
        lang,
        body,
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fileset::FileSet, utils::date::DEFAULT_FORMAT};
    use std::fs;
    use tempfile::TempDir;

    const TRANSFORM: &str =
        r#"<article lang="{{ lang | default(value='') }}">{{ select_xml(path="/post/body/*") }}</article>"#;

    fn setup(posts: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("posts")).unwrap();
        for (name, source) in posts {
            fs::write(dir.path().join("posts").join(name), source).unwrap();
        }
        fs::write(dir.path().join("post.tera"), TRANSFORM).unwrap();
        dir
    }

    fn parse_all(dir: &Path) -> Result<Vec<Post>> {
        parse_all_with(dir, DEFAULT_FORMAT)
    }

    fn parse_all_with(dir: &Path, date_format: &str) -> Result<Vec<Post>> {
        let transform = dir.join("post.tera");
        let options = PostOptions {
            transform: &transform,
            date_format,
            params: Context::new(),
        };
        FileSet::listdir(dir.join("posts"))
            .filter_xml()
            .map(|item| make_post(item, &options, false))
            .map(|posts| posts.into_items())
    }

    #[test]
    fn test_html_basename() {
        assert_eq!(html_basename(Path::new("/posts/hello.xml")), "hello.html");
        assert_eq!(html_basename(Path::new("a.b.xml")), "a.b.html");
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags(" rust ; ;travel;"), ["rust", "travel"]);
        // NFKC folds the ligature
        assert_eq!(split_tags("ﬁsh"), ["fish"]);
        assert!(split_tags(" ; ").is_empty());
    }

    #[test]
    fn test_make_post_full() {
        let dir = setup(&[(
            "hello.xml",
            r#"<post lang="en" orig-date="2021-03-04;approx">
                 <title>Hello</title>
                 <tags>rust; travel</tags>
                 <body><p>Hi</p></body>
               </post>"#,
        )]);

        let posts = parse_all(dir.path()).unwrap();
        let post = &posts[0];
        assert_eq!(post.basename, "hello.html");
        assert_eq!(post.title, "Hello");
        assert_eq!(post.lang.as_deref(), Some("en"));
        assert_eq!(post.tags, ["rust", "travel"]);
        assert_eq!(post.orig_date, "2021-03-04;approx");
        assert_eq!(post.year.as_deref(), Some("2021"));
        assert_eq!(post.date_comment.as_deref(), Some("approx"));
        assert_eq!(post.formatted_date.as_deref(), Some("Thu, 04 Mar 2021"));
        assert_eq!(post.body, r#"<article lang="en"><p>Hi</p></article>"#);
    }

    #[test]
    fn test_make_post_unrecognized_date_is_not_fatal() {
        let dir = setup(&[(
            "a.xml",
            r#"<post orig-date="yesterday"><title>A</title><tags>x</tags></post>"#,
        )]);

        let posts = parse_all(dir.path()).unwrap();
        assert_eq!(posts[0].year, None);
        assert_eq!(posts[0].date, None);
        assert_eq!(posts[0].formatted_date, None);
        assert_eq!(posts[0].lang, None);
    }

    #[test]
    fn test_make_post_impossible_date_is_fatal() {
        let dir = setup(&[(
            "b.xml",
            r#"<post orig-date="2023-02-29"><title>B</title><tags>x</tags></post>"#,
        )]);

        let err = parse_all(dir.path()).unwrap_err();
        assert!(
            matches!(&err, Error::Parse { path, message }
                if path.ends_with("b.xml") && message.contains("2023-02-29")),
            "{err:?}"
        );
    }

    #[test]
    fn test_make_post_bad_date_format_is_an_error() {
        let dir = setup(&[(
            "a.xml",
            r#"<post orig-date="2021-03-04"><title>A</title><tags>x</tags></post>"#,
        )]);

        let err = parse_all_with(dir.path(), "%Q").unwrap_err();
        assert!(matches!(err, Error::InvalidDateFormat(f) if f == "%Q"));
    }

    #[test]
    fn test_make_post_missing_title_is_fatal() {
        let dir = setup(&[(
            "a.xml",
            r#"<post orig-date="2021-01-01"><tags>x</tags></post>"#,
        )]);
        let err = parse_all(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoMatch(q) if q == TITLE));
    }
}
