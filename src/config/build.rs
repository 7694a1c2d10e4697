//! `[build]` section configuration.
//!
//! Paths here are relative to the project root until
//! [`SiteConfig::update_with_cli`](super::SiteConfig::update_with_cli)
//! resolves them.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in folio.toml.
///
/// # Example
/// ```toml
/// [build]
/// templates = ["templates", "theme/templates"]
/// posts = "posts"
/// transform = "post.tera"
/// input = "static"
/// output = "public"
/// date_format = "%d.%m.%Y"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root; `--root` takes precedence.
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Template search path. The first directory providing a name wins;
    /// `post.html`, `tag.html` and the page templates are listed from the
    /// first one.
    #[serde(default = "defaults::build::templates")]
    #[educe(Default = defaults::build::templates())]
    pub templates: Vec<PathBuf>,

    /// Directory of XML post sources. Without it the site has no posts.
    #[serde(default)]
    pub posts: Option<PathBuf>,

    /// Static files copied as is into the output.
    #[serde(default = "defaults::build::input")]
    #[educe(Default = defaults::build::input())]
    pub input: PathBuf,

    /// Output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Transform program rendering post bodies. Required with `posts`.
    #[serde(default)]
    pub transform: Option<PathBuf>,

    /// `strftime` format of the post dates shown to templates.
    #[serde(default = "defaults::build::date_format")]
    #[educe(Default = defaults::build::date_format())]
    pub date_format: String,

    /// Template rendered once per post.
    #[serde(default = "defaults::build::post_template")]
    #[educe(Default = defaults::build::post_template())]
    pub post_template: String,

    /// Template rendered once per tag.
    #[serde(default = "defaults::build::tag_template")]
    #[educe(Default = defaults::build::tag_template())]
    pub tag_template: String,

    /// Overwrite existing output files without prompting.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = defaults::r#false())]
    pub overwrite_all: bool,

    /// Verbose processing.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = defaults::r#false())]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use std::path::PathBuf;

    #[test]
    fn test_build_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.build.templates, [PathBuf::from("templates")]);
        assert_eq!(config.build.input, PathBuf::from("static"));
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert_eq!(config.build.posts, None);
        assert_eq!(config.build.transform, None);
        assert_eq!(config.build.date_format, "%a, %d %b %Y");
        assert_eq!(config.build.post_template, "post.html");
        assert_eq!(config.build.tag_template, "tag.html");
        assert!(!config.build.overwrite_all);
        assert!(!config.build.verbose);
    }

    #[test]
    fn test_build_config_full() {
        let config = r#"
            [build]
            templates = ["site", "theme"]
            posts = "posts"
            transform = "xslt/post.tera"
            input = "assets"
            output = "out"
            date_format = "%d.%m.%Y"
            overwrite_all = true
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(
            config.build.templates,
            [PathBuf::from("site"), PathBuf::from("theme")]
        );
        assert_eq!(config.build.posts, Some(PathBuf::from("posts")));
        assert_eq!(config.build.transform, Some(PathBuf::from("xslt/post.tera")));
        assert_eq!(config.build.input, PathBuf::from("assets"));
        assert_eq!(config.build.date_format, "%d.%m.%Y");
        assert!(config.build.overwrite_all);
    }

    #[test]
    fn test_build_unknown_field_rejection() {
        let config = r#"
            [build.sitemap]
            enable = true
        "#;
        let result: Result<SiteConfig, _> = toml::from_str(config);
        assert!(result.is_err());
    }
}
