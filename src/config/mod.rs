//! Site configuration management for `folio.toml`.
//!
//! The file is optional: every field has a default and the command line
//! overrides what the file says.
//!
//! # Sections
//!
//! | Section     | Purpose                                         |
//! |-------------|-------------------------------------------------|
//! | `[site]`    | Site metadata (title, language)                 |
//! | `[build]`   | Templates, posts, transform, input and output   |
//! | `[extra]`   | User-defined fields passed to every template    |
//!
//! # Example
//!
//! ```toml
//! [site]
//! title = "Travel notes"
//!
//! [build]
//! templates = ["templates"]
//! posts = "posts"
//! transform = "post.tera"
//!
//! [extra]
//! author = "Jan"
//! ```

mod build;
pub mod defaults;
mod error;
mod site;

pub use build::BuildConfig;
pub use error::ConfigError;
pub use site::SiteSection;

use crate::{cli::Cli, utils::date::validate_format};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing folio.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Site metadata
    #[serde(default)]
    pub site: SiteSection,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// User-defined extra fields
    #[serde(default)]
    pub extra: HashMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        if !cli.html.is_empty() {
            self.build.templates = cli.html.clone();
        }
        Self::update_some(&mut self.build.posts, cli.post.as_ref());
        Self::update_some(&mut self.build.transform, cli.transform.as_ref());
        Self::update_option(&mut self.build.input, cli.input_dir.as_ref());
        Self::update_option(&mut self.build.output, cli.output_dir.as_ref());

        self.build.verbose |= cli.verbose;
        self.build.overwrite_all |= cli.overwrite_all;

        self.update_path_with_root(&root, &cli.config);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Update an optional config value if CLI value is provided
    fn update_some<T: Clone>(config_option: &mut Option<T>, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = Some(option.clone());
        }
    }

    /// Resolve all paths against the root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, root: &Path, config: &Path) {
        let root = Self::normalize_path(root);
        self.set_root(&root);

        self.config_path = Self::resolve(&root, config);

        self.build.templates = self
            .build
            .templates
            .iter()
            .map(|dir| Self::resolve(&root, dir))
            .collect();
        self.build.input = Self::resolve(&root, &self.build.input);
        self.build.output = Self::resolve(&root, &self.build.output);
        self.build.posts = self.build.posts.as_ref().map(|dir| Self::resolve(&root, dir));
        self.build.transform = self
            .build
            .transform
            .as_ref()
            .map(|file| Self::resolve(&root, file));
    }

    /// Expand `~` and join relative paths onto `root`
    fn resolve(root: &Path, path: &Path) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
        if expanded.is_relative() {
            Self::normalize_path(&root.join(expanded))
        } else {
            Self::normalize_path(&expanded)
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate the resolved configuration before a build
    pub fn validate(&self) -> Result<()> {
        if self.build.templates.is_empty() {
            bail!(ConfigError::Validation(
                "[build.templates] must have at least one element".into()
            ));
        }
        for dir in &self.build.templates {
            Self::check_dir("[build.templates]", dir)?;
        }

        Self::check_dir("[build.input]", &self.build.input)?;

        if let Some(posts) = &self.build.posts {
            Self::check_dir("[build.posts]", posts)?;

            match &self.build.transform {
                None => bail!(ConfigError::Validation(
                    "[build.posts] requires [build.transform] to be set".into()
                )),
                Some(path) if !path.is_file() => bail!(ConfigError::Validation(format!(
                    "[build.transform] not found: {}",
                    path.display()
                ))),
                _ => {}
            }
        }

        if let Err(err) = validate_format(&self.build.date_format) {
            bail!(ConfigError::Validation(format!("[build.date_format]: {err}")));
        }

        Ok(())
    }

    fn check_dir(field: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            bail!(ConfigError::Validation(format!(
                "{field} not found: {}",
                path.display()
            )));
        }
        if !path.is_dir() {
            bail!(ConfigError::Validation(format!(
                "{field} is not a directory: {}",
                path.display()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("folio").chain(args.iter().copied()))
    }

    /// A root with `templates/` and `static/`, the default layout.
    fn site_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("templates")).unwrap();
        fs::create_dir(dir.path().join("static")).unwrap();
        dir
    }

    fn resolved(toml: &str, root: &Path, args: &[&str]) -> SiteConfig {
        let mut config = SiteConfig::from_str(toml).unwrap();
        let root = root.to_string_lossy().into_owned();
        let mut full = vec!["--root", root.as_str()];
        full.extend_from_slice(args);
        config.update_with_cli(&cli(&full));
        config
    }

    #[test]
    fn test_extra_fields() {
        let config = SiteConfig::from_str(
            r#"
            [extra]
            author = "Jan"
            links = ["a", "b"]
        "#,
        )
        .unwrap();

        assert_eq!(config.extra.get("author").and_then(|v| v.as_str()), Some("Jan"));
        assert!(config.extra.get("links").is_some_and(|v| v.is_array()));
    }

    #[test]
    fn test_unknown_section_rejection() {
        assert!(SiteConfig::from_str("[serve]\nport = 1").is_err());
    }

    #[test]
    fn test_from_path_missing() {
        let err = SiteConfig::from_path(Path::new("/nonexistent/folio.toml")).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_paths_resolved_against_root() {
        let root = site_root();
        let config = resolved("[build]\nposts = \"posts\"", root.path(), &[]);
        let root = root.path().canonicalize().unwrap();

        assert_eq!(config.get_root(), root);
        assert_eq!(config.config_path, root.join("folio.toml"));
        assert_eq!(config.build.templates, [root.join("templates")]);
        assert_eq!(config.build.input, root.join("static"));
        assert_eq!(config.build.output, root.join("public"));
        assert_eq!(config.build.posts, Some(root.join("posts")));
    }

    #[test]
    fn test_cli_overrides() {
        let root = site_root();
        let config = resolved(
            "[build]\ntemplates = [\"ignored\"]\nposts = \"posts\"",
            root.path(),
            &[
                "--html", "site", "--html", "theme", "--post", "blog", "--transform", "t.tera",
                "--verbose", "--overwrite-all", "in", "out",
            ],
        );
        let root = root.path().canonicalize().unwrap();

        assert_eq!(config.build.templates, [root.join("site"), root.join("theme")]);
        assert_eq!(config.build.posts, Some(root.join("blog")));
        assert_eq!(config.build.transform, Some(root.join("t.tera")));
        assert_eq!(config.build.input, root.join("in"));
        assert_eq!(config.build.output, root.join("out"));
        assert!(config.build.verbose);
        assert!(config.build.overwrite_all);
    }

    #[test]
    fn test_absolute_paths_kept() {
        let root = site_root();
        let other = TempDir::new().unwrap();
        let other_path = other.path().to_string_lossy().into_owned();
        let config = resolved("", root.path(), &["--html", other_path.as_str()]);

        assert_eq!(config.build.templates, [other.path().canonicalize().unwrap()]);
    }

    #[test]
    fn test_validate_defaults() {
        let root = site_root();
        let config = resolved("", root.path(), &[]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_template_dir() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("static")).unwrap();
        let config = resolved("", root.path(), &[]);

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("[build.templates]"));
    }

    #[test]
    fn test_validate_posts_require_transform() {
        let root = site_root();
        fs::create_dir(root.path().join("posts")).unwrap();

        let config = resolved("[build]\nposts = \"posts\"", root.path(), &[]);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("[build.transform]"));

        let config = resolved(
            "[build]\nposts = \"posts\"\ntransform = \"missing.tera\"",
            root.path(),
            &[],
        );
        assert!(config.validate().is_err());

        fs::write(root.path().join("post.tera"), "").unwrap();
        let config = resolved(
            "[build]\nposts = \"posts\"\ntransform = \"post.tera\"",
            root.path(),
            &[],
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_date_format() {
        let root = site_root();
        let config = resolved("[build]\ndate_format = \"%Q\"", root.path(), &[]);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("[build.date_format]"));
    }
}
