//! Command-line interface definitions.
//!
//! Every option overrides the matching `folio.toml` field.

use clap::Parser;
use std::path::PathBuf;

/// Generates a complete blog from XML posts and HTML templates.
///
/// Each post results in `output-dir/post/<name>.html`, each tag in
/// `output-dir/tag/<name>.html`. The templates `post.html` and `tag.html`
/// must be present; every other HTML template is rendered once at the
/// output root. Contents of input-dir are copied as is to output-dir.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about)]
pub struct Cli {
    /// Input directory with static files: images, CSS...
    #[arg(value_name = "input-dir")]
    pub input_dir: Option<PathBuf>,

    /// Output directory
    #[arg(value_name = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// HTML template directory; repeat to build a search path, first wins
    #[arg(long, value_name = "DIR")]
    pub html: Vec<PathBuf>,

    /// XML post input directory
    #[arg(long, value_name = "DIR")]
    pub post: Option<PathBuf>,

    /// Transform program rendering post bodies
    #[arg(long, value_name = "FILE")]
    pub transform: Option<PathBuf>,

    /// Verbose processing
    #[arg(short, long)]
    pub verbose: bool,

    /// Overwrite all files without prompting (batch mode)
    #[arg(long)]
    pub overwrite_all: bool,

    /// Project root; relative paths are resolved against it
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: folio.toml)
    #[arg(short = 'C', long, default_value = "folio.toml")]
    pub config: PathBuf,
}
