//! Blog records built by the pipeline: posts and the tags grouping them.

mod post;
mod tag;

pub use post::{Post, PostOptions, html_basename, make_post, split_tags};
pub use tag::{Tag, group_tags, tag_filename};
