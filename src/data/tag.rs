//! Tags and the post-to-tag grouping.

use serde::Serialize;

use super::Post;
use crate::{collection::ListCollection, utils::text::string2id};

/// One tag page: the display value and every post carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    /// Output file name below `tag/`.
    pub filename: String,
    /// Normalized display string.
    pub value: String,
    pub posts: Vec<Post>,
}

impl Tag {
    pub fn new(value: &str, posts: Vec<Post>) -> Self {
        Self {
            filename: tag_filename(value),
            value: value.to_owned(),
            posts,
        }
    }

    /// Combine two tags sharing a file name; `self` keeps its value and
    /// its posts come first.
    pub fn merge(mut self, other: Tag) -> Tag {
        self.posts.extend(other.posts);
        self
    }
}

/// `string2id(value)` with an `.html` suffix; `-` stands in for an empty id.
pub fn tag_filename(value: &str) -> String {
    let id = string2id(value);
    if id.is_empty() {
        "-.html".to_owned()
    } else {
        format!("{id}.html")
    }
}

/// Group posts by tag, merging tags whose file names collide.
pub fn group_tags(posts: &ListCollection<Post>) -> ListCollection<Tag> {
    posts
        .reverse_dict(|post| post.tags.clone())
        .map_values_with_keys(|tag, posts| Tag::new(tag, posts.clone()))
        .map_keys_with_values(|_, tag| tag.filename.clone(), Tag::merge, true)
        .values()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(basename: &str, tags: &[&str]) -> Post {
        Post {
            basename: basename.to_owned(),
            title: basename.to_owned(),
            orig_date: "2021-01-01".to_owned(),
            year: None,
            month: None,
            day: None,
            date_comment: None,
            formatted_date: None,
            date: None,
            lang: None,
            body: String::new(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    fn basenames(tag: &Tag) -> Vec<&str> {
        tag.posts.iter().map(|p| p.basename.as_str()).collect()
    }

    #[test]
    fn test_tag_filename() {
        assert_eq!(tag_filename("Rust"), "Rust.html");
        assert_eq!(tag_filename("Straße & more"), "Strasse-more.html");
        assert_eq!(tag_filename("???"), "-.html");
    }

    #[test]
    fn test_group_tags() {
        let posts = ListCollection::new([post("a.html", &["x", "y"]), post("b.html", &["y"])]);
        let tags = group_tags(&posts);

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].value, "x");
        assert_eq!(basenames(&tags[0]), ["a.html"]);
        assert_eq!(tags[1].filename, "y.html");
        assert_eq!(basenames(&tags[1]), ["a.html", "b.html"]);
    }

    #[test]
    fn test_colliding_filenames_merge() {
        // both spellings map to C.html
        let posts = ListCollection::new([post("a.html", &["C++"]), post("b.html", &["C#"])]);
        let tags = group_tags(&posts);

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].value, "C++");
        assert_eq!(basenames(&tags[0]), ["a.html", "b.html"]);
    }
}
