//! In-memory collections produced by pipeline transformations.
//!
//! Transformations never mutate their receiver: each one returns a new
//! collection whose provenance node points back at the receiver. The single
//! exception is [`DictionaryCollection::merge_with`], which folds another
//! dictionary into the receiver in place so that an open-ended sequence of
//! sources can be accumulated.
//!
//! # Pipeline shape
//!
//! ```text
//! FileSet ──map──► ListCollection<Post>
//!                        │
//!                        └──reverse_dict──► DictionaryCollection<tag, Vec<Post>>
//!                                                  │
//!                                                  ├──map_values_with_keys──► <tag, Tag>
//!                                                  ├──map_keys_with_values──► <filename, Tag>
//!                                                  └──values──► ListCollection<Tag>
//! ```

mod dict;
mod list;

pub use dict::DictionaryCollection;
pub use list::ListCollection;
