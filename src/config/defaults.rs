//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [site] Section Defaults
// ============================================================================

pub mod site {
    pub fn language() -> String {
        "en".into()
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    use crate::utils::date::DEFAULT_FORMAT;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn templates() -> Vec<PathBuf> {
        vec!["templates".into()]
    }

    pub fn input() -> PathBuf {
        "static".into()
    }

    pub fn output() -> PathBuf {
        "public".into()
    }

    pub fn date_format() -> String {
        DEFAULT_FORMAT.into()
    }

    pub fn post_template() -> String {
        "post.html".into()
    }

    pub fn tag_template() -> String {
        "tag.html".into()
    }
}
