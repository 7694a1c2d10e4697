//! String normalization and id generation.
//!
//! `string2id` is the helper every template gets for turning display strings
//! (tag names, titles) into file-name-safe ids.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static DASH_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Digits of [`int2str`], without `I` and `O`.
pub const DIGITS: &str = "0123456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// German letters folded before normalization, so `ä` becomes `ae` rather than `a`.
const GERMAN_FOLDS: &[(char, &str)] = &[
    ('\u{1E9E}', "SS"),
    ('\u{00DF}', "ss"),
    ('\u{00C4}', "AE"),
    ('\u{00E4}', "ae"),
    ('\u{00D6}', "OE"),
    ('\u{00F6}', "oe"),
    ('\u{00DC}', "UE"),
    ('\u{00FC}', "ue"),
];

/// Apply Unicode normalization.
///
/// With `allow_nonascii` the string is NFKC-normalized; otherwise it is
/// NFKD-decomposed and every non-ASCII character is dropped.
pub fn normalize(s: &str, allow_nonascii: bool) -> String {
    if allow_nonascii {
        s.nfkc().collect()
    } else {
        s.nfkd().filter(char::is_ascii).collect()
    }
}

/// Convert an arbitrary string to a friendly, deterministic id.
///
/// German letters are folded, the rest is reduced to ASCII by [`normalize`],
/// non-word characters are removed and whitespace/dash runs collapse into a
/// single `-`. Letters without an ASCII decomposition (`ł`) are dropped.
pub fn string2id(s: &str) -> String {
    to_id(s, false)
}

/// [`string2id`] with control over non-ASCII handling.
pub fn to_id(s: &str, allow_nonascii: bool) -> String {
    let mut folded = String::with_capacity(s.len());
    for c in s.chars() {
        match GERMAN_FOLDS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => folded.push_str(to),
            None => folded.push(c),
        }
    }

    let normalized = normalize(&folded, allow_nonascii);
    let stripped = NON_WORD.replace_all(&normalized, "");
    DASH_RUNS.replace_all(stripped.trim(), "-").into_owned()
}

/// Format `k` in `base`, zero-padding the digits to `min_length`.
///
/// Zero is always the single digit `0`. Returns `None` when `base` is
/// outside `2..=34`.
pub fn int2str(k: i64, base: u32, min_length: usize) -> Option<String> {
    let digits = DIGITS.as_bytes();
    if base < 2 || base as usize > digits.len() {
        return None;
    }
    if k == 0 {
        return Some(char::from(digits[0]).to_string());
    }

    let mut n = k.unsigned_abs();
    let mut res = Vec::new();
    while n > 0 {
        res.push(digits[(n % u64::from(base)) as usize]);
        n /= u64::from(base);
    }
    while res.len() < min_length {
        res.push(digits[0]);
    }
    if k < 0 {
        res.push(b'-');
    }
    res.reverse();
    Some(String::from_utf8_lossy(&res).into_owned())
}
