//! Post date parsing and formatting.
//!
//! Posts carry their creation date as text: `YYYY-MM-DD`, optionally followed
//! by `;` and a free-form comment (`2021-03-04;approximately`).

use anyhow::{Result, bail};
use chrono::{
    NaiveDate,
    format::{Item, StrftimeItems},
};
use regex::Regex;
use std::{fmt::Write, sync::LazyLock};

use crate::error::Error;

/// Default `strftime` format for post dates: `Thu, 04 Mar 2021`
pub const DEFAULT_FORMAT: &str = "%a, %d %b %Y";

static ORIG_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})(?:;(.*))?$").unwrap()
});

/// Components of a post date as written by the author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrigDate {
    pub year: String,
    pub month: String,
    pub day: String,
    pub comment: Option<String>,
    /// `None` when the components do not name a real calendar day.
    pub date: Option<NaiveDate>,
}

impl OrigDate {
    /// Split date text into its components.
    ///
    /// Returns `None` when the text does not have the `YYYY-MM-DD[;comment]` shape.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = ORIG_DATE.captures(text)?;
        let year = caps[1].to_owned();
        let month = caps[2].to_owned();
        let day = caps[3].to_owned();
        let comment = caps.get(4).map(|m| m.as_str().to_owned());

        let date = match (year.parse::<i32>(), month.parse::<u32>(), day.parse::<u32>()) {
            (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
            _ => None,
        };

        Some(Self {
            year,
            month,
            day,
            comment,
            date,
        })
    }
}

/// Check that a `strftime` format string has no invalid specifiers.
pub fn validate_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        bail!("invalid date format: {format}");
    }
    Ok(())
}

/// Format a date, failing on an invalid `strftime` specifier.
pub fn format_date(date: NaiveDate, format: &str) -> Result<String, Error> {
    let mut out = String::new();
    write!(out, "{}", date.format(format))
        .map_err(|_| Error::InvalidDateFormat(format.to_owned()))?;
    Ok(out)
}
