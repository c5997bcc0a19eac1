//! Public order code.
//!
//! Orders are looked up everywhere outside the system by a short numeric code that patients can
//! read out or type in (`98765`, shown to them as `ORD-98765`).
//!
//! ## Canonical form
//! - Length: 5
//! - Characters: ASCII `0-9` only
//!
//! Freshly generated codes come from [`OrderCode::from_number`], which only accepts values in
//! `10000..=99999`, so generated codes never start with `0`.
//!
//! ## Sharded layout
//! File-backed stores place order `c` under `parent_dir/<c[0..2]>/<c>.json`, keeping any one
//! directory to at most a thousand entries.

use crate::TextError;
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Number of digits in an order code.
pub const ORDER_CODE_LEN: usize = 5;

/// A validated 5-digit order code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderCode(String);

impl OrderCode {
    /// Smallest value a generated code may take.
    pub const MIN: u32 = 10_000;
    /// Largest value a generated code may take.
    pub const MAX: u32 = 99_999;

    /// Builds a code from a number in `MIN..=MAX`.
    ///
    /// Returns `None` for values outside the range.
    pub fn from_number(value: u32) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then(|| Self(value.to_string()))
    }

    /// Validates a code supplied from outside the core (URL path, CLI argument).
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidOrderCode`] if `input` is not exactly five ASCII digits.
    pub fn parse(input: &str) -> Result<Self, TextError> {
        if Self::is_canonical(input) {
            return Ok(Self(input.to_owned()));
        }
        Err(TextError::InvalidOrderCode(input.to_owned()))
    }

    /// Returns true if `input` is five ASCII digits.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == ORDER_CODE_LEN && input.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `parent_dir/<first two digits>/<code>.json`.
    pub fn sharded_file(&self, parent_dir: &Path) -> PathBuf {
        parent_dir
            .join(&self.0[0..2])
            .join(format!("{}.json", self.0))
    }
}

impl fmt::Display for OrderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrderCode {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderCode::parse(s)
    }
}

impl serde::Serialize for OrderCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for OrderCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OrderCode::parse(&s).map_err(serde::de::Error::custom)
    }
}
