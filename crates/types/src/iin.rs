//! Patient national identifier (IIN).

use crate::TextError;
use std::{fmt, str::FromStr};

/// Number of characters in an IIN.
pub const IIN_LEN: usize = 12;

/// A patient's individual identification number.
///
/// The value is opaque: it is never parsed as a number, so leading zeros survive and no checksum
/// is applied. The only guarantee is the fixed length of [`IIN_LEN`] characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iin(String);

impl Iin {
    /// Validates and wraps an IIN exactly as supplied (no trimming).
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidIin`] with the observed length if the input is not exactly
    /// [`IIN_LEN`] characters long.
    pub fn parse(input: &str) -> Result<Self, TextError> {
        let len = input.chars().count();
        if len != IIN_LEN {
            return Err(TextError::InvalidIin(len));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Iin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Iin {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Iin::parse(s)
    }
}

impl serde::Serialize for Iin {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Iin {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Iin::parse(&s).map_err(serde::de::Error::custom)
    }
}
