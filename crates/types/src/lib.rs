//! Validated text primitives shared across the PRS crates.
//!
//! Free text arrives from intake forms, prescription forms and CLI flags. Two shapes
//! are common enough to deserve their own types:
//!
//! - [`NonEmptyText`]: a single trimmed value that must contain something.
//! - [`TextList`]: a repeated field (diseases, allergies, medications) whose entries are
//!   trimmed and whose blank entries are dropped before anything is stored.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction, so the
/// stored value never starts or ends with whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Trims an optional form value, mapping blank input to `None`.
    ///
    /// Form fields are optional at input time; a field the user left blank is treated
    /// the same as a field that was never sent.
    pub fn optional(input: Option<impl AsRef<str>>) -> Option<Self> {
        input.and_then(|value| Self::new(value).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// An ordered list of free-text entries with blank entries removed.
///
/// Order is preserved and duplicates are kept; only surrounding whitespace and empty
/// entries are discarded. Serialises as a plain JSON/YAML sequence of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextList(Vec<NonEmptyText>);

impl TextList {
    /// Builds a list from individually entered values.
    pub fn from_entries<I, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self(
            entries
                .into_iter()
                .filter_map(|entry| NonEmptyText::new(entry).ok())
                .collect(),
        )
    }

    /// Builds a list from a single delimited string such as `"Diabetes, Hypertension,"`.
    ///
    /// Trailing and doubled delimiters do not produce empty entries.
    pub fn parse_delimited(input: &str, delimiter: char) -> Self {
        Self::from_entries(input.split(delimiter))
    }

    pub fn push(&mut self, entry: NonEmptyText) {
        self.0.push(entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NonEmptyText> {
        self.0.iter()
    }

    /// Returns the entries as owned strings, in order.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|t| t.as_str().to_owned()).collect()
    }
}

impl Serialize for TextList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TextList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Stored lists written before cleaning was enforced may still hold blanks.
        let raw = Vec::<String>::deserialize(deserializer)?;
        Ok(TextList::from_entries(raw))
    }
}
