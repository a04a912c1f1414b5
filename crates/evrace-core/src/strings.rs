//! Interned string tables with stable integer ids.
//!
//! A trace carries four independent tables, each with its own id space. Tables
//! are append-only while a section is being decoded and immutable afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendering used for ids that resolve to nothing.
pub const UNKNOWN: &str = "(unknown)";

/// Which of the four string tables a lookup targets.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Variable names (`ReadMemory` / `WriteMemory` locations).
    Variables,
    /// Scope names (`EnterScope` locations).
    Scopes,
    /// Script/resource identifiers.
    Scripts,
    /// Serialized memory values (`MemoryValue` locations).
    Values,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Variables => "variables",
            Self::Scopes => "scopes",
            Self::Scripts => "scripts",
            Self::Values => "values",
        };
        f.write_str(s)
    }
}

/// Id → string mapping, populated in stream order.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    /// Empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            strings: Vec::new(),
        }
    }

    /// Append a string and return its id.
    pub fn push(&mut self, s: impl Into<String>) -> u32 {
        let id = self.strings.len() as u32;
        self.strings.push(s.into());
        id
    }

    /// Resolve an id. `None` for ids never written.
    #[inline]
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }

    /// Resolve a raw wire location; `-1` and other negatives are `None`.
    #[inline]
    #[must_use]
    pub fn get_raw(&self, location: i32) -> Option<&str> {
        u32::try_from(location).ok().and_then(|id| self.get(id))
    }

    /// Number of populated ids.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the table holds no strings.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Strings in id order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.strings.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for StringTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            strings: iter.into_iter().map(Into::into).collect(),
        }
    }
}
