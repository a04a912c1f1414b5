//! Load-time error taxonomy.
//!
//! Every variant is terminal for the whole load: there is no degraded trace.

use std::fmt;
use std::path::PathBuf;

/// One of the consecutive sections of a trace file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    /// Variable-name string table.
    Variables,
    /// Scope-name string table.
    Scopes,
    /// Event/command/arc section.
    Events,
    /// Optional script/resource string table.
    Scripts,
    /// Optional memory-value string table.
    Values,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Variables => "variable table",
            Self::Scopes => "scope table",
            Self::Events => "event section",
            Self::Scripts => "script table",
            Self::Values => "value table",
        };
        f.write_str(s)
    }
}

/// Coarse classification of a [`TraceError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file or stream could not be reached.
    Open,
    /// A required section failed structural decoding.
    Read,
    /// A value lies outside its enumeration, or scopes do not nest.
    Parse,
}

/// Failure to load a trace.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// File or stream unreachable.
    #[error("cannot open trace {}: {source}", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Truncated input or malformed length prefix.
    #[error("failed to read {section}: {reason}")]
    Read {
        /// Section being decoded.
        section: Section,
        /// What went wrong.
        reason: String,
    },

    /// Value outside its defined enumeration or invalid scope nesting.
    #[error("malformed {section}: {reason}")]
    Parse {
        /// Section being decoded.
        section: Section,
        /// What went wrong.
        reason: String,
    },
}

impl TraceError {
    /// Shorthand for a [`TraceError::Read`].
    pub fn read(section: Section, reason: impl Into<String>) -> Self {
        Self::Read {
            section,
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`TraceError::Parse`].
    pub fn parse(section: Section, reason: impl Into<String>) -> Self {
        Self::Parse {
            section,
            reason: reason.into(),
        }
    }

    /// Taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Open { .. } => ErrorKind::Open,
            Self::Read { .. } => ErrorKind::Read,
            Self::Parse { .. } => ErrorKind::Parse,
        }
    }

    /// Section that failed, if the error came from decoding.
    #[must_use]
    pub const fn section(&self) -> Option<Section> {
        match self {
            Self::Open { .. } => None,
            Self::Read { section, .. } | Self::Parse { section, .. } => Some(*section),
        }
    }
}

/// Result alias for trace loading.
pub type TraceResult<T> = Result<T, TraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_section_follow_variant() {
        let e = TraceError::read(Section::Variables, "truncated length prefix");
        assert_eq!(e.kind(), ErrorKind::Read);
        assert_eq!(e.section(), Some(Section::Variables));
        assert_eq!(
            e.to_string(),
            "failed to read variable table: truncated length prefix"
        );

        let e = TraceError::parse(Section::Events, "unknown command tag 9");
        assert_eq!(e.kind(), ErrorKind::Parse);

        let e = TraceError::Open {
            path: "missing.log".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(e.kind(), ErrorKind::Open);
        assert_eq!(e.section(), None);
    }
}
