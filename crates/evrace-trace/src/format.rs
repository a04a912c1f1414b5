// crates/evrace-trace/src/format.rs

//! Binary trace layout shared by the decoder and encoder.
//!
//! A trace file is four or six consecutive sections, every integer a 32-bit
//! little-endian two's complement value:
//!
//! ```text
//! variables   : count, count × (len, bytes[len])
//! scopes      : count, count × (len, bytes[len])
//! events      : event_count,
//!               event_count × (type, command_count, command_count × (kind, location)),
//!               arc_count, arc_count × (tail, head, duration)
//! -- end of stream allowed here --
//! scripts     : count, count × (len, bytes[len])      (optional)
//! values      : count, count × (len, bytes[len])      (optional)
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use evrace_core::Section;

/// Width in bytes of every integer field.
pub const WORD: usize = 4;

/// Upper bound on up-front allocation driven by an untrusted count.
///
/// Larger counts still decode; storage just grows as items arrive.
pub const MAX_PREALLOC: usize = 1 << 16;

/// Sections in stream order.
pub const SECTION_ORDER: [Section; 5] = [
    Section::Variables,
    Section::Scopes,
    Section::Events,
    Section::Scripts,
    Section::Values,
];

/// Whether a section may be missing because the stream ended before it.
#[inline]
#[must_use]
pub const fn is_optional(section: Section) -> bool {
    matches!(section, Section::Scripts | Section::Values)
}

/// Capacity to reserve for `count` untrusted items.
#[inline]
#[must_use]
pub fn prealloc(count: usize) -> usize {
    count.min(MAX_PREALLOC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_trailing_tables_are_optional() {
        let optional: Vec<_> = SECTION_ORDER
            .iter()
            .copied()
            .filter(|s| is_optional(*s))
            .collect();
        assert_eq!(optional, vec![Section::Scripts, Section::Values]);
    }

    #[test]
    fn prealloc_is_capped() {
        assert_eq!(prealloc(3), 3);
        assert_eq!(prealloc(usize::MAX), MAX_PREALLOC);
    }
}
