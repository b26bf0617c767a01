// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! UTF-16 code-unit indexing for message text.
//!
//! Telegram expresses entity offsets and lengths in UTF-16 code units, so a
//! character outside the Basic Multilingual Plane (most emoji) occupies two
//! positions. Every slice taken against live-format text goes through this
//! module instead of through byte or `char` indices.
//!
//! # Example
//!
//! ```
//! use tg2html::utf16::Utf16Text;
//!
//! let text = Utf16Text::new("😀 #tag");
//! assert_eq!(text.len(), 7);
//! assert_eq!(text.slice(3, 7).as_deref(), Some("#tag"));
//! ```

use once_cell::unsync::OnceCell;

/// Encodes text as UTF-16 code units.
#[must_use]
pub fn encode(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Decodes UTF-16 code units back to text.
///
/// Unpaired surrogates, which only appear when an offset splits a surrogate
/// pair, decode to U+FFFD instead of failing.
#[must_use]
pub fn decode(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

/// A borrowed message text with a lazily built code-unit view.
#[derive(Debug)]
pub struct Utf16Text<'a> {
    text: &'a str,
    units: OnceCell<Vec<u16>>,
}

impl<'a> Utf16Text<'a> {
    /// Wraps `text` without encoding it yet.
    #[must_use]
    pub const fn new(text: &'a str) -> Self {
        Self {
            text,
            units: OnceCell::new(),
        }
    }

    /// The original text.
    #[must_use]
    pub const fn as_str(&self) -> &'a str {
        self.text
    }

    /// The text as UTF-16 code units, encoded on first use.
    #[must_use]
    pub fn units(&self) -> &[u16] {
        self.units.get_or_init(|| encode(self.text))
    }

    /// Length in code units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units().len()
    }

    /// Returns `true` if the text is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Decodes the code units in `start..end`.
    ///
    /// Returns `None` when the range is inverted or extends past the end.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Option<String> {
        self.units().get(start..end).map(decode)
    }
}
