// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Hashtag normalization and extraction.
//!
//! [`correct_tag_value`] is the single source of truth for turning a raw
//! `#token` into the identifier used both for `?tag=` filter links in
//! rendered HTML and for the tag index built by [`extract_tags`]. Keeping one
//! implementation guarantees that link targets and index keys agree.
//!
//! # Example
//!
//! ```
//! use tg2html::tags::correct_tag_value;
//!
//! assert_eq!(correct_tag_value("#world!").unwrap().as_str(), "world");
//! assert!(correct_tag_value("world").is_err());
//! ```

use crate::history::HistoryText;
use crate::parser::{EntityKind, HistoryMessage, LiveEntity, LiveMessage, Message};
use crate::utf16::Utf16Text;
use once_cell::sync::Lazy;
use regex::Regex;
use snafu::prelude::*;
use std::fmt;
use tracing::debug;

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[A-Za-z0-9_]+").expect("valid hashtag regex"));

/// Error type for hashtag normalization failures.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum TagError {
    /// The raw token does not start with `#`.
    #[snafu(display("tag value must start with #: {raw:?}"))]
    InvalidTag {
        /// The rejected token.
        raw: String,
    },

    /// No word characters follow the leading `#`.
    #[snafu(display("tag value is empty: {raw:?}"))]
    EmptyTag {
        /// The rejected token.
        raw: String,
    },
}

/// A normalized hashtag: non-empty, ASCII word characters only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagValue(String);

impl TagValue {
    /// The identifier without the leading `#`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the tag, returning the identifier.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TagValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extracts the canonical identifier from a raw hashtag token.
///
/// The longest leading run of `#` followed by `[A-Za-z0-9_]` is kept and the
/// `#` is dropped, so `#a1_b-c` yields `a1_b`.
///
/// # Errors
///
/// Returns [`TagError::InvalidTag`] if `raw` does not start with `#`, and
/// [`TagError::EmptyTag`] if no word characters follow it.
pub fn correct_tag_value(raw: &str) -> Result<TagValue, TagError> {
    ensure!(raw.starts_with('#'), InvalidTagSnafu { raw });

    let value = TAG_RE
        .find(raw)
        .map(|m| m.as_str().trim_start_matches('#'))
        .unwrap_or_default();

    ensure!(!value.is_empty(), EmptyTagSnafu { raw });

    Ok(TagValue(value.to_owned()))
}

/// Collects the normalized hashtags of a message, in message order.
///
/// Hashtags that fail normalization are skipped. Duplicates are kept.
#[must_use]
pub fn extract_tags(message: &Message) -> Vec<TagValue> {
    match message {
        Message::Live(live) => live_tags(live),
        Message::History(history) => history_tags(history),
    }
}

fn live_tags(message: &LiveMessage) -> Vec<TagValue> {
    let (text, entities) = message.annotated_text();
    let text = Utf16Text::new(text);

    entities
        .iter()
        .filter(|entity| entity.kind == EntityKind::Hashtag)
        .filter_map(|entity| captured_text(&text, entity))
        .filter_map(|raw| normalize_logged(&raw))
        .collect()
}

fn history_tags(message: &HistoryMessage) -> Vec<TagValue> {
    if message.text.is_empty() {
        return message
            .text_entities
            .iter()
            .filter(|entity| entity.kind == EntityKind::Hashtag)
            .filter_map(|entity| normalize_logged(&entity.text))
            .collect();
    }

    match &message.text {
        HistoryText::Plain(_) => Vec::new(),
        HistoryText::Segments(segments) => segments
            .iter()
            .filter(|segment| segment.kind == EntityKind::Hashtag)
            .filter_map(|segment| normalize_logged(&segment.text))
            .collect(),
    }
}

fn captured_text(text: &Utf16Text<'_>, entity: &LiveEntity) -> Option<String> {
    let end = entity.offset.checked_add(entity.length)?;
    text.slice(entity.offset, end)
}

fn normalize_logged(raw: &str) -> Option<TagValue> {
    correct_tag_value(raw)
        .inspect_err(|err| debug!(%err, "skipping hashtag"))
        .ok()
}
