// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! The `text` field of a Telegram history export message.
//!
//! In `result.json` this field is a bare string when the message carries no
//! formatting, and an array mixing bare strings with typed objects when it
//! does:
//!
//! ```json
//! "text": ["Read ", {"type": "text_link", "text": "this", "href": "https://t.me"}, "!"]
//! ```
//!
//! [`HistoryText`] models the two shapes as an enum with hand-written serde
//! impls. Decoding is lenient at the element level: one malformed element is
//! skipped with a warning instead of failing the whole message.
//!
//! # Example
//!
//! ```
//! use tg2html::history::HistoryText;
//! use tg2html::parser::EntityKind;
//!
//! let text: HistoryText = serde_json::from_str(r#"[{"type": "bold", "text": "x"}, "y"]"#).unwrap();
//! let segments = text.segments();
//! assert_eq!(segments.len(), 2);
//! assert_eq!(segments[0].kind, EntityKind::Bold);
//! assert_eq!(segments[1].kind, EntityKind::Plain);
//! ```

use crate::parser::EntityKind;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use snafu::prelude::*;
use std::borrow::Cow;
use tracing::warn;

/// Failure to classify the whole `text` value.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum DecodeError {
    /// The value is neither a string nor an array.
    #[snafu(display("history text must be a string or an array, found {found}"))]
    UnsupportedShape {
        /// JSON type name of the rejected value.
        found: &'static str,
    },
}

/// A single array element that could not be turned into a [`Segment`].
///
/// These are recorded and skipped; they never fail the surrounding decode.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum SegmentError {
    /// A non-link object has no string `text`.
    #[snafu(display("segment {index} ({kind}) has no text"))]
    MissingText {
        /// Position in the source array.
        index: usize,
        /// Declared segment type.
        kind: String,
    },

    /// A `text_link` object has no usable `href`.
    #[snafu(display("segment {index} (text_link) has no href"))]
    MissingHref {
        /// Position in the source array.
        index: usize,
    },

    /// The element is neither a string nor an object.
    #[snafu(display("segment {index} is a JSON {found}, expected string or object"))]
    UnsupportedElement {
        /// Position in the source array.
        index: usize,
        /// JSON type name of the element.
        found: &'static str,
    },
}

/// One typed, already-ordered chunk of a history message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Segment type.
    pub kind: EntityKind,
    /// Visible text.
    pub text: String,
    /// Link target, present on `text_link` segments.
    pub href: Option<String>,
    /// Attached document reference, when the export provides one.
    pub document_id: Option<String>,
}

impl Segment {
    /// A `plain` segment holding `text`.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(EntityKind::Plain, text)
    }

    /// A segment of the given kind with no link or document.
    #[must_use]
    pub fn new(kind: EntityKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            href: None,
            document_id: None,
        }
    }
}

/// The `text` field: a bare string or an ordered list of segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryText {
    /// Unformatted text.
    Plain(String),
    /// Formatted text, one entry per export array element.
    Segments(Vec<Segment>),
}

impl Default for HistoryText {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

impl HistoryText {
    /// The text as segments; a [`HistoryText::Plain`] value yields one
    /// `plain` segment.
    #[must_use]
    pub fn segments(&self) -> Cow<'_, [Segment]> {
        match self {
            Self::Plain(text) => Cow::Owned(vec![Segment::plain(text.as_str())]),
            Self::Segments(segments) => Cow::Borrowed(segments),
        }
    }

    /// Returns `true` if there is no visible text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Plain(text) => text.is_empty(),
            Self::Segments(segments) => segments.iter().all(|s| s.text.is_empty()),
        }
    }

    /// Concatenation of all segment texts, without markup.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Segments(segments) => segments.iter().map(|s| s.text.as_str()).collect(),
        }
    }
}

/// Result of [`decode`]: the decoded text and the elements that were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded text.
    pub text: HistoryText,
    /// One entry per array element that could not be decoded.
    pub skipped: Vec<SegmentError>,
}

/// Typed form of a well-formed segment object.
#[derive(Deserialize)]
struct SegmentRecord {
    #[serde(rename = "type")]
    kind: EntityKind,
    text: String,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    document_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawElement {
    Plain(String),
    Record(SegmentRecord),
    Other(Value),
}

/// Decodes a raw `text` value.
///
/// A JSON `null` is treated like an absent field and decodes to empty text.
///
/// # Errors
///
/// Returns [`DecodeError::UnsupportedShape`] when `value` is neither a
/// string, an array, nor `null`. Problems with individual array elements are
/// reported in [`Decoded::skipped`] instead.
pub fn decode(value: Value) -> Result<Decoded, DecodeError> {
    let items = match value {
        Value::String(text) => {
            return Ok(Decoded {
                text: HistoryText::Plain(text),
                skipped: Vec::new(),
            });
        }
        Value::Null => {
            return Ok(Decoded {
                text: HistoryText::default(),
                skipped: Vec::new(),
            });
        }
        Value::Array(items) => items,
        other => {
            return UnsupportedShapeSnafu {
                found: json_type(&other),
            }
            .fail();
        }
    };

    let mut segments = Vec::with_capacity(items.len());
    let mut skipped = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let element = serde_json::from_value(item).unwrap_or(RawElement::Other(Value::Null));
        let segment = match element {
            RawElement::Plain(text) => Ok(Segment::plain(text)),
            RawElement::Record(record) => segment_from_record(index, record),
            RawElement::Other(value) => segment_from_value(index, &value),
        };
        match segment {
            Ok(segment) => segments.push(segment),
            Err(err) => skipped.push(err),
        }
    }

    Ok(Decoded {
        text: HistoryText::Segments(segments),
        skipped,
    })
}

fn segment_from_record(index: usize, record: SegmentRecord) -> Result<Segment, SegmentError> {
    let href = record.href.filter(|href| !href.is_empty());
    ensure!(
        record.kind != EntityKind::TextLink || href.is_some(),
        MissingHrefSnafu { index }
    );

    Ok(Segment {
        kind: record.kind,
        text: record.text,
        href,
        document_id: record.document_id.filter(|id| !id.is_empty()),
    })
}

/// Inspects an element that did not match the typed record shape.
fn segment_from_value(index: usize, value: &Value) -> Result<Segment, SegmentError> {
    let object = value.as_object().context(UnsupportedElementSnafu {
        index,
        found: json_type(value),
    })?;

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .map_or(EntityKind::Plain, EntityKind::from);
    let text = object.get("text").and_then(Value::as_str);
    let href = object
        .get("href")
        .and_then(Value::as_str)
        .filter(|href| !href.is_empty());
    let document_id = object.get("document_id").and_then(|id| match id {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    });

    let text = if kind == EntityKind::TextLink {
        ensure!(href.is_some(), MissingHrefSnafu { index });
        text.unwrap_or_default()
    } else {
        text.context(MissingTextSnafu {
            index,
            kind: kind.as_str(),
        })?
    };

    Ok(Segment {
        kind,
        text: text.to_owned(),
        href: href.map(str::to_owned),
        document_id,
    })
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<'de> Deserialize<'de> for HistoryText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let decoded = decode(value).map_err(serde::de::Error::custom)?;

        for err in &decoded.skipped {
            warn!(%err, "skipping malformed history text segment");
        }

        Ok(decoded.text)
    }
}

impl Serialize for HistoryText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Plain(text) => serializer.serialize_str(text),
            Self::Segments(segments) if segments.iter().all(|s| s.kind == EntityKind::Plain) => {
                let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
                serializer.serialize_str(&joined)
            }
            Self::Segments(segments)
                if matches!(segments.as_slice(), [only] if only.text.is_empty()) =>
            {
                serializer.serialize_str("")
            }
            Self::Segments(segments) => {
                let mut seq = serializer.serialize_seq(Some(segments.len()))?;
                for segment in segments {
                    seq.serialize_element(segment)?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for Segment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.kind == EntityKind::Plain {
            return serializer.serialize_str(&self.text);
        }

        let href = self.href.as_deref().filter(|href| !href.is_empty());
        let document_id = self.document_id.as_deref().filter(|id| !id.is_empty());

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind.as_str())?;
        map.serialize_entry("text", &self.text)?;
        if let Some(href) = href {
            map.serialize_entry("href", href)?;
        }
        if let Some(document_id) = document_id {
            map.serialize_entry("document_id", document_id)?;
        }
        map.end()
    }
}
