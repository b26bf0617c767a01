// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for Telegram messages.
//!
//! Two message representations are supported:
//!
//! - **Live** messages, as delivered by the Bot API: plain `text` plus an
//!   `entities` list of `{type, offset, length, url?}` annotations whose
//!   offsets count UTF-16 code units. Media posts carry the same pair as
//!   `caption`/`caption_entities`.
//! - **History** messages, from a Telegram Desktop `result.json` export: a
//!   pre-segmented `text` field (see [`crate::history`]) plus a flat
//!   `text_entities` list.
//!
//! # Example
//!
//! ```
//! use tg2html::parser::{parse_document, Message};
//!
//! let json = r#"{
//!     "name": "My channel",
//!     "type": "public_channel",
//!     "id": 1234567890,
//!     "messages": [{
//!         "id": 1,
//!         "type": "message",
//!         "date_unixtime": "1733356800",
//!         "text": "Hello",
//!         "text_entities": [{ "type": "plain", "text": "Hello" }]
//!     }]
//! }"#;
//!
//! let messages = parse_document(json, None).unwrap();
//! assert_eq!(messages.len(), 1);
//! assert!(matches!(messages[0], Message::History(_)));
//! ```

use crate::history::HistoryText;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::prelude::*;

/// Error type for JSON parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// The type of an entity or segment.
///
/// Known types get their own variant; anything else (`code`, `pre`,
/// `strikethrough`, `custom_emoji`, ...) is kept verbatim in
/// [`EntityKind::Other`] and renders as plain escaped text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    /// Unformatted text (history exports only).
    Plain,
    /// Bold text.
    Bold,
    /// Italic text.
    Italic,
    /// A URL written out in the text.
    Url,
    /// History-export spelling of a written-out URL.
    Link,
    /// Text linking to a separate `url`/`href`.
    TextLink,
    /// A `#hashtag`.
    Hashtag,
    /// A `@username` mention.
    Mention,
    /// Any other type.
    Other(String),
}

impl EntityKind {
    /// The wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain => "plain",
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Url => "url",
            Self::Link => "link",
            Self::TextLink => "text_link",
            Self::Hashtag => "hashtag",
            Self::Mention => "mention",
            Self::Other(kind) => kind,
        }
    }
}

impl From<&str> for EntityKind {
    fn from(kind: &str) -> Self {
        match kind {
            "plain" => Self::Plain,
            "bold" => Self::Bold,
            "italic" => Self::Italic,
            "url" => Self::Url,
            "link" => Self::Link,
            "text_link" => Self::TextLink,
            "hashtag" => Self::Hashtag,
            "mention" => Self::Mention,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for EntityKind {
    fn from(kind: String) -> Self {
        match Self::from(kind.as_str()) {
            Self::Other(_) => Self::Other(kind),
            known => known,
        }
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Other(kind) => kind,
            known => known.as_str().to_owned(),
        }
    }
}

/// An offset-addressed annotation in a live message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LiveEntity {
    /// Entity type.
    #[serde(rename = "type")]
    pub kind: EntityKind,

    /// Start, in UTF-16 code units.
    pub offset: usize,

    /// Length, in UTF-16 code units.
    pub length: usize,

    /// Link target of a `text_link` entity.
    #[serde(default)]
    pub url: Option<String>,
}

/// A message as delivered by the Bot API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LiveMessage {
    /// Message identifier within its chat.
    #[serde(default)]
    pub message_id: i64,

    /// Unix timestamp in seconds when the message was sent.
    #[serde(default)]
    pub date: i64,

    /// Message text.
    #[serde(default)]
    pub text: String,

    /// Annotations over `text`.
    #[serde(default)]
    pub entities: Vec<LiveEntity>,

    /// Caption of a media message.
    #[serde(default)]
    pub caption: String,

    /// Annotations over `caption`.
    #[serde(default)]
    pub caption_entities: Vec<LiveEntity>,
}

impl LiveMessage {
    /// The text that carries annotations, with its annotations.
    ///
    /// This is `text` when it has entities, otherwise `caption` when it has
    /// entities, otherwise the unannotated `text` (or `caption` if `text` is
    /// empty).
    #[must_use]
    pub fn annotated_text(&self) -> (&str, &[LiveEntity]) {
        if !self.entities.is_empty() {
            (&self.text, &self.entities)
        } else if !self.caption_entities.is_empty() {
            (&self.caption, &self.caption_entities)
        } else {
            (self.plain_text(), &[])
        }
    }

    /// The visible text without markup.
    #[must_use]
    pub fn plain_text(&self) -> &str {
        if self.text.is_empty() {
            &self.caption
        } else {
            &self.text
        }
    }

    /// When the message was sent, if `date` is set.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        (self.date != 0)
            .then(|| DateTime::from_timestamp(self.date, 0))
            .flatten()
    }
}

/// An entry of a history message's flat `text_entities` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryTextEntity {
    /// Entity type.
    #[serde(rename = "type")]
    pub kind: EntityKind,

    /// Visible text.
    #[serde(default)]
    pub text: String,

    /// Link target, present on `text_link` entities.
    #[serde(default)]
    pub href: Option<String>,
}

/// A message from a Telegram Desktop history export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HistoryMessage {
    /// Message identifier within the exported chat.
    #[serde(default)]
    pub id: i64,

    /// `message` or `service`.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Local send time as formatted by the exporter.
    #[serde(default)]
    pub date: String,

    /// Send time as a Unix timestamp string.
    #[serde(default)]
    pub date_unixtime: Option<String>,

    /// Author display name.
    #[serde(default)]
    pub from: Option<String>,

    /// Author identifier (`user123` or `channel123`).
    #[serde(default)]
    pub from_id: Option<String>,

    /// Title of service messages and titled posts.
    #[serde(default)]
    pub title: String,

    /// Segmented message text.
    #[serde(default)]
    pub text: HistoryText,

    /// Flat entity list covering the same text.
    #[serde(default)]
    pub text_entities: Vec<HistoryTextEntity>,

    /// The message this one replies to.
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
}

impl HistoryMessage {
    /// The visible text without markup.
    #[must_use]
    pub fn plain_text(&self) -> String {
        if self.text.is_empty() {
            self.text_entities.iter().map(|e| e.text.as_str()).collect()
        } else {
            self.text.plain_text()
        }
    }

    /// When the message was sent, from `date_unixtime`.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let secs = self.date_unixtime.as_deref()?.trim().parse().ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

/// The root of a history export's `result.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryExport {
    /// Chat identifier.
    #[serde(default)]
    pub id: i64,

    /// Chat name.
    #[serde(default)]
    pub name: String,

    /// Chat type, e.g. `public_channel`.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Exported messages, oldest first.
    pub messages: Vec<HistoryMessage>,
}

/// Which representation a message uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Bot API message with offset-addressed entities.
    Live,
    /// History export message with segmented text.
    History,
}

impl MessageFormat {
    /// Guesses the format of a raw message object.
    ///
    /// History messages are recognized by `text_entities`, `date_unixtime`,
    /// or an array-valued `text`; everything else is treated as live.
    #[must_use]
    pub fn detect(value: &Value) -> Self {
        let is_history = value.get("text_entities").is_some()
            || value.get("date_unixtime").is_some()
            || value.get("text").is_some_and(Value::is_array);

        if is_history { Self::History } else { Self::Live }
    }
}

/// A parsed message of either format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A Bot API message.
    Live(LiveMessage),
    /// A history export message.
    History(HistoryMessage),
}

impl Message {
    /// The visible text without markup.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Self::Live(message) => message.plain_text().to_owned(),
            Self::History(message) => message.plain_text(),
        }
    }

    /// When the message was sent.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Live(message) => message.timestamp(),
            Self::History(message) => message.timestamp(),
        }
    }
}

/// Parses a single Bot API message.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or an entity lacks its
/// `type`, `offset` or `length`.
pub fn parse_live_message(json_str: &str) -> Result<LiveMessage, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

/// Parses a single history export message.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or `text` is neither a string
/// nor an array.
pub fn parse_history_message(json_str: &str) -> Result<HistoryMessage, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

/// Parses a whole history export (`result.json`).
///
/// # Errors
///
/// Returns an error if the JSON is malformed or has no `messages` array.
pub fn parse_history_export(json_str: &str) -> Result<HistoryExport, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

/// Parses a file holding one message, an array of messages, or an export
/// object with a `messages` array.
///
/// Each message is parsed as `format`, or as its detected format when
/// `format` is `None`.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or any message fails to parse.
pub fn parse_document(
    json_str: &str,
    format: Option<MessageFormat>,
) -> Result<Vec<Message>, ParseError> {
    let value: Value = serde_json::from_str(json_str).context(JsonSnafu)?;

    let (items, format) = match value {
        Value::Array(items) => (items, format),
        Value::Object(mut object) => match object.remove("messages") {
            // Only history exports wrap their messages in an object.
            Some(Value::Array(items)) => (items, format.or(Some(MessageFormat::History))),
            Some(other) => {
                object.insert("messages".to_owned(), other);
                (vec![Value::Object(object)], format)
            }
            None => (vec![Value::Object(object)], format),
        },
        other => (vec![other], format),
    };

    items
        .into_iter()
        .map(|item| parse_value(item, format))
        .collect()
}

fn parse_value(value: Value, format: Option<MessageFormat>) -> Result<Message, ParseError> {
    let format = format.unwrap_or_else(|| MessageFormat::detect(&value));
    Ok(match format {
        MessageFormat::Live => Message::Live(serde_json::from_value(value).context(JsonSnafu)?),
        MessageFormat::History => {
            Message::History(serde_json::from_value(value).context(JsonSnafu)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Segment;

    fn live_json(text: &str, entities_json: &str) -> String {
        format!(r#"{{ "message_id": 7, "date": 1733356800, "text": "{text}", "entities": [{entities_json}] }}"#)
    }

    #[test]
    fn parses_live_message() {
        let message = parse_live_message(&live_json(
            "Hello world",
            r#"{"type": "bold", "offset": 6, "length": 5}"#,
        ))
        .unwrap();

        assert_eq!(message.message_id, 7);
        assert_eq!(message.text, "Hello world");
        assert_eq!(
            message.entities,
            [LiveEntity {
                kind: EntityKind::Bold,
                offset: 6,
                length: 5,
                url: None,
            }]
        );
    }

    #[test]
    fn parses_text_link_url() {
        let message = parse_live_message(&live_json(
            "docs",
            r#"{"type": "text_link", "offset": 0, "length": 4, "url": "https://docs.rs"}"#,
        ))
        .unwrap();

        assert_eq!(message.entities[0].kind, EntityKind::TextLink);
        assert_eq!(message.entities[0].url.as_deref(), Some("https://docs.rs"));
    }

    #[test]
    fn keeps_unknown_entity_kinds() {
        let message = parse_live_message(&live_json(
            "x",
            r#"{"type": "spoiler", "offset": 0, "length": 1}"#,
        ))
        .unwrap();

        assert_eq!(message.entities[0].kind, EntityKind::Other("spoiler".into()));
        assert_eq!(message.entities[0].kind.as_str(), "spoiler");
    }

    #[test]
    fn entity_kind_round_trips_through_strings() {
        for name in ["plain", "bold", "italic", "url", "link", "text_link", "hashtag", "mention", "code"] {
            assert_eq!(String::from(EntityKind::from(name)), name);
        }
    }

    #[test]
    fn annotated_text_prefers_text_then_caption() {
        let caption_only = parse_live_message(
            r#"{"caption": "pic", "caption_entities": [{"type": "italic", "offset": 0, "length": 3}]}"#,
        )
        .unwrap();
        let (text, entities) = caption_only.annotated_text();
        assert_eq!(text, "pic");
        assert_eq!(entities.len(), 1);

        let bare_caption = parse_live_message(r#"{"caption": "just a caption"}"#).unwrap();
        let (text, entities) = bare_caption.annotated_text();
        assert_eq!(text, "just a caption");
        assert!(entities.is_empty());
    }

    #[test]
    fn live_timestamp() {
        let message = parse_live_message(&live_json("x", "")).unwrap();
        assert_eq!(
            message.timestamp().unwrap().to_rfc3339(),
            "2024-12-05T00:00:00+00:00"
        );
        assert!(LiveMessage::default().timestamp().is_none());
    }

    #[test]
    fn rejects_entity_without_offset() {
        let result = parse_live_message(&live_json("x", r#"{"type": "bold", "length": 1}"#));
        assert!(result.is_err());
    }

    #[test]
    fn parses_history_message_with_string_text() {
        let message = parse_history_message(
            r#"{
                "id": 12,
                "type": "message",
                "date": "2024-12-05T03:00:00",
                "date_unixtime": "1733356800",
                "from": "Channel",
                "from_id": "channel1234",
                "text": "hi",
                "text_entities": [{"type": "plain", "text": "hi"}]
            }"#,
        )
        .unwrap();

        assert_eq!(message.id, 12);
        assert_eq!(message.text, HistoryText::Plain("hi".into()));
        assert_eq!(message.text_entities[0].kind, EntityKind::Plain);
        assert_eq!(message.from_id.as_deref(), Some("channel1234"));
        assert_eq!(
            message.timestamp().unwrap().to_rfc3339(),
            "2024-12-05T00:00:00+00:00"
        );
    }

    #[test]
    fn parses_history_message_with_segmented_text() {
        let message = parse_history_message(
            r#"{"id": 1, "text": [{"type": "bold", "text": "x"}, "y"], "reply_to_message_id": 3}"#,
        )
        .unwrap();

        assert_eq!(
            message.text,
            HistoryText::Segments(vec![Segment::new(EntityKind::Bold, "x"), Segment::plain("y")])
        );
        assert_eq!(message.plain_text(), "xy");
        assert_eq!(message.reply_to_message_id, Some(3));
    }

    #[test]
    fn history_plain_text_falls_back_to_entities() {
        let message = parse_history_message(
            r#"{"id": 1, "text": "", "text_entities": [{"type": "plain", "text": "a"}, {"type": "bold", "text": "b"}]}"#,
        )
        .unwrap();

        assert_eq!(message.plain_text(), "ab");
    }

    #[test]
    fn history_message_rejects_object_text() {
        let result = parse_history_message(r#"{"id": 1, "text": {"type": "bold"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn parses_history_export() {
        let export = parse_history_export(
            r#"{"id": 99, "name": "Blog", "type": "public_channel", "messages": [{"id": 1, "text": "a"}, {"id": 2, "text": "b"}]}"#,
        )
        .unwrap();

        assert_eq!(export.name, "Blog");
        assert_eq!(export.kind, "public_channel");
        assert_eq!(export.messages.len(), 2);
    }

    #[test]
    fn detects_formats() {
        let history = serde_json::json!({"id": 1, "text": ["a"]});
        let history_entities = serde_json::json!({"id": 1, "text": "a", "text_entities": []});
        let live = serde_json::json!({"message_id": 1, "text": "a", "entities": []});

        assert_eq!(MessageFormat::detect(&history), MessageFormat::History);
        assert_eq!(MessageFormat::detect(&history_entities), MessageFormat::History);
        assert_eq!(MessageFormat::detect(&live), MessageFormat::Live);
    }

    #[test]
    fn parse_document_accepts_single_message() {
        let messages = parse_document(&live_json("hi", ""), None).unwrap();
        assert!(matches!(&messages[..], [Message::Live(m)] if m.text == "hi"));
    }

    #[test]
    fn parse_document_accepts_message_array() {
        let messages = parse_document(
            r#"[{"message_id": 1, "text": "live"}, {"id": 2, "text": ["history"]}]"#,
            None,
        )
        .unwrap();

        assert!(matches!(messages[0], Message::Live(_)));
        assert!(matches!(messages[1], Message::History(_)));
    }

    #[test]
    fn parse_document_honors_forced_format() {
        let messages =
            parse_document(r#"[{"id": 1, "text": "x"}]"#, Some(MessageFormat::History)).unwrap();
        assert!(matches!(messages[0], Message::History(_)));
    }

    #[test]
    fn parse_document_treats_export_messages_as_history() {
        let json = r#"{
            "name": "Old channel",
            "messages": [{ "id": 3, "type": "message", "date": "2019-01-01T00:00:00", "text": "hi" }]
        }"#;
        let messages = parse_document(json, None).unwrap();

        let Message::History(message) = &messages[0] else {
            panic!("expected a history message, got {:?}", messages[0]);
        };
        assert_eq!(message.id, 3);
        assert_eq!(message.plain_text(), "hi");
    }

    #[test]
    fn parse_document_rejects_invalid_json() {
        assert!(parse_document("not valid json", None).is_err());
    }

    #[test]
    fn message_plain_text_and_timestamp() {
        let message = Message::Live(parse_live_message(&live_json("hey", "")).unwrap());
        assert_eq!(message.plain_text(), "hey");
        assert!(message.timestamp().is_some());
    }
}
