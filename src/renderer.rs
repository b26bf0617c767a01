// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! HTML rendering for parsed messages.
//!
//! Live messages go through the offset-based compositor in
//! [`crate::compose`]. History messages are already segmented, so each
//! segment is wrapped and appended in order without any offset math.
//!
//! # Output Format
//!
//! The result is an HTML fragment meant to be embedded in a page:
//! - bold and italic spans become `<b class='inline'>` and `<i class='inline'>`
//! - links open in a new tab and carry `class='inline c-link'`
//! - hashtags link to the `?tag=<value>` filter of the current page
//! - mentions link to `https://t.me/<username>`
//! - all other text is HTML-escaped and newlines become `<br>`
//!
//! # Example
//!
//! ```
//! use tg2html::history::{HistoryText, Segment};
//! use tg2html::parser::{EntityKind, HistoryMessage};
//! use tg2html::renderer::render_history_message;
//!
//! let message = HistoryMessage {
//!     text: HistoryText::Segments(vec![
//!         Segment::new(EntityKind::Bold, "x"),
//!         Segment::plain("y"),
//!     ]),
//!     ..Default::default()
//! };
//!
//! assert_eq!(render_history_message(&message), "<b class='inline'>x</b>y");
//! ```

use crate::compose::{Annotation, compose_markup};
use crate::history::Segment;
use crate::markup::{Wrap, escape_text};
use crate::parser::{HistoryMessage, HistoryTextEntity, LiveMessage, Message};

/// Renders a parsed message of either format.
#[must_use]
pub fn render_message(message: &Message) -> String {
    match message {
        Message::Live(live) => render_live_message(live),
        Message::History(history) => render_history_message(history),
    }
}

/// Renders a Bot API message.
///
/// Uses the text's entities, or the caption's when the text has none. A
/// message without entities renders as escaped text.
#[must_use]
pub fn render_live_message(message: &LiveMessage) -> String {
    let (text, entities) = message.annotated_text();
    if entities.is_empty() {
        return escape_text(text);
    }

    compose_markup(text, &Annotation::from_entities(entities))
}

/// Renders a history export message.
///
/// Prefers the segmented `text`, then the flat `text_entities`, then the
/// message `title`.
#[must_use]
pub fn render_history_message(message: &HistoryMessage) -> String {
    if !message.text.is_empty() {
        render_segments(&message.text.segments())
    } else if !message.text_entities.is_empty() {
        render_text_entities(&message.text_entities)
    } else {
        escape_text(&message.title)
    }
}

/// Renders ordered history segments.
#[must_use]
pub fn render_segments(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        render_span(&mut out, segment);
    }
    out
}

/// Renders a flat `text_entities` list.
#[must_use]
pub fn render_text_entities(entities: &[HistoryTextEntity]) -> String {
    let segments: Vec<Segment> = entities
        .iter()
        .map(|entity| Segment {
            kind: entity.kind.clone(),
            text: entity.text.clone(),
            href: entity.href.clone(),
            document_id: None,
        })
        .collect();

    render_segments(&segments)
}

fn render_span(out: &mut String, segment: &Segment) {
    let text = escape_text(&segment.text);
    let username = segment.text.strip_prefix('@').unwrap_or(&segment.text);

    match Wrap::resolve(
        &segment.kind,
        &segment.text,
        segment.href.as_deref(),
        username,
    ) {
        Some(wrap) => {
            out.push_str(&wrap.open());
            out.push_str(&text);
            out.push_str(wrap.close());
        }
        None => out.push_str(&text),
    }
}
