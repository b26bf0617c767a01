// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! HTML composition for live messages.
//!
//! Live messages carry plain text plus annotations addressed by UTF-16
//! offset. Each annotation becomes an open and a close boundary event; the
//! events are sorted right to left and spliced into the code-unit buffer one
//! by one. Because every insertion happens at or after the offsets still
//! waiting to be processed, those offsets never shift.
//!
//! Literal text is escaped before any tag is inserted. The escaped buffer
//! comes with a map from source offsets to buffer positions, so annotation
//! offsets keep addressing the source text.
//!
//! # Example
//!
//! ```
//! use tg2html::compose::{compose_markup, Annotation};
//! use tg2html::parser::EntityKind;
//!
//! let annotations = [Annotation::new(EntityKind::Hashtag, 6, 6, 0)];
//! assert_eq!(
//!     compose_markup("Hello #world!", &annotations),
//!     "Hello <a class='inline c-link' href='?tag=world'>#world</a>!",
//! );
//! ```

use crate::markup::{Wrap, escape_char};
use crate::parser::{EntityKind, LiveEntity};
use crate::utf16::{self, Utf16Text};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// An offset-addressed span over a live message's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Span type.
    pub kind: EntityKind,
    /// Start, in UTF-16 code units.
    pub offset: usize,
    /// Length, in UTF-16 code units.
    pub length: usize,
    /// Link target of a `text_link`.
    pub href: Option<String>,
    /// Position of the annotation in its source list.
    pub registration_index: usize,
}

impl Annotation {
    /// An annotation without a link target.
    #[must_use]
    pub const fn new(
        kind: EntityKind,
        offset: usize,
        length: usize,
        registration_index: usize,
    ) -> Self {
        Self {
            kind,
            offset,
            length,
            href: None,
            registration_index,
        }
    }

    /// Builds annotations from a message's entities, numbering them in list
    /// order.
    #[must_use]
    pub fn from_entities(entities: &[LiveEntity]) -> Vec<Self> {
        entities
            .iter()
            .enumerate()
            .map(|(registration_index, entity)| Self {
                kind: entity.kind.clone(),
                offset: entity.offset,
                length: entity.length,
                href: entity.url.clone(),
                registration_index,
            })
            .collect()
    }

    fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.length)
    }
}

/// A tag to be spliced in at one end of an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Boundary {
    /// Where the tag goes, in source code units.
    offset: usize,
    /// Start of the owning annotation.
    start: usize,
    /// End of the owning annotation.
    end: usize,
    is_open: bool,
    registration_index: usize,
    tag: String,
}

/// Orders boundaries for right-to-left insertion.
///
/// Offsets sort descending. Two tags inserted at the same offset end up in
/// reverse processing order, so at a shared offset:
///
/// - an open sorts before a close, leaving the close on the left;
/// - of two opens, the one whose span ends first sorts first and ends up
///   inside; equal spans fall back to descending registration index;
/// - of two closes, the one whose span started first sorts first and ends up
///   outside; equal starts fall back to ascending registration index.
///
/// When the source list registers outer spans before inner ones, as the Bot
/// API does, the registration fallbacks alone give the same order.
fn compare_boundaries(a: &Boundary, b: &Boundary) -> Ordering {
    b.offset.cmp(&a.offset).then_with(|| match (a.is_open, b.is_open) {
        (false, false) => a
            .start
            .cmp(&b.start)
            .then(a.registration_index.cmp(&b.registration_index)),
        (true, true) => a
            .end
            .cmp(&b.end)
            .then(b.registration_index.cmp(&a.registration_index)),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
    })
}

/// Renders `text` with `annotations` applied as nested HTML.
///
/// Annotations must be disjoint or properly nested, which the Bot API
/// guarantees. Unknown kinds, unparsable hashtags, `text_link`s without a
/// target, zero-length spans and spans past the end of the text are left
/// out; their text still renders, escaped. Newlines become `<br>`.
#[must_use]
pub fn compose_markup(text: &str, annotations: &[Annotation]) -> String {
    let source = Utf16Text::new(text);
    let len = source.len();

    let mut boundaries = Vec::with_capacity(annotations.len() * 2);
    for annotation in annotations {
        let Some(end) = annotation.end().filter(|&end| end <= len) else {
            warn!(
                offset = annotation.offset,
                length = annotation.length,
                len,
                "annotation out of range"
            );
            continue;
        };
        if annotation.length == 0 {
            debug!(
                offset = annotation.offset,
                kind = annotation.kind.as_str(),
                "empty annotation dropped"
            );
            continue;
        }

        let captured = source.slice(annotation.offset, end).unwrap_or_default();
        let username = source
            .slice(annotation.offset + 1, end)
            .unwrap_or_default();
        let Some(wrap) = Wrap::resolve(
            &annotation.kind,
            &captured,
            annotation.href.as_deref(),
            &username,
        ) else {
            continue;
        };

        let boundary = |offset, is_open, tag| Boundary {
            offset,
            start: annotation.offset,
            end,
            is_open,
            registration_index: annotation.registration_index,
            tag,
        };
        boundaries.push(boundary(annotation.offset, true, wrap.open()));
        boundaries.push(boundary(end, false, wrap.close().to_owned()));
    }

    boundaries.sort_by(compare_boundaries);

    let (mut buffer, positions) = escape_units(source.units());
    for boundary in &boundaries {
        let at = positions[boundary.offset];
        buffer.splice(at..at, boundary.tag.encode_utf16());
    }

    utf16::decode(&buffer).replace('\n', "<br>")
}

/// Escapes HTML-special code units.
///
/// Returns the escaped buffer and, for every source offset `0..=len`, the
/// buffer position it maps to.
fn escape_units(units: &[u16]) -> (Vec<u16>, Vec<usize>) {
    let mut escaped = Vec::with_capacity(units.len());
    let mut positions = Vec::with_capacity(units.len() + 1);

    for &unit in units {
        positions.push(escaped.len());
        match char::from_u32(u32::from(unit)).and_then(escape_char) {
            Some(replacement) => escaped.extend(replacement.encode_utf16()),
            None => escaped.push(unit),
        }
    }
    positions.push(escaped.len());

    (escaped, positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(kind: EntityKind, offset: usize, length: usize, index: usize) -> Annotation {
        Annotation::new(kind, offset, length, index)
    }

    fn boundary(offset: usize, start: usize, end: usize, is_open: bool, index: usize) -> Boundary {
        Boundary {
            offset,
            start,
            end,
            is_open,
            registration_index: index,
            tag: String::new(),
        }
    }

    #[test]
    fn renders_hashtag() {
        let annotations = [annotation(EntityKind::Hashtag, 6, 6, 0)];
        assert_eq!(
            compose_markup("Hello #world!", &annotations),
            "Hello <a class='inline c-link' href='?tag=world'>#world</a>!"
        );
    }

    #[test]
    fn nests_coincident_starts_regardless_of_order() {
        let inner_first = [
            annotation(EntityKind::Bold, 0, 1, 0),
            annotation(EntityKind::Italic, 0, 3, 1),
        ];
        let outer_first = [
            annotation(EntityKind::Italic, 0, 3, 0),
            annotation(EntityKind::Bold, 0, 1, 1),
        ];
        let expected = "<i class='inline'><b class='inline'>a</b> b</i>";

        assert_eq!(compose_markup("a b", &inner_first), expected);
        assert_eq!(compose_markup("a b", &outer_first), expected);
    }

    #[test]
    fn nests_coincident_ends() {
        let annotations = [
            annotation(EntityKind::Italic, 0, 3, 0),
            annotation(EntityKind::Bold, 2, 1, 1),
        ];
        assert_eq!(
            compose_markup("a b", &annotations),
            "<i class='inline'>a <b class='inline'>b</b></i>"
        );
    }

    #[test]
    fn identical_spans_nest_by_registration_order() {
        let annotations = [
            annotation(EntityKind::Bold, 0, 2, 0),
            annotation(EntityKind::Italic, 0, 2, 1),
        ];
        assert_eq!(
            compose_markup("hi", &annotations),
            "<b class='inline'><i class='inline'>hi</i></b>"
        );
    }

    #[test]
    fn adjacent_spans_close_before_opening() {
        let annotations = [
            annotation(EntityKind::Bold, 0, 2, 0),
            annotation(EntityKind::Italic, 2, 2, 1),
        ];
        assert_eq!(
            compose_markup("abcd", &annotations),
            "<b class='inline'>ab</b><i class='inline'>cd</i>"
        );
    }

    #[test]
    fn adjacent_spans_close_before_opening_in_any_order() {
        let annotations = [
            annotation(EntityKind::Italic, 2, 2, 0),
            annotation(EntityKind::Bold, 0, 2, 1),
        ];
        assert_eq!(
            compose_markup("abcd", &annotations),
            "<b class='inline'>ab</b><i class='inline'>cd</i>"
        );
    }

    #[test]
    fn comparator_orders_offsets_descending() {
        let near = boundary(1, 0, 1, false, 0);
        let far = boundary(5, 5, 9, true, 1);
        assert_eq!(compare_boundaries(&far, &near), Ordering::Less);
        assert_eq!(compare_boundaries(&near, &far), Ordering::Greater);
    }

    #[test]
    fn comparator_breaks_close_ties_by_ascending_index() {
        let first = boundary(4, 0, 4, false, 0);
        let second = boundary(4, 0, 4, false, 1);
        assert_eq!(compare_boundaries(&first, &second), Ordering::Less);
    }

    #[test]
    fn comparator_breaks_open_ties_by_descending_index() {
        let first = boundary(0, 0, 4, true, 0);
        let second = boundary(0, 0, 4, true, 1);
        assert_eq!(compare_boundaries(&second, &first), Ordering::Less);
    }

    #[test]
    fn comparator_puts_opens_before_closes() {
        let open = boundary(2, 2, 4, true, 0);
        let close = boundary(2, 0, 2, false, 1);
        assert_eq!(compare_boundaries(&open, &close), Ordering::Less);
    }

    #[test]
    fn open_sorts_before_later_registered_close() {
        // italic [2,4) registered before bold [0,2)
        let italic_open = boundary(2, 2, 4, true, 0);
        let bold_close = boundary(2, 0, 2, false, 1);
        assert_eq!(compare_boundaries(&italic_open, &bold_close), Ordering::Less);
        assert_eq!(compare_boundaries(&bold_close, &italic_open), Ordering::Greater);

        let annotations = [
            annotation(EntityKind::Italic, 2, 2, 0),
            annotation(EntityKind::Bold, 0, 2, 1),
        ];
        assert_eq!(
            compose_markup("abcd", &annotations),
            "<b class='inline'>ab</b><i class='inline'>cd</i>"
        );
    }

    #[test]
    fn empty_annotation_leaves_text_untouched() {
        let annotations = [annotation(EntityKind::Bold, 1, 0, 0)];
        assert_eq!(compose_markup("a<b", &annotations), "a&lt;b");
    }

    #[test]
    fn counts_offsets_in_utf16_code_units() {
        let annotations = [annotation(EntityKind::Bold, 3, 4, 0)];
        assert_eq!(
            compose_markup("😀 #tag", &annotations),
            "😀 <b class='inline'>#tag</b>"
        );
    }

    #[test]
    fn escapes_literal_text_without_shifting_offsets() {
        let annotations = [annotation(EntityKind::Bold, 4, 1, 0)];
        assert_eq!(
            compose_markup("a < b & 'c'", &annotations),
            "a &lt; <b class='inline'>b</b> &amp; &#39;c&#39;"
        );
    }

    #[test]
    fn renders_url_with_default_scheme() {
        let annotations = [annotation(EntityKind::Url, 4, 11, 0)];
        assert_eq!(
            compose_markup("see example.com", &annotations),
            "see <a target='_blank' class='inline c-link' href='http://example.com'>example.com</a>"
        );
    }

    #[test]
    fn keeps_explicit_url_scheme() {
        let annotations = [annotation(EntityKind::Url, 0, 13, 0)];
        assert_eq!(
            compose_markup("https://a.io/", &annotations),
            "<a target='_blank' class='inline c-link' href='https://a.io/'>https://a.io/</a>"
        );
    }

    #[test]
    fn renders_text_link_from_annotation_href() {
        let mut link = annotation(EntityKind::TextLink, 0, 4, 0);
        link.href = Some("https://docs.rs".into());
        assert_eq!(
            compose_markup("docs", &[link]),
            "<a target='_blank' class='inline c-link' href='https://docs.rs'>docs</a>"
        );
    }

    #[test]
    fn text_link_without_href_is_inert() {
        let annotations = [annotation(EntityKind::TextLink, 0, 4, 0)];
        assert_eq!(compose_markup("docs", &annotations), "docs");
    }

    #[test]
    fn renders_mention_skipping_at_sign() {
        let annotations = [annotation(EntityKind::Mention, 3, 6, 0)];
        assert_eq!(
            compose_markup("hi @durov", &annotations),
            "hi <a target='_blank' class='inline c-link' href='https://t.me/durov'>@durov</a>"
        );
    }

    #[test]
    fn unparsable_hashtag_leaves_text_plain() {
        let annotations = [
            annotation(EntityKind::Hashtag, 0, 1, 0),
            annotation(EntityKind::Bold, 2, 1, 1),
        ];
        assert_eq!(compose_markup("# x", &annotations), "# <b class='inline'>x</b>");
    }

    #[test]
    fn unknown_kinds_are_inert() {
        let annotations = [annotation(EntityKind::Other("spoiler".into()), 0, 3, 0)];
        assert_eq!(compose_markup("<x>", &annotations), "&lt;x&gt;");
    }

    #[test]
    fn drops_out_of_range_and_empty_annotations() {
        let annotations = [
            annotation(EntityKind::Bold, 2, 5, 0),
            annotation(EntityKind::Italic, usize::MAX, 2, 1),
            annotation(EntityKind::Bold, 1, 0, 2),
            annotation(EntityKind::Italic, 0, 1, 3),
        ];
        assert_eq!(compose_markup("abc", &annotations), "<i class='inline'>a</i>bc");
    }

    #[test]
    fn converts_newlines_after_insertion() {
        let annotations = [annotation(EntityKind::Bold, 0, 3, 0)];
        assert_eq!(
            compose_markup("a\nb\tc", &annotations),
            "<b class='inline'>a<br>b</b>\tc"
        );
    }

    #[test]
    fn deep_nesting_stays_well_formed() {
        // [0,10) bold, [0,6) italic, [2,6) hashtag, [7,10) url
        let text = "ab#xyz a.b";
        let annotations = [
            annotation(EntityKind::Bold, 0, 10, 0),
            annotation(EntityKind::Italic, 0, 6, 1),
            annotation(EntityKind::Hashtag, 2, 4, 2),
            annotation(EntityKind::Url, 7, 3, 3),
        ];
        assert_eq!(
            compose_markup(text, &annotations),
            "<b class='inline'><i class='inline'>ab<a class='inline c-link' href='?tag=xyz'>#xyz</a></i> \
             <a target='_blank' class='inline c-link' href='http://a.b'>a.b</a></b>"
        );
    }

    #[test]
    fn stripped_output_matches_escaped_source() {
        let text = "Tom & <Jerry>\n😀 #fun";
        let annotations = [
            annotation(EntityKind::Italic, 0, 13, 0),
            annotation(EntityKind::Bold, 6, 7, 1),
            annotation(EntityKind::Hashtag, 17, 4, 2),
        ];
        let html = compose_markup(text, &annotations);

        let mut stripped = String::new();
        let mut in_tag = false;
        for c in html.replace("<br>", "\n").chars() {
            match c {
                '<' => in_tag = true,
                '>' => in_tag = false,
                c if !in_tag => stripped.push(c),
                _ => {}
            }
        }
        assert_eq!(stripped, "Tom &amp; &lt;Jerry&gt;\n😀 #fun");
    }

    #[test]
    fn crossing_spans_keep_all_text() {
        let annotations = [
            annotation(EntityKind::Bold, 0, 3, 0),
            annotation(EntityKind::Italic, 2, 3, 1),
        ];
        let html = compose_markup("abcde", &annotations);

        assert_eq!(html.matches("<b ").count(), 1);
        assert_eq!(html.matches("</i>").count(), 1);
        assert!(html.starts_with("<b class='inline'>ab"));
        assert!(html.ends_with("de</i>"));
    }

    #[test]
    fn from_entities_assigns_registration_indexes() {
        let entities = [
            LiveEntity {
                kind: EntityKind::Bold,
                offset: 0,
                length: 1,
                url: None,
            },
            LiveEntity {
                kind: EntityKind::TextLink,
                offset: 1,
                length: 1,
                url: Some("https://t.me".into()),
            },
        ];
        let annotations = Annotation::from_entities(&entities);

        assert_eq!(annotations[0].registration_index, 0);
        assert_eq!(annotations[1].registration_index, 1);
        assert_eq!(annotations[1].href.as_deref(), Some("https://t.me"));
    }
}
