// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Tag vocabulary and escaping shared by the live and history renderers.

use crate::parser::EntityKind;
use crate::tags::correct_tag_value;
use tracing::{debug, warn};

/// Markup wrapped around one annotated span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Wrap {
    Italic,
    Bold,
    /// Opens in a new tab.
    ExternalLink { href: String },
    /// Same-page `?tag=` filter link.
    TagLink { tag: String },
}

impl Wrap {
    /// Resolves the markup for a span of `kind`.
    ///
    /// `text` is the span's visible text, `href` the explicit link target of
    /// a `text_link`, and `username` the mention target without its `@`.
    /// Returns `None` for kinds that render as plain text, and for spans that
    /// cannot be linked (no href, unparsable hashtag).
    pub(crate) fn resolve(
        kind: &EntityKind,
        text: &str,
        href: Option<&str>,
        username: &str,
    ) -> Option<Self> {
        match kind {
            EntityKind::Italic => Some(Self::Italic),
            EntityKind::Bold => Some(Self::Bold),
            EntityKind::Url | EntityKind::Link => Some(Self::ExternalLink {
                href: with_default_scheme(text),
            }),
            EntityKind::TextLink => match href.filter(|href| !href.is_empty()) {
                Some(href) => Some(Self::ExternalLink {
                    href: href.to_owned(),
                }),
                None => {
                    warn!(text, "text_link without href rendered as plain text");
                    None
                }
            },
            EntityKind::Hashtag => match correct_tag_value(text) {
                Ok(tag) => Some(Self::TagLink {
                    tag: tag.into_inner(),
                }),
                Err(err) => {
                    debug!(%err, "hashtag rendered as plain text");
                    None
                }
            },
            EntityKind::Mention => Some(Self::ExternalLink {
                href: format!("https://t.me/{username}"),
            }),
            EntityKind::Plain | EntityKind::Other(_) => None,
        }
    }

    /// The opening tag.
    pub(crate) fn open(&self) -> String {
        match self {
            Self::Italic => "<i class='inline'>".to_owned(),
            Self::Bold => "<b class='inline'>".to_owned(),
            Self::ExternalLink { href } => format!(
                "<a target='_blank' class='inline c-link' href='{}'>",
                escape_html(href)
            ),
            Self::TagLink { tag } => format!("<a class='inline c-link' href='?tag={tag}'>"),
        }
    }

    /// The closing tag.
    pub(crate) const fn close(&self) -> &'static str {
        match self {
            Self::Italic => "</i>",
            Self::Bold => "</b>",
            Self::ExternalLink { .. } | Self::TagLink { .. } => "</a>",
        }
    }
}

/// Prefixes `http://` when `link` has no scheme.
pub(crate) fn with_default_scheme(link: &str) -> String {
    if link.contains("://") {
        link.to_owned()
    } else {
        format!("http://{link}")
    }
}

/// Returns the HTML escape sequence for `c`, if it needs one.
pub(crate) const fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '\'' => Some("&#39;"),
        '"' => Some("&#34;"),
        _ => None,
    }
}

/// Escapes `&`, `<`, `>`, `'` and `"`.
pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match escape_char(c) {
            Some(escaped) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

/// Escapes `s` and turns each newline into `<br>`.
pub(crate) fn escape_text(s: &str) -> String {
    escape_html(s).replace('\n', "<br>")
}
