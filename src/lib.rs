// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Render Telegram messages as safe, nested HTML.
//!
//! This crate turns messages from two Telegram representations into HTML
//! fragments ready to embed in a page, and extracts the hashtags used to
//! index them.
//!
//! # Overview
//!
//! Telegram messages reach a blog or archive in two shapes:
//!
//! 1. **Live** Bot API messages: plain text plus offset/length annotations
//!    counted in UTF-16 code units
//! 2. **History** export messages from `result.json`: text already split
//!    into typed segments
//!
//! Both render to the same markup. All rendering is pure and synchronous;
//! malformed pieces of a message are skipped with a logged warning instead
//! of failing the whole message.
//!
//! # Example
//!
//! ```
//! use tg2html::{parser, renderer, tags};
//!
//! let json = r##"{
//!     "message_id": 1,
//!     "text": "Hello #world!",
//!     "entities": [{ "type": "hashtag", "offset": 6, "length": 6 }]
//! }"##;
//!
//! let messages = parser::parse_document(json, None).unwrap();
//! let html = renderer::render_message(&messages[0]);
//! assert_eq!(html, "Hello <a class='inline c-link' href='?tag=world'>#world</a>!");
//!
//! let tags = tags::extract_tags(&messages[0]);
//! assert_eq!(tags[0].as_str(), "world");
//! ```
//!
//! # Modules
//!
//! - [`parser`]: JSON parsing and type definitions for both message formats
//! - [`history`]: the string-or-array `text` field of history exports
//! - [`compose`]: offset-based markup composition for live messages
//! - [`renderer`]: HTML rendering for parsed messages
//! - [`tags`]: hashtag normalization and extraction
//! - [`utf16`]: UTF-16 code-unit indexing
//! - [`slug`]: URL slugs and excerpts

#![deny(missing_docs)]

pub mod compose;
pub mod history;
mod markup;
pub mod parser;
pub mod renderer;
pub mod slug;
pub mod tags;
pub mod utf16;
