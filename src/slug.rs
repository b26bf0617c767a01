// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! URL slugs and short excerpts derived from message text.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use tg2html::slug::generate_slug;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 12, 5).unwrap();
//! assert_eq!(generate_slug("Привет, мир!", date), "privet-mir-2024-12-05");
//! ```

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug separator regex"));

const SLUG_SOURCE_CHARS: usize = 100;
const SLUG_MAX_CHARS: usize = 90;
const TITLE_CHARS: usize = 60;
const DESCRIPTION_CHARS: usize = 160;

const fn transliterate_char(c: char) -> Option<&'static str> {
    Some(match c {
        'а' | 'А' => "a",
        'б' | 'Б' => "b",
        'в' | 'В' => "v",
        'г' | 'Г' => "g",
        'д' | 'Д' => "d",
        'е' | 'Е' => "e",
        'ё' | 'Ё' => "yo",
        'ж' | 'Ж' => "zh",
        'з' | 'З' => "z",
        'и' | 'И' => "i",
        'й' | 'Й' | 'ы' | 'Ы' => "y",
        'к' | 'К' => "k",
        'л' | 'Л' => "l",
        'м' | 'М' => "m",
        'н' | 'Н' => "n",
        'о' | 'О' => "o",
        'п' | 'П' => "p",
        'р' | 'Р' => "r",
        'с' | 'С' => "s",
        'т' | 'Т' => "t",
        'у' | 'У' => "u",
        'ф' | 'Ф' => "f",
        'х' | 'Х' => "h",
        'ц' | 'Ц' => "ts",
        'ч' | 'Ч' => "ch",
        'ш' | 'Ш' => "sh",
        'щ' | 'Щ' => "sch",
        'ъ' | 'Ъ' | 'ь' | 'Ь' => "",
        'э' | 'Э' => "e",
        'ю' | 'Ю' => "yu",
        'я' | 'Я' => "ya",
        _ => return None,
    })
}

/// Replaces Cyrillic letters with Latin equivalents.
fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match transliterate_char(c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

/// Builds a URL slug from message text and its publication date.
///
/// Cyrillic is transliterated, the first 100 characters are lowercased,
/// every run of characters outside `[a-z0-9]` becomes one `-`, and the
/// result is capped at 90 characters before `-YYYY-MM-DD` is appended.
#[must_use]
pub fn generate_slug(text: &str, date: NaiveDate) -> String {
    let source: String = transliterate(text)
        .chars()
        .take(SLUG_SOURCE_CHARS)
        .collect();
    let lowered = source.to_lowercase();
    let dashed = NON_SLUG_RE.replace_all(&lowered, "-");

    // Only ASCII survives the regex, so byte and char counts agree.
    let mut slug = dashed.trim_matches('-').to_owned();
    slug.truncate(SLUG_MAX_CHARS);
    let slug = slug.trim_end_matches('-');

    let date = date.format("%Y-%m-%d");
    if slug.is_empty() {
        date.to_string()
    } else {
        format!("{slug}-{date}")
    }
}

/// Leading excerpt of at most `max_chars` characters on a single line.
///
/// `\r\n` becomes a space and any other `\n` is dropped.
#[must_use]
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    head.replace("\r\n", " ").replace('\n', "")
}

/// Page title for a post: the first 60 characters.
#[must_use]
pub fn title(text: &str) -> String {
    excerpt(text, TITLE_CHARS)
}

/// Meta description for a post: the first 160 characters.
#[must_use]
pub fn description(text: &str) -> String {
    excerpt(text, DESCRIPTION_CHARS)
}
