/*-
 * ========================LICENSE_START=================================
 * waypost
 * %%
 * Copyright (C) 2024 the waypost authors
 * %%
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in
 * all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
 * THE SOFTWARE.
 * =========================LICENSE_END==================================
 */

//! v2 `HostRegexp` brace-template <-> v3 bare-regex conversion.
//!
//! v2 writes `HostRegexp({sub:[a-z]+}.x)`: a string mixing literal runs
//! with `{name:pattern}` captures. v3 writes the same matcher as a bare
//! regex: `HostRegexp(`(?P<sub>[a-z]+)\.x`)`.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Clone, Debug, PartialEq)]
pub enum TemplateSegment {
    Literal(String),
    Capture { name: Option<String>, pattern: String },
}

static TEMPLATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(?:([A-Za-z_][A-Za-z0-9_]*):)?([^{}]+)\}").unwrap());
static NAMED_GROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\?P<([A-Za-z_][A-Za-z0-9_]*)>((?:[^()]|\([^()]*\))*)\)").unwrap());

/// Parse a v2 `HostRegexp` argument string into alternating literal and
/// capture segments.
pub fn parse_template(src: &str) -> Vec<TemplateSegment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for cap in TEMPLATE_RE.captures_iter(src) {
        let whole = cap.get(0).unwrap();
        if whole.start() > last {
            segments.push(TemplateSegment::Literal(src[last..whole.start()].to_string()));
        }
        let name = cap.get(1).map(|m| m.as_str().to_string());
        let pattern = cap.get(2).unwrap().as_str().to_string();
        segments.push(TemplateSegment::Capture { name, pattern });
        last = whole.end();
    }
    if last < src.len() {
        segments.push(TemplateSegment::Literal(src[last..].to_string()));
    }
    if segments.is_empty() {
        segments.push(TemplateSegment::Literal(String::new()));
    }
    segments
}

/// True if `src` contains at least one `{name:pattern}` or `{pattern}`
/// template segment (used to decide whether a v2 `HostRegexp` argument
/// should be captured as a template rather than a plain literal).
pub fn looks_like_template(src: &str) -> bool {
    TEMPLATE_RE.is_match(src)
}

/// Render segments back into v2 brace-template form.
pub fn render_template(segments: &[TemplateSegment]) -> String {
    segments
        .iter()
        .map(|s| match s {
            TemplateSegment::Literal(text) => text.clone(),
            TemplateSegment::Capture {
                name: Some(name),
                pattern,
            } => format!("{{{name}:{pattern}}}"),
            TemplateSegment::Capture { name: None, pattern } => format!("{{{pattern}}}"),
        })
        .collect()
}

/// Lower segments into a v3 bare regex: literal runs are regex-escaped,
/// captures become `(?P<name>pattern)` (or a bare group if unnamed).
pub fn render_regex(segments: &[TemplateSegment]) -> String {
    segments
        .iter()
        .map(|s| match s {
            TemplateSegment::Literal(text) => escape_regex_literal(text),
            TemplateSegment::Capture {
                name: Some(name),
                pattern,
            } => format!("(?P<{name}>{pattern})"),
            TemplateSegment::Capture { name: None, pattern } => format!("({pattern})"),
        })
        .collect()
}

/// Parse a v3 bare regex string back into segments, recognizing
/// `(?P<name>...)` named groups as captures and everything else as
/// literal runs to be un-escaped. This only round-trips regexes that
/// were themselves produced by [`render_regex`]; arbitrary v3 regexes
/// lift back as a single opaque literal segment.
pub fn parse_regex(src: &str) -> Vec<TemplateSegment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for cap in NAMED_GROUP_RE.captures_iter(src) {
        let whole = cap.get(0).unwrap();
        if whole.start() > last {
            segments.push(TemplateSegment::Literal(unescape_regex_literal(
                &src[last..whole.start()],
            )));
        }
        let name = cap.get(1).unwrap().as_str().to_string();
        let pattern = cap.get(2).unwrap().as_str().to_string();
        segments.push(TemplateSegment::Capture {
            name: Some(name),
            pattern,
        });
        last = whole.end();
    }
    if last < src.len() {
        segments.push(TemplateSegment::Literal(unescape_regex_literal(&src[last..])));
    }
    if segments.is_empty() {
        segments.push(TemplateSegment::Literal(String::new()));
    }
    segments
}

const REGEX_METACHARS: &[char] = &[
    '.', '+', '*', '?', '(', ')', '[', ']', '{', '}', '^', '$', '|', '\\',
];

fn escape_regex_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if REGEX_METACHARS.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn unescape_regex_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next) = chars.peek() {
                if REGEX_METACHARS.contains(&next) {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_named_template_to_regex() {
        let segments = parse_template("{sub:[a-z]+}.x");
        assert_eq!(render_regex(&segments), r"(?P<sub>[a-z]+)\.x");
    }

    #[test]
    fn lifts_v3_regex_back_to_template() {
        let segments = parse_regex(r"(?P<sub>[a-z]+)\.x");
        assert_eq!(render_template(&segments), "{sub:[a-z]+}.x");
    }

    #[test]
    fn plain_string_has_no_template() {
        assert!(!looks_like_template("example.com"));
    }
}
