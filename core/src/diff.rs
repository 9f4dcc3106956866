/*
 * diff.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Grimaldello, a raw HTTP security-testing toolkit.
 *
 * Grimaldello is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Grimaldello is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Grimaldello.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Structural diffing of two requests or two responses: scalar fields,
//! header multimaps, line-oriented unified diff, char-level diff with
//! control-character escapes, and timing deltas. Used to spot how a
//! target treats two nearly-identical probes differently.

use crate::http::response::{parse_response, split_head_body, ParsedResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Unchanged,
    Added,
    Removed,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: String,
    pub change: Change,
    pub old: Option<String>,
    pub new: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDiff {
    pub name: String,
    pub change: Change,
    /// Duplicate values joined with `", "` before comparison.
    pub old: Option<String>,
    pub new: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharDiff {
    pub index: usize,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Signed millisecond deltas; present only when both sides carry timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingDiff {
    pub ttfb_diff: i64,
    pub total_diff: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    pub fields: Vec<FieldDiff>,
    pub headers: Vec<HeaderDiff>,
    /// `"  line"` for matches, `"- old"` / `"+ new"` otherwise.
    pub unified: Vec<String>,
    pub chars: Vec<CharDiff>,
    pub timing: Option<TimingDiff>,
}

fn classify(old: Option<&str>, new: Option<&str>) -> Change {
    match (old, new) {
        (None, None) => Change::Unchanged,
        (None, Some(_)) => Change::Added,
        (Some(_), None) => Change::Removed,
        (Some(a), Some(b)) if a == b => Change::Unchanged,
        _ => Change::Changed,
    }
}

fn field_diff(field: &str, old: Option<&str>, new: Option<&str>) -> FieldDiff {
    FieldDiff {
        field: field.to_string(),
        change: classify(old, new),
        old: old.map(|s| s.to_string()),
        new: new.map(|s| s.to_string()),
    }
}

/// Union both key sets (left order first), join duplicates with `", "`,
/// one entry per key.
fn header_diffs(
    left: &[(String, Vec<String>)],
    right: &[(String, Vec<String>)],
) -> Vec<HeaderDiff> {
    let joined = |values: &Vec<String>| values.join(", ");
    let mut names: Vec<&String> = left.iter().map(|(n, _)| n).collect();
    for (name, _) in right {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
        .into_iter()
        .map(|name| {
            let old = left.iter().find(|(n, _)| n == name).map(|(_, v)| joined(v));
            let new = right.iter().find(|(n, _)| n == name).map(|(_, v)| joined(v));
            HeaderDiff {
                name: name.clone(),
                change: classify(old.as_deref(), new.as_deref()),
                old,
                new,
            }
        })
        .collect()
}

fn split_lines(s: &str) -> Vec<&str> {
    s.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}

/// Zip both sides line by line; equal lines are context, differing
/// positions emit `- old` then `+ new` when each side has a line.
fn unified_diff(left: &str, right: &str) -> Vec<String> {
    let a = split_lines(left);
    let b = split_lines(right);
    let mut out = Vec::new();
    for i in 0..a.len().max(b.len()) {
        match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) if x == y => out.push(format!("  {}", x)),
            (old, new) => {
                if let Some(x) = old {
                    out.push(format!("- {}", x));
                }
                if let Some(y) = new {
                    out.push(format!("+ {}", y));
                }
            }
        }
    }
    out
}

fn escape_char(c: char) -> String {
    match c {
        '\r' => "\\r".to_string(),
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\0' => "\\0".to_string(),
        c if (' '..='~').contains(&c) => c.to_string(),
        c => format!("\\x{:02x}", c as u32),
    }
}

/// Position-by-position character diff over `max(len, len)` indices.
fn char_diff(left: &str, right: &str) -> Vec<CharDiff> {
    let a: Vec<char> = left.chars().collect();
    let b: Vec<char> = right.chars().collect();
    let mut out = Vec::new();
    for i in 0..a.len().max(b.len()) {
        let old = a.get(i).copied();
        let new = b.get(i).copied();
        if old != new {
            out.push(CharDiff {
                index: i,
                old: old.map(escape_char),
                new: new.map(escape_char),
            });
        }
    }
    out
}

/// Diff two parsed responses.
pub fn diff_responses(left: &ParsedResponse, right: &ParsedResponse) -> Diff {
    let fields = vec![
        field_diff(
            "http_version",
            Some(&left.http_version),
            Some(&right.http_version),
        ),
        field_diff(
            "status_code",
            Some(&left.status_code.to_string()),
            Some(&right.status_code.to_string()),
        ),
        field_diff(
            "status_message",
            Some(&left.status_message),
            Some(&right.status_message),
        ),
        field_diff(
            "body",
            Some(&left.body_string()),
            Some(&right.body_string()),
        ),
    ];
    let timing = match (&left.timing, &right.timing) {
        (Some(a), Some(b)) => Some(TimingDiff {
            ttfb_diff: b.ttfb as i64 - a.ttfb as i64,
            total_diff: b.total as i64 - a.total as i64,
        }),
        _ => None,
    };
    Diff {
        fields,
        headers: header_diffs(&left.headers, &right.headers),
        unified: unified_diff(&left.raw_string, &right.raw_string),
        chars: char_diff(&left.raw_string, &right.raw_string),
        timing,
    }
}

/// Diff two raw responses, parsing each side first.
pub fn diff_response_bytes(left: &[u8], right: &[u8]) -> Diff {
    diff_responses(&parse_response(left), &parse_response(right))
}

/// Diff two raw requests: request-line scalars, headers (same
/// header/body split as response parsing), lines, chars.
pub fn diff_requests(left: &[u8], right: &[u8]) -> Diff {
    let a = parse_request_view(left);
    let b = parse_request_view(right);
    let fields = vec![
        field_diff("method", Some(&a.method), Some(&b.method)),
        field_diff("target", Some(&a.target), Some(&b.target)),
        field_diff("version", Some(&a.version), Some(&b.version)),
        field_diff("body", Some(&a.body), Some(&b.body)),
    ];
    Diff {
        fields,
        headers: header_diffs(&a.headers, &b.headers),
        unified: unified_diff(&a.raw, &b.raw),
        chars: char_diff(&a.raw, &b.raw),
        timing: None,
    }
}

struct RequestView {
    raw: String,
    method: String,
    target: String,
    version: String,
    headers: Vec<(String, Vec<String>)>,
    body: String,
}

fn parse_request_view(raw: &[u8]) -> RequestView {
    let raw_string = String::from_utf8_lossy(raw).into_owned();
    let (head, body) = split_head_body(raw);
    let mut lines = head.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.splitn(3, ' ');
    let method = parts.next().unwrap_or("").to_string();
    let target = parts.next().unwrap_or("").to_string();
    let version = parts.next().unwrap_or("").to_string();
    let mut headers: Vec<(String, Vec<String>)> = Vec::new();
    for line in lines {
        match line.find(':') {
            Some(0) | None => continue,
            Some(colon) => {
                let name = line[..colon].trim().to_ascii_lowercase();
                let value = line[colon + 1..].trim().to_string();
                crate::http::response::push_header(&mut headers, name, value);
            }
        }
    }
    RequestView {
        raw: raw_string,
        method,
        target,
        version,
        headers,
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

pub fn is_identical(diff: &Diff) -> bool {
    diff.fields.iter().all(|f| f.change == Change::Unchanged)
        && diff.headers.iter().all(|h| h.change == Change::Unchanged)
        && diff.chars.is_empty()
}

/// One-line rollup for logs and reports.
pub fn summarize(diff: &Diff) -> String {
    if is_identical(diff) {
        return "identical".to_string();
    }
    let fields = diff
        .fields
        .iter()
        .filter(|f| f.change != Change::Unchanged)
        .count();
    let headers = diff
        .headers
        .iter()
        .filter(|h| h.change != Change::Unchanged)
        .count();
    let mut summary = format!(
        "{} field(s), {} header(s), {} char position(s) differ",
        fields,
        headers,
        diff.chars.len()
    );
    if let Some(t) = &diff.timing {
        summary.push_str(&format!(
            "; ttfb {:+}ms total {:+}ms",
            t.ttfb_diff, t.total_diff
        ));
    }
    summary
}
