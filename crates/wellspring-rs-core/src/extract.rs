//! Structured extraction from free-form generation output.
//!
//! Every structured reply passes through [`extract`]. Recovery is tiered:
//!
//! 1. the whole (trimmed) text parses as the target shape;
//! 2. a candidate span inside the text parses, possibly after light repair;
//! 3. nothing parses and the shape's default value is returned.
//!
//! Tier 3 is a soft failure. Callers inspect [`Extraction::is_degraded`]
//! and decide whether the default is acceptable.

use log::{debug, warn};
use regex::Regex;
use serde::de::DeserializeOwned;

/// Maximum number of opening brackets tried as span starts.
const MAX_SPAN_STARTS: usize = 16;

/// Outcome of one extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    /// The whole reply was a valid document.
    Parsed(T),
    /// A document was found inside surrounding prose or fences.
    Recovered(T),
    /// Nothing parsed; `value` is the shape's default.
    Degraded { value: T, reason: String },
}

impl<T> Extraction<T> {
    pub fn value(&self) -> &T {
        match self {
            Extraction::Parsed(value) | Extraction::Recovered(value) => value,
            Extraction::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Extraction::Parsed(value) | Extraction::Recovered(value) => value,
            Extraction::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Extraction::Degraded { .. })
    }

    /// The parsed value, or `None` when degraded.
    pub fn into_parsed(self) -> Option<T> {
        match self {
            Extraction::Parsed(value) | Extraction::Recovered(value) => Some(value),
            Extraction::Degraded { .. } => None,
        }
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Extraction::Degraded { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extraction<U> {
        match self {
            Extraction::Parsed(value) => Extraction::Parsed(f(value)),
            Extraction::Recovered(value) => Extraction::Recovered(f(value)),
            Extraction::Degraded { value, reason } => Extraction::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}

/// Extract a `T` from raw generation output. Never fails.
pub fn extract<T>(raw: &str) -> Extraction<T>
where
    T: DeserializeOwned + Default,
{
    let trimmed = raw.trim();
    let shape = short_type_name::<T>();
    if trimmed.is_empty() {
        warn!("extraction degraded (shape={}, reason=empty reply)", shape);
        return Extraction::Degraded {
            value: T::default(),
            reason: "empty reply".to_string(),
        };
    }

    let first_error = match serde_json::from_str::<T>(trimmed) {
        Ok(value) => return Extraction::Parsed(value),
        Err(err) => err.to_string(),
    };

    for candidate in candidates(trimmed) {
        if let Some(value) = parse_candidate::<T>(&candidate) {
            debug!(
                "extraction recovered (shape={}, span_len={})",
                shape,
                candidate.len()
            );
            return Extraction::Recovered(value);
        }
    }

    warn!(
        "extraction degraded (shape={}, reason={})",
        shape, first_error
    );
    Extraction::Degraded {
        value: T::default(),
        reason: first_error,
    }
}

fn parse_candidate<T: DeserializeOwned>(candidate: &str) -> Option<T> {
    if let Ok(value) = serde_json::from_str::<T>(candidate) {
        return Some(value);
    }
    if let Ok(value) = json5::from_str::<T>(candidate) {
        return Some(value);
    }
    let repaired = repair(candidate);
    if let Ok(value) = serde_json::from_str::<T>(&repaired) {
        return Some(value);
    }
    json5::from_str::<T>(&repaired).ok()
}

/// Candidate spans in priority order, without duplicates.
fn candidates(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |span: &str| {
        let span = span.trim();
        if !span.is_empty() && !out.iter().any(|existing| existing == span) {
            out.push(span.to_string());
        }
    };

    for fenced in fenced_blocks(text) {
        push(&fenced);
    }
    if let Some(span) = greedy_span(text) {
        push(span);
    }
    for span in balanced_spans(text) {
        push(span);
    }
    out
}

fn fenced_blocks(text: &str) -> Vec<String> {
    let Ok(fence) = Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*\n?(.*?)```") else {
        return Vec::new();
    };
    fence
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Leftmost opener to the rightmost matching closer.
fn greedy_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

/// Depth-balanced spans starting at each of the first few openers.
fn balanced_spans(text: &str) -> Vec<&str> {
    text.char_indices()
        .filter(|(_, ch)| *ch == '{' || *ch == '[')
        .take(MAX_SPAN_STARTS)
        .filter_map(|(start, _)| balanced_from(text, start))
        .collect()
}

fn balanced_from(text: &str, start: usize) -> Option<&str> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Fix common near-JSON mistakes: trailing commas and bare unit values.
///
/// Only text outside string literals is rewritten.
fn repair(candidate: &str) -> String {
    let normalized = candidate
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let trailing = Regex::new(r",\s*([}\]])").ok();
    let bare_unit = Regex::new(
        r#":\s*(-?\d+(?:\.\d+)?(?:\s*-\s*\d+(?:\.\d+)?)?\s*[A-Za-z%][A-Za-z% ]*?)\s*([,}\]\n])"#,
    )
    .ok();
    map_outside_strings(&normalized, |segment| {
        let mut fixed = segment.to_string();
        if let Some(trailing) = &trailing {
            fixed = trailing.replace_all(&fixed, "$1").into_owned();
        }
        if let Some(bare_unit) = &bare_unit {
            fixed = bare_unit.replace_all(&fixed, ": \"$1\"$2").into_owned();
        }
        fixed
    })
}

/// Apply `f` to every run of text between string literals, copying the
/// literals through untouched.
fn map_outside_strings(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut segment_start = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    in_string = false;
                    out.push_str(&text[segment_start..=idx]);
                    segment_start = idx + 1;
                }
                _ => {}
            }
            continue;
        }
        if ch == '"' {
            out.push_str(&f(&text[segment_start..idx]));
            segment_start = idx;
            in_string = true;
        }
    }
    let tail = &text[segment_start..];
    if in_string {
        out.push_str(tail);
    } else {
        out.push_str(&f(tail));
    }
    out
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
