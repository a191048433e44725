//! Extract a JSON object from a raw generator response.
//!
//! Responses arrive with optional markdown code fences, surrounding prose,
//! and sometimes `<think>…</think>` reasoning blocks that can themselves
//! contain draft JSON. The extractor drops think blocks, then scans the
//! remaining text for balanced top-level `{…}` objects and tries them
//! last-first, since generators often draft before finalizing.

/// Remove `<think>…</think>` blocks (case-insensitive). An unterminated
/// opening tag swallows the rest of the text.
pub fn strip_think_blocks(text: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    // ASCII-lowercase keeps byte offsets aligned with the original text.
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let lower: String = rest.chars().map(|c| c.to_ascii_lowercase()).collect();
        match lower.find(OPEN) {
            Some(start) => {
                out.push_str(&rest[..start]);
                let after_open = start + OPEN.len();
                match lower[after_open..].find(CLOSE) {
                    Some(close) => {
                        rest = &rest[after_open + close + CLOSE.len()..];
                    }
                    None => return out,
                }
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Balanced top-level `{…}` spans, string-aware.
fn top_level_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        spans.push(&text[start..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    spans
}

/// Best-effort JSON object extraction; `None` when nothing parses.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let cleaned = strip_think_blocks(text);
    for candidate in top_level_objects(&cleaned).into_iter().rev() {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(candidate) {
            if value.is_object() {
                return Some(value);
            }
        }
    }
    None
}
