// SPDX-License-Identifier: Apache-2.0
use serde_json::Value;

use crate::error::LlmError;

/// Implements the four-step JSON extraction ladder from §4.3, in order:
/// (a) parse the whole text as JSON, (b) extract the first fenced
/// ```json``` block, (c) extract the substring from the first `{`/`[` to
/// its matching balanced close, (d) fail with the raw text attached.
/// No step beyond these four is attempted.
pub fn extract_json(text: &str) -> Result<Value, LlmError> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Ok(value);
    }

    if let Some(block) = extract_fenced_json_block(text) {
        if let Ok(value) = serde_json::from_str::<Value>(&block) {
            return Ok(value);
        }
    }

    if let Some(balanced) = extract_balanced_span(text) {
        if let Ok(value) = serde_json::from_str::<Value>(&balanced) {
            return Ok(value);
        }
    }

    Err(LlmError::JsonExtractFailed {
        raw_text: text.to_string(),
    })
}

fn extract_fenced_json_block(text: &str) -> Option<String> {
    let start_marker = "```json";
    let start = text.find(start_marker)? + start_marker.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim().to_string())
}

/// Finds the first `{` or `[` and returns the substring up to its
/// matching balanced close, tracking string literals so braces inside
/// quoted strings are not counted.
fn extract_balanced_span(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{' || b == b'[')?;
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(text[start..end].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
