//! Repair for endpoints that emit JSON objects back to back.
//!
//! Accepted grammar: `ws* (object ws*)*`, where `object` is any balanced JSON
//! object. The scanner tracks string and escape state, so a literal `}{` inside a
//! string value is left alone. The repaired text is a JSON array of the objects
//! in input order; an input that is already an array passes through unchanged.

use crate::error::{HuntError, Result};

pub fn repair_concatenated_objects(body: &str) -> Result<String> {
    let trimmed = body.trim();
    if trimmed.starts_with('[') {
        return Ok(trimmed.to_string());
    }

    let mut objects: Vec<&str> = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in body.bytes().enumerate() {
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
                if depth == 0 {
                    return Err(malformed(i, "unbalanced closing brace"));
                }
                depth -= 1;
                if depth == 0 {
                    objects.push(&body[start..=i]);
                }
            }
            _ if depth > 0 => {}
            b' ' | b'\t' | b'\r' | b'\n' => {}
            other => {
                return Err(malformed(
                    i,
                    &format!("unexpected {:?} between objects", other as char),
                ))
            }
        }
    }

    if depth > 0 || in_string {
        return Err(malformed(body.len(), "unterminated object"));
    }

    Ok(format!("[{}]", objects.join(",")))
}

fn malformed(offset: usize, detail: &str) -> HuntError {
    HuntError::MalformedJson {
        offset,
        detail: detail.to_string(),
    }
}
