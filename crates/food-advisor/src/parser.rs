/// Schema-guided extraction of structured fields from language-model output.
///
/// Models rarely return exactly the requested payload: the object may be fenced, wrapped
/// in prose, single-quoted, or reduced to a bare `key: value` line. Candidates are tried
/// from most to least structured:
/// 1. fenced code blocks (```` ```json ```` or bare ```` ``` ````) holding an object
/// 2. any balanced `{ ... }` span in the text
/// 3. a per-field `key: value` scan
///
/// Objects are decoded with [`crate::literal`], so both JSON and Python-style quoting work.
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::literal;
use crate::schema::{ResponseSchema, QUERY_STRING_FIELD};

static FENCED_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("response has no '{field}' field")]
    MissingField { field: String },

    #[error("field '{field}' is empty")]
    EmptyField { field: String },

    #[error("field '{field}' is not text")]
    NotText { field: String },
}

/// Extract every declared field as text.
pub fn parse_response(
    schema: &ResponseSchema,
    response: &str,
) -> Result<HashMap<String, String>, ParseError> {
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name).collect();

    for candidate in object_candidates(response) {
        let Some(object) = decode_object(&candidate) else {
            continue;
        };
        if names.iter().all(|name| object.contains_key(*name)) {
            debug!("structured response decoded from object");
            return names
                .iter()
                .map(|name| {
                    let text = value_text(name, &object[*name])?;
                    Ok((name.to_string(), text))
                })
                .collect();
        }
    }

    names
        .iter()
        .map(|name| {
            let raw = scan_field(response, name).ok_or_else(|| ParseError::MissingField {
                field: name.to_string(),
            })?;
            let text = non_empty(name, raw)?;
            Ok((name.to_string(), text))
        })
        .collect()
}

/// Extract the similarity-search query from a synthesizer response.
pub fn parse_query(schema: &ResponseSchema, response: &str) -> Result<String, ParseError> {
    let mut fields = parse_response(schema, response)?;
    fields
        .remove(QUERY_STRING_FIELD)
        .ok_or_else(|| ParseError::MissingField {
            field: QUERY_STRING_FIELD.to_string(),
        })
}

/// Candidate object texts, most structured first.
fn object_candidates(response: &str) -> Vec<String> {
    let mut candidates: Vec<String> = FENCED_BLOCK_RE
        .captures_iter(response)
        .map(|caps| caps[1].trim().to_string())
        .collect();
    candidates.extend(balanced_objects(response));
    candidates
}

/// Every top-level `{ ... }` span, honouring quotes so braces inside strings don't count.
fn balanced_objects(text: &str) -> Vec<String> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' if depth > 0 => quote = Some(c),
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(text[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    spans
}

fn decode_object(candidate: &str) -> Option<serde_json::Map<String, Value>> {
    match literal::decode(&strip_line_comments(candidate)) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Drop `// ...` comments that models copy over from the format instructions.
fn strip_line_comments(text: &str) -> String {
    text.lines()
        .map(|line| {
            let mut quote: Option<char> = None;
            let mut escaped = false;
            let mut prev = '\0';
            for (i, c) in line.char_indices() {
                match quote {
                    Some(q) => {
                        if escaped {
                            escaped = false;
                        } else if c == '\\' {
                            escaped = true;
                        } else if c == q {
                            quote = None;
                        }
                    }
                    None => {
                        if c == '"' || c == '\'' {
                            quote = Some(c);
                        } else if c == '/' && prev == '/' {
                            return &line[..i - 1];
                        }
                    }
                }
                prev = c;
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find `name: value` (key optionally quoted, `:` or `=`) and return the value text.
fn scan_field(response: &str, name: &str) -> Option<String> {
    let key = regex::escape(name);
    let pattern = format!(
        r#"["']?\b{key}\b["']?\s*[:=]\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)'|([^\r\n]+))"#
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(response)?;

    if let Some(m) = caps.get(1) {
        return Some(unescape_double_quoted(m.as_str()));
    }
    if let Some(m) = caps.get(2) {
        return Some(m.as_str().replace("\\'", "'"));
    }
    caps.get(3).map(|m| {
        m.as_str()
            .trim()
            .trim_end_matches([',', '}'])
            .trim()
            .to_string()
    })
}

fn unescape_double_quoted(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}

fn value_text(name: &str, value: &Value) -> Result<String, ParseError> {
    match value {
        Value::String(s) => non_empty(name, s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Err(ParseError::EmptyField {
            field: name.to_string(),
        }),
        _ => Err(ParseError::NotText {
            field: name.to_string(),
        }),
    }
}

fn non_empty(name: &str, text: String) -> Result<String, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyField {
            field: name.to_string(),
        });
    }
    Ok(trimmed.to_string())
}
