//! Recovers a tool invocation or a final answer from one assistant
//! message. The Agent Loop runs this once per turn against whatever the
//! LLM produced, which is never guaranteed to be clean JSON.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// What one assistant message resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    Final(String),
    Call { name: String, args: Value },
    MalformedCall { name: String, diagnostic: String },
    None,
}

static ACTION_HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ACTION:\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

/// Parses one assistant message per the recognized-forms order: `Final
/// Answer:` line, then `ACTION: name({...})` anywhere, then a bare
/// `name({...})` on its own line naming a registered tool.
pub fn parse_assistant_message(text: &str, known_tools: &[String]) -> ParsedMessage {
    if let Some(final_text) = find_final_answer(text) {
        return ParsedMessage::Final(final_text);
    }

    if let Some(outcome) = find_action_call(text) {
        return match outcome {
            Ok((name, args)) => ParsedMessage::Call { name, args },
            Err((name, diagnostic)) => ParsedMessage::MalformedCall { name, diagnostic },
        };
    }

    if let Some(outcome) = find_bare_call(text, known_tools) {
        return match outcome {
            Ok((name, args)) => ParsedMessage::Call { name, args },
            Err((name, diagnostic)) => ParsedMessage::MalformedCall { name, diagnostic },
        };
    }

    ParsedMessage::None
}

/// First line (ignoring leading whitespace) starting with `Final
/// Answer:`, case-insensitive; everything after the marker, to the end
/// of the message, is the answer text.
fn find_final_answer(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let marker = "final answer:";
    let mut search_from = 0;
    loop {
        let idx = lower[search_from..].find(marker)?;
        let abs = search_from + idx;
        let line_start = lower[..abs].rfind('\n').map(|p| p + 1).unwrap_or(0);
        if lower[line_start..abs].trim().is_empty() {
            let after = &text[abs + marker.len()..];
            return Some(after.trim().to_string());
        }
        search_from = abs + 1;
    }
}

/// First `ACTION: name(` anywhere in the message, with the JSON object
/// that follows extracted by brace-depth counting (tolerant of nested
/// objects, intolerant of anything that isn't valid JSON).
fn find_action_call(text: &str) -> Option<Result<(String, Value), (String, String)>> {
    let caps = ACTION_HEAD_RE.captures(text)?;
    let name = caps.get(1)?.as_str().to_lowercase();
    let tail = &text[caps.get(0)?.end()..];
    Some(extract_json_call(&name, tail))
}

/// A bare `name({...})` occupying its own line, where `name` matches a
/// registered tool (case-insensitively).
fn find_bare_call(text: &str, known_tools: &[String]) -> Option<Result<(String, Value), (String, String)>> {
    for line in text.lines() {
        let trimmed = line.trim();
        let Some(paren_idx) = trimmed.find('(') else { continue };
        let candidate = trimmed[..paren_idx].trim();
        if candidate.is_empty() || !candidate.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            continue;
        }
        let normalized = candidate.to_lowercase();
        if !known_tools.iter().any(|t| t.to_lowercase() == normalized) {
            continue;
        }
        if !trimmed.ends_with(')') {
            continue;
        }
        return Some(extract_json_call(&normalized, &trimmed[paren_idx + 1..]));
    }
    None
}

/// Given text starting somewhere before a `{`, finds the matching `}` by
/// depth count and parses the span as JSON.
fn extract_json_call(name: &str, tail: &str) -> Result<(String, Value), (String, String)> {
    let Some(start) = tail.find('{') else {
        return Err((name.to_string(), format!("no JSON object found after '{name}('")));
    };
    let bytes = tail.as_bytes();
    let mut depth = 0i32;
    let mut end = None;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(end) = end else {
        return Err((name.to_string(), format!("unterminated JSON object in call to '{name}'")));
    };
    let json_str = &tail[start..=end];
    match serde_json::from_str::<Value>(json_str) {
        Ok(args) => Ok((name.to_string(), args)),
        Err(err) => Err((name.to_string(), format!("malformed JSON in call to '{name}': {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> Vec<String> {
        vec!["http_request".to_string(), "assert_response".to_string()]
    }

    #[test]
    fn final_answer_wins_over_a_trailing_action() {
        let text = "Thought: done\nFinal Answer: the status is 200\nACTION: http_request({\"url\": \"x\"})";
        assert_eq!(
            parse_assistant_message(text, &tools()),
            ParsedMessage::Final("the status is 200\nACTION: http_request({\"url\": \"x\"})".to_string())
        );
    }

    #[test]
    fn action_form_is_case_insensitive_and_name_normalized() {
        let text = "Thought: checking\nACTION: Http_Request({\"url\": \"http://x\", \"method\": \"GET\"})";
        match parse_assistant_message(text, &tools()) {
            ParsedMessage::Call { name, args } => {
                assert_eq!(name, "http_request");
                assert_eq!(args["url"], "http://x");
            }
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn first_action_wins_when_several_are_present() {
        let text = "ACTION: http_request({\"url\": \"a\"})\nACTION: assert_response({\"expected_status\": 200})";
        match parse_assistant_message(text, &tools()) {
            ParsedMessage::Call { name, .. } => assert_eq!(name, "http_request"),
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn malformed_action_json_is_reported_not_silently_dropped() {
        let text = "ACTION: http_request({'url': 'x'})";
        match parse_assistant_message(text, &tools()) {
            ParsedMessage::MalformedCall { name, .. } => assert_eq!(name, "http_request"),
            other => panic!("expected a malformed call, got {other:?}"),
        }
    }

    #[test]
    fn bare_call_matches_only_registered_tool_names() {
        let text = "http_request({\"url\": \"http://x\"})";
        match parse_assistant_message(text, &tools()) {
            ParsedMessage::Call { name, .. } => assert_eq!(name, "http_request"),
            other => panic!("expected a call, got {other:?}"),
        }

        let text_unknown = "do_a_barrel_roll({\"x\": 1})";
        assert_eq!(parse_assistant_message(text_unknown, &tools()), ParsedMessage::None);
    }

    #[test]
    fn prose_without_any_recognized_form_yields_none() {
        assert_eq!(parse_assistant_message("just thinking out loud here", &tools()), ParsedMessage::None);
    }

    #[test]
    fn nested_json_objects_are_extracted_correctly() {
        let text = "ACTION: assert_response({\"header\": {\"name\": \"x\"}, \"expected_status\": 200})";
        match parse_assistant_message(text, &tools()) {
            ParsedMessage::Call { name, args } => {
                assert_eq!(name, "assert_response");
                assert_eq!(args["header"]["name"], "x");
            }
            other => panic!("expected a call, got {other:?}"),
        }
    }
}
