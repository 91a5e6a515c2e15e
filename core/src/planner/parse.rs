//! Parsing of free-form planner and worker output.
//!
//! Model output is often fenced in markdown, contains raw newlines inside JSON
//! strings, carries trailing commas or is cut off mid-object. Each parser tries
//! a strict parse first and falls back to progressively looser repairs.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{ProtocolError, SwarmError};
use crate::executor::types::{normalize_path, Batch, Domain, Handoff, HandoffStatus, Task};

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)```").expect("valid fence regex"))
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid comma regex"))
}

/// Remove up to three nested markdown fences around a JSON payload.
pub fn strip_markdown_fences(text: &str) -> String {
    let mut result = text.to_string();
    for _ in 0..3 {
        let Some(inner) = fence_re()
            .captures(&result)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
        else {
            break;
        };
        let looks_like_json = inner.starts_with('{')
            || inner.starts_with('[')
            || inner.chars().take(20).any(|c| c == '"');
        if inner.is_empty() || !looks_like_json {
            break;
        }
        result = inner;
    }
    result
}

/// Escape raw newlines, carriage returns and tabs that appear inside JSON strings.
pub fn fix_literal_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if !in_string {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
            continue;
        }
        match ch {
            '\\' => {
                out.push(ch);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '"' => {
                in_string = false;
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Close brackets and braces left open by a truncated payload, innermost first.
fn close_truncated(text: &str) -> Option<String> {
    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if in_string {
            match ch {
                '\\' => {
                    chars.next();
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.last() == Some(&ch) {
                    open.pop();
                }
            }
            _ => {}
        }
    }

    if open.is_empty() {
        return None;
    }
    let mut out = text.trim_end().to_string();
    if in_string {
        out.push('"');
    }
    out.extend(open.iter().rev());
    Some(out)
}

/// Parse `text` as JSON, applying newline, trailing-comma and truncation repairs in turn.
pub fn parse_lenient(text: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str(text) {
        return Some(v);
    }
    let repaired = fix_literal_newlines(text);
    if let Ok(v) = serde_json::from_str(&repaired) {
        return Some(v);
    }
    let repaired = trailing_comma_re().replace_all(&repaired, "$1").to_string();
    if let Ok(v) = serde_json::from_str(&repaired) {
        return Some(v);
    }
    close_truncated(&repaired).and_then(|closed| serde_json::from_str(&closed).ok())
}

fn span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Extract the outermost JSON object (or array) from model output.
pub fn extract_json(text: &str) -> Result<Value, ProtocolError> {
    let cleaned = strip_markdown_fences(text.trim());
    let array_first = match (cleaned.find('['), cleaned.find('{')) {
        (Some(a), Some(o)) => a < o,
        (Some(_), None) => true,
        _ => false,
    };
    let spans = if array_first {
        [('[', ']'), ('{', '}')]
    } else {
        [('{', '}'), ('[', ']')]
    };
    for (open, close) in spans {
        if let Some(v) = span(&cleaned, open, close).and_then(parse_lenient) {
            return Ok(v);
        }
    }
    // A truncated object has no closing brace to anchor the span.
    if let Some(v) = cleaned
        .find('{')
        .and_then(|start| parse_lenient(&cleaned[start..]))
    {
        return Ok(v);
    }
    Err(ProtocolError::Malformed(format!(
        "no JSON payload in response ({} bytes)",
        text.len()
    )))
}

/// Pull every complete `{...}` element out of the array that follows `"key": [`.
fn salvage_array_objects(text: &str, key: &str) -> Vec<Value> {
    let Ok(re) = Regex::new(&format!(r#""{}"\s*:\s*\["#, regex::escape(key))) else {
        return Vec::new();
    };
    let Some(m) = re.find(text) else {
        return Vec::new();
    };
    let rest = &text[m.end()..];

    let mut found = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in rest.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        if let Some(v) = parse_lenient(&rest[s..=i]) {
                            found.push(v);
                        }
                    }
                }
            }
            ']' if depth == 0 => break,
            _ => {}
        }
    }
    found
}

fn salvage_string_field(text: &str, key: &str) -> Option<String> {
    let re = Regex::new(&format!(r#""{}"\s*:\s*"((?:[^"\\]|\\.)*)""#, regex::escape(key))).ok()?;
    let raw = re.captures(text)?.get(1)?.as_str().to_string();
    Some(serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or(raw))
}

#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    scope: Option<Vec<String>>,
    #[serde(default)]
    acceptance: Option<String>,
    #[serde(default)]
    priority: Option<i32>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    team: Option<String>,
    #[serde(default, alias = "dependsOn")]
    depends_on: Option<Vec<String>>,
}

/// Parse a planner reply of the form
/// `{scratchpad, tasks: [{id, description, scope, acceptance, priority, domain|team, depends_on}]}`.
///
/// Tasks without a description are dropped. Missing ids become
/// `{id_prefix}-{n:03}`. An unknown domain tag is a validation error.
pub fn parse_planner_response(text: &str, id_prefix: &str) -> Result<Batch, SwarmError> {
    let (scratchpad, raw_tasks) = match extract_json(text) {
        Ok(Value::Object(mut obj)) if obj.get("tasks").is_some_and(Value::is_array) => {
            let scratchpad = obj
                .remove("scratchpad")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let tasks = match obj.remove("tasks") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            (scratchpad, tasks)
        }
        Ok(Value::Array(items)) => (String::new(), items),
        other => {
            let salvaged = salvage_array_objects(text, "tasks");
            if salvaged.is_empty() {
                return Err(match other {
                    Err(e) => e.into(),
                    Ok(_) => ProtocolError::Malformed("response has no task list".into()).into(),
                });
            }
            warn!(tasks = salvaged.len(), bytes = text.len(), "salvaged tasks from malformed planner response");
            let scratchpad = salvage_string_field(text, "scratchpad").unwrap_or_default();
            (scratchpad, salvaged)
        }
    };

    let mut tasks = Vec::new();
    for value in raw_tasks {
        let raw: RawTask = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "skipping malformed task entry");
                continue;
            }
        };
        if raw.description.trim().is_empty() {
            continue;
        }
        let id = raw
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("{id_prefix}-{:03}", tasks.len() + 1));
        let domain = match raw.domain.or(raw.team) {
            Some(tag) => tag.parse::<Domain>()?,
            None => Domain::default(),
        };
        let mut task = Task::new(id.trim(), raw.description)
            .with_scope(raw.scope.unwrap_or_default())
            .with_domain(domain)
            .depends_on(
                raw.depends_on
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|d| !d.trim().is_empty()),
            );
        if let Some(p) = raw.priority {
            task = task.with_priority(p);
        }
        if let Some(a) = raw.acceptance {
            task = task.with_acceptance(a);
        }
        tasks.push(task);
    }

    Ok(Batch::new(scratchpad, tasks))
}

#[derive(Debug, Deserialize, Default)]
struct RawHandoff {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    concerns: Vec<Value>,
    #[serde(default)]
    suggestions: Vec<Value>,
    #[serde(default)]
    tokens_used: Option<u64>,
}

fn handoff_status(raw: Option<&str>, default: HandoffStatus) -> HandoffStatus {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        Some(s) if s == "complete" || s == "completed" || s == "success" => HandoffStatus::Complete,
        Some(s) if s == "partial" => HandoffStatus::Partial,
        Some(s) if s == "blocked" => HandoffStatus::Blocked,
        Some(s) if s == "failed" || s == "failure" || s == "error" => HandoffStatus::Failed,
        _ => default,
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn file_operation(v: &Value) -> Option<(String, String)> {
    let path = normalize_path(v.get("path")?.as_str()?);
    let content = v.get("content")?.as_str()?.to_string();
    (!path.is_empty()).then_some((path, content))
}

/// Parse a worker reply `{handoff: {...}, file_operations: [{path, content}]}`.
///
/// Never fails: unusable output becomes a failed handoff, and a malformed
/// payload yields whatever file operations can be salvaged.
pub fn parse_worker_response(text: &str, task_id: &str) -> Handoff {
    let parsed = extract_json(text).ok().filter(Value::is_object);

    let Some(obj) = parsed else {
        let ops: Vec<(String, String)> = salvage_array_objects(text, "file_operations")
            .iter()
            .filter_map(file_operation)
            .collect();
        if ops.is_empty() {
            return Handoff::failed(task_id, "No JSON object in worker response");
        }
        let default = HandoffStatus::Partial;
        let status = handoff_status(salvage_string_field(text, "status").as_deref(), default);
        let summary = salvage_string_field(text, "summary").unwrap_or_else(|| {
            format!("Salvaged {} file operations from malformed response", ops.len())
        });
        let mut handoff = Handoff::new(task_id, status)
            .with_summary(summary)
            .with_concern("Worker response was malformed; salvaged what was possible");
        handoff.metrics.files_created = ops.len() as u32;
        handoff.artifacts.extend(ops);
        return handoff;
    };

    let raw: RawHandoff = obj
        .get("handoff")
        .cloned()
        .and_then(|h| serde_json::from_value(h).ok())
        .unwrap_or_default();

    let mut handoff = Handoff::new(
        task_id,
        handoff_status(raw.status.as_deref(), HandoffStatus::Complete),
    )
    .with_summary(raw.summary);
    handoff.concerns = raw.concerns.iter().map(value_text).collect();
    handoff.suggestions = raw.suggestions.iter().map(value_text).collect();
    handoff.metrics.tokens_used = raw.tokens_used.unwrap_or(0);

    if let Some(Value::Array(ops)) = obj.get("file_operations") {
        for (path, content) in ops.iter().filter_map(file_operation) {
            handoff.artifacts.insert(path, content);
        }
    }
    handoff.metrics.files_created = handoff.artifacts.len() as u32;
    handoff
}
