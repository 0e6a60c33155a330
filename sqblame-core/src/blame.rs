//! SCM blame entries and the per-run blame table

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::issue::ComponentContext;

/// Blame for one source line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameEntry {
    pub line: u32,
    /// Commit hash
    pub revision: String,
    /// Commit author, usually an email
    pub author: String,
    /// Commit timestamp as reported by the server
    pub date: String,
}

/// Sparse line -> blame map for one component context
pub type BlameLines = HashMap<u32, BlameEntry>;

/// Blame for every component context of a run
///
/// A context is inserted whole, once. Later inserts for the same context are
/// ignored so the first fetched table stays authoritative.
#[derive(Debug, Default)]
pub struct BlameTable {
    contexts: HashMap<ComponentContext, BlameLines>,
}

impl BlameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether blame has been recorded (possibly empty) for a context
    pub fn contains(&self, ctx: &ComponentContext) -> bool {
        self.contexts.contains_key(ctx)
    }

    /// Record blame for a context; returns false if it was already present
    pub fn insert(&mut self, ctx: ComponentContext, lines: BlameLines) -> bool {
        if self.contexts.contains_key(&ctx) {
            return false;
        }
        self.contexts.insert(ctx, lines);
        true
    }

    pub fn lines(&self, ctx: &ComponentContext) -> Option<&BlameLines> {
        self.contexts.get(ctx)
    }

    /// Blame for an exact line of a context
    pub fn lookup(&self, ctx: &ComponentContext, line: u32) -> Option<&BlameEntry> {
        self.contexts.get(ctx).and_then(|lines| lines.get(&line))
    }

    /// Number of contexts recorded
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Total blamed lines across contexts
    pub fn entry_count(&self) -> usize {
        self.contexts.values().map(HashMap::len).sum()
    }
}

/// Body of `/api/sources/scm`
///
/// Accepts `{"scm": [[line, revision, author, date], ...]}`,
/// `{"scm": [{"line", "author", "date", "revision"}, ...]}` and the older
/// `lines` key. For the array form, rows shaped like the server's native
/// `[line, author, date, revision]` are recognized by where the timestamp
/// sits.
#[derive(Debug, Default, Deserialize)]
pub struct ScmResponse {
    #[serde(default)]
    scm: Option<Vec<Value>>,
    #[serde(default)]
    lines: Option<Vec<Value>>,
}

impl ScmResponse {
    pub fn parse(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    /// Decode rows into a line map, skipping rows without a usable line
    pub fn into_lines(self) -> BlameLines {
        self.scm
            .filter(|rows| !rows.is_empty())
            .or(self.lines)
            .unwrap_or_default()
            .iter()
            .filter_map(decode_row)
            .map(|entry| (entry.line, entry))
            .collect()
    }
}

fn decode_row(row: &Value) -> Option<BlameEntry> {
    match row {
        Value::Array(fields) => decode_array(fields),
        Value::Object(fields) => decode_object(fields),
        _ => None,
    }
}

fn decode_array(fields: &[Value]) -> Option<BlameEntry> {
    let line = line_number(fields.first()?)?;
    let text = |idx: usize| fields.get(idx).map(text_of).unwrap_or_default();
    let (first, second, third) = (text(1), text(2), text(3));

    // Timestamp position decides; without one, fall back to where the hash sits
    let native_order = if looks_like_timestamp(&second) || looks_like_timestamp(&third) {
        looks_like_timestamp(&second) && !looks_like_timestamp(&third)
    } else {
        looks_like_revision(&third) && !looks_like_revision(&first)
    };

    if native_order {
        return Some(BlameEntry {
            line,
            author: first,
            date: second,
            revision: third,
        });
    }

    Some(BlameEntry {
        line,
        revision: first,
        author: second,
        date: third,
    })
}

fn decode_object(fields: &Map<String, Value>) -> Option<BlameEntry> {
    let text = |key: &str| fields.get(key).map(text_of).unwrap_or_default();
    Some(BlameEntry {
        line: line_number(fields.get("line")?)?,
        revision: text("revision"),
        author: text("author"),
        date: text("date"),
    })
}

fn line_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Abbreviated or full commit hash
fn looks_like_revision(s: &str) -> bool {
    (7..=64).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn looks_like_timestamp(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}
