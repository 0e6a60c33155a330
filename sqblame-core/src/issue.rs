//! Issue records as returned by `/api/issues/search`
//!
//! Issues are decoded field by field with fixed defaults, so a record with
//! missing or oddly typed fields still produces a [`RawIssue`]:
//!
//! | field                                | default                 |
//! |--------------------------------------|-------------------------|
//! | string fields (`key`, `rule`, ...)   | `""`                    |
//! | `line`, `textRange`                  | absent                  |
//! | `tags`                               | empty list              |
//! | `branch`, `pullRequest`              | absent                  |
//!
//! Numbers found where strings are expected keep their decimal text.
//! Lines that are not non-negative integers (or numeric strings) are absent.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Location of an issue within its file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRange {
    #[serde(deserialize_with = "lenient::line")]
    pub start_line: Option<u32>,
}

/// A single issue from the search endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawIssue {
    #[serde(deserialize_with = "lenient::string")]
    pub key: String,
    #[serde(deserialize_with = "lenient::string")]
    pub rule: String,
    #[serde(deserialize_with = "lenient::string")]
    pub severity: String,
    #[serde(rename = "type", deserialize_with = "lenient::string")]
    pub issue_type: String,
    #[serde(deserialize_with = "lenient::string")]
    pub message: String,
    /// Component key, e.g. `my-project:src/main.rs`
    #[serde(deserialize_with = "lenient::string")]
    pub component: String,
    #[serde(deserialize_with = "lenient::string")]
    pub project: String,
    /// Legacy flat line field
    #[serde(deserialize_with = "lenient::line")]
    pub line: Option<u32>,
    #[serde(deserialize_with = "lenient::text_range")]
    pub text_range: Option<TextRange>,
    /// SCM author the server attributed the issue to
    #[serde(deserialize_with = "lenient::string")]
    pub author: String,
    #[serde(deserialize_with = "lenient::string")]
    pub assignee: String,
    #[serde(deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(deserialize_with = "lenient::string")]
    pub creation_date: String,
    #[serde(deserialize_with = "lenient::string")]
    pub update_date: String,
    /// Remediation effort, e.g. `5min`
    #[serde(deserialize_with = "lenient::string")]
    pub effort: String,
    #[serde(deserialize_with = "lenient::tags")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub branch: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub pull_request: Option<String>,
}

impl RawIssue {
    /// Decode one element of the `issues` array
    ///
    /// Never fails: anything that is not an object becomes an all-default
    /// issue so the number of records is preserved.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "Malformed issue record, using defaults");
            Self::default()
        })
    }

    /// Line the issue points at, preferring `textRange.startLine`
    pub fn line(&self) -> Option<u32> {
        self.text_range
            .as_ref()
            .and_then(|r| r.start_line)
            .or(self.line)
    }

    /// Component context, falling back to the query's scope for branch/PR
    pub fn context(&self, scope: &ScmScope) -> Option<ComponentContext> {
        if self.component.is_empty() {
            return None;
        }
        Some(ComponentContext {
            component: self.component.clone(),
            branch: self.branch.clone().or_else(|| scope.branch.clone()),
            pull_request: self
                .pull_request
                .clone()
                .or_else(|| scope.pull_request.clone()),
        })
    }

    /// Context and line for issues that can be blamed
    pub fn locate(&self, scope: &ScmScope) -> Option<(ComponentContext, u32)> {
        let line = self.line()?;
        Some((self.context(scope)?, line))
    }

    /// File path portion of the component key
    pub fn file_path(&self) -> &str {
        file_path_of(&self.component)
    }
}

/// Branch / pull request the search ran under
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ScmScope {
    pub branch: Option<String>,
    pub pull_request: Option<String>,
}

/// One source file under one review context
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComponentContext {
    pub component: String,
    pub branch: Option<String>,
    pub pull_request: Option<String>,
}

impl ComponentContext {
    /// Create a context for a component under a scope
    pub fn new(component: impl Into<String>, scope: &ScmScope) -> Self {
        Self {
            component: component.into(),
            branch: scope.branch.clone(),
            pull_request: scope.pull_request.clone(),
        }
    }

    /// File path portion of the component key
    pub fn file_path(&self) -> &str {
        file_path_of(&self.component)
    }
}

impl fmt::Display for ComponentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.component)?;
        if let Some(ref branch) = self.branch {
            write!(f, "@{}", branch)?;
        }
        if let Some(ref pr) = self.pull_request {
            write!(f, "#{}", pr)?;
        }
        Ok(())
    }
}

/// `my-project:src/Foo.java` -> `src/Foo.java`
fn file_path_of(component: &str) -> &str {
    component
        .split_once(':')
        .map(|(_, path)| path)
        .unwrap_or(component)
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::TextRange;

    fn scalar(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(scalar(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar(Value::deserialize(d)?).filter(|s| !s.is_empty()))
    }

    pub fn line<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn tags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items.into_iter().filter_map(scalar).collect(),
            Value::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn text_range<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TextRange>, D::Error> {
        Ok(match Value::deserialize(d)? {
            v @ Value::Object(_) => serde_json::from_value(v).ok(),
            _ => None,
        })
    }
}
