//! Merging issues with their blame into flat output records

use serde::{Deserialize, Serialize};

use crate::blame::BlameTable;
use crate::issue::{RawIssue, ScmScope};

/// An issue merged with the blame of its line
///
/// Field order is the output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedIssue {
    #[serde(rename = "issueKey")]
    pub issue_key: String,
    pub rule: String,
    pub severity: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub message: String,
    pub project: String,
    pub component: String,
    pub line: Option<u32>,
    pub scm_author: String,
    pub scm_revision: String,
    pub scm_date: String,
    pub assignee: String,
    pub status: String,
    /// SCM author the server attributed the issue to
    pub author: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "creationDate")]
    pub creation_date: String,
    #[serde(rename = "updateDate")]
    pub update_date: String,
    pub effort: String,
    /// Comma-joined tags
    pub tags: String,
}

impl EnrichedIssue {
    /// Column names in serialization order
    pub const FIELDS: [&'static str; 19] = [
        "issueKey",
        "rule",
        "severity",
        "type",
        "message",
        "project",
        "component",
        "line",
        "scm_author",
        "scm_revision",
        "scm_date",
        "assignee",
        "status",
        "author",
        "filePath",
        "creationDate",
        "updateDate",
        "effort",
        "tags",
    ];

    /// Whether blame was found for this issue's line
    pub fn has_blame(&self) -> bool {
        !self.scm_revision.is_empty() || !self.scm_author.is_empty()
    }

    /// Who to credit: blame author, then issue author
    pub fn committer(&self) -> Option<&str> {
        [self.scm_author.as_str(), self.author.as_str()]
            .into_iter()
            .find(|s| !s.is_empty())
    }
}

impl From<RawIssue> for EnrichedIssue {
    fn from(issue: RawIssue) -> Self {
        let line = issue.line();
        let file_path = issue.file_path().to_string();

        EnrichedIssue {
            issue_key: issue.key,
            rule: issue.rule,
            severity: issue.severity,
            issue_type: issue.issue_type,
            message: issue.message,
            project: issue.project,
            component: issue.component,
            line,
            assignee: issue.assignee,
            status: issue.status,
            author: issue.author,
            file_path,
            creation_date: issue.creation_date,
            update_date: issue.update_date,
            effort: issue.effort,
            tags: issue.tags.join(","),
            ..Default::default()
        }
    }
}

/// Join every issue with its line's blame, one record per issue
pub fn enrich(issues: Vec<RawIssue>, scope: &ScmScope, blame: &BlameTable) -> Vec<EnrichedIssue> {
    issues
        .into_iter()
        .map(|issue| {
            let entry = issue
                .locate(scope)
                .and_then(|(ctx, line)| blame.lookup(&ctx, line))
                .cloned();

            let mut record = EnrichedIssue::from(issue);
            if let Some(entry) = entry {
                record.scm_author = entry.author;
                record.scm_revision = entry.revision;
                record.scm_date = entry.date;
            }
            record
        })
        .collect()
}
