//! Human-readable run summary

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::enrich::EnrichedIssue;

/// Counts over one run's enriched issues
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// (committer, count), most issues first
    pub by_committer: Vec<(String, usize)>,
    pub by_severity: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub total: usize,
    /// Issues whose line had blame
    pub blamed: usize,
}

impl RunSummary {
    pub fn from_records(records: &[EnrichedIssue]) -> Self {
        let mut committers: BTreeMap<&str, usize> = BTreeMap::new();
        let mut summary = RunSummary {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            *committers
                .entry(record.committer().unwrap_or("unknown"))
                .or_default() += 1;
            *summary
                .by_severity
                .entry(or_unknown(&record.severity))
                .or_default() += 1;
            *summary
                .by_type
                .entry(or_unknown(&record.issue_type))
                .or_default() += 1;
            if record.has_blame() {
                summary.blamed += 1;
            }
        }

        let mut by_committer: Vec<(String, usize)> = committers
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        // Stable sort keeps names alphabetical within equal counts
        by_committer.sort_by(|a, b| b.1.cmp(&a.1));
        summary.by_committer = by_committer;

        summary
    }
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        "unknown".to_string()
    } else {
        value.to_string()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Issues by committer")?;
        writeln!(f, "===================")?;
        for (committer, count) in &self.by_committer {
            writeln!(f, "  {:<40}  {:>5} issues", committer, count)?;
        }
        writeln!(f)?;

        let breakdown = |counts: &BTreeMap<String, usize>| {
            counts
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", ")
        };
        writeln!(f, "Severity breakdown: {}", breakdown(&self.by_severity))?;
        writeln!(f, "Type breakdown:     {}", breakdown(&self.by_type))?;
        writeln!(f, "Total issues:       {}", self.total)?;
        write!(f, "With blame:         {}", self.blamed)
    }
}
