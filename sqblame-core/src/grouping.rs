//! Per-file line ranges for blame requests

use std::collections::BTreeMap;

use serde::Serialize;

use crate::issue::{ComponentContext, RawIssue, ScmScope};

/// Inclusive line interval covering every issue of one component context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub min: u32,
    pub max: u32,
}

impl LineRange {
    /// A range holding a single line
    pub fn at(line: u32) -> Self {
        Self {
            min: line,
            max: line,
        }
    }

    /// Widen the range to include `line`
    pub fn expand(&mut self, line: u32) {
        self.min = self.min.min(line);
        self.max = self.max.max(line);
    }

    pub fn contains(&self, line: u32) -> bool {
        (self.min..=self.max).contains(&line)
    }

    /// Number of lines covered, zero for an inverted range
    pub fn span(&self) -> u32 {
        if self.min > self.max {
            return 0;
        }
        (self.max - self.min).saturating_add(1)
    }
}

/// Group line-bearing issues by component context
///
/// Issues without a component or a line are skipped; they are still
/// enriched later, just without blame.
pub fn group_line_ranges(
    issues: &[RawIssue],
    scope: &ScmScope,
) -> BTreeMap<ComponentContext, LineRange> {
    let mut ranges: BTreeMap<ComponentContext, LineRange> = BTreeMap::new();

    for (ctx, line) in issues.iter().filter_map(|issue| issue.locate(scope)) {
        ranges
            .entry(ctx)
            .and_modify(|range| range.expand(line))
            .or_insert_with(|| LineRange::at(line));
    }

    ranges
}
