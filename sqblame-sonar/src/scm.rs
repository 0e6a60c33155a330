//! SCM blame fetching and the per-run blame cache

use std::collections::BTreeMap;

use sqblame_core::{BlameLines, BlameTable, ComponentContext, LineRange, ScmResponse};
use tracing::{debug, info, warn};

use crate::{BlameUnavailable, SonarClient};

/// SCM blame endpoint
pub const SCM_PATH: &str = "api/sources/scm";

impl SonarClient {
    /// Fetch blame for `range` (inclusive) of one component context
    ///
    /// `commits_by_line` is requested so every line in the range is reported,
    /// not just the first line of each commit block.
    pub async fn fetch_blame(
        &self,
        ctx: &ComponentContext,
        range: LineRange,
    ) -> std::result::Result<BlameLines, BlameUnavailable> {
        let mut params = vec![
            ("key".to_string(), ctx.component.clone()),
            ("from".to_string(), range.min.to_string()),
            ("to".to_string(), range.max.to_string()),
            ("commits_by_line".to_string(), "true".to_string()),
        ];
        if let Some(ref branch) = ctx.branch {
            params.push(("branch".to_string(), branch.clone()));
        }
        if let Some(ref pr) = ctx.pull_request {
            params.push(("pullRequest".to_string(), pr.clone()));
        }

        let response = self
            .get(SCM_PATH, &params)
            .await
            .map_err(|e| BlameUnavailable::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(BlameUnavailable::Status(response.status));
        }

        ScmResponse::parse(&response.body)
            .map(ScmResponse::into_lines)
            .map_err(|e| BlameUnavailable::Malformed(e.to_string()))
    }
}

/// Blame fetched once per component context for one run
#[derive(Debug, Default)]
pub struct BlameCache {
    table: BlameTable,
    requests: usize,
    unavailable: usize,
}

impl BlameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure blame for `ctx` is in the table, fetching it if needed
    ///
    /// Failures are logged and recorded as an empty table for the context.
    pub async fn ensure(&mut self, client: &SonarClient, ctx: &ComponentContext, range: LineRange) {
        if self.table.contains(ctx) {
            debug!(context = %ctx, "Blame already cached");
            return;
        }

        self.requests += 1;
        let lines = match client.fetch_blame(ctx, range).await {
            Ok(lines) => {
                debug!(
                    context = %ctx,
                    from = range.min,
                    to = range.max,
                    lines = lines.len(),
                    "Fetched blame"
                );
                lines
            }
            Err(e) => {
                warn!(context = %ctx, error = %e, "Blame unavailable, continuing without it");
                self.unavailable += 1;
                BlameLines::new()
            }
        };

        self.table.insert(ctx.clone(), lines);
    }

    /// Fetch blame for every grouped context, in key order
    pub async fn populate(
        &mut self,
        client: &SonarClient,
        ranges: &BTreeMap<ComponentContext, LineRange>,
    ) {
        for (idx, (ctx, range)) in ranges.iter().enumerate() {
            debug!(
                progress = idx + 1,
                of = ranges.len(),
                file = ctx.file_path(),
                lines = range.span(),
                "Fetching blame"
            );
            self.ensure(client, ctx, *range).await;
        }

        info!(
            contexts = self.table.len(),
            requests = self.requests,
            unavailable = self.unavailable,
            blamed_lines = self.table.entry_count(),
            "Blame fetched"
        );
    }

    /// Number of blame requests issued
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Number of contexts whose blame could not be fetched
    pub fn unavailable(&self) -> usize {
        self.unavailable
    }

    pub fn table(&self) -> &BlameTable {
        &self.table
    }

    pub fn into_table(self) -> BlameTable {
        self.table
    }
}
