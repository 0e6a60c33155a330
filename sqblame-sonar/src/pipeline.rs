//! Issue enrichment pipeline
//!
//! Search -> group by file -> fetch blame once per file -> merge. Every stage
//! runs to completion before the next starts and nothing is written until
//! the records are returned.

use std::time::Duration;

use sqblame_core::{enrich, group_line_ranges, EnrichedIssue, QueryContext};
use tracing::info;

use crate::{BlameCache, Error, Result, SonarClient};

/// Options for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Fetch per-line blame; when false every record has empty blame fields
    pub fetch_blame: bool,
    /// Abort the whole run after this long
    pub deadline: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            fetch_blame: true,
            deadline: None,
        }
    }
}

/// Result of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    /// One record per fetched issue, in server order
    pub records: Vec<EnrichedIssue>,
    /// Blame requests issued
    pub blame_requests: usize,
    /// Contexts whose blame could not be fetched
    pub blame_unavailable: usize,
}

/// Runs the enrichment stages against one client
#[derive(Debug)]
pub struct Pipeline<'a> {
    client: &'a SonarClient,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(client: &'a SonarClient, options: PipelineOptions) -> Self {
        Self { client, options }
    }

    /// Fetch and enrich all issues matching `query`
    pub async fn run(&self, query: &QueryContext) -> Result<EnrichmentReport> {
        match self.options.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.run_stages(query))
                .await
                .map_err(|_| Error::DeadlineExceeded(deadline))?,
            None => self.run_stages(query).await,
        }
    }

    async fn run_stages(&self, query: &QueryContext) -> Result<EnrichmentReport> {
        let issues = self.client.search_issues(query).await?;
        let scope = query.scope();

        let mut cache = BlameCache::new();
        if self.options.fetch_blame {
            let ranges = group_line_ranges(&issues, &scope);
            info!(
                issues = issues.len(),
                files = ranges.len(),
                "Grouped issues by file"
            );
            cache.populate(self.client, &ranges).await;
        } else {
            info!("Blame fetching disabled");
        }

        let blame_requests = cache.requests();
        let blame_unavailable = cache.unavailable();
        let table = cache.into_table();
        let records = enrich(issues, &scope, &table);

        info!(
            records = records.len(),
            blamed = records.iter().filter(|r| r.has_blame()).count(),
            "Enrichment complete"
        );

        Ok(EnrichmentReport {
            records,
            blame_requests,
            blame_unavailable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{int_param, issue, issue_page, ok_json, StubTransport};
    use crate::transport::HttpResponse;
    use crate::{ISSUES_SEARCH_PATH, SCM_PATH};
    use serde_json::json;
    use sqblame_core::ProjectKeyParam;

    fn query(url: &str) -> QueryContext {
        QueryContext::from_browser_url(url, ProjectKeyParam::Projects).unwrap()
    }

    #[tokio::test]
    async fn test_single_blame_call_per_file() {
        let (stub, calls) = StubTransport::new(|path, params| match path {
            ISSUES_SEARCH_PATH => issue_page(
                vec![
                    issue("I1", "proj:a.py", Some(10)),
                    issue("I2", "proj:a.py", Some(40)),
                ],
                2,
            ),
            SCM_PATH => {
                assert_eq!(params["key"], "proj:a.py");
                ok_json(json!({"scm": [
                    [10, "rev10", "alice@example.com", "2024-01-01T00:00:00+0000"],
                    [25, "rev25", "bob@example.com", "2024-01-02T00:00:00+0000"]
                ]}))
            }
            other => panic!("unexpected path {other}"),
        });
        let client = SonarClient::with_transport(stub);

        let report = Pipeline::new(&client, PipelineOptions::default())
            .run(&query("https://sq.example.com/project/issues?id=proj"))
            .await
            .unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].issue_key, "I1");
        assert_eq!(report.records[0].scm_revision, "rev10");
        assert_eq!(report.records[0].scm_author, "alice@example.com");
        assert_eq!(report.records[1].issue_key, "I2");
        assert!(!report.records[1].has_blame());

        let scm_calls = calls.to(SCM_PATH);
        assert_eq!(scm_calls.len(), 1);
        assert_eq!(scm_calls[0].params["from"], "10");
        assert_eq!(scm_calls[0].params["to"], "40");
        assert_eq!(report.blame_requests, 1);
    }

    #[tokio::test]
    async fn test_blame_called_once_per_context_across_pages() {
        let (stub, calls) = StubTransport::new(|path, params| match path {
            ISSUES_SEARCH_PATH => {
                let page = int_param(params, "p");
                let issues = match page {
                    1 => vec![
                        issue("A1", "p:a.rs", Some(3)),
                        issue("B1", "p:b.rs", Some(8)),
                    ],
                    2 => vec![
                        issue("A2", "p:a.rs", Some(90)),
                        json!({"key": "A3", "component": "p:a.rs", "line": 5, "branch": "dev"}),
                    ],
                    _ => vec![issue("F1", "p:c.rs", None), issue("B2", "p:b.rs", Some(1))],
                };
                issue_page(issues, 6)
            }
            _ => ok_json(json!({"scm": []})),
        });
        let client = SonarClient::with_transport(stub).with_page_size(2);

        let report = Pipeline::new(&client, PipelineOptions::default())
            .run(&query("https://sq.example.com/project/issues?id=p"))
            .await
            .unwrap();

        assert_eq!(report.records.len(), 6);
        let scm_calls = calls.to(SCM_PATH);
        // a.rs (default scope), a.rs@dev, b.rs; c.rs has no line-bearing issue
        assert_eq!(scm_calls.len(), 3);
        let mut keys: Vec<(String, Option<String>, String, String)> = scm_calls
            .iter()
            .map(|c| {
                (
                    c.params["key"].clone(),
                    c.params.get("branch").cloned(),
                    c.params["from"].clone(),
                    c.params["to"].clone(),
                )
            })
            .collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ("p:a.rs".to_string(), None, "3".to_string(), "90".to_string()),
                ("p:a.rs".to_string(), Some("dev".to_string()), "5".to_string(), "5".to_string()),
                ("p:b.rs".to_string(), None, "1".to_string(), "8".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_blame_failure_isolated_to_component() {
        let (stub, _) = StubTransport::new(|path, params| match path {
            ISSUES_SEARCH_PATH => issue_page(
                vec![
                    issue("BAD", "p:missing.py", Some(1)),
                    issue("GOOD", "p:ok.py", Some(2)),
                ],
                2,
            ),
            _ if params["key"] == "p:missing.py" => Ok(HttpResponse::new(404, "{}")),
            _ => ok_json(json!({"scm": [
                {"line": 2, "author": "carol", "date": "2024-05-01", "revision": "c0ffee"}
            ]})),
        });
        let client = SonarClient::with_transport(stub);

        let report = Pipeline::new(&client, PipelineOptions::default())
            .run(&query("https://sq.example.com/project/issues?id=p"))
            .await
            .unwrap();

        assert_eq!(report.records.len(), 2);
        assert!(!report.records[0].has_blame());
        assert_eq!(report.records[1].scm_revision, "c0ffee");
        assert_eq!(report.blame_unavailable, 1);
    }

    #[tokio::test]
    async fn test_branch_scope_forwarded_to_blame() {
        let (stub, calls) = StubTransport::new(|path, _| match path {
            ISSUES_SEARCH_PATH => issue_page(vec![issue("I", "p:a.py", Some(4))], 1),
            _ => ok_json(json!({"scm": [[4, "r", "a", "d"]]})),
        });
        let client = SonarClient::with_transport(stub);

        let report = Pipeline::new(&client, PipelineOptions::default())
            .run(&query("https://sq.example.com/project/issues?id=p&branch=release"))
            .await
            .unwrap();

        assert!(report.records[0].has_blame());
        let search = &calls.to(ISSUES_SEARCH_PATH)[0];
        assert_eq!(search.params["branch"], "release");
        let scm = &calls.to(SCM_PATH)[0];
        assert_eq!(scm.params["branch"], "release");
    }

    #[tokio::test]
    async fn test_no_blame_option() {
        let (stub, calls) = StubTransport::new(|_, _| {
            issue_page(vec![issue("I", "p:a.py", Some(4))], 1)
        });
        let client = SonarClient::with_transport(stub);
        let options = PipelineOptions {
            fetch_blame: false,
            ..Default::default()
        };

        let report = Pipeline::new(&client, options)
            .run(&query("https://sq.example.com/project/issues?id=p"))
            .await
            .unwrap();

        assert_eq!(report.records.len(), 1);
        assert!(calls.to(SCM_PATH).is_empty());
        assert_eq!(report.blame_requests, 0);
    }

    #[tokio::test]
    async fn test_zero_issues() {
        let (stub, calls) = StubTransport::new(|_, _| issue_page(vec![], 0));
        let client = SonarClient::with_transport(stub);

        let report = Pipeline::new(&client, PipelineOptions::default())
            .run(&query("https://sq.example.com/project/issues?id=p"))
            .await
            .unwrap();

        assert!(report.records.is_empty());
        assert_eq!(calls.all().len(), 1);
    }

    #[tokio::test]
    async fn test_issue_fetch_error_aborts() {
        let (stub, calls) = StubTransport::new(|_, _| Ok(HttpResponse::new(502, "bad gateway")));
        let client = SonarClient::with_transport(stub);

        let err = Pipeline::new(&client, PipelineOptions::default())
            .run(&query("https://sq.example.com/project/issues?id=p"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::IssueFetch { status: 502, .. }));
        assert!(calls.to(SCM_PATH).is_empty());
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let (stub, _) = StubTransport::new(|_, _| issue_page(vec![], 0));
        let client = SonarClient::with_transport(stub.with_delay(Duration::from_secs(5)));
        let options = PipelineOptions {
            deadline: Some(Duration::from_millis(20)),
            ..Default::default()
        };

        let err = Pipeline::new(&client, options)
            .run(&query("https://sq.example.com/project/issues?id=p"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DeadlineExceeded(_)));
    }
}
