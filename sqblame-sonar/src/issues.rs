//! Paginated issue search

use serde::Deserialize;
use serde_json::Value;
use sqblame_core::config::MAX_PAGE_SIZE;
use sqblame_core::{QueryContext, RawIssue};
use tracing::{debug, info, warn};

use crate::transport::HttpResponse;
use crate::{Error, Result, SonarClient};

/// Issue search endpoint
pub const ISSUES_SEARCH_PATH: &str = "api/issues/search";

/// Results beyond this many are refused by the server
pub const SEARCH_RESULT_WINDOW: usize = 10_000;

/// Sort applied unless the query picks one, keeps paging stable
const DEFAULT_SORT: &str = "FILE_LINE";

/// One page of `/api/issues/search`
#[derive(Debug, Deserialize)]
struct IssueSearchPage {
    #[serde(default)]
    issues: Vec<Value>,
    #[serde(default)]
    paging: Option<Paging>,
    /// Older servers report the total at the top level
    #[serde(default)]
    total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    total: Option<usize>,
}

impl IssueSearchPage {
    fn total(&self) -> Option<usize> {
        self.paging.as_ref().and_then(|p| p.total).or(self.total)
    }
}

impl SonarClient {
    /// Fetch every issue matching a query
    ///
    /// Pages are requested until the accumulated count reaches the reported
    /// total, a page comes back empty, or the next page would start past
    /// [`SEARCH_RESULT_WINDOW`]. The result is cut to the last reported total
    /// and to the window. Issues arrive in server order; duplicates or gaps
    /// caused by concurrent changes on the server are not corrected.
    pub async fn search_issues(&self, query: &QueryContext) -> Result<Vec<RawIssue>> {
        let page_size = query
            .param("ps")
            .and_then(|ps| ps.parse::<u32>().ok())
            .unwrap_or_else(|| self.page_size())
            .clamp(1, MAX_PAGE_SIZE);

        let mut params: Vec<(String, String)> = query
            .params()
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "p" | "ps"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        params.push(("ps".to_string(), page_size.to_string()));
        if query.param("s").is_none() && query.param("sort").is_none() {
            params.push(("s".to_string(), DEFAULT_SORT.to_string()));
        }

        debug!(server = %query.base_url(), page_size, ?params, "Searching issues");

        let mut issues: Vec<RawIssue> = Vec::new();
        let mut page = 1u32;
        let reported_total = loop {
            let mut page_params = params.clone();
            page_params.push(("p".to_string(), page.to_string()));

            let response = check_status(self.get(ISSUES_SEARCH_PATH, &page_params).await?)?;
            let body: IssueSearchPage =
                serde_json::from_str(&response.body).map_err(|e| Error::MalformedResponse {
                    endpoint: ISSUES_SEARCH_PATH.to_string(),
                    reason: e.to_string(),
                })?;

            let fetched = body.issues.len();
            let total = body.total().unwrap_or(issues.len() + fetched);
            issues.extend(body.issues.into_iter().map(RawIssue::from_value));

            debug!(page, fetched, accumulated = issues.len(), total, "Fetched issue page");

            if page == 1 && total > SEARCH_RESULT_WINDOW {
                warn!(
                    total,
                    window = SEARCH_RESULT_WINDOW,
                    "Query matches more issues than the server will page through; \
                     only the first {} are exported, narrow the filters",
                    SEARCH_RESULT_WINDOW
                );
            }

            if fetched == 0 || issues.len() >= total || !within_window(page + 1, page_size) {
                break total;
            }
            page += 1;
        };

        issues.truncate(reported_total.min(SEARCH_RESULT_WINDOW));

        info!(count = issues.len(), pages = page, "Fetched all issues");

        Ok(issues)
    }
}

/// Whether the server will serve page `page` at `page_size` issues per page
fn within_window(page: u32, page_size: u32) -> bool {
    u64::from(page) * u64::from(page_size) <= SEARCH_RESULT_WINDOW as u64
}

/// Map non-success issue search responses to errors
fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    match response.status {
        _ if response.is_success() => Ok(response),
        401 | 403 => Err(Error::Unauthorized {
            status: response.status,
            body: response.body,
        }),
        status => Err(Error::IssueFetch {
            status,
            body: response.body,
        }),
    }
}
