//! Translation of issue-browser URLs into issue-search queries
//!
//! The SonarQube web UI and the Web API disagree on a few parameter names
//! (`id` vs `projects`, `assignee` vs `assignees`). A [`QueryContext`] holds
//! the server base URL and only those parameters `/api/issues/search`
//! understands.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::issue::ScmScope;
use crate::{Error, Result};

/// Parameters accepted by `/api/issues/search`
pub const ISSUES_SEARCH_ALLOWED_PARAMS: &[&str] = &[
    "projects",
    "componentKeys",
    "resolved",
    "severities",
    "types",
    "rules",
    "tags",
    "assignees",
    "authors",
    "createdAfter",
    "createdBefore",
    "statuses",
    "resolutions",
    "branch",
    "pullRequest",
    "ps",
    "p",
    "sinceLeakPeriod",
    "q",
    "languages",
    "directories",
    "files",
    "impactSeverities",
    "impactSoftwareQualities",
    "sort",
    "asc",
    "s",
];

/// Which search parameter the UI's `id` is mapped to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectKeyParam {
    /// `projects` (current API naming)
    #[default]
    Projects,
    /// `componentKeys` (older servers)
    ComponentKeys,
}

impl ProjectKeyParam {
    /// The query parameter name
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectKeyParam::Projects => "projects",
            ProjectKeyParam::ComponentKeys => "componentKeys",
        }
    }
}

impl fmt::Display for ProjectKeyParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectKeyParam {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "projects" => Ok(ProjectKeyParam::Projects),
            "componentKeys" | "component-keys" | "component_keys" => {
                Ok(ProjectKeyParam::ComponentKeys)
            }
            other => Err(Error::Config(format!(
                "Unknown project parameter '{}'. Expected projects or componentKeys",
                other
            ))),
        }
    }
}

/// Base endpoint plus whitelisted issue-search parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    base_url: String,
    params: BTreeMap<String, String>,
}

impl QueryContext {
    /// Build a query from a URL copied out of the issues page
    ///
    /// Handles both
    /// - `https://sq.example.com/project/issues?id=proj&resolved=false`
    /// - `https://sq.example.com/issues?projects=proj&types=BUG`
    pub fn from_browser_url(url: &str, project_param: ProjectKeyParam) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?;

        let mut base_url = match parsed.port() {
            Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
            None => format!("{}://{}", parsed.scheme(), host),
        };
        base_url.push_str(context_path(parsed.path()));

        let mut collected: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for (key, value) in parsed.query_pairs() {
            if value.is_empty() {
                continue;
            }
            match search_param_for(&key, project_param) {
                Some(target) => collected
                    .entry(target)
                    .or_default()
                    .push(value.into_owned()),
                None => debug!(param = %key, "Dropping unsupported issue search parameter"),
            }
        }

        let params = collected
            .into_iter()
            .map(|(key, values)| (key.to_string(), values.join(",")))
            .collect();

        Ok(Self { base_url, params })
    }

    /// Build a query from an already-known server and parameter set
    ///
    /// Parameters outside the allow-list are dropped.
    pub fn from_parts<I, K, V>(base_url: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let params = params
            .into_iter()
            .filter_map(|(k, v)| {
                let key: &str = k.as_ref();
                ISSUES_SEARCH_ALLOWED_PARAMS
                    .contains(&key)
                    .then(|| (key.to_string(), v.into()))
            })
            .collect();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            params,
        }
    }

    /// Set one search parameter, replacing any value taken from the URL
    ///
    /// Keys outside the allow-list are ignored.
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        if ISSUES_SEARCH_ALLOWED_PARAMS.contains(&key) {
            self.params.insert(key.to_string(), value.into());
        } else {
            debug!(param = %key, "Ignoring unsupported issue search parameter");
        }
        self
    }

    /// Server base URL, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whitelisted search parameters
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Look up a single parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The project key(s) the query targets, whichever naming was used
    pub fn project(&self) -> Option<&str> {
        self.param("projects").or_else(|| self.param("componentKeys"))
    }

    /// Branch / pull request scope the search runs under
    pub fn scope(&self) -> ScmScope {
        ScmScope {
            branch: self.param("branch").map(str::to_string),
            pull_request: self.param("pullRequest").map(str::to_string),
        }
    }

    /// Absolute URL of an API path on this server
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Map a UI query key onto its `/api/issues/search` name
fn search_param_for(key: &str, project_param: ProjectKeyParam) -> Option<&'static str> {
    match key {
        "id" => Some(project_param.as_str()),
        "assignee" => Some("assignees"),
        "author" => Some("authors"),
        other => ISSUES_SEARCH_ALLOWED_PARAMS
            .iter()
            .copied()
            .find(|allowed| *allowed == other),
    }
}

/// Path prefix a server is mounted under, e.g. `/sonar` for
/// `https://host/sonar/project/issues`
fn context_path(path: &str) -> &str {
    let prefix = if let Some(idx) = path.find("/project/issues") {
        &path[..idx]
    } else if let Some(stripped) = path.trim_end_matches('/').strip_suffix("/issues") {
        stripped
    } else {
        ""
    };
    prefix.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(url: &str) -> QueryContext {
        QueryContext::from_browser_url(url, ProjectKeyParam::Projects).unwrap()
    }

    #[test]
    fn test_id_maps_to_projects_and_unknown_dropped() {
        let query =
            translate("https://sq.example.com/project/issues?id=myproj&resolved=false&foo=bar");
        assert_eq!(query.base_url(), "https://sq.example.com");
        assert_eq!(query.params().len(), 2);
        assert_eq!(query.param("projects"), Some("myproj"));
        assert_eq!(query.param("resolved"), Some("false"));
        assert!(query.param("foo").is_none());
        assert!(query.param("id").is_none());
    }

    #[test]
    fn test_id_maps_to_component_keys() {
        let query = QueryContext::from_browser_url(
            "https://sq.example.com/project/issues?id=myproj&resolved=false",
            ProjectKeyParam::ComponentKeys,
        )
        .unwrap();
        assert_eq!(query.param("componentKeys"), Some("myproj"));
        assert!(query.param("projects").is_none());
        assert_eq!(query.project(), Some("myproj"));
    }

    #[test]
    fn test_singular_names_renamed() {
        let query =
            translate("https://sq.example.com/issues?assignee=alice&author=bob@example.com");
        assert_eq!(query.param("assignees"), Some("alice"));
        assert_eq!(query.param("authors"), Some("bob@example.com"));
    }

    #[test]
    fn test_multi_valued_params_comma_joined() {
        let query = translate(
            "https://sq.example.com/issues?types=BUG&types=VULNERABILITY&author=a&authors=b",
        );
        assert_eq!(query.param("types"), Some("BUG,VULNERABILITY"));
        assert_eq!(query.param("authors"), Some("a,b"));
    }

    #[test]
    fn test_blank_values_ignored() {
        let query = translate("https://sq.example.com/issues?id=p&severities=");
        assert!(query.param("severities").is_none());
    }

    #[test]
    fn test_no_query_yields_empty_params() {
        let query = translate("https://sq.example.com");
        assert_eq!(query.base_url(), "https://sq.example.com");
        assert!(query.params().is_empty());
    }

    #[test]
    fn test_port_and_context_path_kept() {
        let query = translate("http://localhost:9000/sonar/project/issues?id=p");
        assert_eq!(query.base_url(), "http://localhost:9000/sonar");
        assert_eq!(
            query.endpoint("/api/issues/search"),
            "http://localhost:9000/sonar/api/issues/search"
        );
    }

    #[test]
    fn test_percent_encoded_values_decoded() {
        let query = translate("https://sq.example.com/issues?q=null%20pointer&branch=feature%2Fx");
        assert_eq!(query.param("q"), Some("null pointer"));
        assert_eq!(query.param("branch"), Some("feature/x"));
    }

    #[test]
    fn test_scope_from_branch_and_pull_request() {
        let query =
            translate("https://sq.example.com/project/issues?id=p&branch=main&pullRequest=42");
        let scope = query.scope();
        assert_eq!(scope.branch.as_deref(), Some("main"));
        assert_eq!(scope.pull_request.as_deref(), Some("42"));
    }

    #[test]
    fn test_with_param_replaces_url_value() {
        let query = translate("https://sq.example.com/project/issues?id=p&ps=20")
            .with_param("ps", "250")
            .with_param("id", "other");
        assert_eq!(query.param("ps"), Some("250"));
        assert_eq!(query.param("projects"), Some("p"));
        assert!(query.param("id").is_none());
    }

    #[test]
    fn test_invalid_urls_rejected() {
        for url in ["", "not a url", "sq.example.com/project/issues?id=p", "mailto:someone"] {
            let err = QueryContext::from_browser_url(url, ProjectKeyParam::Projects).unwrap_err();
            assert!(matches!(err, Error::InvalidUrl { .. }), "{url} should be invalid");
        }
    }

    #[test]
    fn test_from_parts_filters_allow_list() {
        let query = QueryContext::from_parts(
            "https://sq.example.com/",
            [("projects", "p"), ("bogus", "x")],
        );
        assert_eq!(query.base_url(), "https://sq.example.com");
        assert_eq!(query.params().len(), 1);
    }

    #[test]
    fn test_project_param_from_str() {
        assert_eq!("projects".parse::<ProjectKeyParam>().unwrap(), ProjectKeyParam::Projects);
        assert_eq!(
            "component-keys".parse::<ProjectKeyParam>().unwrap(),
            ProjectKeyParam::ComponentKeys
        );
        assert!("nope".parse::<ProjectKeyParam>().is_err());
    }
}
