//! sqblame Core - Issue model and enrichment pipeline stages for sqblame
//!
//! This crate holds everything that does not touch the network: URL
//! translation, issue decoding, line-range grouping, blame tables, the
//! merge into flat records, and the CSV/JSON writers.

pub mod blame;
pub mod config;
pub mod enrich;
pub mod error;
pub mod grouping;
pub mod issue;
pub mod output;
pub mod query;
pub mod secrets;
pub mod summary;

pub use blame::{BlameEntry, BlameLines, BlameTable, ScmResponse};
pub use config::{BlameConfig, Config, ConfigOverrides, OutputConfig, ServerConfig, MAX_PAGE_SIZE};
pub use enrich::{enrich, EnrichedIssue};
pub use error::{Error, Result};
pub use grouping::{group_line_ranges, LineRange};
pub use issue::{ComponentContext, RawIssue, ScmScope, TextRange};
pub use output::{render, write_output, OutputFormat};
pub use query::{ProjectKeyParam, QueryContext, ISSUES_SEARCH_ALLOWED_PARAMS};
pub use secrets::{Credentials, Secrets, SonarSecrets};
pub use summary::RunSummary;
