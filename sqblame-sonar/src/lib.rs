//! sqblame Sonar - SonarQube Web API access for sqblame
//!
//! This crate fetches issues from `/api/issues/search`, blame from
//! `/api/sources/scm`, and runs the enrichment pipeline that joins them.

mod client;
mod error;
mod issues;
mod pipeline;
mod scm;
mod transport;

#[cfg(test)]
mod stub;

pub use client::SonarClient;
pub use error::{BlameUnavailable, Error, Result};
pub use issues::{ISSUES_SEARCH_PATH, SEARCH_RESULT_WINDOW};
pub use pipeline::{EnrichmentReport, Pipeline, PipelineOptions};
pub use scm::{BlameCache, SCM_PATH};
pub use transport::{HttpResponse, HttpTransport, Transport};
