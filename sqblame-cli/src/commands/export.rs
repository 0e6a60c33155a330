//! Export command - fetch issues, attach blame, write records

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use sqblame_core::{
    write_output, Config, ConfigOverrides, OutputFormat, QueryContext, RunSummary,
};
use sqblame_sonar::{Pipeline, PipelineOptions, SonarClient};

use super::server::{parse_duration, ServerArgs};

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Output format (defaults to config, then the output file extension)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Skip blame lookups; blame columns stay empty
    #[arg(long)]
    pub no_blame: bool,

    /// Issues per search page (max 500); overrides `ps` in the URL
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Give up if the whole export takes longer than this, e.g. `10m`
    #[arg(long, value_parser = parse_duration)]
    pub deadline: Option<Duration>,

    /// Don't print the summary
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

impl ExportArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            page_size: self.page_size,
            timeout: self.server.timeout,
            insecure: self.server.insecure,
            project_param: self.server.project_param.map(Into::into),
            format: self.format.map(Into::into),
            no_blame: self.no_blame,
            quiet: self.quiet,
        }
    }

    /// Query from the URL, with `--page-size` replacing any `ps` it carries
    fn query(&self, config: &Config) -> sqblame_core::Result<QueryContext> {
        let query = QueryContext::from_browser_url(&self.server.url, config.server.project_param)?;
        Ok(match self.page_size {
            Some(size) => query.with_param("ps", size.to_string()),
            None => query,
        })
    }

    /// Format from config or flag, else guessed from the output path
    fn output_format(&self, config: &Config) -> OutputFormat {
        config.output.format.unwrap_or_else(|| {
            self.out
                .as_deref()
                .map(OutputFormat::from_path)
                .unwrap_or_default()
        })
    }

    /// Execute the export command
    pub async fn execute(&self, verbose: bool) -> anyhow::Result<()> {
        let config = Config::load_with_overrides(&self.overrides())?;
        let query = self.query(&config)?;
        let credentials = self.server.credentials()?;
        let format = self.output_format(&config);

        if verbose {
            tracing::info!(
                server = %query.base_url(),
                project = ?query.project(),
                params = ?query.params(),
                %format,
                blame = config.blame.enabled,
                "Starting export"
            );
        }

        let client = SonarClient::new(&query, credentials, &config.server)?;
        let options = PipelineOptions {
            fetch_blame: config.blame.enabled,
            deadline: self.deadline,
        };

        let report = Pipeline::new(&client, options).run(&query).await?;

        write_output(&report.records, format, self.out.as_deref())?;

        if config.output.summary {
            eprintln!("{}", RunSummary::from_records(&report.records));
            if report.blame_unavailable > 0 {
                eprintln!(
                    "Blame unavailable for {} of {} file(s)",
                    report.blame_unavailable, report.blame_requests
                );
            }
            if let Some(path) = &self.out {
                eprintln!("Wrote {} issue(s) to {}", report.records.len(), path.display());
            }
        }

        Ok(())
    }
}
