//! Connection flags shared by commands that talk to a server

use std::time::Duration;

use clap::{Args, ValueEnum};
use sqblame_core::{Credentials, ProjectKeyParam, Secrets};

/// Server URL, credentials and transport flags
#[derive(Args, Debug)]
pub struct ServerArgs {
    /// SonarQube issues page URL, as copied from the browser
    #[arg(short, long)]
    pub url: String,

    /// User token (overrides SONAR_TOKEN and the secrets file)
    #[arg(short, long)]
    pub token: Option<String>,

    /// Username for basic authentication
    #[arg(long, conflicts_with = "token")]
    pub user: Option<String>,

    /// Password for basic authentication
    #[arg(long, requires = "user")]
    pub password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Per-request timeout, e.g. `30s` or `2m`
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Search parameter the URL's `id` is translated to
    #[arg(long, value_enum)]
    pub project_param: Option<ProjectParamArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProjectParamArg {
    Projects,
    ComponentKeys,
}

impl From<ProjectParamArg> for ProjectKeyParam {
    fn from(arg: ProjectParamArg) -> Self {
        match arg {
            ProjectParamArg::Projects => ProjectKeyParam::Projects,
            ProjectParamArg::ComponentKeys => ProjectKeyParam::ComponentKeys,
        }
    }
}

impl ServerArgs {
    /// Resolve credentials from flags, environment and the secrets file
    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        self.credentials_with(Secrets::load)
    }

    /// Flags win outright; the secrets file is only read when none are given
    fn credentials_with(
        &self,
        load_secrets: impl FnOnce() -> sqblame_core::Result<Secrets>,
    ) -> anyhow::Result<Credentials> {
        if let Some(credentials) =
            Credentials::from_flags(self.token.clone(), self.user.clone(), self.password.clone())
        {
            return Ok(credentials);
        }

        let secrets =
            load_secrets().map_err(|e| anyhow::anyhow!("Failed to load secrets: {}", e))?;
        let credentials = Credentials::resolve(None, None, None, &secrets);

        if credentials.is_anonymous() {
            tracing::info!("No credentials configured, connecting anonymously");
        }

        Ok(credentials)
    }
}

pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}
