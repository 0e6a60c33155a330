//! Check command - validate server and credentials

use clap::Args;
use sqblame_core::{Config, ConfigOverrides, QueryContext};
use sqblame_sonar::SonarClient;

use super::server::ServerArgs;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub server: ServerArgs,
}

impl CheckArgs {
    /// Execute the check command
    pub async fn execute(&self, verbose: bool) -> anyhow::Result<()> {
        let overrides = ConfigOverrides {
            timeout: self.server.timeout,
            insecure: self.server.insecure,
            project_param: self.server.project_param.map(Into::into),
            ..Default::default()
        };
        let config = Config::load_with_overrides(&overrides)?;
        let query = QueryContext::from_browser_url(&self.server.url, config.server.project_param)?;
        let credentials = self.server.credentials()?;
        let anonymous = credentials.is_anonymous();

        if verbose {
            tracing::info!(server = %query.base_url(), anonymous, "Checking connection");
        }

        let client = SonarClient::new(&query, credentials, &config.server)?;
        client
            .test_connection()
            .await
            .map_err(|e| connection_error(e, anonymous, query.base_url()))?;

        println!("Server: {}", query.base_url());
        if let Some(project) = query.project() {
            println!("Project: {}", project);
        }
        if anonymous {
            println!("Connected anonymously");
        } else {
            println!("Credentials accepted");
        }

        Ok(())
    }
}

/// Point anonymous users at the ways to supply credentials
fn connection_error(err: sqblame_sonar::Error, anonymous: bool, server: &str) -> anyhow::Error {
    if err.is_auth() && anonymous {
        anyhow::anyhow!(
            "{} requires authentication. Pass --token or --user/--password, \
             set SONAR_TOKEN, or run `sqblame secrets init`",
            server
        )
    } else {
        err.into()
    }
}
