//! Secrets file management

use clap::{Args, Subcommand};
use sqblame_core::Secrets;

/// Secrets file commands
#[derive(Args, Debug)]
pub struct SecretsArgs {
    #[command(subcommand)]
    pub command: SecretsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SecretsCommand {
    /// Write a template secrets file with owner-only permissions
    Init,

    /// Show where the secrets file lives and which credentials it holds
    Show,
}

impl SecretsArgs {
    /// Execute the secrets command
    pub fn execute(&self) -> anyhow::Result<()> {
        match &self.command {
            SecretsCommand::Init => {
                let path = Secrets::create_template()?;
                println!("Created {}", path.display());
                println!("Edit it and add your SonarQube token.");
            }
            SecretsCommand::Show => {
                let Some(path) = Secrets::default_secrets_path() else {
                    anyhow::bail!("Could not determine secrets path");
                };
                println!("Secrets file: {}", path.display());
                if !path.exists() {
                    println!("  (not found - run `sqblame secrets init`)");
                    return Ok(());
                }

                let secrets = Secrets::load_from_file(&path)?;
                let set = |v: &Option<String>| {
                    if v.as_deref().is_some_and(|s| !s.is_empty()) {
                        "(set)"
                    } else {
                        "(not set)"
                    }
                };
                println!("  token: {}", set(&secrets.sonar.token));
                println!("  username: {}", set(&secrets.sonar.username));
                println!("  password: {}", set(&secrets.sonar.password));
            }
        }

        Ok(())
    }
}
