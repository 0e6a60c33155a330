//! Secrets management for sqblame
//!
//! Secrets are stored separately from configuration to avoid accidental sharing.
//! The secrets file is located at `~/.config/sqblame/secrets.toml` and must have
//! restrictive permissions (0600 on Unix).
//!
//! Loading priority:
//! 1. Environment variables (SONAR_TOKEN)
//! 2. Secrets file (~/.config/sqblame/secrets.toml)

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// SonarQube credentials
    pub sonar: SonarSecrets,
}

/// SonarQube credentials
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SonarSecrets {
    /// User token (used as the basic-auth username)
    pub token: Option<String>,
    /// Login for username/password authentication
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for SonarSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SonarSecrets")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns default (empty) secrets if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_secrets_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load secrets from a specific file with permission checking
    pub fn load_from_file(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = std::fs::metadata(path).map_err(Error::Io)?;
            let mode = metadata.permissions().mode();

            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. \
                     Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }

            debug!(
                path = %path.display(),
                mode = format!("{:o}", mode & 0o777),
                "Secrets file permissions OK"
            );
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        for value in [
            &mut secrets.sonar.token,
            &mut secrets.sonar.username,
            &mut secrets.sonar.password,
        ] {
            if let Some(v) = value {
                *v = v.trim().to_string();
            }
        }

        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/sqblame/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sqblame").join("secrets.toml"))
    }

    /// Get the SonarQube token with environment variable override
    ///
    /// Priority: SONAR_TOKEN env var > secrets file
    pub fn sonar_token(&self) -> Option<String> {
        if let Ok(token) = std::env::var("SONAR_TOKEN") {
            let token = token.trim().to_string();
            if !token.is_empty() {
                debug!("Using SonarQube token from SONAR_TOKEN environment variable");
                return Some(token);
            }
        }

        self.file_token()
    }

    fn file_token(&self) -> Option<String> {
        let token = self.sonar.token.as_ref().filter(|t| !t.is_empty())?;
        debug!("Using SonarQube token from secrets file");
        Some(token.clone())
    }

    /// Create a template secrets file at the default location
    ///
    /// Creates parent directories if needed and sets secure permissions
    pub fn create_template() -> Result<PathBuf> {
        let path = Self::default_secrets_path()
            .ok_or_else(|| Error::Config("Could not determine secrets path".to_string()))?;
        Self::create_template_at(&path)?;
        Ok(path)
    }

    /// Create a template secrets file at `path`, refusing to overwrite
    pub fn create_template_at(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        if path.exists() {
            return Err(Error::Config(format!(
                "Secrets file already exists at {}",
                path.display()
            )));
        }

        let template = r#"# sqblame Secrets
# This file contains sensitive credentials - do not share or commit to version control
#
# IMPORTANT: This file must have restrictive permissions (chmod 600)

[sonar]
# SonarQube user token
# Create at: My Account > Security > Generate Tokens
token = ""

# Or log in with username and password instead of a token
# username = ""
# password = ""
"#;

        std::fs::write(path, template).map_err(Error::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, perms).map_err(Error::Io)?;
        }

        warn!(path = %path.display(), "Created secrets template - please edit and add your token");

        Ok(())
    }
}

/// How requests authenticate against the server
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    Anonymous,
    /// User token, sent as the basic-auth username with an empty password
    Token(String),
    Basic { username: String, password: String },
}

impl Credentials {
    /// Pick credentials from CLI values, then environment, then secrets file
    pub fn resolve(
        token: Option<String>,
        username: Option<String>,
        password: Option<String>,
        secrets: &Secrets,
    ) -> Self {
        if let Some(credentials) = Self::from_flags(token, username, password) {
            return credentials;
        }
        if let Some(token) = secrets.sonar_token() {
            return Credentials::Token(token);
        }
        if let Some(username) = non_empty(secrets.sonar.username.clone()) {
            return Credentials::Basic {
                username,
                password: secrets.sonar.password.clone().unwrap_or_default(),
            };
        }

        Credentials::Anonymous
    }

    /// Credentials given explicitly on the command line, if any
    pub fn from_flags(
        token: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Option<Self> {
        if let Some(token) = non_empty(token) {
            return Some(Credentials::Token(token));
        }
        non_empty(username).map(|username| Credentials::Basic {
            username,
            password: password.unwrap_or_default(),
        })
    }

    /// Username/password pair for HTTP basic auth
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match self {
            Credentials::Anonymous => None,
            Credentials::Token(token) => Some((token.as_str(), "")),
            Credentials::Basic { username, password } => {
                Some((username.as_str(), password.as_str()))
            }
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::Anonymous)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::Token(_) => f.write_str("Token(<redacted>)"),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_secrets() {
        let secrets = Secrets::default();
        assert!(secrets.sonar.token.is_none());
        assert!(secrets.sonar.username.is_none());
    }

    #[test]
    fn test_parse_secrets() {
        let toml = r#"
[sonar]
token = "squ_xxxxxxxxxxxx"
"#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.sonar.token, Some("squ_xxxxxxxxxxxx".to_string()));
        assert_eq!(secrets.file_token(), Some("squ_xxxxxxxxxxxx".to_string()));
    }

    #[test]
    fn test_empty_file_token_ignored() {
        let secrets: Secrets = toml::from_str("[sonar]\ntoken = \"\"\n").unwrap();
        assert!(secrets.file_token().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_insecure_permissions_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[sonar]\ntoken = \"test\"").unwrap();

        let perms = std::fs::Permissions::from_mode(0o644);
        std::fs::set_permissions(file.path(), perms).unwrap();

        let result = Secrets::load_from_file(file.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("insecure permissions"));
    }

    #[cfg(unix)]
    #[test]
    fn test_secure_permissions_accepted_and_trimmed() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[sonar]\ntoken = \"  squ_test  \"").unwrap();

        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(file.path(), perms).unwrap();

        let secrets = Secrets::load_from_file(file.path()).unwrap();
        assert_eq!(secrets.sonar.token, Some("squ_test".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_create_template() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("secrets.toml");

        Secrets::create_template_at(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let secrets = Secrets::load_from_file(&path).unwrap();
        assert_eq!(secrets.sonar.token, Some(String::new()));

        assert!(Secrets::create_template_at(&path).is_err());
    }

    #[test]
    fn test_cli_token_wins() {
        let secrets = Secrets {
            sonar: SonarSecrets {
                token: Some("from_file".to_string()),
                ..Default::default()
            },
        };
        let creds = Credentials::resolve(
            Some("cli".to_string()),
            Some("user".to_string()),
            None,
            &secrets,
        );
        assert_eq!(creds, Credentials::Token("cli".to_string()));
        assert_eq!(creds.basic_auth(), Some(("cli", "")));
    }

    #[test]
    fn test_cli_username_password() {
        let creds = Credentials::resolve(
            None,
            Some("admin".to_string()),
            Some("secret".to_string()),
            &Secrets::default(),
        );
        assert_eq!(creds.basic_auth(), Some(("admin", "secret")));
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(
            Credentials::from_flags(Some(" squ_1 ".to_string()), None, None),
            Some(Credentials::Token("squ_1".to_string()))
        );
        assert_eq!(
            Credentials::from_flags(None, Some("admin".to_string()), None),
            Some(Credentials::Basic {
                username: "admin".to_string(),
                password: String::new(),
            })
        );
        assert!(Credentials::from_flags(Some("  ".to_string()), None, None).is_none());
        assert!(Credentials::from_flags(None, None, Some("pw".to_string())).is_none());
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let creds = Credentials::Token("squ_abc".to_string());
        assert!(!format!("{:?}", creds).contains("squ_abc"));
        assert!(Credentials::default().is_anonymous());
        assert!(Credentials::default().basic_auth().is_none());
    }
}
