//! Where the Cloudability API token comes from.

use tokio::process::Command;
use tracing::debug;

use crate::error::{CostReportError, Result};

/// A source for the API token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// The token itself.
    Literal(String),
    /// Name of an environment variable holding the token.
    EnvVar(String),
    /// Shell-style command printing the token on stdout (e.g. `pass cloudability_secret`).
    Command(String),
}

impl TokenSource {
    /// Produce the token.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::Auth`] if the variable is unset, the command
    /// fails or prints nothing, or the token is empty, and
    /// [`CostReportError::Io`] if the command cannot be started.
    pub async fn resolve(&self) -> Result<String> {
        let token = match self {
            Self::Literal(token) => token.clone(),
            Self::EnvVar(name) => std::env::var(name).map_err(|_| {
                CostReportError::Auth(format!("{name} environment variable not set"))
            })?,
            Self::Command(command) => run_token_command(command).await?,
        };

        if token.is_empty() {
            return Err(CostReportError::Auth("no Cloudability token provided".to_string()));
        }
        Ok(token)
    }
}

async fn run_token_command(command: &str) -> Result<String> {
    let words = shell_words::split(command)
        .map_err(|e| CostReportError::Config(format!("invalid token command: {e}")))?;
    let (program, args) = words
        .split_first()
        .ok_or_else(|| CostReportError::Config("token command is empty".to_string()))?;

    debug!(program = %program, "Running token command");
    let output = Command::new(program).args(args).output().await?;
    if !output.status.success() {
        return Err(CostReportError::Auth(format!(
            "token command exited with {}",
            output.status
        )));
    }

    let stdout = String::from_utf8(output.stdout)
        .map_err(|_| CostReportError::Auth("token command output is not UTF-8".to_string()))?;
    Ok(stdout.replace('\n', ""))
}
