use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// Plays the "look at the screen" sound.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn play_alert(&self) -> Result<()>;
}

/// Rings the terminal bell on stdout.
pub struct TerminalBell;

#[async_trait]
impl Notifier for TerminalBell {
    async fn play_alert(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        Ok(())
    }
}

/// Runs an external player, e.g. `mpg123 -q ./warning.mp3`. The player is
/// killed if the caller stops waiting for it.
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits a whitespace-separated command line. Quoting is not supported.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn play_alert(&self) -> Result<()> {
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("failed to start alert command {}", self.program))?;

        if !status.success() {
            bail!("alert command {} exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// Picks the command notifier when a command is configured, the bell otherwise.
pub fn from_config(command: Option<&str>) -> Arc<dyn Notifier> {
    match command.and_then(CommandNotifier::parse) {
        Some(notifier) => {
            tracing::info!("🔔 Alert sound via `{}`", notifier.program());
            Arc::new(notifier)
        }
        None => Arc::new(TerminalBell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let notifier = CommandNotifier::parse("  mpg123 -q ./warning.mp3 ").unwrap();
        assert_eq!(notifier.program(), "mpg123");
        assert_eq!(notifier.args(), ["-q", "./warning.mp3"]);

        assert!(CommandNotifier::parse("   ").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_exit_status() {
        assert!(CommandNotifier::new("true", vec![]).play_alert().await.is_ok());
        assert!(CommandNotifier::new("false", vec![]).play_alert().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let notifier = CommandNotifier::new("definitely-not-an-installed-player", vec![]);
        assert!(notifier.play_alert().await.is_err());
    }
}
