//! Shell command leaf work.
//!
//! A [`ShellCommand`] is a [`Work`] item that runs one external program with
//! captured output. Arguments may be literals or resolved from the execution
//! [`Context`] at run time, so the same tree can be performed against
//! different bindings.

use arbor_core::{Context, PerformError, Work};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Invalid command construction, rejected before a tree is built.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Shell command requires a non-empty program name")]
    EmptyProgram,
}

/// Process environment for a [`ShellCommand`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Working directory; inherits the parent's when unset.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables, applied after `clear_env`.
    #[serde(default)]
    pub env: Vec<(String, String)>,
    /// Start from an empty environment instead of inheriting.
    #[serde(default)]
    pub clear_env: bool,
}

/// One command-line argument: a fixed string or a context variable resolved
/// when the command runs.
#[derive(Debug, Clone)]
pub enum ShellArg {
    Literal(String),
    Var(String),
}

impl ShellArg {
    /// An argument resolved from the context variable `name` at run time.
    pub fn var(name: impl Into<String>) -> Self {
        ShellArg::Var(name.into())
    }

    fn resolve(&self, ctx: &Context) -> Result<String, PerformError> {
        match self {
            ShellArg::Literal(text) => Ok(text.clone()),
            ShellArg::Var(name) => {
                let value = ctx.value_of(name)?;
                if let Some(text) = value.as_str() {
                    return Ok(text.to_string());
                }
                match value.as_data() {
                    Some(data) => Ok(data.to_string()),
                    None => Err(PerformError::failed(format!(
                        "Variable {name} holds a fault, not argument data"
                    ))),
                }
            }
        }
    }
}

impl From<&str> for ShellArg {
    fn from(text: &str) -> Self {
        ShellArg::Literal(text.to_string())
    }
}

impl From<String> for ShellArg {
    fn from(text: String) -> Self {
        ShellArg::Literal(text)
    }
}

/// A leaf that runs an external program and fails on a non-zero exit.
///
/// Output is captured rather than inherited; on failure the trailing stderr
/// line rides along in the error message.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    program: String,
    args: Vec<ShellArg>,
    config: ShellConfig,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Result<Self, ShellError> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(ShellError::EmptyProgram);
        }
        Ok(ShellCommand {
            program,
            args: Vec::new(),
            config: ShellConfig::default(),
        })
    }

    pub fn arg(mut self, arg: impl Into<ShellArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<ShellArg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn config(mut self, config: ShellConfig) -> Self {
        self.config = config;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Work for ShellCommand {
    async fn run(&self, ctx: &Context) -> Result<(), PerformError> {
        let args = self
            .args
            .iter()
            .map(|arg| arg.resolve(ctx))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(program = %self.program, ?args, "Running shell command");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.config.cwd {
            command.current_dir(cwd);
        }
        if self.config.clear_env {
            command.env_clear();
        }
        command.envs(self.config.env.iter().map(|(k, v)| (k, v)));

        let output = command.output().await?;
        if output.status.success() {
            tracing::info!(program = %self.program, "Shell command succeeded");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("no stderr output");
        tracing::warn!(
            program = %self.program,
            status = %output.status,
            stderr = %detail,
            "Shell command failed"
        );
        Err(PerformError::failed(format!(
            "{} {}: {}",
            self.program, output.status, detail
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{Action, FaultKind, Performer};

    #[test]
    fn test_empty_program_rejected() {
        assert!(matches!(
            ShellCommand::new(""),
            Err(ShellError::EmptyProgram)
        ));
        assert!(matches!(
            ShellCommand::new("   "),
            Err(ShellError::EmptyProgram)
        ));
    }

    #[tokio::test]
    async fn test_successful_command() {
        let command = ShellCommand::new("echo").unwrap().arg("hello");
        command.run(&Context::root()).await.unwrap();
    }

    #[tokio::test]
    async fn test_nonzero_exit_maps_to_failure_with_status() {
        let command = ShellCommand::new("sh")
            .unwrap()
            .args(["-c", "echo diagnostics >&2; exit 3"]);
        let err = command.run(&Context::root()).await.unwrap_err();
        assert_eq!(err.kind(), FaultKind::Execution);
        let message = err.to_string();
        assert!(message.contains("exit status: 3"), "got: {message}");
        assert!(message.contains("diagnostics"), "got: {message}");
    }

    #[tokio::test]
    async fn test_missing_program_maps_to_failure() {
        let command = ShellCommand::new("definitely-not-a-real-binary-xyz").unwrap();
        let err = command.run(&Context::root()).await.unwrap_err();
        assert_eq!(err.kind(), FaultKind::Execution);
    }

    #[tokio::test]
    async fn test_var_argument_resolves_from_context() {
        let command = ShellCommand::new("sh")
            .unwrap()
            .args(["-c", r#"test "$1" = expected"#, "argv0"])
            .arg(ShellArg::var("payload"));
        let ctx = Context::root().child("payload", "expected");
        command.run(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_unbound_var_argument_fails_before_spawning() {
        let command = ShellCommand::new("echo").unwrap().arg(ShellArg::var("missing"));
        let err = command.run(&Context::root()).await.unwrap_err();
        assert!(matches!(err, PerformError::Unbound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_config_env_and_clear_env() {
        let command = ShellCommand::new("sh")
            .unwrap()
            .args(["-c", r#"test "$ARBOR_PROBE" = lives"#])
            .config(ShellConfig {
                cwd: None,
                env: vec![("ARBOR_PROBE".to_string(), "lives".to_string())],
                clear_env: true,
            });
        command.run(&Context::root()).await.unwrap();
    }

    #[tokio::test]
    async fn test_config_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), b"x").unwrap();
        let command = ShellCommand::new("sh")
            .unwrap()
            .args(["-c", "test -f marker"])
            .config(ShellConfig {
                cwd: Some(dir.path().to_path_buf()),
                env: Vec::new(),
                clear_env: false,
            });
        command.run(&Context::root()).await.unwrap();
    }

    #[tokio::test]
    async fn test_command_as_tree_leaf() {
        let leaf = Action::leaf(
            ShellCommand::new("sh")
                .unwrap()
                .args(["-c", r#"test "$1" = a"#, "argv0"])
                .arg(ShellArg::var("item")),
        );
        let ctx = Context::root().child("item", "a");
        Performer::new().perform(&leaf, &ctx).await.unwrap();
    }

    #[test]
    fn test_shell_config_serde_round_trip() {
        let config = ShellConfig {
            cwd: Some(PathBuf::from("/tmp")),
            env: vec![("K".to_string(), "v".to_string())],
            clear_env: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: ShellConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cwd, config.cwd);
        assert_eq!(back.env, config.env);
        assert!(back.clear_env);
    }

    #[test]
    fn test_shell_config_defaults_from_empty_json() {
        let config: ShellConfig = serde_json::from_str("{\"cwd\": null}").unwrap();
        assert!(config.cwd.is_none());
        assert!(config.env.is_empty());
        assert!(!config.clear_env);
    }
}
