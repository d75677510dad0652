use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;
use tracing::info;

use crate::{Command, CommandRunner, Error, Output};

/// Runs commands as real child processes.
///
/// Output is captured rather than inherited; the captured text rides along
/// on the error when the command fails.
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
  async fn run(&self, command: Command) -> Result<Output, Error> {
    info!(
      program = %command.program,
      args = ?command.args,
      "running command"
    );

    let mut cmd = TokioCommand::new(&command.program);
    cmd.args(&command.args);
    if let Some(dir) = &command.current_dir {
      cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let result = cmd.output().await.map_err(|e| Error::Spawn {
      program: command.program.clone(),
      source: e,
    })?;

    let mut combined = String::from_utf8_lossy(&result.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&result.stderr));

    if !result.status.success() {
      // A signal-terminated child has no code; report it as -1.
      return Err(Error::NonZeroExit {
        program: command.program,
        status: result.status.code().unwrap_or(-1),
        output: combined,
      });
    }

    Ok(Output {
      status: result.status.code().unwrap_or(0),
      output: combined,
    })
  }
}
