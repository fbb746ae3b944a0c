// Recovery action: run the configured reboot command.

use std::future::Future;
use std::time::Duration;

use tokio::process::Command;
use tracing::instrument;

use crate::error::RecoveryError;

/// Remediation for a sustained outage. Invoked with no arguments; the caller logs failures.
pub trait RecoveryAction {
    fn invoke(&self) -> impl Future<Output = Result<(), RecoveryError>> + Send;
}

pub struct CommandRecovery {
    command: Vec<String>,
    timeout: Duration,
    dry_run: bool,
}

impl CommandRecovery {
    pub fn new(command: Vec<String>, timeout: Duration, dry_run: bool) -> Self {
        Self {
            command,
            timeout,
            dry_run,
        }
    }
}

impl RecoveryAction for CommandRecovery {
    #[instrument(skip(self), fields(operation = "recovery", dry_run = self.dry_run))]
    async fn invoke(&self) -> Result<(), RecoveryError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(RecoveryError::EmptyCommand);
        };
        if self.dry_run {
            tracing::warn!(command = ?self.command, "dry run: recovery command not executed");
            return Ok(());
        }

        // Not killed on drop: a reboot that outlives the wait must still be allowed to finish.
        let mut child = Command::new(program)
            .args(args)
            .spawn()
            .map_err(|source| RecoveryError::Spawn {
                program: program.clone(),
                source,
            })?;
        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        let Ok(status) = waited else {
            tracing::warn!(pid = child.id(), "recovery command still running after timeout");
            return Err(RecoveryError::Timeout(self.timeout));
        };
        let status = status.map_err(|source| RecoveryError::Spawn {
            program: program.clone(),
            source,
        })?;
        if !status.success() {
            return Err(RecoveryError::Exit {
                program: program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}
