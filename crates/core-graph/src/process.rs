use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::Error;

/// Declaration of a helper child process: the subcommand line passed to a
/// fresh copy of this executable.
#[derive(Debug, Clone)]
pub struct HelperCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// A running helper child. Shutdown is graceful: SIGTERM, a 2 s grace
/// period, then SIGKILL.
pub struct HelperProcess {
    name: String,
    child: Child,
}

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

impl HelperProcess {
    pub fn spawn(command: HelperCommand) -> Result<HelperProcess, Error> {
        let executable = std::env::current_exe()?;
        let child = Command::new(executable).args(&command.args).spawn()?;
        info!(
            target: "graph.process",
            name = %command.name,
            pid = child.id(),
            "helper process started"
        );
        Ok(HelperProcess {
            name: command.name,
            child,
        })
    }

    pub async fn shutdown(&mut self) {
        let Some(pid) = self.child.id() else {
            return;
        };
        debug!(target: "graph.process", name = %self.name, pid, "terminating helper process");
        // SAFETY: plain signal delivery to a child pid this process owns.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                warn!(target: "graph.process", name = %self.name, pid, "termination failed, killing helper process");
                let _ = self.child.kill().await;
            }
        }
    }
}
