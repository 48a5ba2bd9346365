//! Keyword execution and result-envelope construction.

use std::sync::Arc;

use robot_remote_core::{KeywordFault, KeywordResult, Value, STOP_REMOTE_SERVER};
use tracing::{debug, info, warn};

use super::config::ShutdownPolicy;
use super::operation::RpcError;
use crate::library::KeywordLibrary;
use crate::network::ShutdownCoordinator;

/// `output` of an accepted `stop_remote_server`.
pub const SHUTDOWN_ACCEPTED_NOTE: &str = "NOTE: remote server shutting/shut down.";

/// `output` of a `stop_remote_server` ignored by policy.
pub const SHUTDOWN_IGNORED_NOTE: &str =
    "NOTE: remote server not configured to allow remote shutdowns. Your request has been ignored.";

/// Runs keywords and folds every outcome into a [`KeywordResult`].
///
/// Only an unknown keyword name escapes as an error; faults raised by a
/// keyword become FAIL envelopes.
#[derive(Debug, Clone)]
pub struct KeywordInvoker {
    library: Arc<KeywordLibrary>,
    shutdown: Arc<ShutdownCoordinator>,
    policy: ShutdownPolicy,
}

impl KeywordInvoker {
    #[must_use]
    pub fn new(
        library: Arc<KeywordLibrary>,
        shutdown: Arc<ShutdownCoordinator>,
        policy: ShutdownPolicy,
    ) -> Self {
        Self {
            library,
            shutdown,
            policy,
        }
    }

    /// Executes `name` with positional `args`. Blocks for as long as the
    /// keyword runs.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::KeywordNotFound`] if the library has no keyword
    /// called `name`.
    pub fn execute(&self, name: &str, args: &[Value]) -> Result<KeywordResult, RpcError> {
        if name == STOP_REMOTE_SERVER {
            return Ok(self.stop_remote_server());
        }

        let keyword = self
            .library
            .keyword(name)
            .ok_or_else(|| RpcError::KeywordNotFound(name.to_string()))?;

        debug!(keyword = name, args = args.len(), "running keyword");
        let result = match keyword.invoke(args) {
            Ok(ret) => KeywordResult::from_return(&ret),
            Err(fault) => {
                warn!(keyword = name, error = %fault, "keyword raised a fault");
                KeywordResult::from_fault(&fault)
            }
        };
        info!(keyword = name, status = result.status.as_str(), "keyword finished");
        Ok(result)
    }

    fn stop_remote_server(&self) -> KeywordResult {
        if !self.policy.allow_remote_shutdown {
            info!("remote shutdown requested but disabled; ignoring");
            return KeywordResult::note(SHUTDOWN_IGNORED_NOTE);
        }
        match self.shutdown.schedule_shutdown(self.policy.delay) {
            Ok(()) => KeywordResult::note(SHUTDOWN_ACCEPTED_NOTE),
            Err(e) => {
                let fault = KeywordFault::from(
                    anyhow::Error::new(e).context("Failed to schedule remote shutdown"),
                );
                KeywordResult::from_fault(&fault)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use robot_remote_core::KeywordStatus;

    use super::*;
    use crate::library::hyperv::testing::{FakeHost, FakeVm};
    use crate::library::HyperVMgmtLibrary;
    use crate::network::shutdown::testing::RecordingTerminator;
    use crate::network::HealthState;

    fn invoker(allow: bool) -> (KeywordInvoker, Arc<ShutdownCoordinator>, std::sync::mpsc::Receiver<()>) {
        let host = Arc::new(FakeHost::with_vm("web-01", FakeVm::default()));
        let library = HyperVMgmtLibrary::build(host).unwrap();
        let (terminator, rx) = RecordingTerminator::new();
        let shutdown = Arc::new(ShutdownCoordinator::with_terminator(Arc::new(terminator)));
        let policy = ShutdownPolicy {
            allow_remote_shutdown: allow,
            delay: Duration::from_millis(50),
        };
        (
            KeywordInvoker::new(Arc::new(library), Arc::clone(&shutdown), policy),
            shutdown,
            rx,
        )
    }

    #[test]
    fn allowed_stop_passes_and_schedules() {
        let (invoker, shutdown, rx) = invoker(true);
        let result = invoker.execute("stop_remote_server", &[]).unwrap();
        assert_eq!(result.status, KeywordStatus::Pass);
        assert_eq!(result.return_value, "1");
        assert_eq!(result.output, SHUTDOWN_ACCEPTED_NOTE);
        assert_eq!(result.error, "");
        assert_eq!(result.traceback, "");
        assert_eq!(shutdown.health_state(), HealthState::Draining);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn disallowed_stop_passes_without_scheduling() {
        let (invoker, shutdown, rx) = invoker(false);
        let result = invoker.execute("stop_remote_server", &[]).unwrap();
        assert!(result.is_pass());
        assert_eq!(result.return_value, "1");
        assert_eq!(result.output, SHUTDOWN_IGNORED_NOTE);
        assert_eq!(shutdown.health_state(), HealthState::Starting);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn stop_ignores_arguments() {
        let (invoker, _, _rx) = invoker(false);
        let result = invoker
            .execute("stop_remote_server", &[Value::from("extra")])
            .unwrap();
        assert!(result.is_pass());
    }

    #[test]
    fn unknown_keyword_is_a_raw_error() {
        let (invoker, _, _rx) = invoker(true);
        let err = invoker.execute("format_disk", &[]).unwrap_err();
        assert!(matches!(err, RpcError::KeywordNotFound(name) if name == "format_disk"));
    }

    #[test]
    fn keyword_outcomes_become_envelopes() {
        let (invoker, _, _rx) = invoker(true);

        let ok = invoker
            .execute("start_virtual_machine", &[Value::from("web-01")])
            .unwrap();
        assert_eq!(ok.status, KeywordStatus::Pass);
        assert_eq!(ok.return_value, "True");

        let missing = invoker
            .execute("start_virtual_machine", &[Value::from("ghost")])
            .unwrap();
        assert_eq!(missing.status, KeywordStatus::Fail);
        assert_eq!(missing.error, "The virtual machine 'ghost' could not be found.");

        let arity = invoker.execute("start_virtual_machine", &[]).unwrap();
        assert_eq!(arity.status, KeywordStatus::Fail);
        assert_eq!(arity.error, "Parameter count mismatch.");
    }
}
