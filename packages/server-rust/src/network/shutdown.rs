//! Health state tracking and delayed remote shutdown.
//!
//! Uses `ArcSwap` for lock-free health state transitions. Remote shutdown
//! runs on a detached OS thread that sleeps for the configured delay and
//! then hands control to a [`Terminator`]; it is never joined or cancelled.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arc_swap::ArcSwap;
use tracing::info;

/// Server health state.
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Server is initializing (not yet accepting requests).
    Starting,
    /// Server is fully operational and accepting requests.
    Ready,
    /// A shutdown is pending; the process will exit shortly.
    Draining,
    /// The listener has stopped.
    Stopped,
}

impl HealthState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Starting => "starting",
            HealthState::Ready => "ready",
            HealthState::Draining => "draining",
            HealthState::Stopped => "stopped",
        }
    }
}

/// Final action of a scheduled shutdown.
pub trait Terminator: Send + Sync + 'static {
    fn terminate(&self);
}

/// Exits the process with status 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExitProcess;

impl Terminator for ExitProcess {
    fn terminate(&self) {
        std::process::exit(0);
    }
}

/// Tracks health state and schedules remote shutdowns.
pub struct ShutdownCoordinator {
    health_state: Arc<ArcSwap<HealthState>>,
    terminator: Arc<dyn Terminator>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator in the `Starting` state that exits the process
    /// on shutdown.
    #[must_use]
    pub fn new() -> Self {
        Self::with_terminator(Arc::new(ExitProcess))
    }

    #[must_use]
    pub fn with_terminator(terminator: Arc<dyn Terminator>) -> Self {
        Self {
            health_state: Arc::new(ArcSwap::from_pointee(HealthState::Starting)),
            terminator,
        }
    }

    /// Transitions to the `Ready` state, indicating the server can accept requests.
    pub fn set_ready(&self) {
        self.health_state.store(Arc::new(HealthState::Ready));
    }

    pub fn set_stopped(&self) {
        self.health_state.store(Arc::new(HealthState::Stopped));
    }

    /// Returns the current health state.
    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health_state.load()
    }

    /// Schedules termination after `delay` on a detached thread and moves
    /// to `Draining`. Returns as soon as the thread is spawned.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread; the health
    /// state is left unchanged in that case.
    pub fn schedule_shutdown(&self, delay: Duration) -> io::Result<()> {
        let terminator = Arc::clone(&self.terminator);
        thread::Builder::new()
            .name("remote-shutdown".to_string())
            .spawn(move || {
                thread::sleep(delay);
                info!("Remote server/library shut down");
                terminator.terminate();
            })?;
        self.health_state.store(Arc::new(HealthState::Draining));
        info!(
            "Shutting down remote server/library in {} seconds",
            delay.as_secs()
        );
        Ok(())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("health_state", &self.health_state())
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::testing::RecordingTerminator;
    use super::*;

    fn recording() -> (ShutdownCoordinator, std::sync::mpsc::Receiver<()>) {
        let (terminator, rx) = RecordingTerminator::new();
        (ShutdownCoordinator::with_terminator(Arc::new(terminator)), rx)
    }

    #[test]
    fn health_state_transitions() {
        let (coordinator, _rx) = recording();
        assert_eq!(coordinator.health_state(), HealthState::Starting);
        coordinator.set_ready();
        assert_eq!(coordinator.health_state(), HealthState::Ready);
        coordinator.set_stopped();
        assert_eq!(coordinator.health_state(), HealthState::Stopped);
    }

    #[test]
    fn health_state_names() {
        assert_eq!(HealthState::Starting.as_str(), "starting");
        assert_eq!(HealthState::Draining.as_str(), "draining");
    }

    #[test]
    fn schedule_returns_before_delay_and_terminates_after() {
        let (coordinator, rx) = recording();
        coordinator.set_ready();

        let started = Instant::now();
        coordinator
            .schedule_shutdown(Duration::from_millis(200))
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(200));
        assert_eq!(coordinator.health_state(), HealthState::Draining);
        assert!(rx.try_recv().is_err());

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn each_request_schedules_its_own_termination() {
        let (coordinator, rx) = recording();
        coordinator.schedule_shutdown(Duration::from_millis(10)).unwrap();
        coordinator.schedule_shutdown(Duration::from_millis(10)).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}
