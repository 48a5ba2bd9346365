//! Hyper-V virtual machine management keywords.
//!
//! Keywords are registered in the order Robot Framework lists them. All host
//! interaction goes through [`HypervisorHost`], so the keyword semantics
//! (missing-VM faults, boolean outcomes, the info text layout) are
//! independent of how the hypervisor is reached.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Context as _;
use robot_remote_core::KeywordFault;
use tracing::{debug, warn};

use super::loader::{LoadError, HYPERV_LIBRARY_TYPE};
use super::{Args, KeywordLibrary, LibraryBuilder};

/// Text returned by `get_virtual_machine_information` when the host cannot
/// report on the VM.
pub const INFO_UNAVAILABLE: &str = "Failed to retrieve VM info.\n";

/// Requested power-state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Start,
    /// Forced power-off.
    TurnOff,
    /// Forced reset.
    Reset,
}

impl StateChange {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StateChange::Start => "start",
            StateChange::TurnOff => "turn off",
            StateChange::Reset => "reset",
        }
    }
}

/// Summary of a virtual machine as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VmSummary {
    pub name: String,
    pub guest_os: String,
    pub notes: String,
    pub state: String,
    pub uptime: String,
    /// Assigned memory in MiB.
    pub memory_usage: i64,
    /// CPU load in percent.
    pub cpu_load: i64,
}

impl VmSummary {
    /// Renders the summary as newline-terminated `VM <field>: <value>` lines.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "VM name: {}", self.name);
        let _ = writeln!(out, "VM guest OS: {}", self.guest_os);
        let _ = writeln!(out, "VM notes: {}", self.notes);
        let _ = writeln!(out, "VM state: {}", self.state);
        let _ = writeln!(out, "VM uptime: {}", self.uptime);
        let _ = writeln!(out, "VM memory usage: {}", self.memory_usage);
        let _ = writeln!(out, "VM CPU load: {}", self.cpu_load);
        out
    }
}

/// Access to a Hyper-V host.
///
/// `Ok(false)` from a state-changing method means the host refused or failed
/// the change; `Err` means the host could not be queried at all.
pub trait HypervisorHost: Send + Sync {
    /// Whether a VM with this name exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot be queried.
    fn vm_exists(&self, name: &str) -> anyhow::Result<bool>;

    /// # Errors
    ///
    /// Returns an error if the host cannot be reached.
    fn change_state(&self, name: &str, change: StateChange) -> anyhow::Result<bool>;

    /// Applies the most recent snapshot. `Ok(false)` when the VM has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot be reached.
    fn revert_to_last_snapshot(&self, name: &str) -> anyhow::Result<bool>;

    /// # Errors
    ///
    /// Returns an error if the summary cannot be retrieved.
    fn summary(&self, name: &str) -> anyhow::Result<VmSummary>;
}

/// Per-call execution context of the Hyper-V library.
pub struct HyperVSession {
    host: Arc<dyn HypervisorHost>,
}

impl HyperVSession {
    fn require_vm(&self, name: &str) -> Result<(), KeywordFault> {
        let exists = self
            .host
            .vm_exists(name)
            .with_context(|| format!("Failed to look up virtual machine '{name}'"))?;
        if exists {
            Ok(())
        } else {
            Err(KeywordFault::new(format!(
                "The virtual machine '{name}' could not be found."
            )))
        }
    }

    fn change_state(&self, args: &Args<'_>, change: StateChange) -> Result<bool, KeywordFault> {
        let name = args.string(0)?;
        self.require_vm(&name)?;
        let changed = self
            .host
            .change_state(&name, change)
            .with_context(|| format!("Failed to {} virtual machine '{name}'", change.as_str()))?;
        if changed {
            debug!(vm = %name, change = change.as_str(), "state change completed");
        } else {
            warn!(vm = %name, change = change.as_str(), "state change refused by host");
        }
        Ok(changed)
    }

    fn revert(&self, args: &Args<'_>) -> Result<bool, KeywordFault> {
        let name = args.string(0)?;
        self.require_vm(&name)?;
        let reverted = self
            .host
            .revert_to_last_snapshot(&name)
            .with_context(|| format!("Failed to revert virtual machine '{name}'"))?;
        if !reverted {
            warn!(vm = %name, "revert to last snapshot did not complete");
        }
        Ok(reverted)
    }

    fn information(&self, args: &Args<'_>) -> Result<String, KeywordFault> {
        let name = args.string(0)?;
        self.require_vm(&name)?;
        match self.host.summary(&name) {
            Ok(summary) => Ok(summary.render()),
            Err(e) => {
                warn!(vm = %name, error = %e, "failed to retrieve VM summary");
                Ok(INFO_UNAVAILABLE.to_string())
            }
        }
    }
}

/// Registration of the `RobotFramework.HyperVMgmtLibrary` keywords.
pub struct HyperVMgmtLibrary;

impl HyperVMgmtLibrary {
    /// Builds the keyword library backed by `host`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if keyword registration is inconsistent.
    pub fn build(host: Arc<dyn HypervisorHost>) -> Result<KeywordLibrary, LoadError> {
        LibraryBuilder::new(HYPERV_LIBRARY_TYPE, move || {
            Ok(HyperVSession {
                host: Arc::clone(&host),
            })
        })
        .keyword("start_virtual_machine", &["name"], |s: &mut HyperVSession, args| {
            s.change_state(args, StateChange::Start)
        })
        .keyword("stop_virtual_machine", &["name"], |s: &mut HyperVSession, args| {
            s.change_state(args, StateChange::TurnOff)
        })
        .keyword("hard_reset_virtual_machine", &["name"], |s: &mut HyperVSession, args| {
            s.change_state(args, StateChange::Reset)
        })
        .keyword("revert_to_last_snapshot", &["vmName"], |s: &mut HyperVSession, args| {
            s.revert(args)
        })
        .keyword(
            "get_virtual_machine_information",
            &["name"],
            |s: &mut HyperVSession, args| s.information(args),
        )
        .build()
    }
}


#[cfg(test)]
mod tests {
    use robot_remote_core::{KeywordResult, KeywordReturn, KeywordStatus, Value};

    use super::testing::{FakeHost, FakeVm};
    use super::*;
    use crate::library::Keyword;

    fn library(host: FakeHost) -> (KeywordLibrary, Arc<FakeHost>) {
        let host = Arc::new(host);
        let dyn_host: Arc<dyn HypervisorHost> = Arc::clone(&host) as Arc<dyn HypervisorHost>;
        (HyperVMgmtLibrary::build(dyn_host).unwrap(), host)
    }

    fn run(library: &KeywordLibrary, keyword: &str, arg: &str) -> KeywordResult {
        match library.keyword(keyword).unwrap().invoke(&[Value::from(arg)]) {
            Ok(ret) => KeywordResult::from_return(&ret),
            Err(fault) => KeywordResult::from_fault(&fault),
        }
    }

    #[test]
    fn keywords_are_listed_in_declaration_order() {
        let (library, _) = library(FakeHost::default());
        let names: Vec<&str> = library.keywords().map(Keyword::name).collect();
        assert_eq!(
            names,
            vec![
                "start_virtual_machine",
                "stop_virtual_machine",
                "hard_reset_virtual_machine",
                "revert_to_last_snapshot",
                "get_virtual_machine_information",
            ]
        );
        assert_eq!(library.type_name(), "RobotFramework.HyperVMgmtLibrary");
        assert_eq!(
            library.keyword("revert_to_last_snapshot").unwrap().params(),
            ["vmName".to_string()]
        );
    }

    #[test]
    fn start_and_stop_change_state() {
        let (library, host) = library(FakeHost::with_vm("web-01", FakeVm::default()));

        let started = run(&library, "start_virtual_machine", "web-01");
        assert_eq!(started.status, KeywordStatus::Pass);
        assert_eq!(started.return_value, "True");
        assert!(host.vm("web-01").unwrap().running);

        let stopped = run(&library, "stop_virtual_machine", "web-01");
        assert!(stopped.is_pass());
        assert!(!host.vm("web-01").unwrap().running);
    }

    #[test]
    fn refused_change_fails_without_error() {
        let vm = FakeVm {
            refuse_changes: true,
            ..FakeVm::default()
        };
        let (library, _) = library(FakeHost::with_vm("db-01", vm));

        let result = run(&library, "hard_reset_virtual_machine", "db-01");
        assert_eq!(result.status, KeywordStatus::Fail);
        assert_eq!(result.return_value, "False");
        assert_eq!(result.error, "");
    }

    #[test]
    fn missing_vm_is_a_fault() {
        let (library, _) = library(FakeHost::default());
        let result = run(&library, "start_virtual_machine", "ghost");
        assert_eq!(result.status, KeywordStatus::Fail);
        assert_eq!(result.error, "The virtual machine 'ghost' could not be found.");
        assert_eq!(result.output, result.error);
    }

    #[test]
    fn unreachable_host_reports_cause_chain() {
        let host = FakeHost {
            unreachable: true,
            ..FakeHost::default()
        };
        let (library, _) = library(host);
        let result = run(&library, "stop_virtual_machine", "web-01");
        assert_eq!(result.error, "Failed to look up virtual machine 'web-01'");
        assert_eq!(result.traceback, "Caused by: RPC server is unavailable");
    }

    #[test]
    fn revert_without_snapshot_returns_false() {
        let (library, _) = library(FakeHost::with_vm("web-01", FakeVm::default()));
        let ret = library
            .keyword("revert_to_last_snapshot")
            .unwrap()
            .invoke(&[Value::from("web-01")])
            .unwrap();
        assert_eq!(ret, KeywordReturn::Bool(false));
    }

    #[test]
    fn information_renders_all_lines() {
        let vm = FakeVm {
            running: true,
            ..FakeVm::default()
        };
        let (library, _) = library(FakeHost::with_vm("web-01", vm));
        let result = run(&library, "get_virtual_machine_information", "web-01");
        assert!(result.is_pass());
        assert_eq!(
            result.return_value,
            "VM name: web-01\n\
             VM guest OS: Windows Server 2008 R2\n\
             VM notes: \n\
             VM state: Running\n\
             VM uptime: 00:10:00\n\
             VM memory usage: 2048\n\
             VM CPU load: 3\n"
        );
    }

    #[test]
    fn information_degrades_when_summary_fails() {
        let mut host = FakeHost::with_vm("web-01", FakeVm::default());
        host.summary_broken = true;
        let (library, _) = library(host);
        let result = run(&library, "get_virtual_machine_information", "web-01");
        assert!(result.is_pass());
        assert_eq!(result.return_value, INFO_UNAVAILABLE);
    }

    #[test]
    fn non_string_name_is_rejected() {
        let (library, _) = library(FakeHost::with_vm("1", FakeVm::default()));
        let fault = library
            .keyword("start_virtual_machine")
            .unwrap()
            .invoke(&[Value::Int(1)])
            .unwrap_err();
        assert_eq!(
            fault.message(),
            "Invalid argument 1 for keyword 'start_virtual_machine': expected string but got int"
        );
    }
}
