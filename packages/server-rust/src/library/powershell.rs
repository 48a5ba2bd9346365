//! [`HypervisorHost`] backed by the Hyper-V PowerShell module.
//!
//! Each call spawns a non-interactive PowerShell process and reads a single
//! status token (or a JSON document for summaries) from its stdout.

use std::process::Command;

use anyhow::{bail, Context as _};
use serde::Deserialize;
use tracing::{debug, trace};

use super::hyperv::{HypervisorHost, StateChange, VmSummary};

const OK: &str = "OK";
const FAILED: &str = "FAILED";
const NO_SNAPSHOT: &str = "NOSNAPSHOT";

/// Drives the local Hyper-V host through PowerShell cmdlets.
#[derive(Debug, Clone)]
pub struct PowerShellHost {
    program: String,
}

impl PowerShellHost {
    /// Uses `powershell.exe` on Windows and `pwsh` elsewhere.
    #[must_use]
    pub fn new() -> Self {
        let program = if cfg!(windows) { "powershell.exe" } else { "pwsh" };
        Self::with_program(program)
    }

    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs `script` and returns its trimmed stdout.
    fn run(&self, script: &str) -> anyhow::Result<String> {
        trace!(program = %self.program, script, "running PowerShell script");
        let wrapped = format!("& {{ $ProgressPreference = 'SilentlyContinue'; {script} }}");
        let output = Command::new(&self.program)
            .args([
                "-NoLogo",
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                wrapped.as_str(),
            ])
            .output()
            .with_context(|| format!("Failed to launch {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "PowerShell exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Runs a script that prints `OK` or `FAILED`.
    fn run_status(&self, script: &str) -> anyhow::Result<bool> {
        let out = self.run(script)?;
        debug!(status = %out, "PowerShell status");
        match out.lines().last().map(str::trim) {
            Some(OK) => Ok(true),
            Some(FAILED | NO_SNAPSHOT) => Ok(false),
            _ => bail!("unexpected PowerShell output: {out}"),
        }
    }
}

impl Default for PowerShellHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Quotes `value` as a single-quoted PowerShell string literal.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Binds `$vm` to the VM named exactly `name`, or `$null`.
///
/// `-Name` and `-VMName` treat `*`, `?` and `[` as wildcards, so names are
/// matched with `-eq` instead.
fn find_vm(name: &str) -> String {
    format!(
        "$vm = Get-VM | Where-Object {{ $_.Name -eq {} }} | Select-Object -First 1;",
        quote(name)
    )
}

fn state_change_script(name: &str, change: StateChange) -> String {
    let command = match change {
        StateChange::Start => "Start-VM -VM $vm -ErrorAction Stop",
        StateChange::TurnOff => "Stop-VM -VM $vm -TurnOff -Force -ErrorAction Stop",
        StateChange::Reset => "Restart-VM -VM $vm -Force -ErrorAction Stop",
    };
    format!(
        "{find} if ($null -eq $vm) {{ '{FAILED}' }} \
         else {{ try {{ {command} | Out-Null; '{OK}' }} catch {{ '{FAILED}' }} }}",
        find = find_vm(name)
    )
}

fn revert_script(name: &str) -> String {
    format!(
        "{find} if ($null -eq $vm) {{ '{FAILED}' }} \
         else {{ $snap = Get-VMSnapshot -VM $vm -ErrorAction Stop | Sort-Object CreationTime | Select-Object -Last 1; \
         if ($null -eq $snap) {{ '{NO_SNAPSHOT}' }} \
         else {{ try {{ Restore-VMSnapshot -VMSnapshot $snap -Confirm:$false -ErrorAction Stop; '{OK}' }} catch {{ '{FAILED}' }} }} }}",
        find = find_vm(name)
    )
}

fn summary_script(name: &str) -> String {
    format!(
        "{find} if ($null -eq $vm) {{ throw 'VM not found' }}; \
         $os = ''; \
         $kvp = Get-CimInstance -Namespace root\\virtualization\\v2 -ClassName Msvm_KvpExchangeComponent \
           -Filter \"SystemName='$($vm.Id)'\" -ErrorAction SilentlyContinue; \
         if ($kvp) {{ foreach ($item in $kvp.GuestIntrinsicExchangeItems) {{ \
           $x = [xml]$item; $props = $x.INSTANCE.PROPERTY; \
           if (($props | Where-Object {{ $_.NAME -eq 'Name' }}).VALUE -eq 'OSName') {{ \
             $os = ($props | Where-Object {{ $_.NAME -eq 'Data' }}).VALUE }} }} }}; \
         [pscustomobject]@{{ Name = $vm.Name; GuestOperatingSystem = $os; Notes = $vm.Notes; \
           State = [string]$vm.State; Uptime = [string]$vm.Uptime; \
           MemoryUsage = [int64]($vm.MemoryAssigned / 1MB); ProcessorLoad = [int64]$vm.CPUUsage }} \
         | ConvertTo-Json -Compress",
        find = find_vm(name)
    )
}

/// JSON shape emitted by [`summary_script`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PsVmSummary {
    name: String,
    guest_operating_system: Option<String>,
    notes: Option<String>,
    state: String,
    uptime: String,
    memory_usage: i64,
    processor_load: i64,
}

impl From<PsVmSummary> for VmSummary {
    fn from(ps: PsVmSummary) -> Self {
        Self {
            name: ps.name,
            guest_os: ps.guest_operating_system.unwrap_or_default(),
            notes: ps.notes.unwrap_or_default(),
            state: ps.state,
            uptime: ps.uptime,
            memory_usage: ps.memory_usage,
            cpu_load: ps.processor_load,
        }
    }
}

impl HypervisorHost for PowerShellHost {
    fn vm_exists(&self, name: &str) -> anyhow::Result<bool> {
        let script = format!(
            "@(Get-VM | Where-Object {{ $_.Name -eq {} }}).Count",
            quote(name)
        );
        let out = self.run(&script)?;
        let count: usize = out
            .parse()
            .with_context(|| format!("unexpected VM count output: {out}"))?;
        Ok(count > 0)
    }

    fn change_state(&self, name: &str, change: StateChange) -> anyhow::Result<bool> {
        self.run_status(&state_change_script(name, change))
    }

    fn revert_to_last_snapshot(&self, name: &str) -> anyhow::Result<bool> {
        self.run_status(&revert_script(name))
    }

    fn summary(&self, name: &str) -> anyhow::Result<VmSummary> {
        let out = self.run(&summary_script(name))?;
        let parsed: PsVmSummary =
            serde_json::from_str(&out).context("Failed to parse VM summary JSON")?;
        Ok(parsed.into())
    }
}
