use std::path::PathBuf;
use std::time::Duration;

use crate::library::HYPERV_LIBRARY_TYPE;

/// Default documentation file, resolved relative to the working directory.
pub const DEFAULT_DOC_FILE: &str = "HyperVMgmtLibrary_doc.xml";

/// Server-level configuration for keyword dispatch.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Type name of the library to serve.
    pub library_type: String,
    /// XML documentation file for the library. `None` disables documentation.
    pub doc_file: Option<PathBuf>,
    /// Handling of the `stop_remote_server` pseudo-keyword.
    pub shutdown: ShutdownPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            library_type: HYPERV_LIBRARY_TYPE.to_string(),
            doc_file: Some(PathBuf::from(DEFAULT_DOC_FILE)),
            shutdown: ShutdownPolicy::default(),
        }
    }
}

/// Remote shutdown policy, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    /// Whether `stop_remote_server` terminates the process.
    pub allow_remote_shutdown: bool,
    /// Delay between accepting the request and terminating.
    pub delay: Duration,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            allow_remote_shutdown: true,
            delay: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.library_type, "RobotFramework.HyperVMgmtLibrary");
        assert_eq!(config.doc_file, Some(PathBuf::from("HyperVMgmtLibrary_doc.xml")));
        assert!(config.shutdown.allow_remote_shutdown);
        assert_eq!(config.shutdown.delay, Duration::from_secs(5));
    }
}
