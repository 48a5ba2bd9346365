//! Resolution of a library type name to a compiled-in keyword library.

use std::sync::Arc;

use super::hyperv::HyperVMgmtLibrary;
use super::powershell::PowerShellHost;
use super::KeywordLibrary;

/// Type name of the Hyper-V management library.
pub const HYPERV_LIBRARY_TYPE: &str = "RobotFramework.HyperVMgmtLibrary";

/// Library type names this binary can serve.
pub const AVAILABLE_TYPES: &[&str] = &[HYPERV_LIBRARY_TYPE];

/// Errors raised while loading a keyword library. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unknown library type '{name}' (available: {available})")]
    UnknownType { name: String, available: String },
    #[error("keyword '{0}' is registered more than once")]
    DuplicateKeyword(String),
    #[error("keyword name '{0}' is reserved by the remote server")]
    ReservedName(String),
}

/// Loads the library registered under `type_name`.
///
/// # Errors
///
/// Returns [`LoadError::UnknownType`] if no library with that type name is
/// compiled in, or a registration error from the library itself.
pub fn load_library(type_name: &str) -> Result<KeywordLibrary, LoadError> {
    match type_name {
        HYPERV_LIBRARY_TYPE => HyperVMgmtLibrary::build(Arc::new(PowerShellHost::new())),
        other => Err(LoadError::UnknownType {
            name: other.to_string(),
            available: AVAILABLE_TYPES.join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_hyperv_library() {
        let library = load_library(HYPERV_LIBRARY_TYPE).unwrap();
        assert_eq!(library.type_name(), HYPERV_LIBRARY_TYPE);
        assert_eq!(library.len(), 5);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = load_library("RobotFramework.Missing").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown library type 'RobotFramework.Missing' (available: RobotFramework.HyperVMgmtLibrary)"
        );
    }
}
