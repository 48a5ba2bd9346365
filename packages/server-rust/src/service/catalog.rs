//! Keyword listing and argument introspection.

use std::sync::Arc;

use robot_remote_core::STOP_REMOTE_SERVER;

use super::operation::RpcError;
use crate::library::KeywordLibrary;

/// Read-only view of the loaded library's keywords, including the
/// server-provided `stop_remote_server`.
#[derive(Debug, Clone)]
pub struct KeywordCatalog {
    library: Arc<KeywordLibrary>,
}

impl KeywordCatalog {
    #[must_use]
    pub fn new(library: Arc<KeywordLibrary>) -> Self {
        Self { library }
    }

    /// Library keywords in declaration order, then `stop_remote_server`.
    #[must_use]
    pub fn keyword_names(&self) -> Vec<String> {
        self.library
            .keywords()
            .map(|k| k.name().to_string())
            .chain(std::iter::once(STOP_REMOTE_SERVER.to_string()))
            .collect()
    }

    /// Declared parameter names of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::KeywordNotFound`] if the library has no such keyword.
    pub fn keyword_arguments(&self, name: &str) -> Result<Vec<String>, RpcError> {
        if name == STOP_REMOTE_SERVER {
            return Ok(Vec::new());
        }
        self.library
            .keyword(name)
            .map(|k| k.params().to_vec())
            .ok_or_else(|| RpcError::KeywordNotFound(name.to_string()))
    }
}
