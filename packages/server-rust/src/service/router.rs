//! Routing of classified calls to the catalog, invoker and documentation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;
use tracing::debug;

use super::catalog::KeywordCatalog;
use super::config::ShutdownPolicy;
use super::documentation::DocumentationResolver;
use super::invoker::KeywordInvoker;
use super::operation::{RemoteCall, RemoteReply, RpcError};
use crate::library::KeywordLibrary;
use crate::network::ShutdownCoordinator;

type BoxedFuture = Pin<Box<dyn Future<Output = Result<RemoteReply, RpcError>> + Send>>;

// ---------------------------------------------------------------------------
// RemoteLibraryService
// ---------------------------------------------------------------------------

/// Serves the four remote-library methods as a `tower::Service<RemoteCall>`.
///
/// Catalog and documentation calls are answered inline. `run_keyword` runs
/// on the blocking thread pool because keyword bodies perform synchronous
/// host I/O. Cloning is cheap; all clones share the same library.
#[derive(Debug, Clone)]
pub struct RemoteLibraryService {
    library: Arc<KeywordLibrary>,
    catalog: KeywordCatalog,
    invoker: KeywordInvoker,
    docs: Arc<DocumentationResolver>,
}

impl RemoteLibraryService {
    #[must_use]
    pub fn new(
        library: Arc<KeywordLibrary>,
        docs: DocumentationResolver,
        shutdown: Arc<ShutdownCoordinator>,
        policy: ShutdownPolicy,
    ) -> Self {
        Self {
            catalog: KeywordCatalog::new(Arc::clone(&library)),
            invoker: KeywordInvoker::new(Arc::clone(&library), shutdown, policy),
            docs: Arc::new(docs),
            library,
        }
    }

    #[must_use]
    pub fn library(&self) -> &KeywordLibrary {
        &self.library
    }
}

impl Service<RemoteCall> for RemoteLibraryService {
    type Response = RemoteReply;
    type Error = RpcError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: RemoteCall) -> Self::Future {
        debug!(method = call.method_name(), "dispatching remote call");
        match call {
            RemoteCall::GetKeywordNames => {
                let names = self.catalog.keyword_names();
                Box::pin(async move { Ok(RemoteReply::KeywordNames(names)) })
            }
            RemoteCall::GetKeywordArguments { name } => {
                let result = self
                    .catalog
                    .keyword_arguments(&name)
                    .map(RemoteReply::KeywordArguments);
                Box::pin(async move { result })
            }
            RemoteCall::GetKeywordDocumentation { name } => {
                let text = self.docs.describe(&name);
                Box::pin(async move { Ok(RemoteReply::Documentation(text)) })
            }
            RemoteCall::RunKeyword { name, args } => {
                let invoker = self.invoker.clone();
                Box::pin(async move {
                    let result = tokio::task::spawn_blocking(move || invoker.execute(&name, &args))
                        .await
                        .map_err(|e| RpcError::Internal(anyhow::anyhow!("keyword task failed: {e}")))??;
                    Ok(RemoteReply::KeywordResult(result))
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
