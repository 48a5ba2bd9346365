//! Remote library dispatch.
//!
//! 1. **Classification** (`operation`): `MethodCall` -> `Result<RemoteCall, RpcError>`
//! 2. **Routing** (`router`): `tower::Service<RemoteCall>` answering each method
//! 3. **Catalog** (`catalog`): keyword names and parameter names
//! 4. **Invocation** (`invoker`): keyword execution and result envelopes
//! 5. **Documentation** (`documentation`): XML documentation lookup

pub mod catalog;
pub mod config;
pub mod documentation;
pub mod invoker;
pub mod operation;
pub mod router;

pub use catalog::KeywordCatalog;
pub use config::{ServerConfig, ShutdownPolicy};
pub use documentation::{DocumentationResolver, XmlDocumentation};
pub use invoker::KeywordInvoker;
pub use operation::{method_names, RemoteCall, RemoteReply, RpcError};
pub use router::RemoteLibraryService;
