//! Robot Framework remote library server exposing Hyper-V management
//! keywords over XML-RPC.

pub mod library;
pub mod network;
pub mod service;

pub use library::{load_library, KeywordLibrary, LibraryBuilder};
pub use network::{NetworkConfig, NetworkModule, ShutdownCoordinator};
pub use service::{DocumentationResolver, RemoteLibraryService, ServerConfig, ShutdownPolicy};
