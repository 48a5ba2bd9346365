//! Robot Remote Core: keyword values, the `run_keyword` result envelope and
//! the XML-RPC wire codec used by the remote library server.

pub mod keyword;
pub mod value;
pub mod xml;
pub mod xmlrpc;

pub use keyword::{
    KeywordFault, KeywordOutput, KeywordResult, KeywordReturn, KeywordStatus, ReturnShape,
    STOP_REMOTE_SERVER,
};
pub use value::{CoercionError, Value};
pub use xmlrpc::{MethodCall, MethodResponse, XmlRpcError};
