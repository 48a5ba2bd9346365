//! XML-RPC endpoint handler.
//!
//! Every exchange is answered with `200 OK` and an XML-RPC document: either
//! a result or a `<fault>`. A fault only affects its own request.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use bytes::Bytes;
use robot_remote_core::xmlrpc::{decode_method_call, encode_fault, encode_response, fault_codes};
use tower::ServiceExt;
use tracing::{debug, warn};

use super::AppState;
use crate::service::{RemoteCall, RpcError};

/// Handles `POST` requests carrying an XML-RPC `<methodCall>`.
pub async fn xmlrpc_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let xml = match decode_method_call(&body) {
        Ok(call) => {
            debug!(method = %call.method_name, params = call.params.len(), "XML-RPC call");
            let reply = match RemoteCall::try_from(call) {
                Ok(call) => state.service.clone().oneshot(call).await,
                Err(e) => Err(e),
            };
            match reply {
                Ok(reply) => encode_response(&reply.into_value()),
                Err(e) => fault_response(&e),
            }
        }
        Err(e) => {
            warn!(error = %e, "malformed XML-RPC request");
            encode_fault(fault_codes::MALFORMED_REQUEST, &format!("malformed request: {e}"))
        }
    };
    ([(CONTENT_TYPE, "text/xml")], xml)
}

fn fault_response(err: &RpcError) -> String {
    warn!(code = err.fault_code(), error = %err, "answering with fault");
    encode_fault(err.fault_code(), &err.to_string())
}
