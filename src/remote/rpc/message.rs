//! JSON-RPC messages exchanged with the remote code-intelligence service.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::remote::{CallEnvelope, DefinitionQuery, ProxyId};

/// Acquire a handle for a definition query. Params: `{proxy, textDocument, position}`.
pub(crate) const GET_DEFINITION: &str = "codeIntel/getDefinition";
/// One emission of a handle's result stream. Params: `{proxy, value}`.
pub(crate) const EMIT: &str = "codeIntel/emit";
/// The handle's result stream failed. Params: `{proxy, message}`.
pub(crate) const ERROR: &str = "codeIntel/error";
/// The handle's result stream completed. Params: `{proxy}`.
pub(crate) const COMPLETE: &str = "codeIntel/complete";
/// Sent by us: the handle may be discarded. Params: `{proxy}`.
pub(crate) const RELEASE: &str = "proxy/release";

/// JSON-RPC error code used for synthesized failures.
const INTERNAL_ERROR: i64 = -32603;

/// JSON-RPC request ID. Only numeric IDs are used since we allocate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RequestId(i64);

impl RequestId {
    #[inline]
    pub(crate) fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub(crate) fn as_i64(self) -> i64 {
        self.0
    }

    /// The numeric `id` of a message, if any.
    pub(crate) fn from_json(message: &serde_json::Value) -> Option<Self> {
        message.get("id")?.as_i64().map(Self)
    }
}

/// A message queued for the writer task.
#[derive(Debug)]
pub(crate) enum OutboundMessage {
    Notification(serde_json::Value),
    /// The request ID must be registered with the router before queuing.
    Request {
        payload: serde_json::Value,
        request_id: RequestId,
    },
}

#[derive(Serialize)]
struct GetDefinitionParams<'a> {
    proxy: ProxyId,
    #[serde(flatten)]
    query: &'a DefinitionQuery,
}

pub(crate) fn get_definition_request(
    request_id: RequestId,
    proxy: ProxyId,
    query: &DefinitionQuery,
) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": request_id.as_i64(),
        "method": GET_DEFINITION,
        "params": GetDefinitionParams { proxy, query },
    })
}

pub(crate) fn release_notification(proxy: ProxyId) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "method": RELEASE,
        "params": { "proxy": proxy },
    })
}

/// Error response delivered to a waiter when its request cannot complete.
pub(crate) fn synthesized_error_response(request_id: RequestId, message: &str) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": request_id.as_i64(),
        "error": {
            "code": INTERNAL_ERROR,
            "message": message,
        },
    })
}

/// The error message of a response, or `None` for a successful response.
pub(crate) fn response_error(response: &serde_json::Value) -> Option<String> {
    let error = response.get("error").filter(|e| !e.is_null())?;
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    Some(message)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProxyParams {
    pub(crate) proxy: ProxyId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmitParams {
    pub(crate) value: CallEnvelope,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorParams {
    #[serde(default)]
    pub(crate) message: String,
}
