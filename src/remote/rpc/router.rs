//! Routing of inbound messages to their waiters.
//!
//! Responses go to the oneshot registered for their request ID. Stream
//! notifications (`codeIntel/emit`, `codeIntel/error`, `codeIntel/complete`)
//! go to the subscription registered for their proxy ID. Messages for unknown
//! IDs are dropped, which is how late emissions after a release disappear.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use super::message::{
    self, EmitParams, ErrorParams, ProxyParams, RequestId, synthesized_error_response,
};
use crate::error::{BridgeError, BridgeResult};
use crate::remote::{CallEnvelope, ProxyId};

pub(crate) type EnvelopeSender = mpsc::UnboundedSender<BridgeResult<CallEnvelope>>;
pub(crate) type EnvelopeReceiver = mpsc::UnboundedReceiver<BridgeResult<CallEnvelope>>;

pub(crate) struct Router {
    state: std::sync::Mutex<RouterState>,
}

struct RouterState {
    pending: HashMap<RequestId, oneshot::Sender<serde_json::Value>>,
    streams: HashMap<ProxyId, EnvelopeSender>,
    /// Set once the connection is gone; no new registrations are accepted.
    closed: bool,
}

impl Router {
    pub(crate) fn new() -> Self {
        Self {
            state: std::sync::Mutex::new(RouterState {
                pending: HashMap::new(),
                streams: HashMap::new(),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Register a request before sending it.
    ///
    /// Returns `None` for a duplicate ID or a closed connection.
    pub(crate) fn register_request(
        &self,
        id: RequestId,
    ) -> Option<oneshot::Receiver<serde_json::Value>> {
        let mut state = self.lock();
        if state.closed || state.pending.contains_key(&id) {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        state.pending.insert(id, tx);
        Some(rx)
    }

    /// Deliver a response to its waiter. Returns `true` if delivered.
    pub(crate) fn route_response(&self, response: serde_json::Value) -> bool {
        let Some(id) = RequestId::from_json(&response) else {
            return false;
        };
        let tx = self.lock().pending.remove(&id);
        match tx {
            Some(sender) => sender.send(response).is_ok(),
            None => false,
        }
    }

    /// Forget a request without answering it.
    pub(crate) fn remove_request(&self, id: RequestId) -> bool {
        self.lock().pending.remove(&id).is_some()
    }

    /// Answer a request with a synthesized error response.
    pub(crate) fn fail_request(&self, id: RequestId, message: &str) {
        let tx = self.lock().pending.remove(&id);
        if let Some(sender) = tx {
            let _ = sender.send(synthesized_error_response(id, message));
        }
    }

    /// Open the envelope subscription for a proxy.
    ///
    /// Subscribe before sending the acquiring request so no emission can
    /// arrive unrouted. Returns `None` for a duplicate proxy or a closed
    /// connection.
    pub(crate) fn subscribe(&self, proxy: ProxyId) -> Option<EnvelopeReceiver> {
        let mut state = self.lock();
        if state.closed || state.streams.contains_key(&proxy) {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.streams.insert(proxy, tx);
        Some(rx)
    }

    /// Close a proxy's subscription. Later emissions for it are dropped.
    pub(crate) fn unsubscribe(&self, proxy: ProxyId) -> bool {
        self.lock().streams.remove(&proxy).is_some()
    }

    /// Route a stream notification. Returns `true` if it reached a subscriber.
    pub(crate) fn dispatch_notification(&self, method: &str, params: &serde_json::Value) -> bool {
        let Ok(ProxyParams { proxy }) = serde_json::from_value::<ProxyParams>(params.clone()) else {
            log::debug!(
                target: "repolink::remote::rpc",
                "Notification {} without a proxy id, dropping",
                method
            );
            return false;
        };

        match method {
            message::EMIT => match serde_json::from_value::<EmitParams>(params.clone()) {
                Ok(EmitParams { value }) => self.emit(proxy, value),
                Err(e) => self.finish(
                    proxy,
                    Some(BridgeError::remote_query(format!("malformed emission: {e}"))),
                ),
            },
            message::ERROR => {
                let message = serde_json::from_value::<ErrorParams>(params.clone())
                    .map(|p| p.message)
                    .unwrap_or_default();
                self.finish(proxy, Some(BridgeError::remote_query(message)))
            }
            message::COMPLETE => self.finish(proxy, None),
            _ => {
                log::debug!(
                    target: "repolink::remote::rpc",
                    "Unhandled notification {}, dropping",
                    method
                );
                false
            }
        }
    }

    fn emit(&self, proxy: ProxyId, envelope: CallEnvelope) -> bool {
        let mut state = self.lock();
        let Some(sender) = state.streams.get(&proxy) else {
            return false;
        };
        if sender.send(Ok(envelope)).is_ok() {
            return true;
        }
        // Receiver is gone; the stream was dropped without unsubscribing.
        state.streams.remove(&proxy);
        false
    }

    /// End a subscription, optionally delivering a final error first.
    fn finish(&self, proxy: ProxyId, error: Option<BridgeError>) -> bool {
        let Some(sender) = self.lock().streams.remove(&proxy) else {
            return false;
        };
        match error {
            Some(error) => sender.send(Err(error)).is_ok(),
            None => true,
        }
    }

    /// Fail every waiter and close the router.
    ///
    /// Pending requests receive an error response. Open streams receive a
    /// `RemoteQuery` error and then end.
    pub(crate) fn fail_all(&self, message: &str) {
        let (pending, streams) = {
            let mut state = self.lock();
            state.closed = true;
            (
                state.pending.drain().collect::<Vec<_>>(),
                state.streams.drain().collect::<Vec<_>>(),
            )
        };

        for (id, tx) in pending {
            let _ = tx.send(synthesized_error_response(id, message));
        }
        for (_, tx) in streams {
            let _ = tx.send(Err(BridgeError::remote_query(message)));
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    #[cfg(test)]
    pub(crate) fn subscription_count(&self) -> usize {
        self.lock().streams.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::rpc::message::response_error;
    use serde_json::json;

    fn emit_params(proxy: u64, is_loading: bool) -> serde_json::Value {
        json!({ "proxy": proxy, "value": { "isLoading": is_loading, "result": [] } })
    }

    #[tokio::test]
    async fn routes_response_to_registered_waiter() {
        let router = Router::new();
        let rx = router.register_request(RequestId::new(1)).unwrap();

        assert!(router.route_response(json!({"jsonrpc": "2.0", "id": 1, "result": null})));

        let response = rx.await.unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(router.pending_count(), 0);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let router = Router::new();
        let _rx = router.register_request(RequestId::new(1)).unwrap();
        assert!(router.register_request(RequestId::new(1)).is_none());
        let _sub = router.subscribe(ProxyId::new(1)).unwrap();
        assert!(router.subscribe(ProxyId::new(1)).is_none());
    }

    #[test]
    fn response_for_unknown_id_is_dropped() {
        let router = Router::new();
        assert!(!router.route_response(json!({"id": 99, "result": null})));
    }

    #[tokio::test]
    async fn emissions_reach_subscriber_in_order() {
        let router = Router::new();
        let mut rx = router.subscribe(ProxyId::new(5)).unwrap();

        assert!(router.dispatch_notification(message::EMIT, &emit_params(5, true)));
        assert!(router.dispatch_notification(message::EMIT, &emit_params(5, false)));

        assert!(rx.recv().await.unwrap().unwrap().is_loading);
        assert!(!rx.recv().await.unwrap().unwrap().is_loading);
    }

    #[tokio::test]
    async fn late_emission_after_unsubscribe_is_dropped() {
        let router = Router::new();
        let mut rx = router.subscribe(ProxyId::new(5)).unwrap();

        assert!(router.unsubscribe(ProxyId::new(5)));
        assert!(!router.dispatch_notification(message::EMIT, &emit_params(5, false)));

        assert!(rx.recv().await.is_none(), "stream ends once unsubscribed");
    }

    #[tokio::test]
    async fn error_notification_delivers_remote_query_and_ends_stream() {
        let router = Router::new();
        let mut rx = router.subscribe(ProxyId::new(2)).unwrap();

        assert!(router.dispatch_notification(
            message::ERROR,
            &json!({"proxy": 2, "message": "no index"})
        ));

        assert_eq!(rx.recv().await, Some(Err(BridgeError::remote_query("no index"))));
        assert_eq!(rx.recv().await, None);
        assert_eq!(router.subscription_count(), 0);
    }

    #[tokio::test]
    async fn complete_notification_ends_stream() {
        let router = Router::new();
        let mut rx = router.subscribe(ProxyId::new(3)).unwrap();

        assert!(router.dispatch_notification(message::COMPLETE, &json!({"proxy": 3})));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn malformed_emission_fails_the_stream() {
        let router = Router::new();
        let mut rx = router.subscribe(ProxyId::new(4)).unwrap();

        router.dispatch_notification(message::EMIT, &json!({"proxy": 4, "value": "garbage"}));

        assert!(matches!(rx.recv().await, Some(Err(BridgeError::RemoteQuery { .. }))));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn notification_without_proxy_is_dropped() {
        let router = Router::new();
        assert!(!router.dispatch_notification(message::EMIT, &json!({"value": {}})));
        assert!(!router.dispatch_notification("window/logMessage", &json!({"proxy": 1})));
    }

    #[tokio::test]
    async fn fail_all_fails_waiters_and_closes() {
        let router = Router::new();
        let request_rx = router.register_request(RequestId::new(1)).unwrap();
        let mut stream_rx = router.subscribe(ProxyId::new(1)).unwrap();

        router.fail_all("remote exited");

        let response = request_rx.await.unwrap();
        assert_eq!(response_error(&response).as_deref(), Some("remote exited"));
        assert_eq!(
            stream_rx.recv().await,
            Some(Err(BridgeError::remote_query("remote exited")))
        );
        assert_eq!(stream_rx.recv().await, None);

        assert!(router.is_closed());
        assert!(router.register_request(RequestId::new(2)).is_none());
        assert!(router.subscribe(ProxyId::new(2)).is_none());
    }

    #[tokio::test]
    async fn fail_request_answers_with_error() {
        let router = Router::new();
        let rx = router.register_request(RequestId::new(8)).unwrap();

        router.fail_request(RequestId::new(8), "write failed");

        let response = rx.await.unwrap();
        assert_eq!(response_error(&response).as_deref(), Some("write failed"));
        assert!(!router.remove_request(RequestId::new(8)));
    }
}
