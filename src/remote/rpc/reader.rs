//! Reader task for the remote service's stdout.
//!
//! Reads framed messages and hands them to the [`Router`]. On EOF or a read
//! error every waiter is failed and the router closes.

use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::framing::FrameReader;
use super::router::Router;

/// Stops the reader task when dropped.
pub(crate) struct ReaderTaskHandle {
    _join_handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl Drop for ReaderTaskHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

pub(crate) fn spawn_reader_task<R>(reader: FrameReader<R>, router: Arc<Router>) -> ReaderTaskHandle
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let cancel_token = CancellationToken::new();
    let join_handle = tokio::spawn(reader_loop(reader, router, cancel_token.clone()));

    ReaderTaskHandle {
        _join_handle: join_handle,
        cancel_token,
    }
}

/// Closes the router when the reader stops, including by panic.
struct CloseOnExit<'a> {
    router: &'a Router,
}

impl Drop for CloseOnExit<'_> {
    fn drop(&mut self) {
        if !self.router.is_closed() {
            log::warn!(
                target: "repolink::remote::rpc::reader",
                "Reader task stopped unexpectedly, failing pending calls"
            );
            self.router.fail_all("remote channel reader stopped");
        }
    }
}

async fn reader_loop<R>(mut reader: FrameReader<R>, router: Arc<Router>, cancel_token: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let _close_on_exit = CloseOnExit { router: &router };
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log::debug!(
                    target: "repolink::remote::rpc::reader",
                    "Reader task cancelled, shutting down"
                );
                router.fail_all("remote channel closed");
                return;
            }
            result = reader.read_message() => match result {
                Ok(message) => handle_message(message, &router),
                Err(e) => {
                    log::warn!(
                        target: "repolink::remote::rpc::reader",
                        "Remote service stream ended: {}, failing pending calls",
                        e
                    );
                    router.fail_all(&format!("remote service unavailable: {e}"));
                    return;
                }
            }
        }
    }
}

fn handle_message(message: serde_json::Value, router: &Router) {
    let method = message.get("method").and_then(|m| m.as_str());

    match (method, message.get("id")) {
        (None, Some(_)) => {
            if !router.route_response(message) {
                log::debug!(
                    target: "repolink::remote::rpc::reader",
                    "Response for unknown request id, dropping"
                );
            }
        }
        (Some(method), None) => {
            let params = message.get("params").cloned().unwrap_or_default();
            if !router.dispatch_notification(method, &params) {
                log::trace!(
                    target: "repolink::remote::rpc::reader",
                    "Notification {} had no subscriber",
                    method
                );
            }
        }
        (Some(method), Some(_)) => {
            log::debug!(
                target: "repolink::remote::rpc::reader",
                "Ignoring request {} from remote service",
                method
            );
        }
        (None, None) => {
            log::debug!(
                target: "repolink::remote::rpc::reader",
                "Dropping message without method or id"
            );
        }
    }
}
