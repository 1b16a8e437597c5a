//! Writer task for the remote service's stdin.
//!
//! The single consumer of the outbound queue, so messages reach the remote in
//! the order they were queued.

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::framing::FrameWriter;
use super::message::OutboundMessage;
use super::router::Router;

/// Stops the writer task when dropped.
pub(crate) struct WriterTaskHandle {
    _join_handle: tokio::task::JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl Drop for WriterTaskHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

pub(crate) fn spawn_writer_task<W>(
    writer: FrameWriter<W>,
    rx: mpsc::UnboundedReceiver<OutboundMessage>,
    router: Arc<Router>,
) -> WriterTaskHandle
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let cancel_token = CancellationToken::new();
    let join_handle = tokio::spawn(writer_loop(writer, rx, router, cancel_token.clone()));

    WriterTaskHandle {
        _join_handle: join_handle,
        cancel_token,
    }
}

async fn writer_loop<W>(
    mut writer: FrameWriter<W>,
    mut rx: mpsc::UnboundedReceiver<OutboundMessage>,
    router: Arc<Router>,
    cancel_token: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log::debug!(
                    target: "repolink::remote::rpc::writer",
                    "Writer task cancelled, shutting down"
                );
                while let Ok(msg) = rx.try_recv() {
                    if let OutboundMessage::Request { request_id, .. } = msg {
                        router.fail_request(request_id, "remote channel closing");
                    }
                }
                return;
            }

            msg = rx.recv() => {
                let Some(outbound) = msg else {
                    log::debug!(
                        target: "repolink::remote::rpc::writer",
                        "Outbound queue closed, writer exiting"
                    );
                    return;
                };
                let payload = match &outbound {
                    OutboundMessage::Notification(payload) => payload,
                    OutboundMessage::Request { payload, .. } => payload,
                };
                if let Err(e) = writer.write_message(payload).await {
                    log::warn!(
                        target: "repolink::remote::rpc::writer",
                        "Write to remote service failed: {}",
                        e
                    );
                    if let OutboundMessage::Request { request_id, .. } = &outbound {
                        router.fail_request(*request_id, &format!("write failed: {e}"));
                    }
                }
            }
        }
    }
}
