//! JSON-RPC implementation of [`RemoteChannel`].
//!
//! # Architecture
//!
//! One connection to the remote service is shared by all definition calls:
//! - a writer task owns the remote's stdin and drains a single outbound queue
//! - a reader task owns the remote's stdout and feeds the [`Router`](router::Router)
//! - each call subscribes to its proxy's envelope stream before sending the
//!   acquiring request, then awaits the acknowledgement
//!
//! Dropping the [`RpcChannel`] stops both tasks, fails every waiter and kills
//! the child process.

mod framing;
mod message;
mod reader;
mod router;
mod writer;

use std::future::Future;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use self::framing::{FrameReader, FrameWriter};
use self::message::{OutboundMessage, RequestId};
use self::reader::{ReaderTaskHandle, spawn_reader_task};
use self::router::Router;
use self::writer::{WriterTaskHandle, spawn_writer_task};
use super::{DefinitionQuery, EnvelopeStream, ProxyId, ReleaseGuard, RemoteChannel, ScopedProxy};
use crate::config::RemoteServerConfig;
use crate::error::{BridgeError, BridgeResult};

/// Connection to a remote code-intelligence service speaking JSON-RPC.
pub struct RpcChannel {
    inner: Arc<ChannelInner>,
    _reader: ReaderTaskHandle,
    _writer: WriterTaskHandle,
    _child: Option<Mutex<Child>>,
}

struct ChannelInner {
    router: Arc<Router>,
    outbound: mpsc::UnboundedSender<OutboundMessage>,
    next_request_id: AtomicI64,
    next_proxy_id: AtomicU64,
}

impl RpcChannel {
    /// Spawn the configured remote service and connect to its stdio.
    ///
    /// The child process is killed when the channel is dropped.
    pub fn spawn(config: &RemoteServerConfig) -> BridgeResult<Self> {
        let Some((program, args)) = config.cmd.split_first() else {
            return Err(BridgeError::channel_unavailable(
                "remote server command is empty",
            ));
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::channel_unavailable(format!("failed to spawn {program}: {e}")))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            BridgeError::channel_unavailable(format!("failed to obtain stdin for {program}"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            BridgeError::channel_unavailable(format!("failed to obtain stdout for {program}"))
        })?;

        log::info!(
            target: "repolink::remote::rpc",
            "Spawned remote service {} (pid {:?})",
            program,
            child.id()
        );

        let mut channel = Self::connect(stdout, stdin);
        channel._child = Some(Mutex::new(child));
        Ok(channel)
    }

    /// Connect over an already established byte stream pair.
    ///
    /// Must be called within a tokio runtime.
    pub fn connect<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let router = Arc::new(Router::new());
        let (tx, rx) = mpsc::unbounded_channel();

        let reader = spawn_reader_task(FrameReader::new(reader), Arc::clone(&router));
        let writer = spawn_writer_task(FrameWriter::new(writer), rx, Arc::clone(&router));

        Self {
            inner: Arc::new(ChannelInner {
                router,
                outbound: tx,
                next_request_id: AtomicI64::new(1),
                next_proxy_id: AtomicU64::new(1),
            }),
            _reader: reader,
            _writer: writer,
            _child: None,
        }
    }

    /// Whether the remote service has gone away.
    pub fn is_closed(&self) -> bool {
        self.inner.router.is_closed()
    }
}

impl RemoteChannel for RpcChannel {
    fn open_definition(
        &self,
        query: DefinitionQuery,
    ) -> impl Future<Output = BridgeResult<ScopedProxy<EnvelopeStream>>> + Send {
        self.inner.open_definition(query)
    }
}

impl ChannelInner {
    async fn open_definition(
        &self,
        query: DefinitionQuery,
    ) -> BridgeResult<ScopedProxy<EnvelopeStream>> {
        let proxy = ProxyId::new(self.next_proxy_id.fetch_add(1, Ordering::Relaxed));
        let Some(envelopes) = self.router.subscribe(proxy) else {
            return Err(closed());
        };

        // Armed before the acknowledgement: a call dropped while waiting still
        // releases the handle the remote is about to create.
        let mut guard = ReleaseGuard::new(proxy, self.releaser());

        if let Err(e) = self.acquire(proxy, &query).await {
            guard.disarm();
            self.router.unsubscribe(proxy);
            log::debug!(
                target: "repolink::remote::rpc",
                "Acquisition of proxy {} failed: {}",
                proxy,
                e
            );
            return Err(e);
        }

        let stream: EnvelopeStream = Box::pin(UnboundedReceiverStream::new(envelopes));
        Ok(ScopedProxy::new(guard, stream))
    }

    async fn acquire(&self, proxy: ProxyId, query: &DefinitionQuery) -> BridgeResult<()> {
        let request_id = RequestId::new(self.next_request_id.fetch_add(1, Ordering::Relaxed));
        let Some(response_rx) = self.router.register_request(request_id) else {
            return Err(closed());
        };
        let _pending = PendingRequest {
            router: &self.router,
            request_id,
        };

        let payload = message::get_definition_request(request_id, proxy, query);
        self.outbound
            .send(OutboundMessage::Request {
                payload,
                request_id,
            })
            .map_err(|_| closed())?;

        let response = response_rx.await.map_err(|_| closed())?;
        match message::response_error(&response) {
            Some(message) => Err(BridgeError::channel_unavailable(message)),
            None => Ok(()),
        }
    }

    fn releaser(&self) -> impl FnOnce(ProxyId) + Send + use<> {
        let router = Arc::clone(&self.router);
        let outbound = self.outbound.clone();
        move |proxy| {
            router.unsubscribe(proxy);
            let notification = OutboundMessage::Notification(message::release_notification(proxy));
            if outbound.send(notification).is_err() {
                log::debug!(
                    target: "repolink::remote::rpc",
                    "Remote channel gone, release of proxy {} not sent",
                    proxy
                );
            }
        }
    }
}

/// Unregisters a request whose caller stopped waiting.
struct PendingRequest<'a> {
    router: &'a Router,
    request_id: RequestId,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        self.router.remove_request(self.request_id);
    }
}

fn closed() -> BridgeError {
    BridgeError::channel_unavailable("remote channel is closed")
}
