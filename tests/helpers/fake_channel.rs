//! In-process `RemoteChannel` that plays back a per-call plan.

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::{StreamExt, stream};
use repolink::remote::{
    CallEnvelope, DefinitionQuery, EnvelopeStream, ProxyId, ReleaseGuard, RemoteChannel,
    RemoteLocation, ScopedProxy,
};
use repolink::{BridgeError, BridgeResult};
use tower_lsp_server::ls_types::{Position, Range};

/// How the remote behaves for one call.
#[derive(Debug, Clone)]
pub enum Plan {
    /// Acquisition is refused; no handle exists.
    Refuse,
    /// `loading` loading envelopes, then a terminal one with `result`.
    Answer {
        loading: usize,
        result: Vec<RemoteLocation>,
    },
    /// `loading` loading envelopes, then a stream error.
    FailAfter { loading: usize },
    /// Loading envelopes, then the stream completes without a terminal one.
    EndWithoutResult { loading: usize },
    /// Acquired, then nothing is ever emitted.
    Hang,
    /// Loading envelopes forever, one per `interval`.
    Trickle { interval: Duration },
}

#[derive(Default)]
pub struct Counters {
    pub acquired: AtomicUsize,
    pub refused: AtomicUsize,
    pub released: AtomicUsize,
    /// Envelopes pulled from every stream so far.
    pub pulled: AtomicUsize,
    /// Proxy ids released, in release order.
    pub release_log: Mutex<Vec<ProxyId>>,
}

impl Counters {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn refused(&self) -> usize {
        self.refused.load(Ordering::SeqCst)
    }

    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }
}

/// Picks a [`Plan`] for each call from its zero-based call index.
pub struct ScriptedChannel {
    planner: Box<dyn Fn(u64) -> Plan + Send + Sync>,
    next_call: AtomicU64,
    pub counters: Arc<Counters>,
}

impl ScriptedChannel {
    pub fn new(planner: impl Fn(u64) -> Plan + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            planner: Box::new(planner),
            next_call: AtomicU64::new(0),
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn always(plan: Plan) -> Arc<Self> {
        Self::new(move |_| plan.clone())
    }
}

impl RemoteChannel for ScriptedChannel {
    fn open_definition(
        &self,
        _query: DefinitionQuery,
    ) -> impl Future<Output = BridgeResult<ScopedProxy<EnvelopeStream>>> + Send {
        let call = self.next_call.fetch_add(1, Ordering::SeqCst);
        let plan = (self.planner)(call);
        let counters = Arc::clone(&self.counters);

        async move {
            tokio::task::yield_now().await;

            if matches!(plan, Plan::Refuse) {
                counters.refused.fetch_add(1, Ordering::SeqCst);
                return Err(BridgeError::channel_unavailable("scripted refusal"));
            }

            counters.acquired.fetch_add(1, Ordering::SeqCst);
            let release_counters = Arc::clone(&counters);
            let guard = ReleaseGuard::new(ProxyId::new(call), move |id| {
                release_counters.released.fetch_add(1, Ordering::SeqCst);
                release_counters
                    .release_log
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(id);
            });

            Ok(ScopedProxy::new(guard, envelopes(plan, counters)))
        }
    }
}

fn loading(count: usize) -> Vec<BridgeResult<CallEnvelope>> {
    (0..count).map(|_| Ok(CallEnvelope::loading())).collect()
}

fn envelopes(plan: Plan, counters: Arc<Counters>) -> EnvelopeStream {
    let stream: EnvelopeStream = match plan {
        Plan::Refuse => Box::pin(stream::empty::<BridgeResult<CallEnvelope>>()),
        Plan::Answer { loading: n, result } => {
            let mut items = loading(n);
            items.push(Ok(CallEnvelope::done(result)));
            Box::pin(stream::iter(items))
        }
        Plan::FailAfter { loading: n } => {
            let mut items = loading(n);
            items.push(Err(BridgeError::remote_query("scripted stream failure")));
            Box::pin(stream::iter(items))
        }
        Plan::EndWithoutResult { loading: n } => Box::pin(stream::iter(loading(n))),
        Plan::Hang => Box::pin(stream::pending::<BridgeResult<CallEnvelope>>()),
        Plan::Trickle { interval } => Box::pin(stream::unfold((), move |()| async move {
            tokio::time::sleep(interval).await;
            Some((Ok::<_, BridgeError>(CallEnvelope::loading()), ()))
        })),
    };
    Box::pin(stream.inspect(move |_| {
        counters.pulled.fetch_add(1, Ordering::SeqCst);
    }))
}

/// A remote location in `github.com/foo/bar` at `revision`.
pub fn location(revision: &str, path: &str, line: u32) -> RemoteLocation {
    RemoteLocation {
        uri: format!("git://github.com/foo/bar?{revision}#{path}"),
        range: Range {
            start: Position { line, character: 0 },
            end: Position { line, character: 8 },
        },
    }
}
