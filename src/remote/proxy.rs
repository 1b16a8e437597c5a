//! Scoped acquisition of remote handles.
//!
//! A remote handle must be released exactly once, whatever way the call that
//! uses it ends. [`ReleaseGuard`] runs the release on drop, so errors, panics
//! and dropped futures (editor cancellation) all release. [`with_remote_handle`]
//! additionally releases promptly once the body settles.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;

/// Client-allocated identifier of a remote handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyId(u64);

impl ProxyId {
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type ReleaseFn = Box<dyn FnOnce(ProxyId) + Send>;

/// Releases a remote handle exactly once, at the latest when dropped.
///
/// The release function must tolerate a torn-down channel; releasing against a
/// closed channel is a no-op, not an error.
pub struct ReleaseGuard {
    proxy_id: ProxyId,
    release: Option<ReleaseFn>,
}

impl ReleaseGuard {
    pub fn new(proxy_id: ProxyId, release: impl FnOnce(ProxyId) + Send + 'static) -> Self {
        Self {
            proxy_id,
            release: Some(Box::new(release)),
        }
    }

    pub fn proxy_id(&self) -> ProxyId {
        self.proxy_id
    }

    /// Whether the release is still pending.
    pub fn is_armed(&self) -> bool {
        self.release.is_some()
    }

    /// Release now. Later calls, and the drop, do nothing.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            log::debug!(
                target: "repolink::remote::proxy",
                "Releasing remote handle {}",
                self.proxy_id
            );
            release(self.proxy_id);
        }
    }

    /// Forget the release without running it.
    ///
    /// Only for acquisitions the remote refused: no handle exists to release.
    pub fn disarm(&mut self) {
        self.release = None;
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if self.is_armed() {
            log::debug!(
                target: "repolink::remote::proxy",
                "Remote handle {} dropped before explicit release",
                self.proxy_id
            );
        }
        self.release();
    }
}

impl fmt::Debug for ReleaseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseGuard")
            .field("proxy_id", &self.proxy_id)
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// An acquired remote value together with the guard releasing its handle.
#[derive(Debug)]
pub struct ScopedProxy<P> {
    guard: ReleaseGuard,
    proxy: P,
}

impl<P> ScopedProxy<P> {
    pub fn new(guard: ReleaseGuard, proxy: P) -> Self {
        Self { guard, proxy }
    }

    pub fn proxy_id(&self) -> ProxyId {
        self.guard.proxy_id()
    }

    pub fn into_parts(self) -> (ReleaseGuard, P) {
        (self.guard, self.proxy)
    }
}

/// Acquire a handle via `factory`, run `body` on it, then release.
///
/// Acquisition errors propagate unchanged and nothing is released, since no
/// handle was acquired. Once acquired, the handle is released after `body`
/// settles, or on drop if this future is dropped first.
pub async fn with_remote_handle<P, T, Fut>(
    factory: impl Future<Output = BridgeResult<ScopedProxy<P>>>,
    body: impl FnOnce(P) -> Fut,
) -> BridgeResult<T>
where
    Fut: Future<Output = BridgeResult<T>>,
{
    let (mut guard, proxy) = factory.await?.into_parts();
    let outcome = body(proxy).await;
    guard.release();
    outcome
}
