//! Reconcile step shared by every optimistic mutation.
//!
//! The caller applies its local delta first, then hands the remote call and
//! a refetch of the affected state to [`reconcile`]. The outcome tells the
//! caller which authoritative state to commit:
//!
//! - [`Settled::Confirmed`]: the remote call succeeded, commit its response.
//! - [`Settled::Resynced`]: it failed, the delta is discarded and the
//!   refetched server state is committed in its place.
//! - [`Settled::Diverged`]: both failed; the cached state is unverified and
//!   must be evicted rather than kept.
//!
//! A mutation future dropped before it settles never reaches reconcile. The
//! [`Pending`] guard taken alongside the local delta evicts it in that case.

use std::future::Future;

use tracker_client::{ApiError, ApiResult};

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum Settled<T, S> {
    Confirmed(T),
    Resynced { error: ApiError, state: S },
    Diverged { error: ApiError, refetch_error: ApiError },
}

impl<T, S> Settled<T, S> {
    /// Error to report for an unconfirmed outcome.
    pub fn error(&self) -> Option<StoreError> {
        match self {
            Settled::Confirmed(_) => None,
            Settled::Resynced { error, .. } => Some(StoreError::Api(error.clone())),
            Settled::Diverged {
                error,
                refetch_error,
            } => Some(StoreError::Diverged {
                source: error.clone(),
                refetch: refetch_error.clone(),
            }),
        }
    }
}

/// Rollback armed while an applied local delta is unconfirmed.
///
/// Runs its closure on drop unless [`Pending::settled`] was called first.
#[must_use = "dropping the guard immediately rolls the delta back"]
pub(crate) struct Pending<F: FnOnce()> {
    rollback: Option<F>,
}

impl<F: FnOnce()> Pending<F> {
    pub(crate) fn new(rollback: F) -> Self {
        Self {
            rollback: Some(rollback),
        }
    }

    /// The authoritative state has been committed; disarm.
    pub(crate) fn settled(mut self) {
        self.rollback = None;
    }
}

impl<F: FnOnce()> Drop for Pending<F> {
    fn drop(&mut self) {
        if let Some(rollback) = self.rollback.take() {
            rollback();
        }
    }
}

/// Await `remote`; on failure await `refetch()` to learn the server state.
pub async fn reconcile<T, S, R, F, Fut>(remote: R, refetch: F) -> Settled<T, S>
where
    R: Future<Output = ApiResult<T>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<S>>,
{
    let error = match remote.await {
        Ok(confirmed) => return Settled::Confirmed(confirmed),
        Err(error) => error,
    };

    tracing::info!(%error, "mutation failed, resynchronising from server");
    match refetch().await {
        Ok(state) => Settled::Resynced { error, state },
        Err(refetch_error) => {
            tracing::warn!(%error, %refetch_error, "resynchronisation failed");
            Settled::Diverged {
                error,
                refetch_error,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn transport(msg: &str) -> ApiError {
        ApiError::Transport(msg.to_string())
    }

    #[tokio::test]
    async fn success_skips_refetch() {
        let refetched = AtomicBool::new(false);
        let settled: Settled<u8, u8> = reconcile(async { Ok(1) }, || async {
            refetched.store(true, Ordering::SeqCst);
            Ok(2)
        })
        .await;
        assert_eq!(settled, Settled::Confirmed(1));
        assert_eq!(settled.error(), None);
        assert!(!refetched.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failure_commits_refetched_state() {
        let settled: Settled<u8, &str> =
            reconcile(async { Err(transport("down")) }, || async { Ok("server") }).await;
        assert_eq!(
            settled,
            Settled::Resynced {
                error: transport("down"),
                state: "server",
            }
        );
        assert_eq!(settled.error(), Some(StoreError::Api(transport("down"))));
    }

    #[test]
    fn pending_rolls_back_only_when_dropped_unsettled() {
        let rolled_back = AtomicBool::new(false);
        Pending::new(|| rolled_back.store(true, Ordering::SeqCst)).settled();
        assert!(!rolled_back.load(Ordering::SeqCst));

        drop(Pending::new(|| rolled_back.store(true, Ordering::SeqCst)));
        assert!(rolled_back.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn double_failure_diverges() {
        let settled: Settled<u8, u8> = reconcile(async { Err(transport("a")) }, || async {
            Err(transport("b"))
        })
        .await;
        let err = settled.error().unwrap();
        assert_eq!(err.category(), crate::ErrorCategory::Desync);
    }
}
