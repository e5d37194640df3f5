//! Single-flight coordination of access-token refreshes.
//!
//! At most one refresh runs at a time. The caller that finds no refresh in
//! flight becomes the leader and performs it; callers arriving meanwhile are
//! parked in an explicit queue and all receive the leader's outcome.

use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::auth::{AccessToken, TokenStore};
use crate::error::ApiError;

/// Why a refresh did not produce a token. Cloned to every queued caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl RefreshFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn abandoned() -> Self {
        Self::new(None, "token refresh was abandoned before it completed")
    }
}

impl From<RefreshFailure> for ApiError {
    fn from(failure: RefreshFailure) -> Self {
        ApiError::RefreshFailed {
            status: failure.status,
            message: failure.message,
        }
    }
}

pub type RefreshOutcome = Result<AccessToken, RefreshFailure>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    /// Bumped whenever the session is ended or replaced outside a refresh.
    epoch: u64,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// What a caller that saw a 401 should do next.
pub enum RefreshTicket<'a> {
    /// A newer token than the one the request was sent with is already held.
    Current(AccessToken),
    /// Another caller is refreshing; await its outcome.
    Queued(oneshot::Receiver<RefreshOutcome>),
    /// This caller must perform the refresh and settle the guard.
    Leader(RefreshGuard<'a>),
}

/// In-flight flag plus pending queue.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide the caller's role after a 401 on a request sent with `sent_with`.
    ///
    /// The flag check, the token comparison and the flag set happen in one
    /// critical section, so two callers can never both become leader.
    pub fn join(&self, sent_with: Option<&AccessToken>, tokens: &TokenStore) -> RefreshTicket<'_> {
        self.enter(|| tokens.get().filter(|current| sent_with != Some(current)))
    }

    /// Lead a refresh, or queue behind the one in flight, regardless of the held token.
    pub fn begin(&self) -> RefreshTicket<'_> {
        self.enter(|| None)
    }

    fn enter<F>(&self, newer_token: F) -> RefreshTicket<'_>
    where
        F: FnOnce() -> Option<AccessToken>,
    {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            tracing::debug!(queued = state.waiters.len(), "Joined pending token refresh");
            return RefreshTicket::Queued(rx);
        }
        if let Some(current) = newer_token() {
            return RefreshTicket::Current(current);
        }
        state.in_flight = true;
        RefreshTicket::Leader(RefreshGuard {
            coordinator: self,
            epoch: state.epoch,
            settled: false,
        })
    }

    /// Mark the current session as over. A refresh already in flight can no
    /// longer commit its token.
    pub fn end_session(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.epoch = state.epoch.wrapping_add(1);
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).in_flight
    }

    /// Number of callers waiting on the current refresh.
    pub fn queued(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .waiters
            .len()
    }

    fn settle(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        tracing::debug!(
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "Settling token refresh"
        );
        for waiter in waiters {
            // A dropped receiver means that caller went away; nothing to do.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Leadership of the in-flight refresh.
///
/// Dropping an unsettled guard rejects every queued caller and clears the
/// flag, so a cancelled leader never strands the queue.
pub struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    epoch: u64,
    settled: bool,
}

impl RefreshGuard<'_> {
    /// Run `apply` if the session this refresh started in is still current.
    ///
    /// The check and `apply` share the coordinator lock, so an
    /// [`RefreshCoordinator::end_session`] either happens before (and `apply`
    /// is skipped) or after (and sees what `apply` stored).
    pub fn commit<F: FnOnce()>(&self, apply: F) -> bool {
        let state = self.coordinator.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.epoch != self.epoch {
            return false;
        }
        apply();
        true
    }

    /// Resolve or reject every queued caller and clear the in-flight flag.
    pub fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Token refresh dropped before settling; rejecting queued requests");
            self.coordinator.settle(&Err(RefreshFailure::abandoned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader<'a>(ticket: RefreshTicket<'a>) -> RefreshGuard<'a> {
        match ticket {
            RefreshTicket::Leader(guard) => guard,
            _ => panic!("expected leader"),
        }
    }

    fn queued(ticket: RefreshTicket<'_>) -> oneshot::Receiver<RefreshOutcome> {
        match ticket {
            RefreshTicket::Queued(rx) => rx,
            _ => panic!("expected queued"),
        }
    }

    #[tokio::test]
    async fn second_caller_queues_behind_leader() {
        let coordinator = RefreshCoordinator::new();
        let tokens = TokenStore::in_memory();
        tokens.set(AccessToken::new("old")).unwrap();
        let sent = AccessToken::new("old");

        let guard = leader(coordinator.join(Some(&sent), &tokens));
        assert!(coordinator.is_refreshing());
        let rx_b = queued(coordinator.join(Some(&sent), &tokens));
        let rx_c = queued(coordinator.join(Some(&sent), &tokens));
        assert_eq!(coordinator.queued(), 2);

        guard.settle(&Ok(AccessToken::new("new")));
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.queued(), 0);
        assert_eq!(rx_b.await.unwrap(), Ok(AccessToken::new("new")));
        assert_eq!(rx_c.await.unwrap(), Ok(AccessToken::new("new")));
    }

    #[tokio::test]
    async fn failure_reaches_every_waiter() {
        let coordinator = RefreshCoordinator::new();
        let tokens = TokenStore::in_memory();
        let guard = leader(coordinator.join(None, &tokens));
        let rx = queued(coordinator.join(None, &tokens));

        let failure = RefreshFailure::new(Some(401), "expired");
        guard.settle(&Err(failure.clone()));
        assert_eq!(rx.await.unwrap(), Err(failure));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn dropped_leader_rejects_queue_and_clears_flag() {
        let coordinator = RefreshCoordinator::new();
        let tokens = TokenStore::in_memory();
        let guard = leader(coordinator.join(None, &tokens));
        let rx = queued(coordinator.join(None, &tokens));

        drop(guard);
        assert!(!coordinator.is_refreshing());
        let outcome = rx.await.unwrap();
        assert!(outcome.is_err());
    }

    #[test]
    fn newer_token_skips_refresh() {
        let coordinator = RefreshCoordinator::new();
        let tokens = TokenStore::in_memory();
        tokens.set(AccessToken::new("t2")).unwrap();

        match coordinator.join(Some(&AccessToken::new("t1")), &tokens) {
            RefreshTicket::Current(token) => assert_eq!(token.as_str(), "t2"),
            _ => panic!("expected current token"),
        }
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn begin_ignores_held_token() {
        let coordinator = RefreshCoordinator::new();
        assert!(matches!(coordinator.begin(), RefreshTicket::Leader(_)));
    }

    #[test]
    fn ended_session_blocks_commit() {
        let coordinator = RefreshCoordinator::new();
        let guard = leader(coordinator.begin());
        coordinator.end_session();

        let mut applied = false;
        assert!(!guard.commit(|| applied = true));
        assert!(!applied);
        guard.settle(&Err(RefreshFailure::new(None, "ended")));

        let guard = leader(coordinator.begin());
        assert!(guard.commit(|| applied = true));
        assert!(applied);
    }

    #[test]
    fn next_episode_can_lead_after_settle() {
        let coordinator = RefreshCoordinator::new();
        let tokens = TokenStore::in_memory();
        leader(coordinator.join(None, &tokens)).settle(&Err(RefreshFailure::new(None, "x")));
        let _guard = leader(coordinator.join(None, &tokens));
        assert!(coordinator.is_refreshing());
    }
}
