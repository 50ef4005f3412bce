use log::info;
use tokio::sync::watch;

use super::session_state::{transition, SessionEvent, SessionState};
use crate::notification::Notice;

/// Single source of truth for [`SessionState`].
///
/// Reads are synchronous snapshots; consumers that need to react to changes
/// hold a `watch::Receiver` from [`SessionStore::subscribe`]. Only the session
/// exchanger applies events.
pub struct SessionStore {
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { state }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Waits until the state satisfies `pred` and returns that state.
    pub async fn wait_for<F>(&self, mut pred: F) -> SessionState
    where
        F: FnMut(&SessionState) -> bool,
    {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(|s| pred(s)).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot be closed here
            Err(_) => self.snapshot(),
        };
        state
    }

    /// Waits for the first non-Loading state.
    pub async fn resolved(&self) -> SessionState {
        self.wait_for(|s| !s.is_loading()).await
    }

    /// Runs `event` through the state machine, publishes the next state and
    /// returns the notice the caller should raise.
    pub(crate) fn apply(&self, event: SessionEvent) -> Option<Notice> {
        let mut notice = None;
        self.state.send_modify(|state| {
            let t = transition(state, event);
            if t.next.name() != state.name() {
                info!("Session state {} -> {}", state.name(), t.next.name());
            }
            *state = t.next;
            notice = t.notice;
        });
        notice
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Principal;
    use crate::session_management::session::Session;

    #[test]
    fn store_starts_loading() {
        assert!(SessionStore::new().snapshot().is_loading());
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.apply(SessionEvent::SignedOut);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn resolved_waits_past_loading() {
        let store = std::sync::Arc::new(SessionStore::new());
        let writer = store.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            let session = Session::new("abc".into(), Principal::new("u1", "a@b.com")).unwrap();
            writer.apply(SessionEvent::ExchangeSucceeded(session));
        });
        let state = store.resolved().await;
        assert_eq!(state.session().unwrap().token, "abc");
    }

    #[tokio::test]
    async fn wait_for_returns_current_state_when_already_satisfied() {
        let store = SessionStore::new();
        store.apply(SessionEvent::SignedOut);
        let state = store.wait_for(|s| *s == SessionState::Unauthenticated).await;
        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[test]
    fn apply_returns_notice_from_transition() {
        let store = SessionStore::new();
        let notice = store.apply(SessionEvent::ExchangeFailed("boom".into()));
        assert!(notice.is_some());
        assert_eq!(store.snapshot(), SessionState::Error("boom".into()));
    }
}
