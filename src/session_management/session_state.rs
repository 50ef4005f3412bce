//! Session state machine.
//!
//! [`transition`] is a pure function: it never touches storage, the network or
//! the notifier. Side effects are the caller's job; the returned
//! [`Transition`] carries the notice the caller should raise, if any.

use log::debug;
use serde::Serialize;

use super::session::Session;
use crate::error_handling::types::AuthError;
use crate::notification::Notice;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Waiting for the identity provider or for a session exchange to settle.
    #[default]
    Loading,
    Unauthenticated,
    Authenticated(Session),
    Error(String),
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Loading => "Loading",
            SessionState::Unauthenticated => "Unauthenticated",
            SessionState::Authenticated(_) => "Authenticated",
            SessionState::Error(_) => "Error",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new principal was accepted and an exchange started for it.
    PrincipalChanged,
    ExchangeSucceeded(Session),
    ExchangeFailed(String),
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SessionState,
    pub notice: Option<Notice>,
}

impl Transition {
    fn to(next: SessionState) -> Self {
        Self { next, notice: None }
    }
}

pub fn transition(current: &SessionState, event: SessionEvent) -> Transition {
    match (current, event) {
        (_, SessionEvent::PrincipalChanged) => Transition::to(SessionState::Loading),
        (_, SessionEvent::SignedOut) => Transition::to(SessionState::Unauthenticated),
        (SessionState::Loading, SessionEvent::ExchangeSucceeded(session)) => {
            Transition::to(SessionState::Authenticated(session))
        }
        (SessionState::Loading, SessionEvent::ExchangeFailed(reason)) => Transition {
            next: SessionState::Error(reason),
            notice: Some(Notice::error(AuthError::SessionExchangeFailed.user_message())),
        },
        (other, event) => {
            // Exchange results only resolve a pending Loading
            debug!("Ignoring {:?} while {}", event, other.name());
            Transition::to(other.clone())
        }
    }
}
