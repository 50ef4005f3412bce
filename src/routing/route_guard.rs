use log::debug;

use super::routes::RouteTable;
use crate::session_management::SessionState;

pub const DEFAULT_SIGN_IN_PATH: &str = "/login";

/// Where a redirected navigation was headed, kept so sign-in can resume it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Identity check still running; show a neutral placeholder and do not navigate.
    Placeholder,
    Render,
    Redirect(Redirect),
}

pub struct RouteGuard {
    routes: RouteTable,
    sign_in_path: String,
}

impl RouteGuard {
    pub fn new<S: Into<String>>(routes: RouteTable, sign_in_path: S) -> Self {
        Self {
            routes,
            sign_in_path: sign_in_path.into(),
        }
    }

    pub fn check(&self, state: &SessionState, requested: &str) -> GuardDecision {
        if !self.routes.is_protected(requested) {
            return GuardDecision::Render;
        }
        let decision = match state {
            SessionState::Loading => GuardDecision::Placeholder,
            SessionState::Authenticated(_) => GuardDecision::Render,
            SessionState::Unauthenticated | SessionState::Error(_) => {
                GuardDecision::Redirect(Redirect {
                    to: self.sign_in_path.clone(),
                    from: requested.to_string(),
                })
            }
        };
        debug!("Guard for {} while {}: {:?}", requested, state.name(), decision);
        decision
    }

    /// Location to navigate to once sign-in succeeds.
    pub fn resume_after_sign_in<'a>(&self, from: Option<&'a str>) -> &'a str {
        match from {
            Some(path) if path.starts_with('/') && !self.is_sign_in(path) => path,
            _ => "/",
        }
    }

    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    fn is_sign_in(&self, path: &str) -> bool {
        let bare = path.split(['?', '#']).next().unwrap_or(path);
        bare.trim_end_matches('/') == self.sign_in_path.trim_end_matches('/')
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(RouteTable::marathon_hub(), DEFAULT_SIGN_IN_PATH)
    }
}
