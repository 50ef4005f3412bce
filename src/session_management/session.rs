use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error_handling::types::SessionExchangeError;
use crate::identity::Principal;

/// Application-issued credential bound to a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub principal: Principal,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Builds a session, refusing an empty token or an anonymous principal.
    pub fn new(token: String, principal: Principal) -> Result<Self, SessionExchangeError> {
        if token.trim().is_empty() {
            return Err(SessionExchangeError::MalformedResponse("empty session token".into()));
        }
        if principal.identifier.is_empty() {
            return Err(SessionExchangeError::MalformedResponse(
                "principal without identifier".into(),
            ));
        }
        Ok(Self {
            token,
            principal,
            issued_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_token() {
        let err = Session::new("  ".into(), Principal::new("u1", "a@b.com")).unwrap_err();
        assert!(matches!(err, SessionExchangeError::MalformedResponse(_)));
    }

    #[test]
    fn test_rejects_anonymous_principal() {
        assert!(Session::new("abc".into(), Principal::new("", "a@b.com")).is_err());
    }

    #[test]
    fn test_accepts_valid_session() {
        let s = Session::new("abc123".into(), Principal::new("u1", "a@b.com")).unwrap();
        assert_eq!(s.token, "abc123");
        assert_eq!(s.principal.identifier, "u1");
    }
}
