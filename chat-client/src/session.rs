//! Session access for chatsync.
//!
//! The signed-in user and their bearer credential are an injected
//! collaborator, read once per mount by the controller.

use chat_types::UserId;

/// Bearer credential for the chat backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header only.
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&"[REDACTED]").finish()
    }
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Id of the signed-in user; authors every optimistic message.
    pub user_id: UserId,
    /// Bearer credential for every request.
    pub credential: Credential,
}

impl Session {
    /// Create a session.
    pub fn new(user_id: UserId, credential: Credential) -> Self {
        Self {
            user_id,
            credential,
        }
    }
}

/// Read-only source of the current session.
pub trait SessionAccessor: Send + Sync {
    /// The current session, or `None` when signed out.
    fn session(&self) -> Option<Session>;
}

/// A session fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    session: Option<Session>,
}

impl StaticSession {
    /// Always return this session.
    pub fn new(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Never return a session.
    pub fn signed_out() -> Self {
        Self::default()
    }
}

impl SessionAccessor for StaticSession {
    fn session(&self) -> Option<Session> {
        self.session.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_redacts_token() {
        let credential = Credential::new("super-secret-token");
        let debug = format!("{:?}", credential);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-token"));
    }

    #[test]
    fn session_debug_redacts_token() {
        let session = Session::new(UserId::new("u1"), Credential::new("abc123"));
        let debug = format!("{:?}", session);
        assert!(debug.contains("u1"));
        assert!(!debug.contains("abc123"));
    }

    #[test]
    fn static_session_returns_its_session() {
        let session = Session::new(UserId::new("u1"), Credential::new("t"));
        let accessor = StaticSession::new(session.clone());
        assert_eq!(accessor.session(), Some(session));
    }

    #[test]
    fn signed_out_has_no_session() {
        assert!(StaticSession::signed_out().session().is_none());
    }
}
