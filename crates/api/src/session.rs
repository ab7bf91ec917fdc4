//! Signed session-cookie codec.
//!
//! The session is a JSON blob signed with HMAC-SHA256 and carried in a
//! cookie. It holds the login state, one-shot flash messages, and the
//! experiment state written by the home page (visitor flag context and the
//! trial duration it was shown) so the registration handler can send
//! conversion events against the same context.
//!
//! Tampered or malformed cookies decode to an empty session; a bad cookie
//! must never take a page down.

use serde::{Deserialize, Serialize};

use crate::{FlagContext, crypto};

/// Cookie name the session travels in.
pub const SESSION_COOKIE: &str = "flagboard_session";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_context: Option<FlagContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flash: Vec<String>,
}

impl SessionData {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Mark the session as logged in.
    pub fn login(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    /// Drop the login state. Experiment state survives logout so a visitor
    /// who logs out mid-trial keeps their assignment.
    pub fn logout(&mut self) {
        self.user_id = None;
    }

    /// Queue a one-shot message for the next rendered page.
    pub fn push_flash(&mut self, message: impl Into<String>) {
        self.flash.push(message.into());
    }

    /// Pop all queued flash messages.
    pub fn take_flash(&mut self) -> Vec<String> {
        std::mem::take(&mut self.flash)
    }

    /// Record the home-page experiment assignment.
    pub fn set_experiment(&mut self, ctx: FlagContext, trial_duration: u32) {
        self.flag_context = Some(ctx);
        self.trial_duration = Some(trial_duration);
    }

    /// Encode into a signed cookie value.
    pub fn encode(&self, secret: &str) -> String {
        // SessionData always serializes: all fields are plain data.
        let json = serde_json::to_vec(self).unwrap_or_default();
        crypto::sign_payload(&json, secret)
    }

    /// Decode a cookie value. Invalid signatures and garbage both yield an
    /// empty session.
    pub fn decode(value: &str, secret: &str) -> Self {
        match crypto::verify_payload(value, secret) {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_state() {
        let mut session = SessionData::default();
        session.login("user-1");
        session.set_experiment(FlagContext::anonymous(), 30);
        session.push_flash("welcome");

        let decoded = SessionData::decode(&session.encode("s3cret"), "s3cret");
        assert_eq!(decoded, session);
    }

    #[test]
    fn wrong_secret_yields_empty_session() {
        let mut session = SessionData::default();
        session.login("user-1");
        let decoded = SessionData::decode(&session.encode("s3cret"), "other");
        assert_eq!(decoded, SessionData::default());
    }

    #[test]
    fn garbage_cookie_yields_empty_session() {
        assert_eq!(
            SessionData::decode("not-a-session", "s3cret"),
            SessionData::default()
        );
    }

    #[test]
    fn take_flash_drains_queue() {
        let mut session = SessionData::default();
        session.push_flash("one");
        session.push_flash("two");
        assert_eq!(session.take_flash(), vec!["one", "two"]);
        assert!(session.take_flash().is_empty());
    }

    #[test]
    fn logout_keeps_experiment_state() {
        let mut session = SessionData::default();
        session.login("user-1");
        session.set_experiment(FlagContext::anonymous(), 14);
        session.logout();
        assert!(!session.is_authenticated());
        assert_eq!(session.trial_duration, Some(14));
        assert!(session.flag_context.is_some());
    }
}
