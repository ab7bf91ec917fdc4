//! Shared types, crypto, and SQL builders for flagboard.
//!
//! This crate is the single source of truth for the data model, the signed
//! session-cookie codec, and the query builders used by the server. It has
//! no web-framework or database-driver dependencies, so everything in it is
//! unit-testable without a running server.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod crypto;
pub mod db;
pub mod service;
pub mod session;

// ─── Theme ───────────────────────────────────────────────────────────────────

/// Template directory a user's dashboard pages render from.
///
/// Stored in `users.set_path`. Unknown values in the database fall back to
/// [`Theme::Default`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Default,
    Beta,
}

impl Theme {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Default => "default",
            Self::Beta => "beta",
        }
    }

    /// Parse a stored `set_path` value.
    pub fn from_stored(s: &str) -> Self {
        match s {
            "beta" => Self::Beta,
            _ => Self::Default,
        }
    }

    /// Map a `?theme=` query value to a theme. The dashboard links send
    /// `dark` for the beta theme; anything else resets to default.
    pub fn from_query(s: &str) -> Self {
        match s {
            "dark" => Self::Beta,
            _ => Self::Default,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Data model ──────────────────────────────────────────────────────────────

/// A registered user row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub set_path: Theme,
    pub plan_id: Option<i64>,
    pub created_at: String,
}

/// A subscription plan row. Static reference data seeded by the initial
/// migration and queried read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    pub cost: f64,
    pub created_date: String,
    pub updated_date: String,
}

// ─── Flag context ────────────────────────────────────────────────────────────

/// The unit of feature-flag evaluation: who (or which anonymous visitor) a
/// variation is being served to.
///
/// Logged-in users get their user id as the context key so experiment
/// assignments are stable across requests; anonymous visitors get a fresh
/// uuid key that the session keeps for later conversion tracking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlagContext {
    pub key: String,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, String>,
}

impl FlagContext {
    /// Context for a registered user.
    pub fn for_user(user: &User) -> Self {
        let mut custom = BTreeMap::new();
        custom.insert("email".to_string(), user.email.clone());
        custom.insert("theme".to_string(), user.set_path.to_string());
        Self {
            key: user.id.clone(),
            anonymous: false,
            custom,
        }
    }

    /// Fresh anonymous visitor context.
    pub fn anonymous() -> Self {
        Self {
            key: uuid::Uuid::new_v4().to_string(),
            anonymous: true,
            custom: BTreeMap::new(),
        }
    }

    /// Fresh random context, used by the experiments page to sample a new
    /// assignment on every request.
    pub fn random() -> Self {
        Self::anonymous()
    }
}

// ─── Forms ───────────────────────────────────────────────────────────────────

/// Registration form body. Field names match the HTML form inputs.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    #[serde(rename = "userEmail")]
    pub email: String,
    #[serde(rename = "inputPassword")]
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

/// Login form body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(rename = "userEmail")]
    pub email: String,
    #[serde(rename = "inputPassword")]
    pub password: String,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Service-level error, mapped to an HTTP status by the server layer.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }
}
