//! Framework-agnostic service logic — pure functions the route handlers
//! stay thin adapters over.

use crate::ServiceError;

// ─── Validation ─────────────────────────────────────────────────────────────

/// Validate and normalize an email address. Returns the lowercased, trimmed
/// email.
pub fn validate_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') || email.len() > 254 {
        return Err(ServiceError::BadRequest("invalid email address".into()));
    }
    Ok(email)
}

/// Validate a password (minimum 8 characters).
pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.len() < 8 {
        return Err(ServiceError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

// ─── User-facing flash messages ─────────────────────────────────────────────

pub const FLASH_EMAIL_TAKEN: &str = "Email is already taken. Please choose another email";
pub const FLASH_PASSWORD_MISMATCH: &str = "Passwords must match";
pub const FLASH_REGISTERED: &str = "Congratulations, you are now a registered user!";
pub const FLASH_BAD_LOGIN: &str = "Invalid username or password";

// ─── Trial-duration experiment ──────────────────────────────────────────────

/// Trial length shown to the experimentation group.
pub const TRIAL_LONG_DAYS: u32 = 30;
/// Trial length shown to the control group.
pub const TRIAL_CONTROL_DAYS: u32 = 14;

/// Map the `longer-trial-duration` variation to a trial length in days.
pub fn trial_duration(longer_trial: bool) -> u32 {
    if longer_trial {
        TRIAL_LONG_DAYS
    } else {
        TRIAL_CONTROL_DAYS
    }
}

// ─── Redirect target sanitization ───────────────────────────────────────────

/// Resolve the post-login redirect target from a `?next=` value.
///
/// Only same-site relative paths are honored; absolute URLs and
/// protocol-relative (`//host`) values fall back to the dashboard so login
/// can't be used as an open redirect.
pub fn safe_next_path(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/dashboard".to_string(),
    }
}

// ─── Pagination ─────────────────────────────────────────────────────────────

/// Neighboring page numbers for a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub prev: Option<u32>,
    pub next: Option<u32>,
}

/// Compute prev/next page numbers for a 1-based page over `total` rows.
pub fn page_window(page: u32, per_page: u32, total: u64) -> PageWindow {
    let page = page.max(1);
    let last_page = if total == 0 {
        1
    } else {
        total.div_ceil(per_page.max(1) as u64) as u32
    };
    PageWindow {
        prev: (page > 1).then(|| page - 1),
        next: (page < last_page).then(|| page + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(validate_email("  User@Example.COM ").unwrap(), "user@example.com");
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn password_minimum_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn trial_duration_maps_variation_to_days() {
        assert_eq!(trial_duration(true), 30);
        assert_eq!(trial_duration(false), 14);
    }

    #[test]
    fn next_path_allows_relative_only() {
        assert_eq!(safe_next_path(Some("/settings")), "/settings");
        assert_eq!(safe_next_path(Some("https://evil.example")), "/dashboard");
        assert_eq!(safe_next_path(Some("//evil.example")), "/dashboard");
        assert_eq!(safe_next_path(None), "/dashboard");
    }

    #[test]
    fn page_window_edges() {
        // 31 rows at 15/page = 3 pages
        assert_eq!(
            page_window(1, 15, 31),
            PageWindow { prev: None, next: Some(2) }
        );
        assert_eq!(
            page_window(2, 15, 31),
            PageWindow { prev: Some(1), next: Some(3) }
        );
        assert_eq!(
            page_window(3, 15, 31),
            PageWindow { prev: Some(2), next: None }
        );
        assert_eq!(page_window(1, 15, 0), PageWindow { prev: None, next: None });
    }
}
