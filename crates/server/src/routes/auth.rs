use axum::{
    Form,
    extract::{FromRef, FromRequestParts, Query, State},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use flagboard_api::{
    LoginForm, RegisterForm, User, crypto, db, service,
    service::{FLASH_BAD_LOGIN, FLASH_EMAIL_TAKEN, FLASH_PASSWORD_MISMATCH, FLASH_REGISTERED},
};
use flagboard_flags::FlagsClient;

use crate::error::PageError;
use crate::storage::{Db, user_from_row};
use crate::{AppConfig, session, templates};

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// Authenticated user loaded from the session cookie.
///
/// Rejection is a redirect to the login page carrying the original path in
/// `?next=` so the user lands back where they were heading.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Db: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        let data = session::from_parts(parts, &config.session_secret);

        let Some(user_id) = data.user_id else {
            let next = urlencoding::encode(parts.uri.path());
            return Err(Redirect::to(&format!("/login?next={next}")).into_response());
        };

        let db = Db::from_ref(state);
        match db.query_one(db::users::get_by_id(&user_id), user_from_row) {
            Ok(user) => Ok(CurrentUser(user)),
            // Session names a user that no longer exists — treat as logged out.
            Err(_) => Err(Redirect::to("/login").into_response()),
        }
    }
}

/// Optional variant of [`CurrentUser`] for pages that behave differently
/// for visitors and members. Never rejects.
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    Db: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        let data = session::from_parts(parts, &config.session_secret);

        let user = data.user_id.and_then(|user_id| {
            let db = Db::from_ref(state);
            db.query_one(db::users::get_by_id(&user_id), user_from_row).ok()
        });
        Ok(MaybeUser(user))
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Why a registration attempt did not produce a user.
#[derive(Debug)]
pub enum RegisterError {
    /// Bounce back to the form with a flash message.
    Rejected(String),
    Db(String),
}

/// Create a user from the registration form. Pure DB + crypto; both the
/// POST handler and the tests call this.
pub fn register_user(db: &Db, form: &RegisterForm) -> Result<String, RegisterError> {
    let email = service::validate_email(&form.email)
        .map_err(|e| RegisterError::Rejected(e.to_string()))?;

    let taken: bool = db
        .query_one(db::users::email_exists(&email), |row| row.get(0))
        .map_err(|e| RegisterError::Db(e.to_string()))?;
    if taken {
        return Err(RegisterError::Rejected(FLASH_EMAIL_TAKEN.into()));
    }

    if form.password != form.confirm_password {
        return Err(RegisterError::Rejected(FLASH_PASSWORD_MISMATCH.into()));
    }
    service::validate_password(&form.password)
        .map_err(|e| RegisterError::Rejected(e.to_string()))?;

    let (hash, salt) =
        crypto::hash_password(&form.password).map_err(|e| RegisterError::Db(e.to_string()))?;
    let user_id = Uuid::new_v4().to_string();

    match db.execute(db::users::insert(&user_id, &email, &hash, &salt)) {
        Ok(_) => Ok(user_id),
        // Lost a race on the unique email index.
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(RegisterError::Rejected(FLASH_EMAIL_TAKEN.into()))
        }
        Err(e) => Err(RegisterError::Db(e.to_string())),
    }
}

/// GET /register — the registration form.
///
/// Arriving here from the home page means the visitor saw the trial-length
/// experiment; their context is in the session, so record the attempt.
pub async fn register_page(
    State(config): State<AppConfig>,
    State(flags): State<FlagsClient>,
    MaybeUser(user): MaybeUser,
    session::Session(mut data): session::Session,
) -> Result<Response, PageError> {
    if let Some(ctx) = data.flag_context.clone() {
        tracing::info!("sending started-registration event for context {}", ctx.key);
        flags.track("started-registration", &ctx).await;
    }

    if user.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    let flashes = data.take_flash();
    let page = templates::page_context("Create account", &flashes);
    let resp = templates::render("auth/register.html", &page)?.into_response();
    Ok(session::save(&data, &config.session_secret, resp))
}

/// POST /register — create the account and log the user in.
pub async fn register(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    State(flags): State<FlagsClient>,
    MaybeUser(user): MaybeUser,
    session::Session(mut data): session::Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    if user.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    match register_user(&db, &form) {
        Ok(user_id) => {
            data.push_flash(FLASH_REGISTERED);
            // The context that saw the home-page experiment converted.
            if let Some(ctx) = data.flag_context.clone() {
                tracing::info!("sending registered event for context {}", ctx.key);
                flags.track("registered", &ctx).await;
            }
            data.login(user_id);
            let resp = Redirect::to("/dashboard").into_response();
            Ok(session::save(&data, &config.session_secret, resp))
        }
        Err(RegisterError::Rejected(message)) => {
            data.push_flash(message);
            let resp = Redirect::to("/register").into_response();
            Ok(session::save(&data, &config.session_secret, resp))
        }
        Err(RegisterError::Db(e)) => {
            tracing::error!("register: {e}");
            Err(PageError::internal("internal server error"))
        }
    }
}

// ---------------------------------------------------------------------------
// Login / logout
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Check credentials. `Ok(Some(user_id))` on success, `Ok(None)` for an
/// unknown email or a wrong password — callers must not distinguish.
pub fn authenticate(db: &Db, email: &str, password: &str) -> rusqlite::Result<Option<String>> {
    let row = db.query_one(db::users::get_by_email_for_login(email), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    });

    match row {
        Ok((user_id, Some(hash), Some(salt)))
            if crypto::verify_password(password, &hash, &salt) =>
        {
            Ok(Some(user_id))
        }
        Ok(_) => Ok(None),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// GET /login — the sign-in form.
pub async fn login_page(
    State(config): State<AppConfig>,
    MaybeUser(user): MaybeUser,
    session::Session(mut data): session::Session,
) -> Result<Response, PageError> {
    if user.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    let flashes = data.take_flash();
    let page = templates::page_context("Sign In", &flashes);
    let resp = templates::render("auth/login.html", &page)?.into_response();
    Ok(session::save(&data, &config.session_secret, resp))
}

/// POST /login — verify credentials and start a session.
pub async fn login(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<LoginQuery>,
    session::Session(mut data): session::Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    if user.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    let email = form.email.trim().to_lowercase();
    let user_id = authenticate(&db, &email, &form.password)
        .map_err(PageError::from_db("login lookup"))?;

    match user_id {
        Some(user_id) => {
            data.login(user_id);
            let target = service::safe_next_path(query.next.as_deref());
            let resp = Redirect::to(&target).into_response();
            Ok(session::save(&data, &config.session_secret, resp))
        }
        None => {
            data.push_flash(FLASH_BAD_LOGIN);
            let resp = Redirect::to("/login").into_response();
            Ok(session::save(&data, &config.session_secret, resp))
        }
    }
}

/// GET /logout — drop the login state and go home.
pub async fn logout(
    State(config): State<AppConfig>,
    session::Session(mut data): session::Session,
) -> Response {
    data.logout();
    let resp = Redirect::to("/").into_response();
    session::save(&data, &config.session_secret, resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage;

    fn temp_db() -> (tempfile::TempDir, Db) {
        let dir = tempfile::tempdir().unwrap();
        let db = storage::init_db(dir.path()).unwrap();
        (dir, db)
    }

    fn form(email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    fn user_count(db: &Db) -> i64 {
        db.query_one(db::users::count(), |row| row.get(0)).unwrap()
    }

    #[test]
    fn registration_creates_exactly_one_row() {
        let (_dir, db) = temp_db();
        let user_id = register_user(&db, &form("new@example.com", "password1", "password1"))
            .expect("registration should succeed");
        assert_eq!(user_count(&db), 1);

        let user = db
            .query_one(db::users::get_by_id(&user_id), user_from_row)
            .unwrap();
        assert_eq!(user.email, "new@example.com");
    }

    #[test]
    fn duplicate_email_is_rejected_without_a_row() {
        let (_dir, db) = temp_db();
        register_user(&db, &form("dup@example.com", "password1", "password1")).unwrap();

        let err = register_user(&db, &form("dup@example.com", "password2", "password2"))
            .expect_err("duplicate email must be rejected");
        match err {
            RegisterError::Rejected(msg) => assert_eq!(msg, FLASH_EMAIL_TAKEN),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(user_count(&db), 1);
    }

    #[test]
    fn mismatched_passwords_are_rejected_without_a_row() {
        let (_dir, db) = temp_db();
        let err = register_user(&db, &form("new@example.com", "password1", "password2"))
            .expect_err("mismatched passwords must be rejected");
        match err {
            RegisterError::Rejected(msg) => assert_eq!(msg, FLASH_PASSWORD_MISMATCH),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(user_count(&db), 0);
    }

    #[test]
    fn email_is_normalized_before_insert() {
        let (_dir, db) = temp_db();
        let user_id =
            register_user(&db, &form("  Mixed@Example.COM ", "password1", "password1")).unwrap();
        let user = db
            .query_one(db::users::get_by_id(&user_id), user_from_row)
            .unwrap();
        assert_eq!(user.email, "mixed@example.com");
    }

    #[tokio::test]
    async fn successful_registration_logs_the_user_in() {
        use axum::http::{StatusCode, header};
        use flagboard_api::session::SessionData;

        let (_dir, db) = temp_db();
        let config = AppConfig {
            session_secret: "test-secret".into(),
        };
        let flags = FlagsClient::offline(std::collections::HashMap::new());

        let resp = register(
            State(db.clone()),
            State(config),
            State(flags),
            MaybeUser(None),
            session::Session(SessionData::default()),
            Form(form("fresh@example.com", "password1", "password1")),
        )
        .await
        .unwrap();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/dashboard");
        assert_eq!(user_count(&db), 1);

        let cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        let value = cookie
            .strip_prefix("flagboard_session=")
            .unwrap()
            .split(';')
            .next()
            .unwrap();
        let session = SessionData::decode(value, "test-secret");
        assert!(session.is_authenticated());
        assert_eq!(session.flash, vec![FLASH_REGISTERED]);
    }

    #[test]
    fn authenticate_accepts_good_and_rejects_bad_credentials() {
        let (_dir, db) = temp_db();
        let user_id = register_user(&db, &form("who@example.com", "password1", "password1")).unwrap();

        assert_eq!(
            authenticate(&db, "who@example.com", "password1").unwrap(),
            Some(user_id)
        );
        assert_eq!(authenticate(&db, "who@example.com", "wrong-pass").unwrap(), None);
        assert_eq!(authenticate(&db, "nobody@example.com", "password1").unwrap(), None);
    }
}
