//! Public home page and the themed dashboard pages.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use flagboard_api::{FlagContext, Theme, User, db, service};
use flagboard_flags::FlagsClient;

use crate::error::PageError;
use crate::routes::auth::{CurrentUser, MaybeUser};
use crate::storage::Db;
use crate::{AppConfig, session, templates};

/// `?theme=` query accepted by every dashboard page.
#[derive(Deserialize)]
pub struct ThemeQuery {
    pub theme: Option<String>,
}

/// Persist a `?theme=` switch for the user, if one was requested.
pub(crate) fn apply_theme(
    db: &Db,
    user: &mut User,
    theme: Option<&str>,
) -> Result<(), PageError> {
    let Some(theme) = theme else {
        return Ok(());
    };
    let theme = Theme::from_query(theme);
    if theme != user.set_path {
        db.execute(db::users::update_set_path(&user.id, theme.as_str()))
            .map_err(PageError::from_db("update theme"))?;
        user.set_path = theme;
    }
    Ok(())
}

/// GET / — public home page.
///
/// Runs the trial-duration experiment: the visitor's flag context is
/// assigned a variation of `longer-trial-duration`, and both the context
/// and the chosen duration are written to the session so registration can
/// report conversions for the same context.
pub async fn index(
    State(config): State<AppConfig>,
    State(flags): State<FlagsClient>,
    MaybeUser(user): MaybeUser,
    session::Session(mut data): session::Session,
) -> Result<Response, PageError> {
    if user.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    // Returning visitors keep their assignment; new ones get a fresh context.
    let ctx = data
        .flag_context
        .clone()
        .unwrap_or_else(FlagContext::anonymous);
    let longer_trial = flags.variation("longer-trial-duration", &ctx, false).await;
    let trial_duration = service::trial_duration(longer_trial);
    data.set_experiment(ctx, trial_duration);

    let flashes = data.take_flash();
    let mut page = templates::page_context("Home", &flashes);
    page.insert("trial_duration", &trial_duration);

    let resp = templates::render("home.html", &page)?.into_response();
    Ok(session::save(&data, &config.session_secret, resp))
}

/// GET /dashboard — the member landing page.
pub async fn dashboard(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    State(flags): State<FlagsClient>,
    Query(query): Query<ThemeQuery>,
    CurrentUser(mut user): CurrentUser,
    session::Session(mut data): session::Session,
) -> Result<Response, PageError> {
    apply_theme(&db, &mut user, query.theme.as_deref())?;

    let ctx = FlagContext::for_user(&user);
    let show_beta = flags.variation("dark-theme", &ctx, false).await;

    let flashes = data.take_flash();
    let mut page = templates::page_context("Home", &flashes);
    page.insert("show_beta", &show_beta);
    page.insert("user", &user);

    let name = templates::themed(user.set_path, "index.html");
    let resp = templates::render(&name, &page)?.into_response();
    Ok(session::save(&data, &config.session_secret, resp))
}

/// GET /dark — the beta-theme dashboard, viewable without switching.
pub async fn dark(CurrentUser(user): CurrentUser) -> Result<Response, PageError> {
    let mut page = templates::page_context("Dark Theme", &[]);
    page.insert("show_beta", &true);
    page.insert("user", &user);
    Ok(templates::render("beta/index.html", &page)?.into_response())
}

/// GET /experiments — NPS survey experiment against a fresh random context.
pub async fn experiments(
    State(db): State<Db>,
    State(flags): State<FlagsClient>,
    Query(query): Query<ThemeQuery>,
    CurrentUser(mut user): CurrentUser,
) -> Result<Response, PageError> {
    apply_theme(&db, &mut user, query.theme.as_deref())?;

    let random_user = FlagContext::random();
    let show_nps = flags.variation("show-nps-survey", &random_user, false).await;

    let mut page = templates::page_context("Experiments", &[]);
    page.insert("show_nps", &show_nps);
    page.insert("random_user", &random_user);
    page.insert("user", &user);

    let name = templates::themed(user.set_path, "exp.html");
    Ok(templates::render(&name, &page)?.into_response())
}

/// GET /operational — operational toggles page.
pub async fn operational(
    State(db): State<Db>,
    Query(query): Query<ThemeQuery>,
    CurrentUser(mut user): CurrentUser,
) -> Result<Response, PageError> {
    apply_theme(&db, &mut user, query.theme.as_deref())?;

    let mut page = templates::page_context("Operational", &[]);
    page.insert("user", &user);

    let name = templates::themed(user.set_path, "operation.html");
    Ok(templates::render(&name, &page)?.into_response())
}

/// GET /release — release pipeline page.
pub async fn release(
    State(db): State<Db>,
    Query(query): Query<ThemeQuery>,
    CurrentUser(mut user): CurrentUser,
) -> Result<Response, PageError> {
    apply_theme(&db, &mut user, query.theme.as_deref())?;

    let mut page = templates::page_context("Release", &[]);
    page.insert("user", &user);

    let name = templates::themed(user.set_path, "release.html");
    Ok(templates::render(&name, &page)?.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};
    use flagboard_api::session::SessionData;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret";

    fn config() -> AppConfig {
        AppConfig {
            session_secret: SECRET.into(),
        }
    }

    fn member() -> User {
        User {
            id: "u-1".into(),
            email: "a@example.com".into(),
            set_path: Theme::Default,
            plan_id: None,
            created_at: "2024-01-01 00:00:00".into(),
        }
    }

    fn flags_with(key: &str, value: bool) -> FlagsClient {
        let mut overrides = HashMap::new();
        overrides.insert(key.to_string(), value);
        FlagsClient::offline(overrides)
    }

    fn session_from_response(resp: &Response) -> SessionData {
        let cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .expect("response should set the session cookie")
            .to_str()
            .unwrap();
        let value = cookie
            .strip_prefix("flagboard_session=")
            .unwrap()
            .split(';')
            .next()
            .unwrap();
        SessionData::decode(value, SECRET)
    }

    #[tokio::test]
    async fn authenticated_home_redirects_to_dashboard() {
        let resp = index(
            State(config()),
            State(FlagsClient::offline(HashMap::new())),
            MaybeUser(Some(member())),
            session::Session(SessionData::default()),
        )
        .await
        .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/dashboard");
    }

    #[tokio::test]
    async fn longer_trial_variation_stores_thirty_days() {
        let resp = index(
            State(config()),
            State(flags_with("longer-trial-duration", true)),
            MaybeUser(None),
            session::Session(SessionData::default()),
        )
        .await
        .unwrap();
        let session = session_from_response(&resp);
        assert_eq!(session.trial_duration, Some(30));
        assert!(session.flag_context.is_some());
    }

    #[tokio::test]
    async fn control_variation_stores_fourteen_days() {
        let resp = index(
            State(config()),
            State(flags_with("longer-trial-duration", false)),
            MaybeUser(None),
            session::Session(SessionData::default()),
        )
        .await
        .unwrap();
        assert_eq!(session_from_response(&resp).trial_duration, Some(14));
    }

    #[tokio::test]
    async fn returning_visitor_keeps_their_context() {
        let ctx = FlagContext::anonymous();
        let mut data = SessionData::default();
        data.set_experiment(ctx.clone(), 14);

        let resp = index(
            State(config()),
            State(FlagsClient::offline(HashMap::new())),
            MaybeUser(None),
            session::Session(data),
        )
        .await
        .unwrap();
        let session = session_from_response(&resp);
        assert_eq!(session.flag_context.unwrap().key, ctx.key);
    }
}
