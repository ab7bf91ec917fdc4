//! Data-export page with the embedded analytics dashboard.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};

use flagboard_api::FlagContext;
use flagboard_flags::FlagsClient;

use crate::embed::{EmbedClient, EmbedError};
use crate::error::PageError;
use crate::routes::auth::CurrentUser;
use crate::routes::pages::{ThemeQuery, apply_theme};
use crate::storage::Db;
use crate::{AppConfig, session, templates};

/// GET /dataexport.
///
/// The embed URL is fetched fresh per view. Missing credentials is the
/// normal local-development state: log it at debug and render the page
/// without the embed.
pub async fn dataexport(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    State(flags): State<FlagsClient>,
    State(embed): State<EmbedClient>,
    Query(query): Query<ThemeQuery>,
    CurrentUser(mut user): CurrentUser,
    session::Session(mut data): session::Session,
) -> Result<Response, PageError> {
    apply_theme(&db, &mut user, query.theme.as_deref())?;

    let ctx = FlagContext::for_user(&user);
    data.flag_context = Some(ctx.clone());

    let embed_url = match embed.fetch_embed_url().await {
        Ok(url) => Some(url),
        Err(EmbedError::MissingCredentials) => {
            tracing::debug!("embed credentials not configured; rendering without embed");
            None
        }
        Err(e) => {
            tracing::warn!("embed url fetch failed: {e}");
            None
        }
    };

    let show_data_export = flags.variation("data-export", &ctx, false).await;

    let flashes = data.take_flash();
    let mut page = templates::page_context("Data Export", &flashes);
    page.insert("embed_url", &embed_url);
    page.insert("show_data_export", &show_data_export);
    page.insert("user", &user);

    let name = templates::themed(user.set_path, "dataexport.html");
    let resp = templates::render(&name, &page)?.into_response();
    Ok(session::save(&data, &config.session_secret, resp))
}
