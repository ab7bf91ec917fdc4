//! Profile, people listing, plan settings, and upgrades.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use flagboard_api::{db, service};

use crate::cache::PageCache;
use crate::error::PageError;
use crate::routes::auth::CurrentUser;
use crate::storage::{Db, plan_from_row, user_from_row};
use crate::templates;

/// Users shown per people page.
const PER_PAGE: u32 = 15;

/// GET /profile — the current user's details.
pub async fn profile(CurrentUser(user): CurrentUser) -> Result<Response, PageError> {
    let mut page = templates::page_context("Profile", &[]);
    page.insert("user", &user);
    Ok(templates::render("default/profile.html", &page)?.into_response())
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

/// GET /people — paginated member directory, served through the page cache.
pub async fn people(
    State(db): State<Db>,
    State(cache): State<PageCache>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    let page_num = query.page.unwrap_or(1).max(1);
    let cache_key = format!("/people?page={page_num}");

    if let Some(body) = cache.get(&cache_key) {
        return Ok(Html(body).into_response());
    }

    let total: i64 = db
        .query_one(db::users::count(), |row| row.get(0))
        .map_err(PageError::from_db("count users"))?;
    let offset = (u64::from(page_num) - 1) * u64::from(PER_PAGE);
    let users = db
        .query_all(
            db::users::list_page(u64::from(PER_PAGE), offset),
            user_from_row,
        )
        .map_err(PageError::from_db("list users"))?;

    let window = service::page_window(page_num, PER_PAGE, total as u64);
    let next_url = window.next.map(|p| format!("/people?page={p}"));
    let prev_url = window.prev.map(|p| format!("/people?page={p}"));

    let mut page = templates::page_context("People", &[]);
    page.insert("users", &users);
    page.insert("user", &user);
    page.insert("next_url", &next_url);
    page.insert("prev_url", &prev_url);

    let Html(body) = templates::render("default/people.html", &page)?;
    cache.put(cache_key, body.clone());
    Ok(Html(body).into_response())
}

/// GET /settings — the plan listing.
pub async fn settings(
    State(db): State<Db>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, PageError> {
    let plans = db
        .query_all(db::plans::list_all(), plan_from_row)
        .map_err(PageError::from_db("list plans"))?;

    let mut page = templates::page_context("Settings", &[]);
    page.insert("plans", &plans);
    page.insert("user", &user);
    Ok(templates::render("default/settings.html", &page)?.into_response())
}

#[derive(Deserialize)]
pub struct UpgradeQuery {
    pub plan: Option<i64>,
}

/// GET /upgrade?plan=<id> — move the user onto a plan, then bounce back to
/// the page that linked here.
pub async fn upgrade(
    State(db): State<Db>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<UpgradeQuery>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    if let Some(plan_id) = query.plan {
        let known: bool = db
            .query_one(db::plans::exists(plan_id), |row| row.get(0))
            .map_err(PageError::from_db("check plan"))?;
        if !known {
            return Err(PageError::not_found("no such plan"));
        }
        db.execute(db::users::update_plan(&user.id, plan_id))
            .map_err(PageError::from_db("upgrade plan"))?;
    }

    let back = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("/settings");
    Ok(Redirect::to(back).into_response())
}
