//! User query builders.

use sea_query::{Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Users;

/// Columns fetched whenever a full user row is needed.
const USER_COLUMNS: [Users; 5] = [
    Users::Id,
    Users::Email,
    Users::SetPath,
    Users::PlanId,
    Users::CreatedAt,
];

// ── Lookups ────────────────────────────────────────────────────────────────

/// Find user by id.
pub fn get_by_id(user_id: &str) -> Built {
    Query::select()
        .columns(USER_COLUMNS)
        .from(Users::Table)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Find user by email for login (returns id, password_hash, password_salt).
pub fn get_by_email_for_login(email: &str) -> Built {
    Query::select()
        .columns([Users::Id, Users::PasswordHash, Users::PasswordSalt])
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

/// Check email existence.
pub fn email_exists(email: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

/// Count all users (for pagination).
pub fn count() -> Built {
    Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(Users::Table)
        .build(SqliteQueryBuilder)
}

/// One page of users ordered by id.
pub fn list_page(limit: u64, offset: u64) -> Built {
    Query::select()
        .columns(USER_COLUMNS)
        .from(Users::Table)
        .order_by(Users::Id, Order::Asc)
        .limit(limit)
        .offset(offset)
        .build(SqliteQueryBuilder)
}

// ── Inserts ────────────────────────────────────────────────────────────────

/// Insert a freshly registered user.
pub fn insert(id: &str, email: &str, password_hash: &str, password_salt: &str) -> Built {
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::Id,
            Users::Email,
            Users::PasswordHash,
            Users::PasswordSalt,
        ])
        .values_panic([
            id.into(),
            email.into(),
            password_hash.into(),
            password_salt.into(),
        ])
        .build(SqliteQueryBuilder)
}

// ── Updates ────────────────────────────────────────────────────────────────

/// Switch the user's theme directory.
pub fn update_set_path(user_id: &str, set_path: &str) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::SetPath, set_path)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Move the user onto a plan.
pub fn update_plan(user_id: &str, plan_id: i64) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::PlanId, plan_id)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}
