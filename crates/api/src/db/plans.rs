//! Plan query builders. Plans are static reference data — read-only.

use sea_query::{Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Plan;

/// All plans, cheapest first.
pub fn list_all() -> Built {
    Query::select()
        .columns([
            Plan::Id,
            Plan::Name,
            Plan::Cost,
            Plan::CreatedDate,
            Plan::UpdatedDate,
        ])
        .from(Plan::Table)
        .order_by(Plan::Cost, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Check a plan id exists (guards the upgrade endpoint).
pub fn exists(plan_id: i64) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Plan::Table)
        .and_where(Expr::col(Plan::Id).eq(plan_id))
        .build(SqliteQueryBuilder)
}
