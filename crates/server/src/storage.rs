use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use flagboard_api::db::Built;
use flagboard_api::{Plan, Theme, User};

/// Shared database state
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Execute a built statement, returning the number of affected rows.
    pub fn execute(&self, built: Built) -> rusqlite::Result<usize> {
        let (sql, values) = built;
        self.conn()
            .execute(&sql, rusqlite::params_from_iter(bind(values)))
    }

    /// Run a built query expected to return exactly one row.
    pub fn query_one<T>(
        &self,
        built: Built,
        f: impl FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> rusqlite::Result<T> {
        let (sql, values) = built;
        self.conn()
            .query_row(&sql, rusqlite::params_from_iter(bind(values)), f)
    }

    /// Run a built query and collect all rows.
    pub fn query_all<T>(
        &self,
        built: Built,
        f: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> rusqlite::Result<Vec<T>> {
        let (sql, values) = built;
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bind(values)), f)?;
        rows.collect()
    }
}

/// Initialize the database: open connection, enable WAL, run migrations
pub fn init_db(data_dir: &Path) -> Result<Db> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("flagboard.db");
    let conn = Connection::open(&db_path).context("opening SQLite database")?;

    // Enable WAL mode for better concurrent read performance
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    run_migrations(&conn)?;

    Ok(Db {
        conn: Arc::new(Mutex::new(conn)),
    })
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let migrations = vec![("0001_init", include_str!("../../../migrations/0001_init.sql"))];

    for (name, sql) in migrations {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("Applied migration: {name}");
        }
    }

    Ok(())
}

/// Convert sea-query bind values into rusqlite values.
fn bind(values: sea_query::Values) -> Vec<rusqlite::types::Value> {
    use rusqlite::types::Value as Sql;
    values
        .0
        .into_iter()
        .map(|v| match v {
            sea_query::Value::Bool(b) => b.map(|b| Sql::Integer(b as i64)).unwrap_or(Sql::Null),
            sea_query::Value::TinyInt(n) => n.map(|n| Sql::Integer(n as i64)).unwrap_or(Sql::Null),
            sea_query::Value::SmallInt(n) => n.map(|n| Sql::Integer(n as i64)).unwrap_or(Sql::Null),
            sea_query::Value::Int(n) => n.map(|n| Sql::Integer(n as i64)).unwrap_or(Sql::Null),
            sea_query::Value::BigInt(n) => n.map(Sql::Integer).unwrap_or(Sql::Null),
            sea_query::Value::TinyUnsigned(n) => {
                n.map(|n| Sql::Integer(n as i64)).unwrap_or(Sql::Null)
            }
            sea_query::Value::SmallUnsigned(n) => {
                n.map(|n| Sql::Integer(n as i64)).unwrap_or(Sql::Null)
            }
            sea_query::Value::Unsigned(n) => n.map(|n| Sql::Integer(n as i64)).unwrap_or(Sql::Null),
            sea_query::Value::BigUnsigned(n) => {
                n.map(|n| Sql::Integer(n as i64)).unwrap_or(Sql::Null)
            }
            sea_query::Value::Float(f) => f.map(|f| Sql::Real(f as f64)).unwrap_or(Sql::Null),
            sea_query::Value::Double(f) => f.map(Sql::Real).unwrap_or(Sql::Null),
            sea_query::Value::String(s) => s.map(|s| Sql::Text(*s)).unwrap_or(Sql::Null),
            sea_query::Value::Char(c) => c.map(|c| Sql::Text(c.to_string())).unwrap_or(Sql::Null),
            sea_query::Value::Bytes(b) => b.map(|b| Sql::Blob(*b)).unwrap_or(Sql::Null),
            // Feature-gated variants (json, chrono, uuid) bind as NULL.
            #[allow(unreachable_patterns)]
            _ => Sql::Null,
        })
        .collect()
}

/// Map a full user row (id, email, set_path, plan_id, created_at).
pub fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        set_path: Theme::from_stored(&row.get::<_, String>(2)?),
        plan_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Map a plan row (id, name, cost, created_date, updated_date).
pub fn plan_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Plan> {
    Ok(Plan {
        id: row.get(0)?,
        name: row.get(1)?,
        cost: row.get(2)?,
        created_date: row.get(3)?,
        updated_date: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagboard_api::db;

    fn temp_db() -> (tempfile::TempDir, Db) {
        let dir = tempfile::tempdir().unwrap();
        let db = init_db(dir.path()).unwrap();
        (dir, db)
    }

    #[test]
    fn migrations_seed_plans() {
        let (_dir, db) = temp_db();
        let plans = db.query_all(db::plans::list_all(), plan_from_row).unwrap();
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].name, "Basic");
        assert_eq!(plans[0].cost, 0.0);
        assert_eq!(plans[2].name, "Premium");
    }

    #[test]
    fn migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let _ = init_db(dir.path()).unwrap();
        let db = init_db(dir.path()).unwrap();
        let plans = db.query_all(db::plans::list_all(), plan_from_row).unwrap();
        assert_eq!(plans.len(), 3);
    }

    #[test]
    fn user_insert_and_lookup_roundtrip() {
        let (_dir, db) = temp_db();
        db.execute(db::users::insert("u-1", "a@example.com", "hash", "salt"))
            .unwrap();

        let user = db
            .query_one(db::users::get_by_id("u-1"), user_from_row)
            .unwrap();
        assert_eq!(user.email, "a@example.com");
        assert_eq!(user.set_path, Theme::Default);
        assert_eq!(user.plan_id, None);

        db.execute(db::users::update_set_path("u-1", "beta")).unwrap();
        db.execute(db::users::update_plan("u-1", 2)).unwrap();
        let user = db
            .query_one(db::users::get_by_id("u-1"), user_from_row)
            .unwrap();
        assert_eq!(user.set_path, Theme::Beta);
        assert_eq!(user.plan_id, Some(2));
    }

    #[test]
    fn duplicate_email_violates_unique_index() {
        let (_dir, db) = temp_db();
        db.execute(db::users::insert("u-1", "a@example.com", "h", "s"))
            .unwrap();
        let err = db
            .execute(db::users::insert("u-2", "a@example.com", "h", "s"))
            .unwrap_err();
        match err {
            rusqlite::Error::SqliteFailure(e, _) => {
                assert_eq!(e.code, rusqlite::ErrorCode::ConstraintViolation)
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
