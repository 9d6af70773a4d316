//! `SQLite` schema bootstrap logic.
//!
//! All definitions use `IF NOT EXISTS`, so bootstrap is safe to re-run on
//! every startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply the table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS image_cache (
    image_hash      TEXT PRIMARY KEY NOT NULL CHECK(length(image_hash) = 64),
    hosted_url      TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    refreshed_at    TEXT NOT NULL
);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
