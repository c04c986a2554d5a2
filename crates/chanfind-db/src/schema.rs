//! Idempotent schema bootstrap.
//!
//! Channel documents live in a single `channel` table with the embedded
//! property/tag instance lists stored as JSONB arrays, mirroring the
//! document-index layout the service was designed around. Canonical
//! property and tag definitions get their own narrow tables.

use sqlx::PgPool;
use tracing::info;

use chanfind_core::{Error, Result};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS channel (
        name            TEXT PRIMARY KEY,
        owner           TEXT NOT NULL DEFAULT '',
        properties      JSONB NOT NULL DEFAULT '[]'::jsonb,
        tags            JSONB NOT NULL DEFAULT '[]'::jsonb,
        created_at_utc  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at_utc  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS property (
        name            TEXT PRIMARY KEY,
        owner           TEXT NOT NULL,
        created_at_utc  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tag (
        name            TEXT PRIMARY KEY,
        owner           TEXT NOT NULL,
        created_at_utc  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_channel_properties ON channel USING GIN (properties)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_channel_tags ON channel USING GIN (tags)"#,
];

/// Create the chanfind tables and indexes if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(Error::Database)?;
    }
    info!("Schema bootstrap complete");
    Ok(())
}
