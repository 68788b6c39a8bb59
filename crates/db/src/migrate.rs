//! Runtime migration runner.
//!
//! Modules contribute plain SQL migrations. Applied migrations are recorded in
//! `_migrations` keyed by `(module, id)`, so running the same set twice is a no-op.

use crate::{Database, DbError};

/// A single schema change contributed by a module.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Apply every pending migration in the given order.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row. Returns how many migrations were applied.
pub async fn run_migrations(
    db: &Database,
    migrations: &[(String, Migration)],
) -> Result<usize, DbError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            module TEXT NOT NULL,
            id TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (module, id)
        )
        "#,
    )
    .execute(db.pool())
    .await?;

    let mut applied = 0;

    for (module, migration) in migrations {
        let already: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM _migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(migration.id)
                .fetch_one(db.pool())
                .await?;

        if already > 0 {
            tracing::debug!(target: "bookshelf-db", %module, id = migration.id, "migration already applied");
            continue;
        }

        apply(db, module, migration)
            .await
            .map_err(|source| DbError::Migration {
                module: module.clone(),
                id: migration.id,
                source,
            })?;

        tracing::info!(target: "bookshelf-db", %module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

async fn apply(db: &Database, module: &str, migration: &Migration) -> Result<(), sqlx::Error> {
    let mut tx = db.pool().begin().await?;

    sqlx::raw_sql(migration.up).execute(&mut *tx).await?;

    sqlx::query("INSERT INTO _migrations (module, id) VALUES (?, ?)")
        .bind(module)
        .bind(migration.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}
