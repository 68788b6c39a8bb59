//! Process bootstrap: open the pool, migrate, run modules, serve, shut down.

use anyhow::Context;
use bookshelf_db::Database;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// Registry with every application module registered.
pub fn build_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);
    registry
}

/// Apply pending migrations of every module. Returns how many were applied.
pub async fn run_migrations(registry: &ModuleRegistry, db: &Database) -> anyhow::Result<usize> {
    let migrations = registry.collect_migrations();
    let applied = bookshelf_db::run_migrations(db, &migrations)
        .await
        .context("failed to apply migrations")?;

    tracing::info!(applied, total = migrations.len(), "migrations complete");
    Ok(applied)
}

/// Open the database, apply migrations and close it again.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let db = connect(settings).await?;
    let result = run_migrations(&build_registry(), &db).await;
    db.close().await;
    result
}

/// Run the HTTP service until Ctrl-C or SIGTERM.
///
/// The pool is opened once here and closed after the server and modules stop.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let db = connect(settings).await?;
    let registry = build_registry();

    let result = run(&registry, settings, &db).await;

    if let Err(e) = registry.stop_modules().await {
        tracing::error!(error = ?e, "failed to stop modules cleanly");
    }
    db.close().await;

    result
}

async fn run(registry: &ModuleRegistry, settings: &Settings, db: &Database) -> anyhow::Result<()> {
    run_migrations(registry, db).await?;

    let ctx = InitCtx { settings, db };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    bookshelf_http::start_server(registry, &ctx, bookshelf_http::shutdown_signal()).await
}

async fn connect(settings: &Settings) -> anyhow::Result<Database> {
    Database::connect(&settings.database.url, settings.database.max_connections)
        .await
        .with_context(|| format!("failed to open database '{}'", settings.database.url))
}
