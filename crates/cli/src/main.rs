use anyhow::Context;
use clap::{Parser, Subcommand};

/// Book catalogue service
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    /// Settings environment (local, test, staging, production); overrides BOOKSHELF_ENV
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations, then serve the HTTP API until interrupted
    Serve,
    /// Apply pending migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(env) = &cli.env {
        std::env::set_var("BOOKSHELF_ENV", env);
    }

    let settings = bookshelf_kernel::settings::Settings::load()
        .with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(env = ?settings.environment, command = ?cli.command, "bookshelf starting");

    match cli.command {
        Command::Serve => bookshelf_app::serve(&settings).await,
        Command::Migrate => {
            let applied = bookshelf_app::migrate(&settings).await?;
            println!("applied {applied} migration(s)");
            Ok(())
        }
    }
}
