use anyhow::Context;
use clap::Parser;
use readinglist::App;
use readinglist_kernel::settings::Settings;

/// Reading list HTTP API
#[derive(Debug, Parser)]
#[command(name = "readinglist", version, about)]
struct Cli {
    /// API server port
    #[arg(long)]
    port: Option<u16>,

    /// Environment (dev|stage|prod)
    #[arg(long)]
    env: Option<String>,

    /// SQLite database path, or `:memory:`
    #[arg(long = "db-dsn", env = "READINGLIST_DB_DSN")]
    db_dsn: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_for(cli.env.as_deref())
        .with_context(|| "failed to load reading list settings")?;
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(dsn) = cli.db_dsn {
        settings.database.dsn = dsn;
    }

    readinglist_telemetry::init(&settings.telemetry)?;

    let app = App::bootstrap(settings).await?;
    tracing::info!(
        env = %app.settings().environment,
        backend = ?app.settings().database.backend,
        db = %app.settings().database.dsn,
        "readinglist bootstrapped"
    );
    app.run().await
}
