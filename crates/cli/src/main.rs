use anyhow::Context;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Bookshelf: an in-memory book catalog served over JSON
#[derive(Parser)]
#[command(author, about, version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Override `server.host`
        #[arg(long)]
        host: Option<String>,
        /// Override `server.port`
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the merged OpenAPI document
    Openapi {
        /// Print on a single line
        #[arg(long)]
        compact: bool,
    },
    /// Print the effective settings as JSON
    Config,
}

fn print_json(value: &impl serde::Serialize, compact: bool) -> anyhow::Result<()> {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("failed to render JSON")?;

    println!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load Bookshelf settings")?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }

            bookshelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(
                env = ?settings.environment,
                addr = %settings.server.bind_address(),
                "bookshelf serve"
            );

            bookshelf_app::run(settings).await
        }
        Command::Openapi { compact } => {
            let registry = bookshelf_app::build_registry(&settings);
            let spec = bookshelf_http::router::openapi_document(&registry, &settings)?;
            print_json(&spec, compact)
        }
        Command::Config => print_json(&settings, false),
    }
}
