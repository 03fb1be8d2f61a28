// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, build the session, hand it to the
//   menu loop.
// - One current-thread runtime: the menu, the request and the progress
//   ticker all share a single event loop.

use std::sync::Arc;

use log::LevelFilter;
use unmark_cli::logging::{self, LogDestination};
use unmark_cli::notify::TerminalNotifier;
use unmark_cli::{ui::main_menu, ApiClient, DirectorySink, Session};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let level = std::env::var("WATERMARK_LOG")
        .ok()
        .and_then(|raw| logging::parse_level(&raw))
        .unwrap_or(LevelFilter::Info);
    logging::initialize(LogDestination::File, level);

    // Service address comes from `WATERMARK_API_URL`, defaulting to
    // http://localhost:8000. See `ServiceConfig::from_env`.
    let api = ApiClient::from_env()?;
    log::info!("Using service at {}", api.config().base_url);

    let sink = DirectorySink::from_env();
    let session = Session::new(
        Arc::new(api.clone()),
        Arc::new(sink.clone()),
        Arc::new(TerminalNotifier),
    );

    main_menu(session, &api, &sink).await?;
    Ok(())
}
