use lyricsd::config::{Config, LyricsConfig};
use lyricsd::events::{self, Event, EventSink};
use lyricsd::lyrics::{GeniusProvider, LrclibProvider, LyricsGateway, PlainLyricsSource};
use lyricsd::monitor::Monitor;
use lyricsd::spotify::SpotifyClient;
use lyricsd::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut sink = events::stdout_sink();
    sink.emit(&Event::status("Starting...", None));

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            sink.emit(&Event::status(format!("Spotify connection failed: {e}"), false));
            sink.emit(&Event::error(e.to_string()));
            return Err(e.into());
        }
    };

    let spotify = match SpotifyClient::connect(&config.spotify).await {
        Ok(client) => {
            sink.emit(&Event::status("Connected to Spotify", true));
            client
        }
        Err(e) => {
            sink.emit(&Event::status(format!("Spotify connection failed: {e}"), false));
            sink.emit(&Event::error(e.to_string()));
            return Err(e.into());
        }
    };

    let gateway = build_gateway(&config.lyrics)?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            signal_token.cancel();
        }
    });

    Monitor::new(spotify, gateway, sink, &config.spotify)
        .run(cancel)
        .await;

    Ok(())
}

/// Logs go to stderr: stdout carries the event protocol.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_gateway(config: &LyricsConfig) -> Result<LyricsGateway> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let primary = LrclibProvider::new(timeout, config.max_retries)?;

    let fallback: Option<Box<dyn PlainLyricsSource>> = match &config.genius_access_token {
        Some(token) if !token.is_empty() => Some(Box::new(GeniusProvider::new(
            token.as_str(),
            timeout,
            config.max_retries,
        )?)),
        _ => {
            info!("No Genius access token configured, plain-lyrics fallback disabled");
            None
        }
    };

    Ok(LyricsGateway::new(Box::new(primary), fallback))
}
