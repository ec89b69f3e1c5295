//! Runs one session bootstrap against a JSON fixture and prints the resulting state.
//!
//! The fixture maps document paths to documents, e.g. `{"games/solitaire/config/host": {...}}`.
//! Configuration comes from the `TRIUMPH_*` environment variables (a `.env` file is read first).

use std::sync::{Arc, LazyLock};

use anyhow::Context;
use docsync::memory::InMemoryDocumentStore;
use docsync::{FileCache, LocalCache, MemoryCache};
use triumph_session::{Session, SessionConfig};

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
static LOGGER: LazyLock<()> = LazyLock::new(|| {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Logging initialized");
});

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    LazyLock::force(&LOGGER);

    let fixture_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TRIUMPH_FIXTURES").ok())
        .context("usage: session-cli <fixture.json> (or set TRIUMPH_FIXTURES)")?;
    let fixture = std::fs::read_to_string(&fixture_path)
        .with_context(|| format!("reading {fixture_path}"))?;
    let fixture: serde_json::Value =
        serde_json::from_str(&fixture).with_context(|| format!("parsing {fixture_path}"))?;

    let config = SessionConfig::from_env()?;
    let store = Arc::new(InMemoryDocumentStore::from_fixture(&fixture)?);
    let cache: Arc<dyn LocalCache> = match &config.cache_dir {
        Some(directory) => {
            log::info!("Caching to {}", directory.display());
            Arc::new(FileCache::open(directory)?)
        }
        None => Arc::new(MemoryCache::new()),
    };

    let session = Session::new(config, store, cache)?;
    session.subscribe(|event| log::debug!("{event:?}"));

    let prepared = session.prepare_session().wait().await?;
    for (resource, error) in &prepared.report.failures {
        log::warn!("{resource} was not fetched: {error}");
    }
    if session.is_locked_down() {
        log::warn!("This build is below the minimum supported version");
    }

    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(())
}
