use std::sync::Arc;

use tracing::error;

use anonrelay_core::{config::Config, store::PersistentStore, templates::Templates};

#[tokio::main]
async fn main() -> Result<(), anonrelay_core::Error> {
    anonrelay_core::logging::init("anonrelay")?;

    let cfg = Arc::new(Config::load().inspect_err(|e| {
        error!(error = %e, "cannot start, shutting down now");
    })?);
    let store = PersistentStore::open(cfg.cache_root.clone())?;
    let templates = Templates::load(&cfg.text_path)?;

    anonrelay_telegram::router::run_polling(cfg, store, templates)
        .await
        .map_err(|e| anonrelay_core::Error::External(format!("telegram relay failed: {e}")))?;

    Ok(())
}
