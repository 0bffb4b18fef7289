use std::sync::Arc;

use idf_core::config::Config;
use idf_sqlite::SqliteStore;
use idf_telegram::router::Storage;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), idf_core::Error> {
    idf_core::logging::init("idf")?;

    let cfg = Arc::new(Config::load()?);

    let store = Arc::new(SqliteStore::open(&cfg.db_file)?);
    info!(db = %cfg.db_file.display(), "database ready");

    let storage = Storage {
        recipients: store.clone(),
        ledger: store.clone(),
        directory: store.clone(),
        admins: store,
    };

    idf_telegram::router::run_polling(cfg, storage)
        .await
        .map_err(|e| idf_core::Error::External(format!("telegram bot failed: {e}")))?;

    info!("idf stopped");
    Ok(())
}
