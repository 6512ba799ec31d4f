use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::application::{LookupUseCase, TabularLookupStore};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::ConfigService;
use crate::interfaces::http::{add_log, start_server, LogEntry};

/// Load config, load the dataset and serve the lookup page.
///
/// A dataset that cannot be loaded (or lacks the key column) stops here,
/// before the HTTP server starts.
pub async fn run() -> Result<()> {
    let config = ConfigService::new().load()?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.as_str())
        .try_init();

    let logs: Arc<Mutex<Vec<LogEntry>>> = Arc::new(Mutex::new(Vec::new()));

    let store = Arc::new(TabularLookupStore::new().with_sheet(config.sheet.clone()));
    let lookup = Arc::new(LookupUseCase::new(
        store,
        config.data_path(),
        config.key_column.clone(),
    ));

    let prepared = {
        let lookup = lookup.clone();
        tokio::task::spawn_blocking(move || lookup.prepare())
            .await
            .map_err(|e| AppError::Internal(format!("Startup load task failed: {}", e)))?
    };

    let key = prepared.map_err(|err| {
        error!(
            error = %err,
            path = %config.data_path,
            "Failed to load dataset; lookup is unavailable"
        );
        err
    })?;

    add_log(
        &logs,
        "INFO",
        "Bootstrap",
        &format!(
            "Serving {} with key column '{}'",
            config.data_path, key.label
        ),
    );

    let server = start_server(lookup, logs, &config.host, config.port)?;
    info!(host = %config.host, port = config.port, "HTTP server listening");

    server.await?;
    Ok(())
}
