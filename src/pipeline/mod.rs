// src/pipeline/mod.rs

use chrono::Utc;
use futures::{stream, StreamExt};
use reqwest::Client;
use std::{collections::BTreeMap, sync::Arc, time::Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::{
    catalog::{DatasetCatalog, DatasetConfig},
    config::Settings,
    error::PipelineError,
    fetch, process,
    reshape::{self, Record},
};

/// Resolve → fetch → parse → reshape for datasets of one catalog.
///
/// Cheap to clone; the catalog is shared read-only.
#[derive(Debug, Clone)]
pub struct Pipeline {
    client: Client,
    catalog: Arc<DatasetCatalog>,
    settings: Settings,
}

impl Pipeline {
    pub fn new(catalog: DatasetCatalog, settings: Settings) -> Self {
        Self::with_client(Client::new(), catalog, settings)
    }

    pub fn with_client(client: Client, catalog: DatasetCatalog, settings: Settings) -> Self {
        Self {
            client,
            catalog: Arc::new(catalog),
            settings,
        }
    }

    /// Fetch with the configured retry policy. Only retryable failures
    /// (timeouts, connection errors, 5xx) are attempted again.
    async fn fetch_with_retry(&self, config: &DatasetConfig) -> Result<Vec<u8>, PipelineError> {
        let policy = self.settings.retry;
        let mut attempts = 0;
        loop {
            match fetch::fetch(&self.client, &config.source_url, self.settings.timeout).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    let err = PipelineError::from(e);
                    if attempts < policy.max_retries && err.is_retryable() {
                        attempts += 1;
                        let backoff = policy.backoff(attempts);
                        warn!(
                            dataset = %config.name,
                            attempt = attempts,
                            delay_ms = backoff.as_millis() as u64,
                            error = %err,
                            "Retrying"
                        );
                        sleep(backoff).await;
                        continue;
                    }
                    if attempts > 0 {
                        error!(dataset = %config.name, error = %err, "Exhausted retries");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Run one dataset end to end. Any fetch or parse failure aborts the
    /// run; column-level reshape problems only narrow the series.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, dataset: &str) -> Result<Vec<Record>, PipelineError> {
        let start = Instant::now();
        let config = self.catalog.resolve(dataset)?;

        let bytes = self.fetch_with_retry(config).await?;
        if let Some(dir) = &self.settings.raw_dir {
            fetch::save_raw(dir, &config.name, Utc::now(), &bytes).await?;
        }

        let table = process::parse(&bytes, config.separator(), config.encoding()).map_err(
            |source| PipelineError::Parse {
                dataset: config.name.clone(),
                source,
            },
        )?;

        let records = reshape::reshape(&table, config.fixed_columns);
        info!(
            records = records.len(),
            elapsed = ?start.elapsed(),
            "dataset ready"
        );
        Ok(records)
    }

    /// Run every catalog dataset, at most `settings.concurrency` at a time.
    /// One failure does not affect the others.
    #[instrument(level = "info", skip(self))]
    pub async fn run_all(&self) -> BTreeMap<String, Result<Vec<Record>, PipelineError>> {
        let names: Vec<String> = self
            .catalog
            .names()
            .into_iter()
            .map(str::to_string)
            .collect();

        stream::iter(names)
            .map(|name| async move {
                let result = self.run(&name).await;
                if let Err(e) = &result {
                    error!(dataset = %name, error = %e, "dataset failed");
                }
                (name, result)
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await
    }
}
