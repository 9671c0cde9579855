//! Adds the `stock_status` column to a catalog CSV.
//!
//! The column's presence is the only idempotency signal: a catalog that
//! already has it is left untouched. Otherwise every row is classified and
//! the file is replaced in one rename, so readers never see a half-written
//! catalog. Progress survives a crash through the sidecar [`Checkpoint`].

use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::checkpoint::{Checkpoint, CheckpointEntry};
use crate::classifier::StockClassifier;
use crate::errors::EnrichError;
use crate::retry::RetryPolicy;
use crate::stock_status::{STOCK_STATUS_COLUMN, StockStatus};

const NAME_COLUMN: &str = "name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichOptions {
    /// Rows classified between two checkpoint writes.
    pub batch_size: usize,
    /// In-flight classification requests within a batch.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            batch_size: 16,
            concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }
}

impl EnrichOptions {
    pub fn validate(&self) -> Result<(), EnrichError> {
        if self.batch_size == 0 {
            return Err(EnrichError::Options("batch_size must be > 0".into()));
        }
        if self.concurrency == 0 {
            return Err(EnrichError::Options("concurrency must be > 0".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(EnrichError::Options("max_attempts must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The file has no header row.
    EmptyFile,
    /// `stock_status` is already a column.
    AlreadyEnriched,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    /// Data rows written.
    pub rows: usize,
    /// Rows labeled by the classifier in this run.
    pub classified: usize,
    /// Rows taken from an earlier run's checkpoint.
    pub resumed: usize,
    /// Rows whose answer was outside the allowed labels.
    pub fallbacks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    Skipped(SkipReason),
    Enriched(EnrichReport),
}

pub struct CatalogEnricher {
    classifier: Arc<dyn StockClassifier>,
    options: EnrichOptions,
    // Serializes runs so a concurrent caller sees the finished column.
    run_lock: Mutex<()>,
}

impl CatalogEnricher {
    pub fn new(classifier: Arc<dyn StockClassifier>) -> Self {
        Self {
            classifier,
            options: EnrichOptions::default(),
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_options(mut self, options: EnrichOptions) -> Self {
        self.options = options;
        self
    }

    /// Enriches `path` in place.
    ///
    /// Concurrent calls on the same enricher run one after another, so the
    /// column is computed once even when several sessions start together.
    ///
    /// # Errors
    /// - [`EnrichError::RowTooLong`] if a row has more fields than the header;
    ///   nothing is classified or written.
    /// - [`EnrichError::MissingColumn`] if rows exist but there is no `name` column.
    /// - [`EnrichError::Classify`] if a row still fails after retries; the
    ///   catalog is left as it was and finished rows stay in the checkpoint.
    /// - I/O and CSV errors while reading or rewriting.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn enrich(&self, path: &Path) -> Result<EnrichOutcome, EnrichError> {
        self.options.validate()?;
        let _guard = self.run_lock.lock().await;

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            info!("catalog is empty, nothing to enrich");
            return Ok(EnrichOutcome::Skipped(SkipReason::EmptyFile));
        }
        if headers.iter().any(|h| h == STOCK_STATUS_COLUMN) {
            debug!("catalog already has '{}'", STOCK_STATUS_COLUMN);
            return Ok(EnrichOutcome::Skipped(SkipReason::AlreadyEnriched));
        }
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        // Release the handle so the final rename can replace the file.
        drop(reader);

        if let Some((row, r)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() > headers.len())
        {
            return Err(EnrichError::RowTooLong {
                row,
                fields: r.len(),
                header: headers.len(),
            });
        }

        let name_idx = headers.iter().position(|h| h == NAME_COLUMN);
        let names: Vec<String> = match name_idx {
            Some(i) => records
                .iter()
                .map(|r| r.get(i).unwrap_or_default().to_string())
                .collect(),
            None if records.is_empty() => Vec::new(),
            None => return Err(EnrichError::MissingColumn(NAME_COLUMN)),
        };

        let checkpoint = Checkpoint::for_catalog(path);
        let mut labels: Vec<Option<String>> = vec![None; records.len()];
        let mut report = EnrichReport {
            rows: records.len(),
            ..EnrichReport::default()
        };

        for (row, entry) in checkpoint.load()? {
            if names.get(row).is_some_and(|n| *n == entry.name) {
                labels[row] = Some(entry.stock_status);
                report.resumed += 1;
            }
        }
        if report.resumed > 0 {
            info!(resumed = report.resumed, "resuming from checkpoint");
        }

        let pending: Vec<usize> = (0..records.len()).filter(|&i| labels[i].is_none()).collect();
        info!(
            rows = records.len(),
            pending = pending.len(),
            "classifying stock status"
        );

        for batch in pending.chunks(self.options.batch_size) {
            let (done, failure) = self.classify_batch(batch, &names).await;

            let mut entries = Vec::with_capacity(done.len());
            for (row, raw) in done {
                let status = match StockStatus::from_label(&raw) {
                    Some(s) => s,
                    None => {
                        warn!(
                            row,
                            name = %names[row],
                            raw = %raw,
                            fallback = StockStatus::FALLBACK.label(),
                            "unexpected stock status label"
                        );
                        report.fallbacks += 1;
                        StockStatus::FALLBACK
                    }
                };
                report.classified += 1;
                labels[row] = Some(status.label().to_string());
                entries.push(CheckpointEntry {
                    row,
                    name: names[row].clone(),
                    stock_status: status.label().to_string(),
                });
            }
            checkpoint.append(&entries)?;

            if let Some(err) = failure {
                return Err(err);
            }
            debug!(
                classified = report.classified,
                total = pending.len(),
                "batch checkpointed"
            );
        }

        write_enriched(path, &headers, &records, &labels)?;
        checkpoint.remove()?;

        info!(
            rows = report.rows,
            classified = report.classified,
            resumed = report.resumed,
            fallbacks = report.fallbacks,
            "catalog enriched"
        );
        Ok(EnrichOutcome::Enriched(report))
    }

    /// Classifies `rows` with bounded concurrency. Successful answers are
    /// returned in row order alongside the first failure, if any.
    async fn classify_batch(
        &self,
        rows: &[usize],
        names: &[String],
    ) -> (Vec<(usize, String)>, Option<EnrichError>) {
        let retry = self.options.retry;
        let results: Vec<(usize, Result<String, _>)> = stream::iter(rows.iter().copied())
            .map(|row| {
                let classifier = Arc::clone(&self.classifier);
                let name = names[row].clone();
                async move {
                    let res = retry.run(|| classifier.classify(&name)).await;
                    (row, res)
                }
            })
            .buffered(self.options.concurrency)
            .collect()
            .await;

        let mut done = Vec::with_capacity(results.len());
        let mut failure = None;
        for (row, res) in results {
            match res {
                Ok(raw) => done.push((row, raw)),
                Err(source) if failure.is_none() => {
                    failure = Some(EnrichError::Classify {
                        row,
                        name: names[row].clone(),
                        source,
                    });
                }
                Err(source) => {
                    warn!(row, error = %source, "additional classification failure");
                }
            }
        }
        (done, failure)
    }
}

/// Replaces `path` with the original columns plus `stock_status`.
/// Short rows are padded so the new value always lands in its own column.
fn write_enriched(
    path: &Path,
    headers: &StringRecord,
    records: &[StringRecord],
    labels: &[Option<String>],
) -> Result<(), EnrichError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;

    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(tmp.as_file_mut());

        let mut header = headers.clone();
        header.push_field(STOCK_STATUS_COLUMN);
        writer.write_record(&header)?;

        for (record, label) in records.iter().zip(labels) {
            let mut out = record.clone();
            while out.len() < headers.len() {
                out.push_field("");
            }
            out.push_field(label.as_deref().unwrap_or(StockStatus::FALLBACK.label()));
            writer.write_record(&out)?;
        }
        writer.flush()?;
    }

    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| EnrichError::Io(e.error))?;
    debug!(path = %path.display(), "catalog rewritten");
    Ok(())
}
