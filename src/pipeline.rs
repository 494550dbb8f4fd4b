use crate::app::ports::{HttpClientPort, RateLimiterPort};
use crate::config::FetchConfig;
use crate::constants;
use crate::entrez::EntrezClient;
use crate::error::{Result, RetrieverError};
use crate::export::{self, plot::PlotFormat};
use crate::parser;
use crate::types::{LengthRange, RunReport, SearchHandle, SequenceSummary, TaxId};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Records kept by a fetch, plus the counters behind them
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub summaries: Vec<SequenceSummary>,
    pub report: RunReport,
}

/// Files produced by a run
#[derive(Debug, Clone, Serialize)]
pub struct OutputPaths {
    pub csv: PathBuf,
    /// `None` when there was nothing to plot
    pub plot: Option<PathBuf>,
}

pub struct Retriever<H: HttpClientPort + ?Sized, R: RateLimiterPort + ?Sized> {
    client: EntrezClient<H, R>,
    range: LengthRange,
    batch_size: usize,
    max_records: usize,
}

impl<H: HttpClientPort + ?Sized, R: RateLimiterPort + ?Sized> Retriever<H, R> {
    pub fn new(client: EntrezClient<H, R>, range: LengthRange, fetch: &FetchConfig) -> Self {
        Self {
            client,
            range,
            batch_size: fetch.batch_size.max(1),
            max_records: fetch.max_records,
        }
    }

    #[instrument(skip_all, fields(taxid = %taxid))]
    pub async fn search(&self, taxid: &TaxId) -> Result<SearchHandle> {
        let handle = self.client.search(taxid).await?;
        info!(count = handle.count, "search complete");
        Ok(handle)
    }

    /// Number of records a fetch will request for this search.
    pub fn planned_total(&self, handle: &SearchHandle) -> usize {
        handle.count.min(self.max_records)
    }

    /// Page through the search results in sequential batches, keeping records
    /// whose length falls inside the configured range.
    #[instrument(skip(self, handle), fields(count = handle.count))]
    pub async fn fetch(&self, handle: &SearchHandle) -> Result<RetrievalResult> {
        let total = self.planned_total(handle);
        let mut result = RetrievalResult {
            summaries: Vec::new(),
            report: RunReport {
                total_found: handle.count,
                requested: total,
                ..RunReport::default()
            },
        };

        for start in (0..total).step_by(self.batch_size) {
            let body = self.client.fetch_batch(handle, start, self.batch_size).await?;
            let records = parser::parse_genbank(body.as_bytes()).map_err(|e| match e {
                RetrieverError::Parse(msg) => RetrieverError::Parse(format!("batch at offset {start}: {msg}")),
                other => other,
            })?;

            let parsed = records.len();
            let before = result.summaries.len();
            result
                .summaries
                .extend(records.into_iter().filter(|r| self.range.contains(r.length)));
            let kept = result.summaries.len() - before;

            result.report.batches += 1;
            result.report.parsed += parsed;
            debug!(start, parsed, kept, "batch filtered");
        }

        result.report.kept = result.summaries.len();
        info!(
            parsed = result.report.parsed,
            kept = result.report.kept,
            batches = result.report.batches,
            "fetch complete"
        );
        Ok(result)
    }

    /// Search then fetch in one call.
    pub async fn run(&self, taxid: &TaxId) -> Result<RetrievalResult> {
        let handle = self.search(taxid).await?;
        self.fetch(&handle).await
    }
}

/// Write the CSV summary and, when there is data, the length plot.
#[instrument(skip_all, fields(taxid = %taxid, rows = summaries.len()))]
pub fn save_outputs(
    output_dir: &Path,
    taxid: &TaxId,
    summaries: &[SequenceSummary],
    plot_format: PlotFormat,
) -> Result<OutputPaths> {
    fs::create_dir_all(output_dir)?;

    let csv_path = output_dir.join(constants::csv_file_name(taxid.as_str()));
    export::csv::write_summaries(&csv_path, summaries)?;

    let plot_path = if summaries.is_empty() {
        warn!("No records passed the length filter; skipping plot");
        None
    } else {
        let path = output_dir.join(constants::plot_file_name(taxid.as_str(), plot_format.extension()));
        export::plot::write_plot(&path, summaries, plot_format)?;
        Some(path)
    };

    Ok(OutputPaths { csv: csv_path, plot: plot_path })
}
