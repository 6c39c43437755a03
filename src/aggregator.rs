use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::dao;
use crate::error::StoreError;
use crate::extract::extract;
use crate::fetcher::PageSource;
use crate::storage::RecordStore;
use crate::types::{Film, RefreshProgress, RefreshReport};

/// Aggregator owns the store and a page source and runs refresh passes over
/// the whole film list.
pub struct Aggregator {
    store: Arc<dyn RecordStore>,
    source: Arc<dyn PageSource>,
    // Serializes read-modify-write cycles on the store within this process
    merge_guard: Arc<Mutex<()>>,
    concurrency: Option<usize>,
}

struct Outcome {
    label: String,
    fetched: bool,
    updated: bool,
    failed: bool,
}

impl Aggregator {
    pub fn new(store: Arc<dyn RecordStore>, source: Arc<dyn PageSource>, merge_guard: Arc<Mutex<()>>) -> Self {
        Self { store, source, merge_guard, concurrency: None }
    }

    /// Cap the number of pipelines in flight. None runs them all at once.
    pub fn with_concurrency(mut self, concurrency: Option<usize>) -> Self {
        self.concurrency = concurrency.filter(|n| *n > 0);
        self
    }

    pub async fn refresh_all(&self, debug: bool) -> Result<RefreshReport, StoreError> {
        self.refresh_on(&today(), debug).await
    }

    pub async fn refresh_on(&self, today: &str, debug: bool) -> Result<RefreshReport, StoreError> {
        self.refresh_on_with_progress(today, debug, |_| {}).await
    }

    /// Refresh every film not yet checked on `today`. Callback receives one
    /// progress event per finished film, in completion order.
    pub async fn refresh_on_with_progress<F>(&self, today: &str, debug: bool, mut progress: F) -> Result<RefreshReport, StoreError>
    where
        F: FnMut(RefreshProgress),
    {
        let (selected, total_films) = {
            let _guard = self.merge_guard.lock().await;
            let films = self.store.read().await?;
            let total_films = films.len();
            let selected: Vec<(usize, Film)> = films
                .into_iter()
                .enumerate()
                .map(|(i, f)| (i + 1, f))
                .filter(|(_, f)| f.needs_refresh(today))
                .collect();
            // Stamp before fetching so a rerun today never picks these up again
            let ids: Vec<usize> = selected.iter().map(|(id, _)| *id).collect();
            dao::stamp_checked(&*self.store, &ids, today).await?;
            (selected, total_films)
        };

        let mut report = RefreshReport {
            scheduled: selected.len(),
            up_to_date: total_films.saturating_sub(selected.len()),
            ..RefreshReport::default()
        };
        tracing::info!(scheduled = report.scheduled, up_to_date = report.up_to_date, "starting refresh");
        if selected.is_empty() {
            return Ok(report);
        }

        let total = selected.len();
        let limit = self.concurrency.unwrap_or(total);
        let mut runs = stream::iter(selected.into_iter().map(|(id, film)| self.refresh_one(id, film, debug)))
            .buffer_unordered(limit);

        let mut current = 0;
        while let Some(outcome) = runs.next().await {
            current += 1;
            report.fetched += usize::from(outcome.fetched);
            report.updated += usize::from(outcome.updated);
            report.failed += usize::from(outcome.failed);
            progress(RefreshProgress { current, total, current_item: outcome.label });
        }
        tracing::info!(fetched = report.fetched, updated = report.updated, failed = report.failed, "refresh finished");
        Ok(report)
    }

    async fn refresh_one(&self, id: usize, film: Film, debug: bool) -> Outcome {
        let label = film.display_name().to_string();
        let html = self.source.fetch(&film.url, debug).await;
        let fetched = !html.is_empty();
        let update = extract(&html, &film.name_selector, &film.quality_selector, film.name.as_deref(), &film.url);
        if !update.has_scraped_data() {
            return Outcome { label, fetched, updated: false, failed: false };
        }

        let _guard = self.merge_guard.lock().await;
        match dao::merge_film_tracked(&*self.store, id, &update).await {
            Ok((merged, changed)) => Outcome { label: merged.display_name().to_string(), fetched, updated: changed, failed: false },
            Err(e) => {
                tracing::warn!(id, url = %film.url, error = %e, "failed to merge film update");
                Outcome { label, fetched, updated: false, failed: true }
            }
        }
    }
}

/// Local calendar date as `YYYY-MM-DD`.
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}
