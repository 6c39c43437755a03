pub mod aggregator;
pub mod config;
pub mod dao;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod storage;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::error::{FilmixError, MergeError, StoreError};
    pub use crate::fetcher::{FetchConfig, PageSource};
    pub use crate::storage::RecordStore;
    pub use crate::types::{Film, FilmUpdate, RefreshProgress, RefreshReport};
    pub use crate::Filmix;
}

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::db::Database;
use crate::error::{FilmixError, MergeError, StoreError};
use crate::fetcher::{Fetcher, PageSource};
use crate::storage::RecordStore;
use crate::types::{Film, FilmUpdate, RefreshProgress, RefreshReport};

/// Async library entry point. Owns the film list store and the page fetcher.
pub struct Filmix {
    store: Arc<dyn RecordStore>,
    aggregator: Aggregator,
    merge_guard: Arc<Mutex<()>>,
}

impl Filmix {
    /// Bind to the film list named by `config` and build an HTTP fetcher.
    pub fn connect(config: &Config) -> Result<Self> {
        let db = Database::connect(config.db_path.as_deref())?;
        let fetcher = Fetcher::new(config.fetch.clone())?;
        Ok(Self::with_parts(Arc::new(db), Arc::new(fetcher), config.fetch.concurrency()))
    }

    /// Assemble from any store and page source.
    pub fn with_parts(store: Arc<dyn RecordStore>, source: Arc<dyn PageSource>, concurrency: Option<usize>) -> Self {
        let merge_guard = Arc::new(Mutex::new(()));
        let aggregator = Aggregator::new(store.clone(), source, merge_guard.clone()).with_concurrency(concurrency);
        Self { store, aggregator, merge_guard }
    }

    /// Create (or with `force`, reset) the film list file at `path`.
    pub async fn init_database(path: &Path, force: bool) -> Result<Database> {
        let db = Database::connect(Some(path))?;
        db.init(force).await?;
        Ok(db)
    }

    pub async fn films(&self) -> Result<Vec<Film>, StoreError> {
        dao::list_films(&*self.store).await
    }

    /// Track a new film url with its selectors.
    pub async fn add(&self, url: &str, name_selector: &str, quality_selector: &str) -> Result<Film, StoreError> {
        let _guard = self.merge_guard.lock().await;
        dao::add_film(&*self.store, Film::new(url, name_selector, quality_selector)).await
    }

    /// Merge a partial update into the film with 1-based `id`.
    pub async fn merge(&self, id: usize, update: &FilmUpdate) -> Result<Film, MergeError> {
        let _guard = self.merge_guard.lock().await;
        dao::merge_film(&*self.store, id, update).await
    }

    /// User edit of a film; same semantics as [`Filmix::merge`] with the
    /// error flattened for callers.
    pub async fn change(&self, id: usize, update: &FilmUpdate) -> Result<Film, FilmixError> {
        Ok(self.merge(id, update).await?)
    }

    pub async fn remove(&self, id: usize) -> Result<Film, FilmixError> {
        let _guard = self.merge_guard.lock().await;
        dao::remove_film(&*self.store, id).await
    }

    pub async fn remove_all(&self) -> Result<(), StoreError> {
        let _guard = self.merge_guard.lock().await;
        dao::remove_all(&*self.store).await
    }

    /// Fetch and merge metadata for every film not checked today.
    pub async fn refresh_all(&self, debug: bool) -> Result<RefreshReport, StoreError> {
        self.aggregator.refresh_all(debug).await
    }

    /// Refresh with a progress callback. Callback receives (current, total, item name).
    pub async fn refresh_all_with_progress<F>(&self, debug: bool, progress: F) -> Result<RefreshReport, StoreError>
    where
        F: FnMut(RefreshProgress),
    {
        self.aggregator.refresh_on_with_progress(&aggregator::today(), debug, progress).await
    }

    /// Refresh as if the current date were `today` (`YYYY-MM-DD`).
    pub async fn refresh_on(&self, today: &str, debug: bool) -> Result<RefreshReport, StoreError> {
        self.aggregator.refresh_on(today, debug).await
    }
}
