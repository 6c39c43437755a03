use std::path::PathBuf;

use thiserror::Error;

use crate::types::Film;

/// Failures reading or writing the film list.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read film list {}: {source}", path.display())]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("film list {} is not valid JSON: {source}", path.display())]
    Parse { path: PathBuf, #[source] source: serde_json::Error },
    #[error("failed to encode film list for {}: {source}", path.display())]
    Encode { path: PathBuf, #[source] source: serde_json::Error },
    #[error("failed to write film list {}: {source}", path.display())]
    Write { path: PathBuf, #[source] source: std::io::Error },
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error(transparent)]
    Read(StoreError),
    #[error("film id {id} is out of range (list has {len} films)")]
    Id { id: usize, len: usize },
    /// The write failed; `film` is the record as merged in memory.
    #[error("failed to persist merged film {}", film.url)]
    Write { film: Box<Film>, #[source] source: StoreError },
}

#[derive(Debug, Error)]
pub enum FilmixError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("film id {id} is out of range (list has {len} films)")]
    Id { id: usize, len: usize },
    #[error(transparent)]
    Merge(MergeError),
}

impl From<MergeError> for FilmixError {
    fn from(e: MergeError) -> Self {
        match e {
            MergeError::Read(s) => FilmixError::Store(s),
            MergeError::Id { id, len } => FilmixError::Id { id, len },
            other => FilmixError::Merge(other),
        }
    }
}
