use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::Film;

/// Whole-list persistence for tracked films. Implementations read and write
/// the full list; callers do read-modify-write on top.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn read(&self) -> Result<Vec<Film>, StoreError>;
    async fn write(&self, films: &[Film]) -> Result<(), StoreError>;
}
