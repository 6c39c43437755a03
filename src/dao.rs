use crate::error::{FilmixError, MergeError, StoreError};
use crate::storage::RecordStore;
use crate::types::{Film, FilmUpdate};

fn index_of(id: usize, len: usize) -> Option<usize> {
    (1..=len).contains(&id).then(|| id - 1)
}

pub async fn list_films<S: RecordStore + ?Sized>(store: &S) -> Result<Vec<Film>, StoreError> {
    store.read().await
}

pub async fn add_film<S: RecordStore + ?Sized>(store: &S, film: Film) -> Result<Film, StoreError> {
    let mut films = store.read().await?;
    films.push(film.clone());
    store.write(&films).await?;
    Ok(film)
}

/// Apply `update` to the film with 1-based `id`, re-reading the list first.
/// Nothing is written when no field changes.
pub async fn merge_film<S: RecordStore + ?Sized>(store: &S, id: usize, update: &FilmUpdate) -> Result<Film, MergeError> {
    merge_film_tracked(store, id, update).await.map(|(film, _)| film)
}

/// Same as [`merge_film`], also reporting whether any field changed.
pub async fn merge_film_tracked<S: RecordStore + ?Sized>(store: &S, id: usize, update: &FilmUpdate) -> Result<(Film, bool), MergeError> {
    let mut films = store.read().await.map_err(MergeError::Read)?;
    let len = films.len();
    let idx = index_of(id, len).ok_or(MergeError::Id { id, len })?;
    let changed = films[idx].apply(update);
    if changed {
        if let Err(source) = store.write(&films).await {
            return Err(MergeError::Write { film: Box::new(films.swap_remove(idx)), source });
        }
        tracing::debug!(id, url = %films[idx].url, "merged film update");
    }
    Ok((films.swap_remove(idx), changed))
}

/// Stamp `last_checked = date` on every listed id in one write.
pub async fn stamp_checked<S: RecordStore + ?Sized>(store: &S, ids: &[usize], date: &str) -> Result<(), StoreError> {
    if ids.is_empty() { return Ok(()); }
    let mut films = store.read().await?;
    let len = films.len();
    let update = FilmUpdate { last_checked: Some(date.to_string()), ..Default::default() };
    let mut changed = false;
    for &id in ids {
        match index_of(id, len) {
            Some(idx) => changed |= films[idx].apply(&update),
            None => tracing::warn!(id, len, "film vanished before it could be stamped"),
        }
    }
    if changed { store.write(&films).await?; }
    Ok(())
}

pub async fn remove_film<S: RecordStore + ?Sized>(store: &S, id: usize) -> Result<Film, FilmixError> {
    let mut films = store.read().await?;
    let len = films.len();
    let idx = index_of(id, len).ok_or(FilmixError::Id { id, len })?;
    let removed = films.remove(idx);
    store.write(&films).await?;
    Ok(removed)
}

pub async fn remove_all<S: RecordStore + ?Sized>(store: &S) -> Result<(), StoreError> {
    store.write(&[]).await
}
