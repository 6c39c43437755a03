use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::storage::RecordStore;
use crate::types::Film;

pub const DEFAULT_DB_FILE_NAME: &str = "filmix.json";

/// JSON file holding the film list.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    // Bind to a list file. If `path` is None, use the default location
    // in the user's data directory.
    pub fn connect(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => default_db_path()?,
        };
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Create the list file with an empty list. An existing file is kept
    /// unless `force` is set.
    pub async fn init(&self, force: bool) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating db parent dir: {}", parent.display()))?;
        }
        if !force && tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            // Make sure what is there is usable before keeping it
            self.read().await?;
            return Ok(());
        }
        self.write(&[]).await?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait::async_trait]
impl RecordStore for Database {
    async fn read(&self) -> Result<Vec<Film>, StoreError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| StoreError::Read { path: self.path.clone(), source })?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Parse { path: self.path.clone(), source })
    }

    async fn write(&self, films: &[Film]) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
        serde::Serialize::serialize(films, &mut ser)
            .map_err(|source| StoreError::Encode { path: self.path.clone(), source })?;

        // Write next to the target and rename over it so readers never see a half-written list
        let tmp = self.tmp_path();
        let write_err = |source| StoreError::Write { path: self.path.clone(), source };
        tokio::fs::write(&tmp, &buf).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(write_err)?;
        Ok(())
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "filmix", "filmix")
        .context("unable to determine data directory for default film list path")?;
    let mut path: PathBuf = proj.data_dir().to_path_buf();
    path.push(DEFAULT_DB_FILE_NAME);
    Ok(path)
}
