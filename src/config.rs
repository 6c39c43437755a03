use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fetcher::FetchConfig;

pub const CONFIG_ENV: &str = "FILMIX_CONFIG";
pub const DB_PATH_ENV: &str = "FILMIX_DB_PATH";
pub const CONCURRENCY_ENV: &str = "FILMIX_CONCURRENCY";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Film list location; None means the default data directory file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Config {
    /// Load from `path`, or from the default location when None. A missing
    /// file yields defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };
        let mut cfg: Config = match std::fs::read_to_string(&path) {
            Ok(s) => toml::from_str(&s).with_context(|| format!("invalid config file: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e).with_context(|| format!("reading config file: {}", path.display())),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Some(p) = std::env::var_os(DB_PATH_ENV).filter(|v| !v.is_empty()) {
            self.db_path = Some(PathBuf::from(p));
        }
        if let Some(n) = std::env::var(CONCURRENCY_ENV).ok().and_then(|s| s.parse().ok()) {
            self.fetch.concurrency = Some(n);
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("creating config dir: {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("encoding config")?;
        std::fs::write(path, raw).with_context(|| format!("writing config file: {}", path.display()))
    }
}

/// `FILMIX_CONFIG` if set, else `config.toml` in the user's config directory.
pub fn config_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    let proj = ProjectDirs::from("dev", "filmix", "filmix").context("unable to determine config directory")?;
    Ok(proj.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(cfg.fetch, FetchConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg/config.toml");
        let cfg = Config {
            db_path: Some(dir.path().join("films.json")),
            fetch: FetchConfig { max_retries: Some(2), timeout_secs: Some(5), ..Default::default() },
        };
        cfg.save(&path).unwrap();
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.fetch.max_retries(), 2);
        assert_eq!(loaded.fetch.timeout(), std::time::Duration::from_secs(5));
        assert_eq!(loaded.fetch.backoff_unit(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn partial_fetch_table() {
        let cfg: Config = toml::from_str("db_path = \"/tmp/f.json\"\n[fetch]\nconcurrency = 4\n").unwrap();
        assert_eq!(cfg.db_path.as_deref(), Some(Path::new("/tmp/f.json")));
        assert_eq!(cfg.fetch.concurrency(), Some(4));
        assert_eq!(cfg.fetch.max_retries(), 1);
    }
}
