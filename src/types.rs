use serde::{Deserialize, Serialize};

pub const DEFAULT_NAME_SELECTOR: &str = "h1.name";
pub const DEFAULT_QUALITY_SELECTOR: &str = "div.quality";

/// One tracked film. Its 1-based position in the stored list is its id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Film {
    pub url: String,
    #[serde(rename = "n_selector", alias = "name_selector", default)]
    pub name_selector: String,
    #[serde(rename = "q_selector", alias = "quality_selector", default)]
    pub quality_selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(rename = "imdb", alias = "imdb_rating", default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    #[serde(rename = "filmix_users_rating", alias = "community_rating", default, skip_serializing_if = "Option::is_none")]
    pub community_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<String>,
}

impl Film {
    pub fn new(url: impl Into<String>, name_selector: impl Into<String>, quality_selector: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name_selector: name_selector.into(),
            quality_selector: quality_selector.into(),
            ..Self::default()
        }
    }

    /// Name for display, falling back to the url for films not yet scraped.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.url)
    }

    /// True when the film was not checked on `today` (or later).
    pub fn needs_refresh(&self, today: &str) -> bool {
        match self.last_checked.as_deref() {
            None | Some("") => true,
            Some(d) => d < today,
        }
    }

    /// Applies every non-empty field of `update` that differs from the stored
    /// value. Returns true when anything changed.
    pub fn apply(&mut self, update: &FilmUpdate) -> bool {
        let mut changed = false;
        changed |= set_required(&mut self.url, &update.url);
        changed |= set_required(&mut self.name_selector, &update.name_selector);
        changed |= set_required(&mut self.quality_selector, &update.quality_selector);
        changed |= set_optional(&mut self.name, &update.name);
        changed |= set_optional(&mut self.quality, &update.quality);
        changed |= set_optional(&mut self.imdb_rating, &update.imdb_rating);
        changed |= set_optional(&mut self.community_rating, &update.community_rating);
        changed |= set_optional(&mut self.last_checked, &update.last_checked);
        changed
    }
}

fn set_required(slot: &mut String, value: &Option<String>) -> bool {
    match value {
        Some(v) if !v.is_empty() && slot != v => { *slot = v.clone(); true }
        _ => false,
    }
}

fn set_optional(slot: &mut Option<String>, value: &Option<String>) -> bool {
    match value {
        Some(v) if !v.is_empty() && slot.as_deref() != Some(v.as_str()) => { *slot = Some(v.clone()); true }
        _ => false,
    }
}

/// Partial update for a stored film. `None` and empty strings both mean
/// "leave as is"; a value is never cleared through an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmUpdate {
    pub url: Option<String>,
    pub name_selector: Option<String>,
    pub quality_selector: Option<String>,
    pub name: Option<String>,
    pub quality: Option<String>,
    pub imdb_rating: Option<String>,
    pub community_rating: Option<String>,
    pub last_checked: Option<String>,
}

impl FilmUpdate {
    /// True when no field carries a value that could change a record.
    pub fn is_empty(&self) -> bool {
        [
            &self.url,
            &self.name_selector,
            &self.quality_selector,
            &self.name,
            &self.quality,
            &self.imdb_rating,
            &self.community_rating,
            &self.last_checked,
        ]
        .iter()
        .all(|f| f.as_deref().map_or(true, str::is_empty))
    }

    /// True when the update carries scraped data (name, quality or a rating).
    pub fn has_scraped_data(&self) -> bool {
        [&self.name, &self.quality, &self.imdb_rating, &self.community_rating]
            .iter()
            .any(|f| f.as_deref().is_some_and(|v| !v.is_empty()))
    }
}

/// Aggregate counts for one refresh run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub scheduled: usize,
    pub up_to_date: usize,
    pub fetched: usize,
    pub updated: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshProgress {
    pub current: usize,
    pub total: usize,
    pub current_item: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_historical_keys() {
        let raw = r#"[{"url": "https://filmix.ac/films/1", "n_selector": "h1.name", "q_selector": "div.quality",
            "name": "Dune", "imdb": "|7.5|53966", "filmix_users_rating": "567", "quality": "TS 1080"}]"#;
        let films: Vec<Film> = serde_json::from_str(raw).unwrap();
        assert_eq!(films[0].name_selector, "h1.name");
        assert_eq!(films[0].imdb_rating.as_deref(), Some("|7.5|53966"));
        assert_eq!(films[0].community_rating.as_deref(), Some("567"));
        assert_eq!(films[0].last_checked, None);
    }

    #[test]
    fn accepts_long_key_aliases() {
        let raw = r#"{"url": "u", "name_selector": "h1", "quality_selector": "div.q", "community_rating": "0"}"#;
        let film: Film = serde_json::from_str(raw).unwrap();
        assert_eq!(film.quality_selector, "div.q");
        assert_eq!(film.community_rating.as_deref(), Some("0"));
    }

    #[test]
    fn omits_absent_fields_on_write() {
        let film = Film::new("u", "h1", "div");
        let json = serde_json::to_string(&film).unwrap();
        assert_eq!(json, r#"{"url":"u","n_selector":"h1","q_selector":"div"}"#);
    }

    #[test]
    fn apply_keeps_existing_values_for_empty_fields() {
        let mut film = Film { name: Some("Old".into()), ..Film::new("u", "h1", "div") };
        let update = FilmUpdate { name: Some(String::new()), quality: Some("HD".into()), ..Default::default() };
        assert!(film.apply(&update));
        assert_eq!(film.name.as_deref(), Some("Old"));
        assert_eq!(film.quality.as_deref(), Some("HD"));
        assert!(!film.apply(&update));
    }

    #[test]
    fn zero_is_a_value() {
        let mut film = Film::new("u", "h1", "div");
        let update = FilmUpdate { community_rating: Some("0".into()), ..Default::default() };
        assert!(!update.is_empty());
        assert!(film.apply(&update));
        assert_eq!(film.community_rating.as_deref(), Some("0"));
    }

    #[test]
    fn refresh_selection_compares_dates() {
        let mut film = Film::new("u", "h1", "div");
        assert!(film.needs_refresh("2024-05-02"));
        film.last_checked = Some("2024-05-01".into());
        assert!(film.needs_refresh("2024-05-02"));
        film.last_checked = Some("2024-05-02".into());
        assert!(!film.needs_refresh("2024-05-02"));
    }
}
