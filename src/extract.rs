//! Metadata extraction from film pages.
//!
//! Every lookup yields an optional node; a missing node, attribute or an
//! invalid selector only leaves the matching field unset.

use scraper::{ElementRef, Html, Selector};

use crate::types::FilmUpdate;

const IMDB_SELECTORS: [&str; 2] = [".imdb_rating", ".imdb"];
const VOTES_POSITIVE: &str = ".ratePos";
const VOTES_NEGATIVE: &str = ".rateNeg";
const QUALITY_BOILERPLATE: &str = "Фильм в высочайшем качестве";
const ALT_PROVIDER_MARKER: &str = "hdkinoteatr";
const ALT_PROVIDER_QUALITY: &str = "HD 720P";

/// Derive a partial update for the film at `url` from its page.
pub fn extract(html: &str, name_selector: &str, quality_selector: &str, existing_name: Option<&str>, url: &str) -> FilmUpdate {
    let mut update = FilmUpdate::default();
    if html.trim().is_empty() {
        return update;
    }
    let doc = Html::parse_document(html);

    if existing_name.map_or(true, str::is_empty) {
        update.name = select_first(&doc, name_selector).map(trimmed_text).filter(|n| !n.is_empty());
    }
    update.imdb_rating = IMDB_SELECTORS
        .iter()
        .find_map(|sel| select_first(&doc, sel))
        .map(|el| normalize_rating(&el.text().collect::<String>()))
        .filter(|r| !r.is_empty());
    update.community_rating = community_rating(&doc);
    update.quality = select_first(&doc, quality_selector).and_then(quality_of);
    if update.quality.is_none() && url.contains(ALT_PROVIDER_MARKER) {
        update.quality = Some(ALT_PROVIDER_QUALITY.to_string());
    }

    if !update.has_scraped_data() {
        tracing::debug!(url, "no recognised metadata on page");
    }
    update
}

fn select_first<'a>(doc: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let sel = match Selector::parse(selector) {
        Ok(sel) => sel,
        Err(e) => {
            tracing::warn!(selector, error = %e, "invalid selector");
            return None;
        }
    };
    let found = doc.select(&sel).next();
    if found.is_none() {
        tracing::debug!(selector, "selector matched nothing");
    }
    found
}

fn trimmed_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Line breaks become `|` separators; trailing separators are dropped.
pub fn normalize_rating(text: &str) -> String {
    text.replace("\r\n", "\n")
        .split('\n')
        .collect::<Vec<_>>()
        .join("|")
        .trim_end_matches('|')
        .to_string()
}

fn community_rating(doc: &Html) -> Option<String> {
    let positive = select_first(doc, VOTES_POSITIVE);
    let negative = select_first(doc, VOTES_NEGATIVE);
    if positive.is_none() && negative.is_none() {
        return None;
    }
    let pos = positive.and_then(vote_count);
    let neg = negative.and_then(vote_count);
    if pos.is_none() && neg.is_none() {
        tracing::debug!("vote markers present but not numeric");
        return None;
    }
    match pos.unwrap_or(0).checked_sub(neg.unwrap_or(0)) {
        Some(score) => Some(score.to_string()),
        None => {
            tracing::debug!(?pos, ?neg, "vote difference out of range");
            None
        }
    }
}

fn vote_count(el: ElementRef<'_>) -> Option<i64> {
    let raw: String = el.text().flat_map(str::chars).filter(|c| !c.is_whitespace()).collect();
    let digits = raw.strip_prefix('+').unwrap_or(&raw);
    match digits.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::debug!(text = %raw, "vote count is not a number");
            None
        }
    }
}

fn quality_of(el: ElementRef<'_>) -> Option<String> {
    let text = trimmed_text(el);
    if !text.is_empty() {
        return Some(text);
    }
    let Some(title) = el.value().attr("title") else {
        tracing::debug!("quality node has no text and no title attribute");
        return None;
    };
    let stripped = title.replace(QUALITY_BOILERPLATE, "").trim().to_string();
    (!stripped.is_empty()).then_some(stripped)
}
