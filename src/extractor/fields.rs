use crate::{
    entities::{NewArticle, SourceRef},
    extractor::normalize::{strip_markup, word_count},
    fetcher::types::RawEntry,
};

pub const DESCRIPTION_FALLBACK_CHARS: usize = 500;
pub const TRUNCATION_MARKER: &str = "...";
pub const WORDS_PER_MINUTE: f64 = 200.0;

/// Derive a candidate article from one feed entry.
pub fn extract_article(entry: &RawEntry, source: &SourceRef) -> NewArticle {
    let description = derive_description(entry);

    let words = entry
        .content
        .as_deref()
        .map(|content| word_count(&strip_markup(content)))
        .filter(|words| *words > 0)
        .unwrap_or_else(|| description.as_deref().map(word_count).unwrap_or(0));

    NewArticle {
        title: entry.title.trim().to_string(),
        url: entry.link.trim().to_string(),
        description,
        content: entry.content.clone().filter(|c| !c.trim().is_empty()),
        author: pick_author(entry),
        published_at: entry.published.or(entry.updated),
        source_id: Some(source.id),
        source_name: source.name.clone(),
        image_url: pick_image(entry),
        reading_time_minutes: reading_time_minutes(words),
        categories: entry
            .categories
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// `max(1, round(words / 200))`, rounding half away from zero.
pub fn reading_time_minutes(words: usize) -> i32 {
    let minutes = (words as f64 / WORDS_PER_MINUTE).round();
    (minutes as i32).max(1)
}

fn derive_description(entry: &RawEntry) -> Option<String> {
    let raw = match entry.description.as_deref() {
        Some(description) if !description.trim().is_empty() => description.to_string(),
        _ => match entry.content.as_deref() {
            Some(content) => truncate_chars(content, DESCRIPTION_FALLBACK_CHARS),
            None => return None,
        },
    };

    let plain = strip_markup(&raw);
    if plain.is_empty() { None } else { Some(plain) }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

fn pick_image(entry: &RawEntry) -> Option<String> {
    if let Some(url) = entry.image_url.as_deref().filter(|u| !u.trim().is_empty()) {
        return Some(url.to_string());
    }

    entry
        .enclosures
        .iter()
        .find(|enclosure| {
            enclosure
                .media_type
                .as_deref()
                .is_some_and(|media_type| media_type.starts_with("image"))
        })
        .map(|enclosure| enclosure.url.clone())
}

fn pick_author(entry: &RawEntry) -> Option<String> {
    entry
        .authors
        .iter()
        .map(|name| name.trim())
        .find(|name| !name.is_empty())
        .or_else(|| entry.author.as_deref().map(str::trim).filter(|a| !a.is_empty()))
        .map(str::to_string)
}
