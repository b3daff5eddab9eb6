use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::entities::SourceRef;
use crate::extractor::extract_article;
use crate::fetcher::types::{Enclosure, RawEntry};

fn source() -> SourceRef {
    SourceRef {
        id: Uuid::new_v4(),
        name: "Example Wire".to_string(),
        favicon_url: Some("https://example.com/favicon.ico".to_string()),
    }
}

fn entry(link: &str) -> RawEntry {
    RawEntry {
        title: "A headline".to_string(),
        link: link.to_string(),
        ..RawEntry::default()
    }
}

#[test]
fn test_description_prefers_entry_description() {
    let mut raw = entry("https://example.com/a");
    raw.description = Some("<p>Short   <em>summary</em></p>".to_string());
    raw.content = Some("<p>Much longer body text</p>".to_string());

    let article = extract_article(&raw, &source());

    assert_eq!(article.description.as_deref(), Some("Short summary"));
    assert_eq!(
        article.content.as_deref(),
        Some("<p>Much longer body text</p>")
    );
}

#[test]
fn test_description_falls_back_to_truncated_content() {
    let mut raw = entry("https://example.com/a");
    raw.description = Some("   ".to_string());
    raw.content = Some("x".repeat(800));

    let article = extract_article(&raw, &source());
    let description = article.description.expect("description derived from content");

    assert_eq!(description.chars().count(), 503);
    assert!(description.ends_with("..."));
}

#[test]
fn test_description_absent_without_text() {
    let article = extract_article(&entry("https://example.com/a"), &source());
    assert_eq!(article.description, None);
    assert_eq!(article.content, None);
    assert_eq!(article.reading_time_minutes, 1);
}

#[test]
fn test_image_prefers_entry_image_then_image_enclosure() {
    let mut raw = entry("https://example.com/a");
    raw.enclosures = vec![
        Enclosure {
            url: "https://cdn.example.com/episode.mp3".to_string(),
            media_type: Some("audio/mpeg".to_string()),
        },
        Enclosure {
            url: "https://cdn.example.com/cover.jpg".to_string(),
            media_type: Some("image/jpeg".to_string()),
        },
        Enclosure {
            url: "https://cdn.example.com/second.png".to_string(),
            media_type: Some("image/png".to_string()),
        },
    ];

    let article = extract_article(&raw, &source());
    assert_eq!(
        article.image_url.as_deref(),
        Some("https://cdn.example.com/cover.jpg")
    );

    raw.image_url = Some("https://cdn.example.com/explicit.webp".to_string());
    let article = extract_article(&raw, &source());
    assert_eq!(
        article.image_url.as_deref(),
        Some("https://cdn.example.com/explicit.webp")
    );
}

#[test]
fn test_no_image_when_enclosures_are_not_images() {
    let mut raw = entry("https://example.com/a");
    raw.enclosures = vec![Enclosure {
        url: "https://cdn.example.com/file.pdf".to_string(),
        media_type: None,
    }];

    assert_eq!(extract_article(&raw, &source()).image_url, None);
}

#[test]
fn test_author_precedence() {
    let mut raw = entry("https://example.com/a");
    raw.author = Some("Single Byline".to_string());
    assert_eq!(
        extract_article(&raw, &source()).author.as_deref(),
        Some("Single Byline")
    );

    raw.authors = vec!["".to_string(), "First Listed".to_string(), "Second".to_string()];
    assert_eq!(
        extract_article(&raw, &source()).author.as_deref(),
        Some("First Listed")
    );
}

#[test]
fn test_published_falls_back_to_updated() {
    let published = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    let updated = Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap();

    let mut raw = entry("https://example.com/a");
    assert_eq!(extract_article(&raw, &source()).published_at, None);

    raw.updated = Some(updated);
    assert_eq!(extract_article(&raw, &source()).published_at, Some(updated));

    raw.published = Some(published);
    assert_eq!(extract_article(&raw, &source()).published_at, Some(published));
}

#[test]
fn test_reading_time_counts_content_words() {
    let mut raw = entry("a");
    raw.content = Some("word ".repeat(250));

    let article = extract_article(&raw, &source());
    assert_eq!(article.url, "a");
    assert_eq!(article.reading_time_minutes, 1);

    raw.content = Some(format!("<div>{}</div>", "word ".repeat(700)));
    assert_eq!(extract_article(&raw, &source()).reading_time_minutes, 4);
}

#[test]
fn test_reading_time_uses_description_without_content() {
    let mut raw = entry("https://example.com/a");
    raw.description = Some("word ".repeat(500));
    assert_eq!(extract_article(&raw, &source()).reading_time_minutes, 3);
}

#[test]
fn test_source_fields_and_categories_are_stamped() {
    let source = source();
    let mut raw = entry("  https://example.com/a  ");
    raw.categories = vec![" Rust ".to_string(), "".to_string(), "Databases".to_string()];

    let article = extract_article(&raw, &source);

    assert_eq!(article.url, "https://example.com/a");
    assert_eq!(article.source_id, Some(source.id));
    assert_eq!(article.source_name, "Example Wire");
    assert_eq!(article.categories, vec!["Rust", "Databases"]);
}
