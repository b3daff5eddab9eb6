use feed_rs::model::{Entry, Link};
use feed_rs::parser;

use crate::fetcher::{
    errors::FeedError,
    types::{Enclosure, RawEntry},
};

/// Parse an RSS, Atom or JSON Feed document into entries, in document order.
pub fn parse_feed(body: &[u8]) -> Result<Vec<RawEntry>, FeedError> {
    let feed = parser::parse(body).map_err(|e| FeedError::Parse(e.to_string()))?;
    Ok(feed.entries.into_iter().map(raw_entry).collect())
}

fn raw_entry(entry: Entry) -> RawEntry {
    let link = select_link(&entry);
    let image_url = select_thumbnail(&entry);
    let enclosures = collect_enclosures(&entry);

    let authors = entry
        .authors
        .iter()
        .map(|person| person.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    // RSS `<author>` is often only an email address; keep it as a last resort
    let author = entry
        .authors
        .iter()
        .filter_map(|person| person.email.as_deref())
        .map(str::trim)
        .find(|email| !email.is_empty())
        .map(str::to_string);

    RawEntry {
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        link,
        description: entry.summary.map(|s| s.content),
        content: entry.content.and_then(|c| c.body),
        image_url,
        enclosures,
        authors,
        author,
        published: entry.published,
        updated: entry.updated,
        categories: entry
            .categories
            .into_iter()
            .map(|c| c.label.unwrap_or(c.term))
            .collect(),
    }
}

fn select_link(entry: &Entry) -> String {
    let usable = |link: &&Link| !link.href.trim().is_empty();

    let alternate = entry.links.iter().filter(usable).find(|link| {
        let rel = link.rel.as_deref().unwrap_or("");
        rel.is_empty() || rel.eq_ignore_ascii_case("alternate")
    });
    if let Some(link) = alternate.or_else(|| entry.links.iter().find(usable)) {
        return link.href.trim().to_string();
    }

    let id = entry.id.trim();
    if id.starts_with("http://") || id.starts_with("https://") {
        return id.to_string();
    }
    String::new()
}

fn select_thumbnail(entry: &Entry) -> Option<String> {
    entry
        .media
        .iter()
        .flat_map(|media| media.thumbnails.iter())
        .map(|thumbnail| thumbnail.image.uri.trim())
        .find(|uri| !uri.is_empty())
        .map(str::to_string)
}

fn collect_enclosures(entry: &Entry) -> Vec<Enclosure> {
    let media = entry
        .media
        .iter()
        .flat_map(|media| media.content.iter())
        .filter_map(|content| {
            let url = content.url.as_ref()?.to_string();
            Some(Enclosure {
                url,
                media_type: content.content_type.as_ref().map(|m| m.to_string()),
            })
        });

    let linked = entry
        .links
        .iter()
        .filter(|link| {
            link.rel
                .as_deref()
                .is_some_and(|rel| rel.eq_ignore_ascii_case("enclosure"))
        })
        .map(|link| Enclosure {
            url: link.href.trim().to_string(),
            media_type: link.media_type.clone(),
        });

    media.chain(linked).filter(|e| !e.url.is_empty()).collect()
}
