//! Remote catalog chapters and bibliographic metadata.
//!
//! Chapter timelines come from the Audnexus catalog (keyed by Audible ASIN);
//! bibliographic fields are resolved from the Audible product search with a
//! Google Books fallback, merged field-by-field with Audible preferred. The
//! timeline adapter itself performs no network I/O: it maps already-fetched
//! entries onto the chapter model.

use std::io::Read;

use log::info;
use serde::Deserialize;

use crate::chapters::ChapterList;
use crate::error::{Error, Result};

const AUDNEXUS_API: &str = "https://api.audnex.us";
const AUDIBLE_API: &str = "https://api.audible.com/1.0/catalog/products";
const GOOGLE_BOOKS_API: &str = "https://www.googleapis.com/books/v1/volumes";
const USER_AGENT: &str = "Totally not a bot";

/// Correction applied when the catalog timeline includes a leading retail
/// intro clip that the local audio does not carry.
const INTRO_BUFFER_MS: u64 = 4_000;

/// One chapter row as fetched from the catalog; transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChapterEntry {
    pub title: String,
    pub start_offset_ms: u64,
    pub length_ms: u64,
}

/// Bibliographic fields for the tagging stage. Unresolved fields stay `None`
/// and are skipped when tagging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub narrators: Option<String>,
    pub description: Option<String>,
    pub year: Option<String>,
    pub cover_url: Option<String>,
}

impl BookMetadata {
    /// Merge two lookups field-by-field, preferring `self`.
    pub fn merged_with(self, fallback: BookMetadata) -> BookMetadata {
        BookMetadata {
            title: self.title.or(fallback.title),
            authors: self.authors.or(fallback.authors),
            narrators: self.narrators.or(fallback.narrators),
            description: self.description.or(fallback.description),
            year: self.year.or(fallback.year),
            cover_url: self.cover_url.or(fallback.cover_url),
        }
    }
}

/// Map catalog entries onto the chapter model.
///
/// Catalogs written against the retail edition start 4 seconds late when the
/// local audio lacks the leading promotional clip; `has_intro = false`
/// applies that correction, clamped at zero. An empty entry list yields an
/// empty chapter list ("no chapters available"), not an error.
pub fn chapters_from_catalog(
    entries: &[RemoteChapterEntry],
    has_intro: bool,
) -> Result<ChapterList> {
    let buffer_ms = if has_intro { 0 } else { INTRO_BUFFER_MS };

    // Clamping the first start at zero can push it into the previous
    // chapter's shifted end by up to the buffer, so the list tolerates that
    // much overlap.
    let mut list = ChapterList::with_overlap_tolerance(buffer_ms);
    for entry in entries {
        let start = entry.start_offset_ms.saturating_sub(buffer_ms);
        let end = start + entry.length_ms;
        list.append(entry.title.clone(), start, Some(end))?;
    }
    Ok(list)
}

// ── Audnexus: chapters, book record, cover bytes ─────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiChapterList {
    chapters: Vec<ApiChapter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiChapter {
    title: String,
    start_offset_ms: u64,
    length_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ApiBook {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<ApiPerson>,
    #[serde(default)]
    narrators: Vec<ApiPerson>,
    image: Option<String>,
    description: Option<String>,
    copyright: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiPerson {
    name: String,
}

fn api_get(url: &str) -> ureq::Request {
    ureq::get(url).set("User-Agent", USER_AGENT)
}

fn fetch_json<T: for<'de> Deserialize<'de>>(request: ureq::Request) -> Result<T> {
    let response = request
        .call()
        .map_err(|e| Error::CatalogUnavailable(e.to_string()))?;
    serde_json::from_reader(response.into_reader())
        .map_err(|e| Error::CatalogUnavailable(format!("bad catalog response: {}", e)))
}

/// Fetch the chapter rows for an ASIN, in catalog order.
pub fn fetch_chapters(asin: &str) -> Result<Vec<RemoteChapterEntry>> {
    let url = format!("{}/books/{}/chapters", AUDNEXUS_API, asin);
    let api: ApiChapterList = fetch_json(api_get(&url))?;

    Ok(api
        .chapters
        .into_iter()
        .map(|c| RemoteChapterEntry {
            title: c.title,
            start_offset_ms: c.start_offset_ms,
            length_ms: c.length_ms,
        })
        .collect())
}

/// Fetch the book record for an ASIN.
pub fn fetch_book(asin: &str) -> Result<BookMetadata> {
    let url = format!("{}/books/{}", AUDNEXUS_API, asin);
    let api: ApiBook = fetch_json(api_get(&url))?;

    Ok(BookMetadata {
        title: api.title,
        authors: join_names(&api.authors),
        narrators: join_names(&api.narrators),
        description: api.description,
        year: api.copyright.map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }),
        cover_url: api.image,
    })
}

fn join_names(people: &[ApiPerson]) -> Option<String> {
    if people.is_empty() {
        None
    } else {
        Some(
            people
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// Download cover image bytes.
pub fn fetch_cover(url: &str) -> Result<Vec<u8>> {
    let response = api_get(url)
        .call()
        .map_err(|e| Error::CatalogUnavailable(e.to_string()))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| Error::CatalogUnavailable(format!("cover download failed: {}", e)))?;
    Ok(bytes)
}

// ── Audible product search ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiProductSearch {
    #[serde(default)]
    products: Vec<ApiProduct>,
}

#[derive(Debug, Deserialize)]
struct ApiProduct {
    asin: String,
}

/// Search the Audible catalog for a book, returning its ASIN when found.
pub fn search_audible(title: &str, author: &str, narrator: Option<&str>) -> Result<Option<String>> {
    let mut request = api_get(AUDIBLE_API)
        .query("title", title)
        .query("author", author)
        .query("product_sort_by", "Relevance")
        .query("num_results", "1");
    if let Some(narrator) = narrator {
        request = request.query("narrator", narrator);
    }

    let api: ApiProductSearch = fetch_json(request)?;
    match api.products.into_iter().next() {
        Some(product) => {
            info!("Found ASIN for '{}' by '{}': {}", title, author, product.asin);
            Ok(Some(product.asin))
        }
        None => {
            info!("No results for '{}' by '{}' on Audible", title, author);
            Ok(None)
        }
    }
}

// ── Google Books fallback ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiVolumeSearch {
    #[serde(default)]
    items: Vec<ApiVolumeStub>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVolumeStub {
    self_link: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVolume {
    volume_info: ApiVolumeInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    description: Option<String>,
    published_date: Option<String>,
    image_links: Option<ApiImageLinks>,
}

#[derive(Debug, Deserialize)]
struct ApiImageLinks {
    thumbnail: Option<String>,
}

/// Search Google Books for bibliographic fields. Narrators are never
/// available from this source.
pub fn search_google_books(title: &str, author: &str) -> Result<Option<BookMetadata>> {
    let request = api_get(GOOGLE_BOOKS_API)
        .query("q", &format!("intitle:{}+inauthor:{}", title, author))
        .query("maxResults", "1")
        .query("langRestrict", "en");

    let search: ApiVolumeSearch = fetch_json(request)?;
    let Some(stub) = search.items.into_iter().next() else {
        info!("No results for '{}' by '{}' on Google Books", title, author);
        return Ok(None);
    };

    let volume: ApiVolume = fetch_json(api_get(&stub.self_link))?;
    let info = volume.volume_info;

    let title = info.title.map(|t| match &info.subtitle {
        Some(subtitle) => format!("{} - {}", t, subtitle),
        None => t,
    });
    let authors = if info.authors.is_empty() {
        None
    } else {
        Some(info.authors.join(", "))
    };

    Ok(Some(BookMetadata {
        title,
        authors,
        narrators: None,
        description: info.description.map(|d| strip_html_tags(&d)),
        year: info.published_date.map(|d| d.chars().take(4).collect()),
        cover_url: info.image_links.and_then(|l| l.thumbnail),
    }))
}

/// Drop `<...>` markup from a description.
fn strip_html_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Resolve bibliographic metadata for a book: Audible first (search → book
/// record), Google Books filling any gaps.
pub fn lookup_metadata(title: &str, author: &str, narrator: Option<&str>) -> Result<BookMetadata> {
    let audible = match search_audible(title, author, narrator)? {
        Some(asin) => fetch_book(&asin)?,
        None => BookMetadata::default(),
    };
    let google = search_google_books(title, author)?.unwrap_or_default();
    Ok(audible.merged_with(google))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, start_offset_ms: u64, length_ms: u64) -> RemoteChapterEntry {
        RemoteChapterEntry {
            title: title.to_string(),
            start_offset_ms,
            length_ms,
        }
    }

    #[test]
    fn test_catalog_without_intro_shifts_and_clamps() {
        let entries = vec![entry("Opening Credits", 3_000, 50_000)];
        let list = chapters_from_catalog(&entries, false).unwrap();
        let only = list.last().unwrap();
        // 3000 - 4000 clamps at zero
        assert_eq!(only.start_ms, 0);
        assert_eq!(only.end_ms, Some(50_000));
    }

    #[test]
    fn test_catalog_with_intro_keeps_offsets() {
        let entries = vec![entry("Opening Credits", 3_000, 50_000)];
        let list = chapters_from_catalog(&entries, true).unwrap();
        let only = list.last().unwrap();
        assert_eq!(only.start_ms, 3_000);
        assert_eq!(only.end_ms, Some(53_000));
    }

    #[test]
    fn test_catalog_clamp_overlap_is_tolerated() {
        // Contiguous catalog entries: the first start clamps to zero, so the
        // second chapter begins inside the first one's shifted end. That
        // overlap never exceeds the buffer and must be accepted.
        let entries = vec![entry("One", 3_000, 50_000), entry("Two", 53_000, 10_000)];
        let list = chapters_from_catalog(&entries, false).unwrap();
        let chapters: Vec<_> = list.iter().collect();
        assert_eq!(chapters[0].start_ms, 0);
        assert_eq!(chapters[0].end_ms, Some(50_000));
        assert_eq!(chapters[1].start_ms, 49_000);
        assert_eq!(chapters[1].end_ms, Some(59_000));
    }

    #[test]
    fn test_catalog_empty_entries_is_no_chapters() {
        let list = chapters_from_catalog(&[], false).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_metadata_merge_prefers_primary() {
        let audible = BookMetadata {
            title: Some("The Book".to_string()),
            narrators: Some("N. Arrator".to_string()),
            ..BookMetadata::default()
        };
        let google = BookMetadata {
            title: Some("The Book - A Subtitle".to_string()),
            authors: Some("A. Writer".to_string()),
            year: Some("1999".to_string()),
            ..BookMetadata::default()
        };

        let merged = audible.merged_with(google);
        assert_eq!(merged.title.as_deref(), Some("The Book"));
        assert_eq!(merged.authors.as_deref(), Some("A. Writer"));
        assert_eq!(merged.narrators.as_deref(), Some("N. Arrator"));
        assert_eq!(merged.year.as_deref(), Some("1999"));
    }

    #[test]
    fn test_strip_html_tags() {
        assert_eq!(
            strip_html_tags("<p>A <b>bold</b> tale.</p>"),
            "A bold tale."
        );
        assert_eq!(strip_html_tags("plain"), "plain");
    }
}
