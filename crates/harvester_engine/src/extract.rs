use std::collections::BTreeSet;

use engine_logging::{engine_debug, engine_warn};
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use crate::source::{Extractor, Page, PageBuffer};

/// Canonical form of an item link: `{origin}{marker}{id}`.
///
/// Query strings, fragments and anything after the id segment are dropped. With
/// `numeric_only`, ids that are not all ASCII digits are rejected.
pub fn canonical_item_url(url: &Url, marker: &str, numeric_only: bool) -> Option<String> {
    let (_, rest) = url.path().split_once(marker)?;
    let id = rest.split('/').next().unwrap_or_default();
    if id.is_empty() {
        return None;
    }
    if numeric_only && !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!(
        "{origin}{marker}{id}",
        origin = url.origin().ascii_serialization()
    ))
}

/// Collects anchors whose path contains a marker such as `/property-for-sale/`.
pub struct LinkPatternExtractor {
    buffer: PageBuffer,
    marker: String,
    numeric_only: bool,
}

impl LinkPatternExtractor {
    pub fn new(buffer: PageBuffer, marker: impl Into<String>) -> Self {
        Self {
            buffer,
            marker: marker.into(),
            numeric_only: true,
        }
    }

    pub fn allow_non_numeric_ids(mut self) -> Self {
        self.numeric_only = false;
        self
    }

    pub fn extract_from(&self, page: &Page) -> BTreeSet<String> {
        let doc = Html::parse_document(&page.html);
        let Ok(anchor_sel) = Selector::parse("a[href]") else {
            return BTreeSet::new();
        };
        let base = Url::parse(&page.url).ok();

        doc.select(&anchor_sel)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| href.contains(self.marker.as_str()))
            .filter_map(|href| match base.as_ref() {
                Some(base) => base.join(href).ok(),
                None => Url::parse(href).ok(),
            })
            .filter_map(|url| canonical_item_url(&url, &self.marker, self.numeric_only))
            .collect()
    }
}

#[async_trait::async_trait]
impl Extractor for LinkPatternExtractor {
    async fn extract(&self) -> BTreeSet<String> {
        match self.buffer.current() {
            Some(page) => self.extract_from(&page),
            None => {
                engine_debug!("No page loaded; nothing to extract");
                BTreeSet::new()
            }
        }
    }
}

/// Reads item URLs from JSON-LD `ItemList` blocks embedded in the page.
///
/// Each `itemListElement` of `@type: ListItem` contributes `item.url`, falling back to
/// `item.@id`, with query and fragment dropped. Entries without an id (`productID`, or
/// the last segment of `@id` or `url`) are skipped. When the page carries a
/// `script#item-list-structured-data` block, only that block is read.
pub struct StructuredDataExtractor {
    buffer: PageBuffer,
}

impl StructuredDataExtractor {
    pub fn new(buffer: PageBuffer) -> Self {
        Self { buffer }
    }

    pub fn extract_from(&self, page: &Page) -> BTreeSet<String> {
        let doc = Html::parse_document(&page.html);
        let (Ok(listing_sel), Ok(any_sel)) = (
            Selector::parse(r#"script#item-list-structured-data[type="application/ld+json"]"#),
            Selector::parse(r#"script[type="application/ld+json"]"#),
        ) else {
            return BTreeSet::new();
        };
        let script_sel = if doc.select(&listing_sel).next().is_some() {
            &listing_sel
        } else {
            &any_sel
        };
        let base = Url::parse(&page.url).ok();

        let mut items = BTreeSet::new();
        let mut found_block = false;
        for script in doc.select(script_sel) {
            let text = script.text().collect::<String>();
            let value: Value = match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(err) => {
                    engine_warn!("Skipping malformed structured data on {}: {}", page.url, err);
                    continue;
                }
            };
            for block in blocks(&value) {
                if let Some(list) = block.get("itemListElement").and_then(Value::as_array) {
                    found_block = true;
                    items.extend(
                        list.iter()
                            .filter_map(|entry| list_item_url(entry, base.as_ref())),
                    );
                }
            }
        }
        if !found_block {
            engine_warn!("No item list structured data found on {}", page.url);
        }
        items
    }
}

#[async_trait::async_trait]
impl Extractor for StructuredDataExtractor {
    async fn extract(&self) -> BTreeSet<String> {
        match self.buffer.current() {
            Some(page) => self.extract_from(&page),
            None => {
                engine_debug!("No page loaded; nothing to extract");
                BTreeSet::new()
            }
        }
    }
}

fn blocks(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(values) => values.iter().collect(),
        Value::Object(map) => match map.get("@graph").and_then(Value::as_array) {
            Some(graph) => graph.iter().chain(std::iter::once(value)).collect(),
            None => vec![value],
        },
        _ => Vec::new(),
    }
}

fn list_item_url(entry: &Value, base: Option<&Url>) -> Option<String> {
    if entry.get("@type").and_then(Value::as_str) != Some("ListItem") {
        return None;
    }
    let item = entry.get("item")?;
    let field = |name: &str| {
        item.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let raw = field("url").or_else(|| field("@id"))?;
    let mut url = match base {
        Some(base) => base.join(raw).ok()?,
        None => Url::parse(raw).ok()?,
    };
    url.set_query(None);
    url.set_fragment(None);

    let has_id = field("productID").is_some()
        || url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
            .is_some();
    if !has_id {
        return None;
    }
    let canonical = url.as_str();
    Some(canonical.strip_suffix('/').unwrap_or(canonical).to_string())
}
