use std::collections::BTreeSet;

use harvester_engine::{
    canonical_item_url, Extractor, LinkPatternExtractor, Page, PageBuffer,
    StructuredDataExtractor,
};
use pretty_assertions::assert_eq;
use url::Url;

const MARKER: &str = "/property-for-sale/";

fn page(html: &str) -> Page {
    Page {
        url: "https://www.example.com/property-for-sale/inland?numpag=2".to_string(),
        html: html.to_string(),
    }
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn canonical_url_drops_query_fragment_and_slug() {
    let url = Url::parse("https://www.example.com/property-for-sale/9087543/villa-in-jalon?ref=list#photos")
        .unwrap();

    assert_eq!(
        canonical_item_url(&url, MARKER, true).as_deref(),
        Some("https://www.example.com/property-for-sale/9087543")
    );
}

#[test]
fn canonical_url_requires_an_id_segment() {
    let bare = Url::parse("https://www.example.com/property-for-sale/").unwrap();
    let elsewhere = Url::parse("https://www.example.com/about/123").unwrap();

    assert_eq!(canonical_item_url(&bare, MARKER, true), None);
    assert_eq!(canonical_item_url(&elsewhere, MARKER, true), None);
}

#[test]
fn numeric_only_rejects_category_links() {
    let url = Url::parse("https://www.example.com/property-for-sale/costa-blanca").unwrap();

    assert_eq!(canonical_item_url(&url, MARKER, true), None);
    assert_eq!(
        canonical_item_url(&url, MARKER, false).as_deref(),
        Some("https://www.example.com/property-for-sale/costa-blanca")
    );
}

#[test]
fn link_extractor_resolves_relative_links_and_dedupes() {
    let extractor = LinkPatternExtractor::new(PageBuffer::new(), MARKER);
    let html = r#"
        <a href="/property-for-sale/111/flat">Flat</a>
        <a href="/property-for-sale/111/flat?photo=2">Same flat</a>
        <a href="https://www.example.com/property-for-sale/222">Villa</a>
        <a href="/property-for-sale/alicante">Category</a>
        <a href="/contact">Contact</a>
        <a>No href</a>
    "#;

    let items = extractor.extract_from(&page(html));

    assert_eq!(
        items,
        set(&[
            "https://www.example.com/property-for-sale/111",
            "https://www.example.com/property-for-sale/222",
        ])
    );
}

#[test]
fn link_extractor_can_accept_non_numeric_ids() {
    let extractor = LinkPatternExtractor::new(PageBuffer::new(), MARKER).allow_non_numeric_ids();

    let items = extractor.extract_from(&page(r#"<a href="/property-for-sale/abc-1">x</a>"#));

    assert_eq!(items, set(&["https://www.example.com/property-for-sale/abc-1"]));
}

#[tokio::test]
async fn extractors_read_the_shared_buffer() {
    let buffer = PageBuffer::new();
    let extractor = LinkPatternExtractor::new(buffer.clone(), MARKER);

    assert!(extractor.extract().await.is_empty());

    buffer.store(page(r#"<a href="/property-for-sale/42">x</a>"#));
    assert_eq!(
        extractor.extract().await,
        set(&["https://www.example.com/property-for-sale/42"])
    );

    buffer.clear();
    assert!(extractor.extract().await.is_empty());
}

#[test]
fn structured_data_reads_item_list_with_id_fallback() {
    let extractor = StructuredDataExtractor::new(PageBuffer::new());
    let html = r#"
        <script type="application/ld+json">
        {
          "@context": "https://schema.org",
          "@type": "ItemList",
          "itemListElement": [
            {"@type": "ListItem", "position": 1, "item": {"url": "https://example.com/p/1"}},
            {"@type": "ListItem", "position": 2, "item": {"@id": "https://example.com/p/2"}},
            {"@type": "ListItem", "position": 3, "item": {"name": "no link"}},
            {"@type": "Offer", "item": {"url": "https://example.com/not-a-list-item"}}
          ]
        }
        </script>
    "#;

    let items = extractor.extract_from(&page(html));

    assert_eq!(items, set(&["https://example.com/p/1", "https://example.com/p/2"]));
}

#[test]
fn structured_data_handles_graphs_and_skips_malformed_blocks() {
    let extractor = StructuredDataExtractor::new(PageBuffer::new());
    let html = r#"
        <script type="application/ld+json">{ not json</script>
        <script type="application/ld+json">
        {"@graph": [
          {"@type": "WebPage"},
          {"@type": "ItemList", "itemListElement": [
            {"@type": "ListItem", "item": {"url": "https://example.com/p/9"}}
          ]}
        ]}
        </script>
        <script type="application/ld+json">
        [{"@type": "ItemList", "itemListElement": [
          {"@type": "ListItem", "item": {"url": "https://example.com/p/10"}}
        ]}]
        </script>
    "#;

    let items = extractor.extract_from(&page(html));

    assert_eq!(items, set(&["https://example.com/p/10", "https://example.com/p/9"]));
}

#[test]
fn page_without_structured_data_yields_nothing() {
    let extractor = StructuredDataExtractor::new(PageBuffer::new());

    assert!(extractor
        .extract_from(&page("<p>plain listing</p>"))
        .is_empty());
}

#[test]
fn structured_data_collapses_url_variants_of_one_item() {
    let extractor = StructuredDataExtractor::new(PageBuffer::new());
    let html = r#"
        <script type="application/ld+json">
        {"@type": "ItemList", "itemListElement": [
          {"@type": "ListItem", "item": {
            "productID": "123",
            "url": "https://www.example.com/property-for-sale/123?ref=list#top"
          }},
          {"@type": "ListItem", "item": {"@id": "https://www.example.com/property-for-sale/123"}},
          {"@type": "ListItem", "item": {"url": "/property-for-sale/123/"}}
        ]}
        </script>
    "#;

    let items = extractor.extract_from(&page(html));

    assert_eq!(items, set(&["https://www.example.com/property-for-sale/123"]));
}

#[test]
fn structured_data_skips_entries_without_an_id() {
    let extractor = StructuredDataExtractor::new(PageBuffer::new());
    let html = r#"
        <script type="application/ld+json">
        {"@type": "ItemList", "itemListElement": [
          {"@type": "ListItem", "item": {"url": "https://www.example.com/"}},
          {"@type": "ListItem", "item": {"productID": "77", "url": "https://www.example.com/"}}
        ]}
        </script>
    "#;

    let items = extractor.extract_from(&page(html));

    assert_eq!(items, set(&["https://www.example.com"]));
}

#[test]
fn structured_data_prefers_the_item_list_block() {
    let extractor = StructuredDataExtractor::new(PageBuffer::new());
    let html = r#"
        <script type="application/ld+json">
        {"@type": "ItemList", "itemListElement": [
          {"@type": "ListItem", "item": {"url": "https://www.example.com/ads/1"}}
        ]}
        </script>
        <script id="item-list-structured-data" type="application/ld+json">
        {"@type": "ItemList", "itemListElement": [
          {"@type": "ListItem", "item": {"url": "https://www.example.com/property-for-sale/5"}}
        ]}
        </script>
    "#;

    let items = extractor.extract_from(&page(html));

    assert_eq!(items, set(&["https://www.example.com/property-for-sale/5"]));
}
