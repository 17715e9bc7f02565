// src/services/extractor.rs

//! Record extraction service.
//!
//! Turns listing markup into an ordered sequence of records. Item selectors
//! are tried most-specific first; the first one matching more than one
//! element wins. When none does, the visible text of the main content region
//! becomes a single `GeneralContent` record so that a layout change still
//! moves the fingerprint.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ExtractConfig, Record};
use crate::utils::{join_whitespace, resolve_url, truncate_chars};

/// A selector must match at least this many elements to count as a listing.
const MIN_ITEMS: usize = 2;

/// Descendants whose text counts as a record title.
const TITLE_SELECTOR: &str = "h1, h2, h3, h4, a";

/// Elements whose text is never part of the visible content.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Service for extracting records from listing markup.
pub struct RecordExtractor {
    item_selectors: Vec<(String, Selector)>,
    fallback_selectors: Vec<Selector>,
    title_selector: Selector,
    title_max_chars: usize,
    body_max_chars: usize,
    fallback_max_chars: usize,
    base_url: Option<Url>,
}

impl RecordExtractor {
    /// Create an extractor from configuration. Fails only on invalid selectors.
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        let item_selectors = config
            .item_selectors
            .iter()
            .map(|s| Self::parse_selector(s).map(|selector| (s.clone(), selector)))
            .collect::<Result<Vec<_>>>()?;
        let fallback_selectors = config
            .fallback_selectors
            .iter()
            .map(|s| Self::parse_selector(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            item_selectors,
            fallback_selectors,
            title_selector: Self::parse_selector(TITLE_SELECTOR)?,
            title_max_chars: config.title_max_chars,
            body_max_chars: config.body_max_chars,
            fallback_max_chars: config.fallback_max_chars,
            base_url: None,
        })
    }

    /// Resolve relative links against the page they were found on.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Extract records from raw markup. Never fails; an empty result means
    /// the page carried no text at all.
    pub fn extract(&self, html: &str) -> Vec<Record> {
        let document = Html::parse_document(html);

        for (name, selector) in &self.item_selectors {
            let items: Vec<ElementRef> = document.select(selector).collect();
            if items.len() >= MIN_ITEMS {
                log::debug!("Selector '{}' matched {} items", name, items.len());
                return items
                    .into_iter()
                    .map(|item| self.parse_item(item))
                    .filter(Record::has_text)
                    .collect();
            }
        }

        log::warn!("No item selector matched; falling back to general content");
        self.parse_fallback(&document).into_iter().collect()
    }

    fn parse_item(&self, item: ElementRef<'_>) -> Record {
        let title_elem = item.select(&self.title_selector).next();

        let title = title_elem.map(|el| {
            truncate_chars(&join_whitespace(visible_text(el)), self.title_max_chars)
        });
        let link = title_elem
            .filter(|el| el.value().name() == "a")
            .and_then(|el| el.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(|href| match &self.base_url {
                Some(base) => resolve_url(base, href),
                None => href.to_string(),
            });
        let body = truncate_chars(&join_whitespace(visible_text(item)), self.body_max_chars);

        Record::item(title, link, body)
    }

    fn parse_fallback(&self, document: &Html) -> Option<Record> {
        let region = self
            .fallback_selectors
            .iter()
            .find_map(|selector| document.select(selector).next())?;

        let text = join_whitespace(visible_text(region));
        if text.is_empty() {
            return None;
        }
        Some(Record::general_content(truncate_chars(
            &text,
            self.fallback_max_chars,
        )))
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

/// Text nodes under `element`, skipping script-like containers.
fn visible_text<'a>(element: ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    element.descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let hidden = node
            .ancestors()
            .filter_map(|a| a.value().as_element())
            .any(|el| HIDDEN_ELEMENTS.contains(&el.name()));
        if hidden { None } else { Some(&**text) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordKind;

    fn extractor() -> RecordExtractor {
        RecordExtractor::new(&ExtractConfig::default()).unwrap()
    }

    const LISTING: &str = r#"
        <html><body><main>
          <div class="e-loop-item">
            <h3>Convocatoria UPME 01-2025</h3>
            <p>Subestación   Norte
               230 kV</p>
          </div>
          <div class="e-loop-item">
            <a href="/convocatorias/02-2025">Convocatoria UPME 02-2025</a>
            <p>Línea de transmisión</p>
          </div>
          <article><h2>Unrelated article</h2></article>
        </main></body></html>
    "#;

    #[test]
    fn test_extracts_items_in_order() {
        let records = extractor().extract(LISTING);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title.as_deref(), Some("Convocatoria UPME 01-2025"));
        assert_eq!(
            records[0].body,
            "Convocatoria UPME 01-2025 Subestación Norte 230 kV"
        );
        assert_eq!(records[1].title.as_deref(), Some("Convocatoria UPME 02-2025"));
        assert!(records.iter().all(|r| r.kind == RecordKind::Item));
    }

    #[test]
    fn test_inline_title_fragments_joined_with_space() {
        let html = r#"
            <div class="e-loop-item"><h3>Convocatoria <b>UPME</b>03-2025</h3></div>
            <div class="e-loop-item"><h3>Otra</h3></div>
        "#;
        let records = extractor().extract(html);

        assert_eq!(records[0].title.as_deref(), Some("Convocatoria UPME 03-2025"));
        assert_eq!(records[0].identity_key(), "Convocatoria UPME 03-2025");
    }

    #[test]
    fn test_link_only_when_title_element_is_anchor() {
        let records = extractor().extract(LISTING);

        assert_eq!(records[0].link, None);
        assert_eq!(records[1].link.as_deref(), Some("/convocatorias/02-2025"));
    }

    #[test]
    fn test_link_resolved_against_base_url() {
        let base = Url::parse("https://www.upme.gov.co/home/").unwrap();
        let records = extractor().with_base_url(base).extract(LISTING);

        assert_eq!(
            records[1].link.as_deref(),
            Some("https://www.upme.gov.co/convocatorias/02-2025")
        );
    }

    #[test]
    fn test_single_match_is_not_a_listing() {
        // One `.e-loop-item` does not qualify; two `article`s do.
        let html = r#"
            <div class="e-loop-item"><h3>Lonely</h3></div>
            <article><h2>First</h2></article>
            <article><h2>Second</h2></article>
        "#;
        let records = extractor().extract(html);

        let titles: Vec<_> = records.iter().filter_map(|r| r.title()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[test]
    fn test_title_and_body_are_truncated() {
        let long_title = "T".repeat(300);
        let long_body = "b ".repeat(400);
        let html = format!(
            r#"<article><h2>{long_title}</h2><p>{long_body}</p></article>
               <article><h2>Short</h2></article>"#
        );
        let records = extractor().extract(&html);

        assert_eq!(records[0].title.as_ref().unwrap().chars().count(), 200);
        assert_eq!(records[0].body.chars().count(), 500);
    }

    #[test]
    fn test_item_without_heading_has_body_only() {
        let html = r#"
            <article><p>Aviso sin título</p></article>
            <article><p>Otro aviso</p></article>
        "#;
        let records = extractor().extract(html);

        assert_eq!(records.len(), 2);
        assert!(records[0].title.is_none());
        assert_eq!(records[0].body, "Aviso sin título");
    }

    #[test]
    fn test_empty_items_are_dropped() {
        let html = r#"<article>  </article><article><h2>Kept</h2></article>"#;
        let records = extractor().extract(html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title(), Some("Kept"));
    }

    #[test]
    fn test_fallback_uses_main_region() {
        let html = r#"
            <html><body>
              <nav>Menu</nav>
              <main><p>No hay convocatorias abiertas</p><script>var x = 1;</script></main>
            </body></html>
        "#;
        let records = extractor().extract(html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RecordKind::GeneralContent);
        assert_eq!(records[0].body, "No hay convocatorias abiertas");
        assert!(records[0].title.is_none());
    }

    #[test]
    fn test_fallback_uses_body_without_main_and_truncates() {
        let html = format!("<html><body><p>{}</p></body></html>", "x".repeat(6000));
        let records = extractor().extract(&html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RecordKind::GeneralContent);
        assert_eq!(records[0].body.chars().count(), 5000);
    }

    #[test]
    fn test_malformed_markup_degrades_gracefully() {
        let records = extractor().extract("<div><p>Texto <b>roto</div></span>");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RecordKind::GeneralContent);
        assert_eq!(records[0].body, "Texto roto");
    }

    #[test]
    fn test_no_text_yields_empty() {
        assert!(extractor().extract("").is_empty());
        assert!(extractor().extract("<html><body>   </body></html>").is_empty());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let config = ExtractConfig {
            item_selectors: vec!["[[invalid".to_string()],
            ..ExtractConfig::default()
        };
        assert!(RecordExtractor::new(&config).is_err());
    }
}
