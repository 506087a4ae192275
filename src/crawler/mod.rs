//! Bounded same-domain web crawler.
//!
//! Crawls each source's base URL breadth-first via depth-bounded recursion:
//! a page is fetched at most once per `scrape()` invocation, the global page
//! cap applies across all sources in the invocation, and link discovery is
//! confined to the network location of the *source's* base URL (children of
//! an off-domain redirect are still filtered against the original base).
//!
//! All crawl state lives in a [`CrawlState`] created per invocation and
//! threaded through the recursion, so concurrent or test-isolated crawls
//! never share a visited set.

pub mod swagger;

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

use crate::catalog::{Source, SourceKind};
use crate::config::CrawlerConfig;
use crate::documents::{Document, DocumentSource};

/// Errors from crawler construction and spec fetching.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Spec parse error: {0}")]
    SpecParse(#[from] serde_json::Error),
}

/// Elements whose subtrees carry no document content.
const STRIP_TAGS: [&str; 9] = [
    "script", "style", "nav", "footer", "header", "aside", "form", "iframe", "noscript",
];

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));
static H1_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("static selector"));
static CONTENT_ROOT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["main", "article", r#"[class*="content" i]"#, "body"]
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

/// Per-invocation crawl state: visited set, page cap, accumulated output.
struct CrawlState {
    visited: HashSet<String>,
    documents: Vec<Document>,
    max_pages: usize,
}

impl CrawlState {
    fn new(max_pages: usize) -> Self {
        Self {
            visited: HashSet::new(),
            documents: Vec::new(),
            max_pages,
        }
    }
}

/// Everything extracted from one fetched page, fully owned so the parsed
/// DOM never crosses an await point.
struct ParsedPage {
    title: String,
    text: String,
    links: Vec<String>,
}

/// Scraper for documentation websites.
pub struct WebCrawler {
    client: reqwest::Client,
    config: CrawlerConfig,
}

impl WebCrawler {
    pub fn new(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Crawl the given web sources.
    ///
    /// State is reset at the start of every call; nothing accumulates
    /// across invocations.
    pub async fn scrape(&self, sources: &[Source]) -> Vec<Document> {
        let mut state = CrawlState::new(self.config.max_pages);

        for source in sources.iter().filter(|s| s.kind == SourceKind::Web) {
            let base = match Url::parse(&source.url) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping source with invalid URL {}: {e}", source.url);
                    continue;
                }
            };
            let max_depth = source.max_depth.unwrap_or(self.config.max_depth);
            tracing::info!(
                "Scraping documentation from: {} (max_depth={max_depth})",
                source.url
            );
            self.crawl_page(&mut state, source.url.clone(), 0, &base, max_depth)
                .await;
        }

        tracing::info!(
            "Scraping complete: {} documents from {} pages",
            state.documents.len(),
            state.visited.len()
        );

        state.documents
    }

    /// Import every configured Swagger/OpenAPI endpoint.
    ///
    /// A failing endpoint is logged and skipped; the others still import.
    pub async fn import_swagger(&self) -> Vec<Document> {
        let mut documents = Vec::new();
        for swagger_url in &self.config.swagger_urls {
            tracing::info!("Scraping Swagger/OpenAPI from: {swagger_url}");
            match swagger::import(&self.client, swagger_url).await {
                Ok(docs) => documents.extend(docs),
                Err(e) => tracing::warn!("Error importing Swagger {swagger_url}: {e}"),
            }
        }
        documents
    }

    /// Crawl one page, then its same-domain children.
    ///
    /// Stop conditions are checked before the fetch; a fetch failure
    /// abandons this branch only.
    fn crawl_page<'a>(
        &'a self,
        state: &'a mut CrawlState,
        url: String,
        depth: usize,
        base: &'a Url,
        max_depth: usize,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if depth > max_depth {
                return;
            }
            if state.visited.contains(&url) {
                return;
            }
            if state.visited.len() >= state.max_pages {
                tracing::warn!("Reached max pages limit ({})", state.max_pages);
                return;
            }

            state.visited.insert(url.clone());

            let body = match self.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Error fetching {url}: {e}");
                    return;
                }
            };

            let page_url = match Url::parse(&url) {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!("Unparseable page URL {url}: {e}");
                    return;
                }
            };

            let page = parse_page(&body, &page_url, base);

            if !page.text.is_empty() {
                state.documents.push(Document::new(
                    page.text,
                    page.title,
                    url.clone(),
                    DocumentSource::Scraper,
                ));
                tracing::debug!("Extracted document from {url} (depth={depth})");
            }

            if depth < max_depth {
                for link in page.links {
                    if !state.visited.contains(&link) {
                        self.crawl_page(state, link, depth + 1, base, max_depth)
                            .await;
                    }
                }
            }
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        response.text().await
    }
}

/// Parse one HTML page into owned title, visible text, and child links.
fn parse_page(body: &str, page_url: &Url, base: &Url) -> ParsedPage {
    let html = Html::parse_document(body);

    let title = extract_title(&html);
    let text = extract_text(&html);
    let links = extract_links(&html, page_url, base);

    ParsedPage { title, text, links }
}

fn extract_title(html: &Html) -> String {
    if let Some(title) = html.select(&TITLE_SELECTOR).next() {
        let text: String = title.text().collect();
        let text = text.trim();
        if !text.is_empty() {
            return text.to_string();
        }
    }
    if let Some(h1) = html.select(&H1_SELECTOR).next() {
        return h1.text().collect::<String>().trim().to_string();
    }
    String::new()
}

/// Extract visible text from the page's content root.
///
/// The root is the first match of `<main>`, `<article>`, an element whose
/// class contains "content", or `<body>`. Non-content subtrees are skipped
/// and the result is collapsed to non-empty trimmed lines.
fn extract_text(html: &Html) -> String {
    let root = CONTENT_ROOT_SELECTORS
        .iter()
        .find_map(|selector| html.select(selector).next());

    let root = root.unwrap_or_else(|| html.root_element());

    let mut lines: Vec<String> = Vec::new();
    collect_text(root, &mut lines);

    lines.join("\n")
}

fn collect_text(element: ElementRef, lines: &mut Vec<String>) {
    if STRIP_TAGS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, lines);
        } else if let Some(text) = child.value().as_text() {
            for line in text.split('\n') {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
        }
    }
}

/// Collect same-domain absolute links, in discovery order.
///
/// Links inside stripped subtrees (navigation, footers, forms) are not
/// followed. Relative hrefs resolve against the current page; fragments
/// are stripped; anchors and `javascript:`/`mailto:` schemes are skipped.
/// Domain confinement compares against the source's base URL, not the
/// page.
fn extract_links(html: &Html, page_url: &Url, base: &Url) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    for anchor in html.select(&LINK_SELECTOR) {
        if in_stripped_subtree(&anchor) {
            continue;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:")
        {
            continue;
        }

        let Ok(mut absolute) = page_url.join(href) else {
            continue;
        };
        absolute.set_fragment(None);

        if !same_netloc(&absolute, base) {
            continue;
        }

        let link = absolute.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

fn in_stripped_subtree(element: &ElementRef) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| STRIP_TAGS.contains(&e.name()))
    })
}

fn same_netloc(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port() == b.port()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
<html>
  <head><title>  Privacy Handbook  </title><script>var x = 1;</script></head>
  <body>
    <nav><a href="/nav-link">Nav</a>Navigation menu</nav>
    <main>
      <h1>Data protection</h1>
      <p>Personal data must be processed lawfully.</p>
      <p>   </p>
      <a href="/chapter-2">Next chapter</a>
      <a href="/chapter-2#section">Anchor duplicate</a>
      <a href="#top">Top</a>
      <a href="javascript:void(0)">JS</a>
      <a href="mailto:dpo@example.test">Mail</a>
      <a href="https://other.example/page">External</a>
    </main>
    <footer>Footer text</footer>
  </body>
</html>"##;

    fn parse(body: &str) -> ParsedPage {
        let url = Url::parse("https://docs.example.test/handbook").unwrap();
        let base = Url::parse("https://docs.example.test/").unwrap();
        parse_page(body, &url, &base)
    }

    #[test]
    fn extracts_title_and_main_text_only() {
        let page = parse(PAGE);
        assert_eq!(page.title, "Privacy Handbook");
        assert!(page.text.contains("Data protection"));
        assert!(page.text.contains("Personal data must be processed lawfully."));
        assert!(!page.text.contains("Navigation menu"));
        assert!(!page.text.contains("Footer text"));
        assert!(!page.text.contains("var x"));
    }

    #[test]
    fn text_is_trimmed_nonempty_lines() {
        let page = parse(PAGE);
        for line in page.text.split('\n') {
            assert!(!line.trim().is_empty());
            assert_eq!(line, line.trim());
        }
    }

    #[test]
    fn link_discovery_filters_schemes_fragments_and_domains() {
        let page = parse(PAGE);
        assert_eq!(
            page.links,
            vec!["https://docs.example.test/chapter-2".to_string()]
        );
    }

    #[test]
    fn falls_back_to_h1_title() {
        let body = "<html><body><h1>Only Heading</h1><p>text</p></body></html>";
        let page = parse(body);
        assert_eq!(page.title, "Only Heading");
    }

    #[test]
    fn body_is_content_root_when_no_main() {
        let body = "<html><body><p>Plain body text</p></body></html>";
        let page = parse(body);
        assert_eq!(page.text, "Plain body text");
    }

    #[test]
    fn content_class_is_matched_case_insensitively() {
        let body = r#"<html><body>
            <div class="sidebar">Side</div>
            <div class="Page-Content"><p>Inner text</p></div>
        </body></html>"#;
        let page = parse(body);
        // The class-contains-"content" root wins over <body>
        assert_eq!(page.text, "Inner text");
    }

    #[test]
    fn same_netloc_compares_host_and_port() {
        let a = Url::parse("https://example.test/a").unwrap();
        let b = Url::parse("https://example.test:8443/b").unwrap();
        let c = Url::parse("https://example.test/c").unwrap();
        assert!(!same_netloc(&a, &b));
        assert!(same_netloc(&a, &c));
    }
}
