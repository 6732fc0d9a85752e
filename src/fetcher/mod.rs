//! Match page fetching
//!
//! A [`PageRenderer`] turns a URL into fully rendered HTML (JavaScript
//! executed, scoreboard present). [`MatchPageFetcher`] validates the URL,
//! renders the summary page and optionally the statistics tab, and pulls
//! the configured slots out of the markup.

mod browser;
pub mod extract;
mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::model::{ConfigError, FetcherConfig, RawFragment, Slot};
use crate::service::normalizer::canonicalize_url;

pub use browser::BrowserRenderer;
pub use extract::{CompiledSelectors, extract_fragment};
pub use http::HttpRenderer;

/// Rendered pages shorter than this are treated as failed navigations
const MIN_HTML_LEN: usize = 100;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("Page did not become ready within {0:?}")]
    Timeout(Duration),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Required element for '{slot}' not found (selector '{selector}')")]
    MissingElement { slot: Slot, selector: String },
}

impl FetchError {
    /// Whether retrying the same URL may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout(_) | FetchError::NavigationFailed(_))
    }

    fn from_request(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            FetchError::Timeout(timeout)
        } else {
            FetchError::NavigationFailed(error.to_string())
        }
    }
}

/// Parameters of a single render
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub url: &'a Url,
    /// Element that must be present before the page counts as loaded
    pub ready_selector: &'a str,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: Url,
    pub html: String,
}

/// Trait for page renderers
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render the page and return its final HTML
    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedPage, FetchError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Pick a renderer for the configuration
///
/// Without a browser service endpoint pages are fetched with a plain GET,
/// which only works for pages that carry the scoreboard in their initial
/// markup.
pub fn renderer_from_config(config: &FetcherConfig) -> Arc<dyn PageRenderer> {
    match &config.browser.endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "Rendering pages through browser service");
            Arc::new(BrowserRenderer::new(endpoint.clone(), config.browser.token.clone()))
        }
        None => {
            tracing::warn!("No browser service configured, falling back to plain HTTP fetching");
            Arc::new(HttpRenderer::new())
        }
    }
}

fn check_rendered(url: &Url, html: String) -> Result<RenderedPage, FetchError> {
    if html.trim().len() < MIN_HTML_LEN {
        return Err(FetchError::NavigationFailed(format!(
            "rendered page for {} is empty",
            url
        )));
    }
    Ok(RenderedPage {
        url: url.clone(),
        html,
    })
}

/// URL of the statistics tab belonging to a match summary URL
pub fn stats_url(url: &Url, stats_path: &str) -> Url {
    let mut stats = url.clone();
    stats.set_fragment(None);
    let path = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        stats_path.trim_start_matches('/')
    );
    stats.set_path(&path);
    stats
}

/// Fetches match pages and extracts raw fragments
pub struct MatchPageFetcher {
    config: FetcherConfig,
    renderer: Arc<dyn PageRenderer>,
    selectors: CompiledSelectors,
}

impl MatchPageFetcher {
    pub fn new(config: FetcherConfig, renderer: Arc<dyn PageRenderer>) -> Result<Self, ConfigError> {
        let selectors = CompiledSelectors::compile(&config.selectors)?;

        tracing::info!(
            renderer = renderer.name(),
            allowed_hosts = ?config.allowed_hosts,
            stats_page = config.fetch_stats_page,
            "Match page fetcher configured"
        );

        Ok(Self {
            config,
            renderer,
            selectors,
        })
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    /// Canonicalize a URL and check that it points at a match page of a
    /// supported site
    pub fn check_url(&self, raw: &str) -> Result<Url, FetchError> {
        let unsupported = || FetchError::UnsupportedUrl(raw.to_string());

        let url = canonicalize_url(raw).map_err(|_| unsupported())?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(unsupported());
        }

        let host = url.host_str().ok_or_else(unsupported)?;
        let host_allowed = self
            .config
            .allowed_hosts
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)));
        if !host_allowed {
            return Err(unsupported());
        }

        let is_match_page = self
            .config
            .match_path_markers
            .iter()
            .any(|marker| url.path().contains(marker.as_str()));
        if !is_match_page {
            return Err(unsupported());
        }

        Ok(url)
    }

    /// Fetch a match page and extract its raw fragment
    pub async fn fetch(&self, raw_url: &str) -> Result<RawFragment, FetchError> {
        let url = self.check_url(raw_url)?;

        tracing::info!(url = %url, renderer = self.renderer.name(), "Fetching match page");

        let page = self.render(&url).await?;
        let mut fragment = extract_fragment(&page.html, &page.url, &self.selectors)?;

        if self.config.fetch_stats_page {
            let stats = stats_url(&url, &self.config.stats_path);
            match self.render(&stats).await {
                Ok(page) => fragment.insert(Slot::StatsText, page.html),
                Err(e) => {
                    tracing::warn!(url = %stats, error = %e, "Failed to fetch statistics page, continuing without it");
                }
            }
        }

        tracing::debug!(
            url = %url,
            slots = ?fragment.slots().collect::<Vec<_>>(),
            "Match page extracted"
        );

        Ok(fragment)
    }

    async fn render(&self, url: &Url) -> Result<RenderedPage, FetchError> {
        let timeout = self.config.navigation_timeout();
        let request = RenderRequest {
            url,
            ready_selector: &self.config.ready_selector,
            timeout,
        };

        match tokio::time::timeout(timeout, self.renderer.render(&request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(url = %url, timeout_ms = timeout.as_millis() as u64, "Page render timed out");
                Err(FetchError::Timeout(timeout))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedRenderer;
    use super::*;
    use crate::fetcher::extract::MATCH_PAGE;

    const MATCH_URL: &str = "https://www.livesport.cz/zapas/fotbal/bohemians/mlada-boleslav/?mid=abc";

    fn fetcher(renderer: Arc<dyn PageRenderer>, stats: bool) -> MatchPageFetcher {
        let config = FetcherConfig {
            fetch_stats_page: stats,
            ..Default::default()
        };
        MatchPageFetcher::new(config, renderer).unwrap()
    }

    struct SlowRenderer;

    #[async_trait]
    impl PageRenderer for SlowRenderer {
        async fn render(&self, _request: &RenderRequest<'_>) -> Result<RenderedPage, FetchError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(FetchError::NavigationFailed("unreachable".to_string()))
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[test]
    fn test_check_url() {
        let fetcher = fetcher(Arc::new(ScriptedRenderer::always(MATCH_PAGE)), false);

        assert!(fetcher.check_url(MATCH_URL).is_ok());
        assert!(fetcher
            .check_url("https://www.flashscore.com/match/football/abc/")
            .is_ok());
        assert!(matches!(
            fetcher.check_url("https://www.livesport.cz/fotbal/cesko/"),
            Err(FetchError::UnsupportedUrl(_))
        ));
        assert!(fetcher.check_url("https://evil-livesport.cz/zapas/x/").is_err());
        assert!(fetcher.check_url("ftp://www.livesport.cz/zapas/x/").is_err());
        assert!(fetcher.check_url("not a url").is_err());
    }

    #[test]
    fn test_check_url_canonicalizes() {
        let fetcher = fetcher(Arc::new(ScriptedRenderer::always(MATCH_PAGE)), false);
        let url = fetcher
            .check_url("https://WWW.LIVESPORT.CZ/zapas/fotbal/a/b?mid=abc&utm_source=share#detail")
            .unwrap();
        assert_eq!(url.as_str(), "https://www.livesport.cz/zapas/fotbal/a/b/?mid=abc");
    }

    #[test]
    fn test_stats_url() {
        let url = Url::parse(MATCH_URL).unwrap();
        assert_eq!(
            stats_url(&url, "/prehled/stats/celkem/").as_str(),
            "https://www.livesport.cz/zapas/fotbal/bohemians/mlada-boleslav/prehled/stats/celkem/?mid=abc"
        );
    }

    #[tokio::test]
    async fn test_fetch_extracts_fragment_with_stats() {
        let stats_page = format!("<html><body>{}</body></html>", "Possession 55% ".repeat(10));
        let renderer = Arc::new(ScriptedRenderer::new(vec![
            Ok(MATCH_PAGE.to_string()),
            Ok(stats_page),
        ]));
        let fetcher = fetcher(renderer.clone(), true);

        let fragment = fetcher.fetch(MATCH_URL).await.unwrap();
        assert_eq!(fragment.first(Slot::HomeTeam), Some("Bohemians"));
        assert!(fragment.first(Slot::StatsText).unwrap().contains("Possession"));
        assert_eq!(renderer.calls(), 2);
    }

    #[tokio::test]
    async fn test_stats_failure_is_not_fatal() {
        let renderer = Arc::new(ScriptedRenderer::new(vec![
            Ok(MATCH_PAGE.to_string()),
            Err(FetchError::NavigationFailed("404".to_string())),
        ]));
        let fetcher = fetcher(renderer, true);

        let fragment = fetcher.fetch(MATCH_URL).await.unwrap();
        assert!(fragment.first(Slot::StatsText).is_none());
    }

    #[tokio::test]
    async fn test_unsupported_url_never_renders() {
        let renderer = Arc::new(ScriptedRenderer::always(MATCH_PAGE));
        let fetcher = fetcher(renderer.clone(), false);

        let err = fetcher.fetch("https://example.com/zapas/x/").await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedUrl(_)));
        assert!(!err.is_transient());
        assert_eq!(renderer.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_page_is_navigation_failure() {
        let fetcher = fetcher(Arc::new(ScriptedRenderer::always("<html></html>")), false);
        let err = fetcher.fetch(MATCH_URL).await.unwrap_err();
        assert!(matches!(err, FetchError::NavigationFailed(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_render_timeout() {
        let config = FetcherConfig {
            navigation_timeout_ms: 20,
            ..Default::default()
        };
        let fetcher = MatchPageFetcher::new(config, Arc::new(SlowRenderer)).unwrap();

        let err = fetcher.fetch(MATCH_URL).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_millis(20)));
    }
}
