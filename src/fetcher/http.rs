//! Plain HTTP renderer, no JavaScript execution

use async_trait::async_trait;
use reqwest::Client;

use super::{FetchError, PageRenderer, RenderRequest, RenderedPage, check_rendered};

pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent("Mozilla/5.0 (compatible; scoreflash/1.0)")
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for HttpRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedPage, FetchError> {
        tracing::debug!(url = %request.url, "Fetching page over HTTP");

        let response = self
            .client
            .get(request.url.as_str())
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_request(e, request.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::NavigationFailed(format!(
                "{} returned {}",
                request.url, status
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::from_request(e, request.timeout))?;

        check_rendered(request.url, html)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
