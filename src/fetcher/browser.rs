//! Renderer backed by a headless browser service
//!
//! Talks to a browserless-compatible `/content` endpoint which navigates to
//! the page, waits for the network to settle and for the ready selector to
//! appear, then returns the serialized DOM.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::{FetchError, PageRenderer, RenderRequest, RenderedPage, check_rendered};

/// Extra time granted to the HTTP call on top of the navigation budget
const REQUEST_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    goto_options: GotoOptions,
    wait_for_selector: WaitForSelector<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoOptions {
    wait_until: &'static str,
    timeout: u64,
}

#[derive(Debug, Serialize)]
struct WaitForSelector<'a> {
    selector: &'a str,
    timeout: u64,
}

pub struct BrowserRenderer {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl BrowserRenderer {
    pub fn new(endpoint: String, token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent("scoreflash/1.0")
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn content_url(&self) -> String {
        format!("{}/content", self.endpoint)
    }
}

#[async_trait]
impl PageRenderer for BrowserRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedPage, FetchError> {
        let timeout_ms = request.timeout.as_millis() as u64;
        let body = ContentRequest {
            url: request.url.as_str(),
            goto_options: GotoOptions {
                wait_until: "networkidle2",
                timeout: timeout_ms,
            },
            wait_for_selector: WaitForSelector {
                selector: request.ready_selector,
                timeout: timeout_ms,
            },
        };

        tracing::debug!(url = %request.url, endpoint = %self.endpoint, "Rendering page in browser service");

        let mut call = self
            .client
            .post(self.content_url())
            .timeout(request.timeout + REQUEST_GRACE)
            .json(&body);
        if let Some(token) = &self.token {
            call = call.query(&[("token", token)]);
        }

        let response = call
            .send()
            .await
            .map_err(|e| FetchError::from_request(e, request.timeout))?;

        let status = response.status();
        if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
            return Err(FetchError::Timeout(request.timeout));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(FetchError::NavigationFailed(format!(
                "browser service returned {}: {}",
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::from_request(e, request.timeout))?;

        check_rendered(request.url, html)
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
