//! Thin HTTP client used by every facility source.
//!
//! Responses are returned with their status code rather than turned into
//! errors, so callers decide what a non-success status means.

use reqwest::Client;
use std::time::Duration;

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Shared reqwest client with a fixed user agent and timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("lotmap/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// POST a raw text body.
    pub async fn post_text(&self, url: &str, body: String) -> Result<HttpResponse, reqwest::Error> {
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;
        Self::collect(resp).await
    }

    /// GET with query-string parameters.
    pub async fn get_query(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<HttpResponse, reqwest::Error> {
        let resp = self.client.get(url).query(params).send().await?;
        Self::collect(resp).await
    }

    async fn collect(resp: reqwest::Response) -> Result<HttpResponse, reqwest::Error> {
        let url = resp.url().to_string();
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpResponse { url, status, body })
    }
}
