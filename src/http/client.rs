// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP client

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::response::Response;
use super::DEFAULT_USER_AGENT;
use crate::error::{Error, Result};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Accept invalid certificates (dangerous!)
    pub accept_invalid_certs: bool,
    pub default_headers: HeaderMap,
    pub proxy: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            "accept",
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        default_headers.insert(
            "accept-language",
            HeaderValue::from_static("en-US,en;q=0.5"),
        );

        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            accept_invalid_certs: false,
            default_headers,
            proxy: None,
        }
    }
}

/// Fetches pages for the agent to work on
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(Policy::limited(config.max_redirects))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .default_headers(config.default_headers.clone());

        if let Some(ref proxy_url) = config.proxy {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy_url)
                    .map_err(|e| Error::config(format!("Invalid proxy URL: {}", e)))?,
            );
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// GET a URL and read the whole body
    pub async fn get(&self, url: impl AsRef<str>) -> Result<Response> {
        let url = Url::parse(url.as_ref())?;
        let start = Instant::now();

        let response = self.client.get(url.clone()).send().await?;
        let response_time = start.elapsed().as_millis() as u64;

        let final_url = response.url().clone();
        let redirected = final_url != url;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        debug!("GET {} -> {} ({} bytes)", final_url, status, body.len());

        Ok(Response::new(
            status,
            headers,
            body,
            final_url,
            redirected,
            response_time,
        ))
    }

    /// GET several URLs concurrently; results keep the input order
    pub async fn get_all(&self, urls: &[Url]) -> Vec<Result<Response>> {
        let requests: Vec<_> = urls.iter().map(|u| self.get(u.as_str())).collect();
        futures::future::join_all(requests).await
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_creation() {
        let client = HttpClient::new().unwrap();
        assert_eq!(client.config().user_agent, DEFAULT_USER_AGENT);
    }

    #[tokio::test]
    async fn test_get_follows_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/new"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<p>moved</p>", "text/html"),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let resp = client.get(format!("{}/old", server.uri())).await.unwrap();
        assert!(resp.is_success());
        assert!(resp.redirected);
        assert_eq!(resp.url.path(), "/new");
        assert_eq!(resp.text_lossy(), "<p>moved</p>");
    }

    #[tokio::test]
    async fn test_get_all_keeps_order() {
        let server = MockServer::start().await;
        for name in ["a", "b"] {
            Mock::given(path(format!("/{}", name)))
                .respond_with(ResponseTemplate::new(200).set_body_string(name))
                .mount(&server)
                .await;
        }
        let base = Url::parse(&server.uri()).unwrap();
        let urls = vec![base.join("/b").unwrap(), base.join("/a").unwrap()];
        let bodies: Vec<String> = HttpClient::new()
            .unwrap()
            .get_all(&urls)
            .await
            .into_iter()
            .map(|r| r.unwrap().text_lossy())
            .collect();
        assert_eq!(bodies, vec!["b", "a"]);
    }
}
