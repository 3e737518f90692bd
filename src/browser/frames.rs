// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Page loading with recursive frame attachment
//!
//! Fetches a page, then every `iframe`/`frame` it contains, and attaches
//! each child document behind its frame element so addresses can cross
//! into it. A frame that fails to load is logged and left empty.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};
use url::Url;

use crate::dom::{parse_html_with_url, Document, Element};
use crate::error::{Error, ErrorContext, Result};
use crate::http::{HttpClient, Response};

/// Elements that host a child document
pub const FRAME_ELEMENTS: &str = "iframe, frame";

/// Loads a page together with its frame tree
#[derive(Debug, Clone)]
pub struct FrameLoader {
    client: HttpClient,
    max_depth: u32,
}

impl FrameLoader {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            max_depth: 3,
        }
    }

    /// Nesting depth below which frames are no longer fetched
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Fetch `url` and its frames. Only a failure of the page itself is
    /// returned as an error.
    pub async fn load(&self, url: &Url) -> Result<Document> {
        let response = self.client.get(url.as_str()).await?;
        let document = into_document(response)?;
        let attached = self.load_frames(document.clone(), 1).await;
        debug!("loaded {} with {} frame(s)", url, attached);
        Ok(document)
    }

    fn load_frames(
        &self,
        document: Document,
        depth: u32,
    ) -> Pin<Box<dyn Future<Output = usize> + Send + '_>> {
        Box::pin(async move {
            if depth > self.max_depth {
                return 0;
            }

            let targets: Vec<(Element, Url)> = document
                .query_selector_all(FRAME_ELEMENTS)
                .into_iter()
                .filter_map(|frame| {
                    let url = frame_url(&document, &frame)?;
                    Some((frame, url))
                })
                .collect();
            if targets.is_empty() {
                return 0;
            }

            let urls: Vec<Url> = targets.iter().map(|(_, url)| url.clone()).collect();
            let responses = self.client.get_all(&urls).await;

            let mut attached = 0;
            for ((frame, url), response) in targets.into_iter().zip(responses) {
                let child = match response.and_then(into_document) {
                    Ok(child) => child,
                    Err(e) if e.is_network() => {
                        warn!("frame {} not loaded: {}", url, e);
                        continue;
                    }
                    Err(e) => {
                        debug!("frame {} skipped: {}", url, e);
                        continue;
                    }
                };
                document.attach_frame(&frame, &child);
                attached += 1 + self.load_frames(child, depth + 1).await;
            }
            attached
        })
    }
}

/// Resolved http(s) source of a frame element
pub fn frame_url(document: &Document, frame: &Element) -> Option<Url> {
    if !frame.is_frame() {
        return None;
    }
    let src = frame.src().filter(|s| !s.trim().is_empty())?;
    let url = document.resolve_url(src.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn into_document(response: Response) -> Result<Document> {
    check_frame(&response).with_url(response.url.as_str())?;
    parse_html_with_url(&response.text_lossy(), Some(response.url.clone()))
}

fn check_frame(response: &Response) -> Result<()> {
    if !response.is_success() {
        return Err(Error::frame(format!("status {}", response.status_code())));
    }
    if !response.is_html() {
        return Err(Error::frame("content is not HTML"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{address_of, resolve};
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(server: &MockServer, at: &str, html: &str) {
        Mock::given(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
            .mount(server)
            .await;
    }

    #[test]
    fn test_frame_url_schemes() {
        let doc = parse_html_with_url(
            r#"<iframe id="a" src="inner.html"></iframe>
               <iframe id="b" src="javascript:void(0)"></iframe>
               <iframe id="c" src="data:text/html,hi"></iframe>
               <iframe id="d"></iframe>"#,
            Some(Url::parse("https://example.com/dir/").unwrap()),
        )
        .unwrap();
        let url = |id: &str| frame_url(&doc, &doc.get_element_by_id(id).unwrap());
        assert_eq!(
            url("a").map(|u| u.to_string()),
            Some("https://example.com/dir/inner.html".to_string())
        );
        assert!(url("b").is_none());
        assert!(url("c").is_none());
        assert!(url("d").is_none());
    }

    #[tokio::test]
    async fn test_nested_frames_are_attached() {
        let server = MockServer::start().await;
        serve(&server, "/", r#"<body><iframe src="/mid"></iframe></body>"#).await;
        serve(&server, "/mid", r#"<body><iframe src="/leaf"></iframe></body>"#).await;
        serve(&server, "/leaf", r#"<body><button id="deep">x</button></body>"#).await;

        let loader = FrameLoader::new(HttpClient::new().unwrap());
        let top = loader
            .load(&Url::parse(&format!("{}/", server.uri())).unwrap())
            .await
            .unwrap();

        let (_, mid) = top.frames().pop().unwrap();
        let (_, leaf) = mid.frames().pop().unwrap();
        let button = leaf.get_element_by_id("deep").unwrap();
        assert_eq!(button.owner_document().top(), top);

        let address = address_of(&button);
        assert_eq!(resolve(&top, &address), Some(button));
    }

    #[tokio::test]
    async fn test_failed_frame_is_skipped() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/",
            r#"<iframe src="/missing"></iframe><iframe src="/ok"></iframe>"#,
        )
        .await;
        serve(&server, "/ok", "<p>ok</p>").await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let loader = FrameLoader::new(HttpClient::new().unwrap());
        let top = loader
            .load(&Url::parse(&format!("{}/", server.uri())).unwrap())
            .await
            .unwrap();
        assert_eq!(top.frames().len(), 1);
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let server = MockServer::start().await;
        serve(&server, "/", r#"<iframe src="/child"></iframe>"#).await;
        serve(&server, "/child", "<p>child</p>").await;

        let loader = FrameLoader::new(HttpClient::new().unwrap()).max_depth(0);
        let top = loader
            .load(&Url::parse(&format!("{}/", server.uri())).unwrap())
            .await
            .unwrap();
        assert!(top.frames().is_empty());
    }
}
