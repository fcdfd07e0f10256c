use crate::app::ports::{UpstreamPort, UpstreamReply, UpstreamRequest};
use crate::constants::{MAX_UPSTREAM_BODY_BYTES, NO_STORE};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use std::time::Duration;

/// `UpstreamPort` over a shared reqwest client pointed at one fixed URL.
pub struct ReqwestUpstream {
    client: reqwest::Client,
    url: String,
    body_limit: usize,
}

impl ReqwestUpstream {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("waitlist_gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url: url.into(), body_limit: MAX_UPSTREAM_BODY_BYTES })
    }

    /// Cap on how many body bytes are kept per upstream reply.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Read at most `limit` bytes of the body. A read failure yields an empty
/// body, not a failed call.
async fn read_capped(mut resp: reqwest::Response, limit: usize) -> String {
    let mut buf: Vec<u8> = Vec::new();
    loop {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let room = limit - buf.len();
                if chunk.len() >= room {
                    buf.extend_from_slice(&chunk[..room]);
                    tracing::debug!("Upstream body truncated at {} bytes", limit);
                    break;
                }
                buf.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Failed to read upstream body: {}", e);
                return String::new();
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait]
impl UpstreamPort for ReqwestUpstream {
    async fn post(&self, request: UpstreamRequest) -> std::result::Result<UpstreamReply, String> {
        tracing::debug!("HTTP POST to upstream: content_type={}", request.content_type);
        let resp = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, request.content_type)
            .header(ACCEPT, request.accept)
            .header(CACHE_CONTROL, NO_STORE)
            .header(PRAGMA, "no-cache")
            .body(request.body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status().as_u16();
        let body = read_capped(resp, self.body_limit).await;
        tracing::debug!("HTTP response: status={}, size={} bytes", status, body.len());
        Ok(UpstreamReply { status, body })
    }
}
