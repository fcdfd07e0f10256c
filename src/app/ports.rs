use async_trait::async_trait;

/// One encoded POST to the upstream intake endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub content_type: &'static str,
    pub accept: &'static str,
    pub body: Vec<u8>,
}

/// What came back from the upstream at the transport level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamReply {
    pub status: u16,
    /// Empty when the body could not be read.
    pub body: String,
}

/// Outbound seam to the third-party intake endpoint.
///
/// `Err` is reserved for network-level failures (connect, timeout, TLS);
/// any HTTP status, including 4xx/5xx, comes back as `Ok`.
#[async_trait]
pub trait UpstreamPort: Send + Sync {
    async fn post(&self, request: UpstreamRequest) -> Result<UpstreamReply, String>;
}
