use std::future::Future;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::{PollError, TransportError};

/// Status and body of one completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Performs a single GET against the events feed.
///
/// Any status code is a successful exchange; only failures to complete the
/// request at all are errors.
pub trait Transport {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport used in production.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        debug!("GET {} -> {status} ({} bytes)", redact(url), body.len());
        Ok(HttpResponse { status, body })
    }
}

/// Check that `url` lives under one of the allowed endpoint prefixes.
///
/// Scheme, host and port must match exactly and the path must extend the
/// prefix path, so look-alike hosts such as `eventsapi.chaturbate.com.evil`
/// are rejected.
pub fn check_allowed(url: &str, allowed_prefixes: &[String]) -> Result<(), PollError> {
    let target = Url::parse(url)
        .map_err(|e| PollError::Config(format!("invalid events URL: {e}")))?;

    let allowed = allowed_prefixes.iter().any(|prefix| {
        let Ok(prefix) = Url::parse(prefix) else {
            return false;
        };
        target.scheme() == prefix.scheme()
            && target.host_str() == prefix.host_str()
            && target.port_or_known_default() == prefix.port_or_known_default()
            && path_extends(target.path(), prefix.path())
    });

    if allowed {
        Ok(())
    } else {
        Err(PollError::DisallowedUrl(redact(url)))
    }
}

/// `path` equals `prefix` or continues it at a segment boundary.
fn path_extends(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || prefix.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// Events API URLs embed the access token in the path; keep only the origin
/// and the first path segment for logs and error messages.
pub fn redact(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let first = parsed
                .path_segments()
                .and_then(|mut s| s.next())
                .filter(|s| !s.is_empty());
            match first {
                Some(seg) => format!("{}/{seg}/…", parsed.origin().ascii_serialization()),
                None => parsed.origin().ascii_serialization(),
            }
        }
        Err(_) => "<invalid url>".to_string(),
    }
}
