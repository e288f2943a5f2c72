//! Outbound request construction
//!
//! Turns a URL/method/body/header tuple into a fully-formed request:
//! normalizes the scheme, seeds the `User-Agent`, and captures body length
//! and replay capability when the body's backing store allows it.

use crate::{HaulError, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use url::Url;

/// The body attached to an outbound request.
///
/// A body whose backing buffer is observable is captured as `Full`: its
/// length is known and it can be cheaply replayed (the snapshot is a
/// refcounted `Bytes`). Any other body is `Streaming`: length unknown, not
/// safely retriable.
#[derive(Debug)]
pub enum RequestBody {
    /// No body.
    None,
    /// Fully buffered body with a known length and cheap replay.
    Full(Bytes),
    /// Opaque streaming body; consumed on send.
    Streaming(reqwest::Body),
}

impl RequestBody {
    /// Classifies a reqwest body, snapshotting buffered ones.
    ///
    /// A buffered body of length exactly 0 normalizes to `None` so that
    /// downstream code never has to distinguish "no body" from "empty body".
    pub fn from_body(body: reqwest::Body) -> Self {
        match body.as_bytes() {
            Some(buf) if buf.is_empty() => RequestBody::None,
            Some(buf) => RequestBody::Full(Bytes::copy_from_slice(buf)),
            None => RequestBody::Streaming(body),
        }
    }

    /// Builds a form-encoded body from key/value fields.
    pub fn form(fields: &std::collections::HashMap<String, String>) -> Self {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            serializer.append_pair(key, value);
        }
        let encoded = serializer.finish();
        if encoded.is_empty() {
            RequestBody::None
        } else {
            RequestBody::Full(Bytes::from(encoded))
        }
    }

    /// Known content length, if the body is buffered.
    pub fn len(&self) -> Option<u64> {
        match self {
            RequestBody::None => Some(0),
            RequestBody::Full(buf) => Some(buf.len() as u64),
            RequestBody::Streaming(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::None)
    }

    /// Whether the same logical body can be read again after a send.
    pub fn is_replayable(&self) -> bool {
        matches!(self, RequestBody::None | RequestBody::Full(_))
    }

    /// Takes a sendable body, leaving the replay snapshot in place.
    ///
    /// A streaming body can only be sent once; taking it leaves `None`
    /// behind, which is also why it is not retriable.
    pub(crate) fn take_for_send(&mut self) -> Option<reqwest::Body> {
        match self {
            RequestBody::None => None,
            RequestBody::Full(buf) => Some(reqwest::Body::from(buf.clone())),
            RequestBody::Streaming(_) => {
                let body = std::mem::replace(self, RequestBody::None);
                match body {
                    RequestBody::Streaming(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    }
}

/// A fully-formed outbound request.
///
/// Request callbacks receive this mutably before the exchange and may adjust
/// headers; that is the one deliberate mutation point in the pipeline.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl OutboundRequest {
    /// Builds a request from its parts.
    ///
    /// Fails fast with `HaulError::InvalidUrl` if the URL cannot be parsed.
    /// Input without a scheme defaults to `http`. Empty headers are seeded
    /// with the configured `User-Agent`.
    pub fn build(
        url: &str,
        method: Method,
        body: RequestBody,
        headers: HeaderMap,
        user_agent: &str,
    ) -> Result<Self> {
        let parsed = parse_with_default_scheme(url)?;

        let mut headers = headers;
        if headers.is_empty() {
            if let Ok(value) = HeaderValue::from_str(user_agent) {
                headers.insert(USER_AGENT, value);
            }
        }

        // Normalize a present-but-empty buffered body to the canonical
        // "no body" marker.
        let body = match body {
            RequestBody::Full(buf) if buf.is_empty() => RequestBody::None,
            other => other,
        };

        Ok(Self {
            method,
            url: parsed,
            headers,
            body,
        })
    }

    /// Applies wire defaults after the request-callback phase: form
    /// content-type for POST bodies and a catch-all `Accept`.
    pub(crate) fn apply_header_defaults(&mut self) {
        if self.method == Method::POST && !self.headers.contains_key(CONTENT_TYPE) {
            self.headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
        }
        if !self.headers.contains_key(reqwest::header::ACCEPT) {
            self.headers
                .insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
        }
    }
}

/// Parses a URL, defaulting schemeless input to `http`.
fn parse_with_default_scheme(input: &str) -> Result<Url> {
    match Url::parse(input) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{}", input))
            .map_err(|source| HaulError::InvalidUrl {
                url: input.to_string(),
                source,
            }),
        Err(source) => Err(HaulError::InvalidUrl {
            url: input.to_string(),
            source,
        }),
    }
}
