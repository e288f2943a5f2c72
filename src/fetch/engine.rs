//! Fetch engine: executes HTTP exchanges and tracks in-flight work
//!
//! One engine owns a shared HTTP client, the three callback lists, and the
//! join-counter. An exchange runs request callbacks, performs the HTTP call,
//! classifies the outcome, and fires exactly one of the response or error
//! callback phases before decrementing the counter.

use crate::fetch::callbacks::CallbackRegistry;
use crate::fetch::join::JoinCounter;
use crate::fetch::request::{OutboundRequest, RequestBody};
use crate::{HaulError, Result};
use bytes::Bytes;
use futures::future::BoxFuture;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Process-wide monotonic engine id counter.
static ENGINE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Status codes below this value classify as success; everything at or above
/// it is a status error, with no distinction between 3xx/4xx/5xx.
const SUCCESS_STATUS_LIMIT: u16 = 203;

/// Engine construction options.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Outbound `User-Agent` header value.
    pub user_agent: String,

    /// Concurrent exchange execution: scheduled fetches run as independent
    /// tasks and errors surface only through error callbacks. When false,
    /// exchanges run inline on the calling task and return their outcome.
    pub asynchronous: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            asynchronous: false,
        }
    }
}

/// An inbound response with a back-reference to its originating request.
///
/// When the transport itself fails there is no real response; a synthetic one
/// (status 0, empty headers and body) is substituted so error callbacks are
/// always handed the request that failed.
#[derive(Debug)]
pub struct FetchedResponse {
    /// HTTP status code; 0 for a synthetic response after transport failure.
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub request: OutboundRequest,
}

impl FetchedResponse {
    pub(crate) fn synthetic(request: OutboundRequest) -> Self {
        Self {
            status: 0,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            request,
        }
    }
}

struct EngineInner {
    id: u32,
    user_agent: String,
    asynchronous: bool,
    client: Client,
    pending: JoinCounter,
    callbacks: CallbackRegistry,
}

/// Decrements the join-counter when the exchange ends, however it ends.
/// A callback panic unwinds through `perform` and still releases the count.
struct CompletionGuard(Arc<EngineInner>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.0.pending.done();
    }
}

/// The fetch engine. Cheap to clone; clones share the client, callbacks, and
/// join-counter.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                id: ENGINE_COUNTER.fetch_add(1, Ordering::SeqCst) + 1,
                user_agent: config.user_agent,
                asynchronous: config.asynchronous,
                client: Client::new(),
                pending: JoinCounter::new(),
                callbacks: CallbackRegistry::new(),
            }),
        }
    }

    /// Identity assigned at construction from a process-wide counter.
    pub fn id(&self) -> u32 {
        self.inner.id
    }

    pub fn user_agent(&self) -> &str {
        &self.inner.user_agent
    }

    pub fn is_async(&self) -> bool {
        self.inner.asynchronous
    }

    /// Number of exchanges currently in flight.
    pub fn pending(&self) -> usize {
        self.inner.pending.pending()
    }

    /// Registers a request observer, effective for all subsequent fetches.
    pub fn on_request<F>(&self, callback: F)
    where
        F: Fn(&mut OutboundRequest) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_request(callback);
    }

    /// Registers a response observer, effective for all subsequent fetches.
    pub fn on_response<F>(&self, callback: F)
    where
        F: for<'a> Fn(&'a FetchedResponse) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.inner.callbacks.on_response(callback);
    }

    /// Registers an error observer, effective for all subsequent fetches.
    pub fn on_error<F>(&self, callback: F)
    where
        F: for<'a> Fn(&'a FetchedResponse, &'a HaulError) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.inner.callbacks.on_error(callback);
    }

    /// Schedules a GET fetch.
    pub async fn get(&self, url: &str) -> Result<()> {
        self.scrape(url, Method::GET, RequestBody::None, HeaderMap::new())
            .await
    }

    /// Schedules a POST fetch with form-encoded fields.
    pub async fn post(&self, url: &str, form: &HashMap<String, String>) -> Result<()> {
        self.scrape(url, Method::POST, RequestBody::form(form), HeaderMap::new())
            .await
    }

    /// Builds a request and schedules its exchange.
    ///
    /// URL parse errors surface synchronously even in async mode, before the
    /// counter is touched. In async mode the exchange runs as an independent
    /// task and this returns `Ok(())` immediately; exchange errors are then
    /// observable only through error callbacks. In sync mode the exchange
    /// runs inline and its outcome is returned.
    ///
    /// The counter increment happens here, on the scheduling task, before
    /// control returns: `wait` can never observe a false zero between
    /// "decided to schedule" and "counter incremented".
    pub async fn scrape(
        &self,
        url: &str,
        method: Method,
        body: RequestBody,
        headers: HeaderMap,
    ) -> Result<()> {
        let request = OutboundRequest::build(url, method, body, headers, &self.inner.user_agent)?;

        self.inner.pending.add();
        if self.inner.asynchronous {
            let engine = self.clone();
            tokio::spawn(async move {
                if let Err(error) = engine.perform(request).await {
                    tracing::trace!(engine = engine.id(), "exchange failed: {}", error);
                }
            });
            Ok(())
        } else {
            self.perform(request).await
        }
    }

    /// Blocks until every in-flight exchange, including ones scheduled from
    /// response callbacks while this call is waiting, has completed.
    pub async fn wait(&self) {
        self.inner.pending.wait().await;
    }

    /// Runs one full exchange lifecycle. The counter is decremented when
    /// this returns or unwinds; exactly one of the response or error phases
    /// fires.
    async fn perform(&self, mut request: OutboundRequest) -> Result<()> {
        let _guard = CompletionGuard(Arc::clone(&self.inner));

        self.inner.callbacks.fire_request(&mut request);
        request.apply_header_defaults();

        match self.execute(request).await {
            Ok(response) if response.status < SUCCESS_STATUS_LIMIT => {
                self.inner.callbacks.fire_response(&response).await;
                Ok(())
            }
            Ok(response) => {
                let error = HaulError::Status {
                    status: response.status,
                    reason: status_text(response.status),
                };
                self.inner.callbacks.fire_error(&response, &error).await;
                Err(error)
            }
            Err((request, source)) => {
                let error = HaulError::Transport {
                    url: request.url.to_string(),
                    source,
                };
                let response = FetchedResponse::synthetic(request);
                self.inner.callbacks.fire_error(&response, &error).await;
                Err(error)
            }
        }
    }

    /// Performs the HTTP call, buffering the body. Transport failures hand
    /// the request back so a synthetic response can be built around it.
    async fn execute(
        &self,
        mut request: OutboundRequest,
    ) -> std::result::Result<FetchedResponse, (OutboundRequest, reqwest::Error)> {
        let mut builder = self
            .inner
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = request.body.take_for_send() {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => return Err((request, source)),
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(source) => return Err((request, source)),
        };

        Ok(FetchedResponse {
            status,
            headers,
            body,
            request,
        })
    }
}

/// Canonical reason phrase for a status code; the error message the status
/// classification carries.
fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("unknown status")
        .to_string()
}
