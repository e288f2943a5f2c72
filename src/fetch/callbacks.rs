//! Callback registry for the fetch pipeline
//!
//! Holds the ordered observer lists for the three callback phases. Lists are
//! mutated under a write lock and dispatched from a cloned snapshot, so
//! callbacks run without the lock held and registration from another task
//! cannot deadlock a dispatch in progress.
//!
//! A panic inside a callback is deliberately not caught here: it propagates
//! to the engine's exchange so orchestration bugs surface loudly instead of
//! silently dropping crawl branches.

use crate::fetch::engine::FetchedResponse;
use crate::fetch::request::OutboundRequest;
use crate::HaulError;
use futures::future::BoxFuture;
use std::sync::{Arc, RwLock};

/// Observer invoked with the built request before the exchange.
///
/// This is the one deliberate mutation point: callbacks may adjust headers on
/// the request before it is sent.
pub type RequestCallback = Arc<dyn Fn(&mut OutboundRequest) + Send + Sync>;

/// Observer invoked with a successful response.
///
/// Asynchronous so it can schedule further fetches through the engine.
pub type ResponseCallback =
    Arc<dyn for<'a> Fn(&'a FetchedResponse) -> BoxFuture<'a, ()> + Send + Sync>;

/// Observer invoked with the (possibly synthetic) response and the error.
pub type ErrorCallback =
    Arc<dyn for<'a> Fn(&'a FetchedResponse, &'a HaulError) -> BoxFuture<'a, ()> + Send + Sync>;

#[derive(Default)]
pub struct CallbackRegistry {
    request: RwLock<Vec<RequestCallback>>,
    response: RwLock<Vec<ResponseCallback>>,
    error: RwLock<Vec<ErrorCallback>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request<F>(&self, callback: F)
    where
        F: Fn(&mut OutboundRequest) + Send + Sync + 'static,
    {
        self.request.write().unwrap().push(Arc::new(callback));
    }

    pub fn on_response<F>(&self, callback: F)
    where
        F: for<'a> Fn(&'a FetchedResponse) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.response.write().unwrap().push(Arc::new(callback));
    }

    pub fn on_error<F>(&self, callback: F)
    where
        F: for<'a> Fn(&'a FetchedResponse, &'a HaulError) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.error.write().unwrap().push(Arc::new(callback));
    }

    /// Dispatches request observers in registration order.
    pub fn fire_request(&self, request: &mut OutboundRequest) {
        let snapshot: Vec<RequestCallback> = self.request.read().unwrap().clone();
        for callback in snapshot {
            callback(request);
        }
    }

    /// Dispatches response observers in registration order.
    pub async fn fire_response(&self, response: &FetchedResponse) {
        let snapshot: Vec<ResponseCallback> = self.response.read().unwrap().clone();
        for callback in snapshot {
            callback(response).await;
        }
    }

    /// Dispatches error observers in registration order.
    pub async fn fire_error(&self, response: &FetchedResponse, error: &HaulError) {
        let snapshot: Vec<ErrorCallback> = self.error.read().unwrap().clone();
        for callback in snapshot {
            callback(response, error).await;
        }
    }
}
