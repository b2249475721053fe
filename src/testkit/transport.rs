//! Scripted [`ArcherTransport`] for testing.
//!
//! Routes are matched on method, path, and a subset of query parameters.
//! Each route either replays a queue of scripted outcomes (the last one
//! repeats once the queue drains) or computes its outcome from the request
//! with a handler closure. Unmatched requests answer 404 with a null body.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::app::client::{ArcherRequest, ArcherResponse, ArcherTransport, Method, TransportFactory};
use crate::app::models::Connection;
use crate::errors::{AuthResult, TransportError, TransportResult};

/// Outcome of one scripted request.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Respond with a status and body.
    Reply(ArcherResponse),
    /// Sleep, then respond.
    Delayed(Duration, ArcherResponse),
    /// Fail with a transport timeout.
    Timeout,
    /// Fail with a connection error.
    Network(String),
}

impl Scripted {
    pub fn ok(body: Value) -> Self {
        Self::Reply(ArcherResponse::new(200, body))
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self::Reply(ArcherResponse::new(status, body))
    }
}

type Handler = Arc<dyn Fn(&ArcherRequest) -> Scripted + Send + Sync>;

enum Outcomes {
    Queue(VecDeque<Scripted>),
    Handler(Handler),
}

struct Route {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    outcomes: Outcomes,
}

impl Route {
    fn matches(&self, request: &ArcherRequest) -> bool {
        self.method == request.method
            && self.path == request.path
            && self
                .query
                .iter()
                .all(|(k, v)| request.query_value(k) == Some(v.as_str()))
    }

    fn next(&mut self, request: &ArcherRequest) -> Scripted {
        match &mut self.outcomes {
            Outcomes::Queue(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Scripted::status(404, Value::Null)),
            Outcomes::Queue(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Scripted::status(404, Value::Null)),
            Outcomes::Handler(handler) => handler(request),
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

/// A transport that answers from a script and records every request.
pub struct ScriptedTransport {
    base_url: Url,
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ArcherRequest>>,
    calls: Arc<AtomicU32>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            base_url: Url::parse(super::fixtures::BASE_URL).expect("fixture base URL is valid"),
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Append an outcome to the route for `method path` with the given query pairs.
    ///
    /// Routes registered later take precedence over earlier ones that also match.
    pub fn push(&self, method: Method, path: &str, query: &[(&str, &str)], outcome: Scripted) {
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let existing = routes.iter().position(|route| {
            route.method == method
                && route.path == path
                && route.query == query
                && matches!(route.outcomes, Outcomes::Queue(_))
        });

        match existing {
            Some(index) => {
                if let Outcomes::Queue(queue) = &mut routes[index].outcomes {
                    queue.push_back(outcome);
                }
            }
            None => routes.push(Route {
                method,
                path: path.to_string(),
                query,
                outcomes: Outcomes::Queue(VecDeque::from([outcome])),
            }),
        }
    }

    /// Answer `GET path` with 200 and `body`.
    pub fn get_json(&self, path: &str, body: Value) -> &Self {
        self.push(Method::Get, path, &[], Scripted::ok(body));
        self
    }

    /// Answer `GET path` (with matching query pairs) with `outcome`.
    pub fn get_with_query(&self, path: &str, query: &[(&str, &str)], outcome: Scripted) -> &Self {
        self.push(Method::Get, path, query, outcome);
        self
    }

    /// Answer `POST path` with `outcome`.
    pub fn post(&self, path: &str, outcome: Scripted) -> &Self {
        self.push(Method::Post, path, &[], outcome);
        self
    }

    /// Compute the outcome of `method path` from each request.
    pub fn handle<F>(&self, method: Method, path: &str, handler: F) -> &Self
    where
        F: Fn(&ArcherRequest) -> Scripted + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Route {
                method,
                path: path.to_string(),
                query: Vec::new(),
                outcomes: Outcomes::Handler(Arc::new(handler)),
            });
        self
    }

    /// Drop every route.
    pub fn clear_routes(&self) {
        self.routes.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<ArcherRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of requests executed against `path`.
    pub fn count_for(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|request| request.path == path)
            .count()
    }

    /// Number of requests whose path starts with `prefix`.
    pub fn count_prefixed(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|request| request.path.starts_with(prefix))
            .count()
    }

    /// Total number of requests executed.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared counter for asserting call counts after the transport is moved.
    pub fn calls(&self) -> Arc<AtomicU32> {
        self.calls.clone()
    }

    fn next_outcome(&self, request: &ArcherRequest) -> Scripted {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes
            .iter_mut()
            .rev()
            .find(|route| route.matches(request))
            .map(|route| route.next(request))
            .unwrap_or_else(|| Scripted::status(404, Value::Null))
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("base_url", &self.base_url.as_str())
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl ArcherTransport for ScriptedTransport {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn execute(&self, request: ArcherRequest) -> TransportResult<ArcherResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        match self.next_outcome(&request) {
            Scripted::Reply(response) => Ok(response),
            Scripted::Delayed(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Scripted::Timeout => Err(TransportError::Timeout { seconds: 0 }),
            Scripted::Network(reason) => Err(TransportError::Connection { reason }),
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedFactory
// ---------------------------------------------------------------------------

/// Factory handing every connection the same scripted transport.
#[derive(Debug, Clone)]
pub struct ScriptedFactory {
    transport: Arc<ScriptedTransport>,
    created: Arc<AtomicU32>,
}

impl ScriptedFactory {
    pub fn new(transport: Arc<ScriptedTransport>) -> Self {
        Self {
            transport,
            created: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Number of transports created, i.e. pooled clients built.
    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

impl TransportFactory for ScriptedFactory {
    fn create(&self, _connection: &Connection) -> AuthResult<Arc<dyn ArcherTransport>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.transport.clone())
    }
}
