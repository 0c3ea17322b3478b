//! The application boundary: handlers and the `(method, path)` route table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::http::headers::HeaderMap;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, StatusCode};

/// What a handler hands back to the connection.
#[derive(Debug)]
pub enum Reply {
    /// A fully decided response.
    Response(Response),
    /// A `(status, headers, body)` triple, turned into a response by the adapter.
    Parts(StatusCode, HeaderMap, Vec<u8>),
}

impl Reply {
    pub fn into_response(self) -> Response {
        match self {
            Reply::Response(resp) => resp,
            Reply::Parts(status, headers, body) => {
                let mut resp = Response::new();
                resp.status = Some(status);
                resp.headers.merge(&headers);
                resp.set_body(body);
                resp
            }
        }
    }
}

impl From<Response> for Reply {
    fn from(resp: Response) -> Self {
        Reply::Response(resp)
    }
}

/// Per-route application behavior.
///
/// Any `Fn(&Request) -> anyhow::Result<Reply>` closure is a handler. An `Err`
/// is answered with a fixed 500 response by the connection.
pub trait Handler: Send + Sync {
    fn handle(&self, req: &Request) -> anyhow::Result<Reply>;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> anyhow::Result<Reply> + Send + Sync,
{
    fn handle(&self, req: &Request) -> anyhow::Result<Reply> {
        self(req)
    }
}

/// Route table key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub method: Method,
    pub path: String,
}

/// Static route table supplied at startup, read-only while serving.
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<RouteKey, Arc<dyn Handler>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.routes.keys()).finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `(method, path)`, replacing any earlier one.
    pub fn route<H>(mut self, method: Method, path: impl Into<String>, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        let key = RouteKey {
            method,
            path: path.into(),
        };
        self.routes.insert(key, Arc::new(handler));
        self
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Option<Arc<dyn Handler>> {
        let key = RouteKey {
            method: method.clone(),
            path: path.to_string(),
        };
        self.routes.get(&key).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RouteKey> {
        self.routes.keys()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
