//! The transport seam used by the request executor
//!
//! A [`Transport`] performs a single network call and either returns a [`Response`] or fails
//! with a [`TransportError`]. The [request executor](`crate::executor::RequestExecutor`) never
//! talks to the network itself: it only classifies the errors a transport raises.
//!
//! Implementors only need to provide [`Transport::send`], the per-verb operations are derived
//! from it.
//!
//! ```rust,no_run
//! use courier::transport::{HttpConfig, HttpTransport, Transport};
//!
//! # tokio_test::block_on(async {
//! let transport = HttpTransport::new(HttpConfig::default().base_url("https://example.com/api")).unwrap();
//! let response = transport
//!     .get("/users", Some(vec![("page".into(), "2".into())]))
//!     .await
//!     .unwrap();
//! assert!(response.is_success());
//! # })
//! ```
use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use futures::future::AbortRegistration;
use serde::de::DeserializeOwned;
use serde_json::Value;

mod error;
mod http;

pub use error::*;
pub use http::*;

/// Query parameters, sent in the given order
pub type Query = Vec<(String, String)>;

/// HTTP methods supported by a transport
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
}

impl Method {
    pub(crate) fn as_str(&self) -> &'static str {
        use Method::*;
        match *self {
            Get => "GET",
            Post => "POST",
            Put => "PUT",
            Delete => "DELETE",
            Patch => "PATCH",
            Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request to be performed by a [`Transport`]
pub struct Request {
    method: Method,
    path: String,
    query: Query,
    body: Option<Value>,
    abort: Option<AbortRegistration>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            abort: None,
        }
    }

    /// Append query parameters to the request
    pub fn query<K, V, I>(self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut req = self;
        req.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        req
    }

    /// Set a JSON body for the request
    pub fn body(self, body: Value) -> Self {
        let mut req = self;
        req.body = Some(body);
        req
    }

    /// Cancel the request when the [AbortHandle](`futures::future::AbortHandle`) paired with
    /// the registration is aborted
    ///
    /// A cancelled request fails with [`TransportErrorKind::Cancelled`].
    pub fn abort_on(self, registration: AbortRegistration) -> Self {
        let mut req = self;
        req.abort = Some(registration);
        req
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &Query {
        &self.query
    }

    pub fn json_body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub(crate) fn take_abort(&mut self) -> Option<AbortRegistration> {
        self.abort.take()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("abortable", &self.abort.is_some())
            .finish()
    }
}

/// A response returned by a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_headers(self, headers: HashMap<String, String>) -> Self {
        let mut res = self;
        res.headers = headers;
        res
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a response header, header names are case insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Deserialize the response body from JSON
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// A transport able to perform HTTP requests
///
/// Errors must be reported as a [`TransportError`]. Any other failure surfacing from code
/// using the transport is classified as unknown by the executor.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request
    async fn send(&self, request: Request) -> Result<Response, TransportError>;

    async fn get(&self, path: &str, query: Option<Query>) -> Result<Response, TransportError> {
        self.send(Request::new(Method::Get, path).query(query.unwrap_or_default()))
            .await
    }

    async fn post(
        &self,
        path: &str,
        body: Option<Value>,
        query: Option<Query>,
    ) -> Result<Response, TransportError> {
        self.send(with_body(Method::Post, path, body, query)).await
    }

    async fn put(
        &self,
        path: &str,
        body: Option<Value>,
        query: Option<Query>,
    ) -> Result<Response, TransportError> {
        self.send(with_body(Method::Put, path, body, query)).await
    }

    async fn delete(
        &self,
        path: &str,
        body: Option<Value>,
        query: Option<Query>,
    ) -> Result<Response, TransportError> {
        self.send(with_body(Method::Delete, path, body, query))
            .await
    }

    async fn patch(
        &self,
        path: &str,
        body: Option<Value>,
        query: Option<Query>,
    ) -> Result<Response, TransportError> {
        self.send(with_body(Method::Patch, path, body, query))
            .await
    }

    async fn head(&self, path: &str, query: Option<Query>) -> Result<Response, TransportError> {
        self.send(Request::new(Method::Head, path).query(query.unwrap_or_default()))
            .await
    }
}

fn with_body(method: Method, path: &str, body: Option<Value>, query: Option<Query>) -> Request {
    let req = Request::new(method, path).query(query.unwrap_or_default());
    match body {
        Some(body) => req.body(body),
        None => req,
    }
}
