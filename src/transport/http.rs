use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::Abortable;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{instrument, trace};
use url::Url;

use super::{Method, Request, Response, Transport, TransportError, TransportErrorKind};

/// Configuration for [`HttpTransport`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Base URL for request paths. When missing, request paths must be absolute URLs.
    base_url: Option<String>,
    /// Headers sent with every request
    headers: HashMap<String, String>,
    /// Maximum time to establish a connection
    connect_timeout_ms: Option<u64>,
    /// Maximum time from dispatching the request until the response head arrives
    send_timeout_ms: Option<u64>,
    /// Maximum time to download the response body
    receive_timeout_ms: Option<u64>,
    /// Fail with a bad response on non-2xx statuses. Defaults to true
    validate_status: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            headers: HashMap::new(),
            connect_timeout_ms: None,
            send_timeout_ms: None,
            receive_timeout_ms: None,
            validate_status: true,
        }
    }
}

impl HttpConfig {
    pub fn base_url(self, base_url: impl Into<String>) -> Self {
        let mut config = self;
        config.base_url = Some(base_url.into());
        config
    }

    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut config = self;
        config.headers.insert(name.into(), value.into());
        config
    }

    pub fn connect_timeout_ms(self, connect_timeout_ms: u64) -> Self {
        let mut config = self;
        config.connect_timeout_ms = Some(connect_timeout_ms);
        config
    }

    pub fn send_timeout_ms(self, send_timeout_ms: u64) -> Self {
        let mut config = self;
        config.send_timeout_ms = Some(send_timeout_ms);
        config
    }

    pub fn receive_timeout_ms(self, receive_timeout_ms: u64) -> Self {
        let mut config = self;
        config.receive_timeout_ms = Some(receive_timeout_ms);
        config
    }

    pub fn validate_status(self, validate_status: bool) -> Self {
        let mut config = self;
        config.validate_status = validate_status;
        config
    }
}

/// The configuration could not be turned into a transport
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to create http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// A [`Transport`] backed by a [reqwest](https://docs.rs/reqwest) client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Option<Url>,
    send_timeout: Option<Duration>,
    receive_timeout: Option<Duration>,
    validate_status: bool,
}

impl Default for HttpTransport {
    /// Create a transport without base url, timeouts or default headers
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized. [`HttpTransport::new`] reports that
    /// case as [`ConfigError::Client`] instead.
    fn default() -> Self {
        Self {
            client: Client::new(),
            base_url: None,
            send_timeout: None,
            receive_timeout: None,
            validate_status: true,
        }
    }
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        for (name, value) in config.headers.iter() {
            let invalid = |reason: String| ConfigError::InvalidHeader {
                name: name.clone(),
                reason,
            };
            let key = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            headers.insert(key, value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(ms) = config.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }

        let base_url = config.base_url.as_deref().map(parse_base_url).transpose()?;

        Ok(Self {
            client: builder.build()?,
            base_url,
            send_timeout: config.send_timeout_ms.map(Duration::from_millis),
            receive_timeout: config.receive_timeout_ms.map(Duration::from_millis),
            validate_status: config.validate_status,
        })
    }

    /// Resolve the request path into the URL to call
    fn url(&self, path: &str) -> Result<Url, TransportError> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }

        let Some(base) = self.base_url.as_ref() else {
            return Err(TransportError::new(TransportErrorKind::Unknown)
                .with_source(format!("relative path '{path}' requires a base url")));
        };

        base.join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::new(TransportErrorKind::Unknown).with_source(e))
    }

    async fn exchange(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
        let pending = builder.send();
        let response = match self.send_timeout {
            Some(limit) => timeout(limit, pending)
                .await
                .map_err(|_| TransportError::new(TransportErrorKind::SendTimeout))?,
            None => pending.await,
        }?;

        let status = response.status();
        trace!(status = status.as_u16(), "response received");
        if self.validate_status && !status.is_success() {
            return Err(TransportError::new(TransportErrorKind::BadResponse).with_status(status.as_u16()));
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect::<HashMap<_, _>>();

        let reading = response.text();
        let body = match self.receive_timeout {
            Some(limit) => timeout(limit, reading)
                .await
                .map_err(|_| TransportError::new(TransportErrorKind::ReceiveTimeout))?,
            None => reading.await,
        }?;

        Ok(Response::new(status.as_u16(), body).with_headers(headers))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(level = "trace", skip_all, fields(method = %request.method(), path = request.path()), err(level = "trace"))]
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let mut request = request;
        let abort = request.take_abort();

        let url = self.url(request.path())?;
        let mut builder = self.client.request(request.method().into(), url);
        if !request.query_params().is_empty() {
            builder = builder.query(request.query_params());
        }
        if let Some(body) = request.json_body() {
            builder = builder.json(body);
        }

        match abort {
            Some(registration) => Abortable::new(self.exchange(builder), registration)
                .await
                .map_err(|_| TransportError::new(TransportErrorKind::Cancelled))?,
            None => self.exchange(builder).await,
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
            Method::Head => reqwest::Method::HEAD,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = error_kind(ErrorFlags {
            timeout: err.is_timeout(),
            connect: err.is_connect(),
            certificate: mentions_certificate(&err),
            bad_response: err.is_status() || err.is_decode(),
        });

        let status = err.status().map(|s| s.as_u16());
        let mut transport_err = TransportError::new(kind).with_source(err);
        if let Some(status) = status {
            transport_err = transport_err.with_status(status);
        }
        transport_err
    }
}

/// What a `reqwest::Error` reports about itself
#[derive(Debug, Default, Clone, Copy)]
struct ErrorFlags {
    timeout: bool,
    connect: bool,
    certificate: bool,
    bad_response: bool,
}

fn error_kind(flags: ErrorFlags) -> TransportErrorKind {
    if flags.timeout && flags.connect {
        TransportErrorKind::ConnectionTimeout
    } else if flags.timeout {
        TransportErrorKind::ReceiveTimeout
    } else if flags.certificate {
        TransportErrorKind::BadCertificate
    } else if flags.connect {
        TransportErrorKind::ConnectionError
    } else if flags.bad_response {
        TransportErrorKind::BadResponse
    } else {
        TransportErrorKind::Unknown
    }
}

// neither reqwest nor hyper expose a dedicated TLS error kind
fn mentions_certificate(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.to_string().to_lowercase().contains("certificate") {
            return true;
        }
        current = e.source();
    }
    false
}

fn parse_base_url(url: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(url)?;
    // make sure paths are joined below the base path instead of replacing its last segment
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use futures::future::AbortHandle;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::new(HttpConfig::default().base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn it_performs_get_requests_with_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-total", "10")
                    .set_body_json(json!([{"id": 1}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = transport(&server)
            .get("/users", Some(vec![("page".into(), "2".into())]))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.header("X-Total"), Some("10"));
        assert_eq!(response.json::<serde_json::Value>().unwrap(), json!([{"id": 1}]));
    }

    #[tokio::test]
    async fn it_sends_json_bodies() {
        let server = MockServer::start().await;
        for verb in ["POST", "PUT", "PATCH", "DELETE"] {
            Mock::given(method(verb))
                .and(path("/items/1"))
                .and(body_json(json!({"name": "one"})))
                .respond_with(ResponseTemplate::new(204))
                .expect(1)
                .mount(&server)
                .await;
        }

        let transport = transport(&server);
        let body = || Some(json!({"name": "one"}));
        assert_eq!(transport.post("items/1", body(), None).await.unwrap().status(), 204);
        assert_eq!(transport.put("items/1", body(), None).await.unwrap().status(), 204);
        assert_eq!(transport.patch("items/1", body(), None).await.unwrap().status(), 204);
        assert_eq!(transport.delete("items/1", body(), None).await.unwrap().status(), 204);
    }

    #[tokio::test]
    async fn it_performs_head_requests() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let response = transport(&server).head("/health", None).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text(), "");
    }

    #[tokio::test]
    async fn it_sends_default_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(
            HttpConfig::default()
                .base_url(server.uri())
                .header("Authorization", "Bearer token"),
        )
        .unwrap();
        assert!(transport.get("/", None).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn it_joins_paths_below_the_base_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(
            HttpConfig::default().base_url(format!("{}/api/v1", server.uri())),
        )
        .unwrap();
        transport.get("users", None).await.unwrap();
        transport.get("/users", None).await.unwrap();
    }

    #[tokio::test]
    async fn it_fails_with_bad_response_on_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = transport(&server).get("/", None).await.unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::BadResponse);
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn it_returns_error_statuses_when_validation_is_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(
            HttpConfig::default()
                .base_url(server.uri())
                .validate_status(false),
        )
        .unwrap();

        let response = transport.get("/", None).await.unwrap();
        assert_eq!(response.status(), 404);
        assert!(!response.is_success());
        assert_eq!(response.text(), "missing");
    }

    #[tokio::test]
    async fn it_fails_with_send_timeout_on_slow_servers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(
            HttpConfig::default()
                .base_url(server.uri())
                .send_timeout_ms(50),
        )
        .unwrap();

        let err = transport.get("/", None).await.unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::SendTimeout);
    }

    #[tokio::test]
    async fn it_fails_with_receive_timeout_on_stalled_bodies() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\npartial")
                .await
                .unwrap();
            socket.flush().await.unwrap();
            // keep the connection open without finishing the body
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let transport = HttpTransport::new(
            HttpConfig::default()
                .base_url(format!("http://{addr}"))
                .receive_timeout_ms(50),
        )
        .unwrap();

        let err = transport.get("/", None).await.unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::ReceiveTimeout);
    }

    #[test]
    fn it_maps_reqwest_error_flags_to_transport_kinds() {
        let flags = ErrorFlags::default;
        let cases = [
            (
                ErrorFlags {
                    timeout: true,
                    connect: true,
                    ..flags()
                },
                TransportErrorKind::ConnectionTimeout,
            ),
            (
                ErrorFlags {
                    timeout: true,
                    ..flags()
                },
                TransportErrorKind::ReceiveTimeout,
            ),
            (
                ErrorFlags {
                    connect: true,
                    certificate: true,
                    ..flags()
                },
                TransportErrorKind::BadCertificate,
            ),
            (
                ErrorFlags {
                    connect: true,
                    ..flags()
                },
                TransportErrorKind::ConnectionError,
            ),
            (
                ErrorFlags {
                    bad_response: true,
                    ..flags()
                },
                TransportErrorKind::BadResponse,
            ),
            (flags(), TransportErrorKind::Unknown),
        ];

        for (flags, kind) in cases {
            assert_eq!(error_kind(flags), kind, "{flags:?}");
        }
    }

    #[derive(Debug)]
    struct Handshake(io::Error);

    impl std::fmt::Display for Handshake {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "tls handshake failed")
        }
    }

    impl std::error::Error for Handshake {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn it_finds_certificate_errors_in_the_cause_chain() {
        let err = Handshake(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid peer certificate: UnknownIssuer",
        ));
        assert!(mentions_certificate(&err));

        let err = Handshake(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
        assert!(!mentions_certificate(&err));
    }

    #[tokio::test]
    async fn it_fails_with_connection_error_on_closed_ports() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let transport = HttpTransport::new(
            HttpConfig::default().base_url(format!("http://127.0.0.1:{port}")),
        )
        .unwrap();

        let err = transport.get("/", None).await.unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::ConnectionError);
    }

    #[tokio::test]
    async fn it_fails_with_cancelled_when_aborted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let (handle, registration) = AbortHandle::new_pair();
        let transport = transport(&server);
        let request = Request::new(Method::Get, "/slow").abort_on(registration);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.abort();
        });

        let err = transport.send(request).await.unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn it_rejects_relative_paths_without_base_url() {
        let err = HttpTransport::default().get("/users", None).await.unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::Unknown);
    }

    #[tokio::test]
    async fn it_builds_the_default_transport_fallibly() {
        let transport = HttpTransport::new(HttpConfig::default()).unwrap();
        let err = transport.get("/users", None).await.unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::Unknown);
    }

    #[test]
    fn it_rejects_invalid_configuration() {
        let err = HttpTransport::new(HttpConfig::default().base_url("not a url")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));

        let err = HttpTransport::new(HttpConfig::default().header("bad header", "x")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader { name, .. } if name == "bad header"));
    }

    #[test]
    fn it_deserializes_configuration() {
        let config: HttpConfig = serde_json::from_value(json!({
            "base_url": "http://localhost:8080",
            "send_timeout_ms": 1000
        }))
        .unwrap();

        assert_eq!(
            config,
            HttpConfig::default()
                .base_url("http://localhost:8080")
                .send_timeout_ms(1000)
        );
    }
}
