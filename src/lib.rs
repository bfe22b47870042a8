#![cfg_attr(docsrs, feature(doc_cfg))]
//! courier runs HTTP requests and normalizes their failures into a small, closed set of
//! presentable errors.
//!
//! Transport libraries report failures in many shapes. courier collapses all of them into a
//! [Failure](`failure::Failure`), made of one of eight [kinds](`failure::FailureKind`) and a
//! title/message pair that can be shown to a user as is.
//!
//! # Request executor
//!
//! A [RequestExecutor](`executor::RequestExecutor`) runs a caller supplied asynchronous
//! operation exactly once and classifies whatever error it raises. It does not retry, time out
//! or otherwise change the operation, it only changes how a failure is represented.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use courier::executor::RequestExecutor;
//! use courier::failure::Failure;
//! use courier::transport::{HttpConfig, HttpTransport};
//!
//! # tokio_test::block_on(async {
//! let transport = HttpTransport::new(
//!     HttpConfig::default()
//!         .base_url("https://example.com/api")
//!         .connect_timeout_ms(5_000),
//! )
//! .unwrap();
//! let executor = RequestExecutor::new(Arc::new(transport));
//!
//! // the result convention returns every outcome as a value
//! match executor
//!     .execute_with_result(|| executor.transport().get("/users", None))
//!     .await
//! {
//!     Ok(response) => println!("{}", response.text()),
//!     Err(failure) => println!("{}: {}", failure.title(), failure.message()),
//! }
//!
//! // the other conventions are meant to be propagated with `?`
//! async fn remove_user(executor: &RequestExecutor, id: u32) -> Result<(), Failure> {
//!     executor
//!         .execute_void(|| async {
//!             executor.transport().delete(&format!("/users/{id}"), None, None).await?;
//!             Ok::<_, courier::transport::TransportError>(())
//!         })
//!         .await
//! }
//! # })
//! ```
//!
//! # Failure kinds
//!
//! | Kind | Title | Message |
//! |---|---|---|
//! | `ConnectionTimeout` | Connection Timeout | Connection timed out. |
//! | `SendTimeout` | Send Timeout | Send request timed out. |
//! | `ReceiveTimeout` | Receive Timeout | Receive response timed out. |
//! | `BadCertificate` | Bad Certificate | Bad certificate received. |
//! | `BadResponse` | Bad Response | Bad response received from server. |
//! | `Cancelled` | Request Cancelled | Request was cancelled. |
//! | `ConnectionError` | Connection Error | Connection error occurred. |
//! | `Unknown` | Unknown Error | Unknown error occurred. |
//!
//! Errors raised by a [Transport](`transport::Transport`) map to the kind of the same name. Any
//! other error, and any panic inside the operation, is reported as `Unknown`. The original error
//! is never carried by the failure.
//!
//! # Transport
//!
//! The executor is agnostic of how requests are made. The [transport](`transport`) module
//! defines the [Transport](`transport::Transport`) trait and a default implementation on top of
//! [reqwest](https://docs.rs/reqwest), [HttpTransport](`transport::HttpTransport`). A transport is
//! always given to the executor on creation, there is no shared global client.
//!
//! # Observability
//!
//! courier is instrumented with the [tracing](https://crates.io/crates/tracing) crate. Every
//! failure is reported when classified, with the original error as a field.
//!
//! Key log levels:
//! - **WARN**: Transport failures
//! - **ERROR**: Failures classified as unknown, panics
//! - **TRACE**: Successful requests, transport operation
//!
//! With the `logging` feature, [logging::init](`logging::init`) installs a subscriber printing to
//! stderr, filtered with `RUST_LOG`.

pub mod executor;
pub mod failure;
pub mod transport;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;
