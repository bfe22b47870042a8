//! Execute requests and normalize their failures
//!
//! The [`RequestExecutor`] runs a caller supplied asynchronous operation (a thunk) exactly once
//! and converts whatever error it raises into a [`Failure`]. Three calling conventions are
//! provided:
//!
//! - [`execute_with_result`](`RequestExecutor::execute_with_result`) captures every outcome in
//!   the returned `Result`. This is the recommended convention for business logic.
//! - [`execute_void`](`RequestExecutor::execute_void`) for operations without a value, meant to
//!   be propagated with `?`.
//! - [`execute_without_result`](`RequestExecutor::execute_without_result`) for operations
//!   returning a value, meant to be propagated with `?`.
//!
//! In all cases, the only error a caller observes is a [`Failure`] of one of the kinds in
//! [`FailureKind`](`crate::failure::FailureKind`). Errors raised by the transport map to the
//! failure kind of the same name, anything else is classified as
//! [`Unknown`](`crate::failure::FailureKind::Unknown`). See [`classify()`] for details.
//!
//! A panic inside the thunk is caught and reported as an
//! [`Unknown`](`crate::failure::FailureKind::Unknown`) failure as well, no convention unwinds.
//!
//! ```rust,no_run
//! use courier::executor::RequestExecutor;
//! use courier::failure::FailureKind;
//!
//! # tokio_test::block_on(async {
//! let executor = RequestExecutor::default();
//! match executor
//!     .execute_with_result(|| executor.transport().get("https://example.com/health", None))
//!     .await
//! {
//!     Ok(response) => println!("status: {}", response.status()),
//!     Err(failure) if failure.kind() == FailureKind::ConnectionTimeout => {
//!         println!("{}: {}", failure.title(), failure.message())
//!     }
//!     Err(failure) => println!("{failure}"),
//! }
//! # })
//! ```
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, instrument, trace, warn};

use crate::failure::{Failure, FailureKind};
use crate::transport::{HttpTransport, Transport};

mod classify;

pub use classify::*;

/// Runs request thunks and normalizes their failures
///
/// The executor is stateless besides the [`Transport`] handle it is created with, which thunks
/// may use through [`RequestExecutor::transport`]. Clones share the same transport.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
}

impl Default for RequestExecutor {
    /// Create an executor using an [`HttpTransport`] with the default configuration
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized. Use
    /// [`HttpTransport::new`] with [`RequestExecutor::new`] to handle that case as a
    /// [`ConfigError`](`crate::transport::ConfigError`).
    fn default() -> Self {
        Self::new(Arc::new(HttpTransport::default()))
    }
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor").finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Get the transport the executor was created with
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Run the thunk and capture its outcome
    ///
    /// Returns `Ok` with the value produced by the thunk, or `Err` with the classified
    /// failure.
    #[instrument(level = "trace", skip_all)]
    pub async fn execute_with_result<T, E, F, Fut>(&self, thunk: F) -> Result<T, Failure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        run(thunk).await
    }

    /// Run a thunk that produces no value
    ///
    /// Returns `Ok(())` on success. Any error raised by the thunk is returned as a classified
    /// [`Failure`], ready to be propagated with `?`.
    #[instrument(level = "trace", skip_all)]
    pub async fn execute_void<E, F, Fut>(&self, thunk: F) -> Result<(), Failure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Into<anyhow::Error>,
    {
        run(thunk).await
    }

    /// Run a thunk and return its value
    ///
    /// Behaves as [`execute_void`](`RequestExecutor::execute_void`) but returns the value
    /// produced by the thunk on success.
    #[instrument(level = "trace", skip_all)]
    pub async fn execute_without_result<T, E, F, Fut>(&self, thunk: F) -> Result<T, Failure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        run(thunk).await
    }
}

/// Invoke the thunk once, reporting a panic as an unknown failure
async fn run<T, E, F, Fut>(thunk: F) -> Result<T, Failure>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<anyhow::Error>,
{
    // call the thunk within the future so panics before the first await are caught too
    let outcome = AssertUnwindSafe(async move { thunk().await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(res) => settle(res),
        Err(panic) => {
            error!(kind = %FailureKind::Unknown, panic = panic_message(&*panic), "request panicked");
            Err(Failure::new(FailureKind::Unknown))
        }
    }
}

fn settle<T, E: Into<anyhow::Error>>(outcome: Result<T, E>) -> Result<T, Failure> {
    match outcome {
        Ok(value) => {
            trace!("request succeeded");
            Ok(value)
        }
        Err(err) => {
            let err: anyhow::Error = err.into();
            let failure = classify(&err);
            let detail = format!("{err:#}");
            if failure.kind() == FailureKind::Unknown {
                error!(kind = %failure.kind(), error = %detail, "request failed");
            } else {
                warn!(kind = %failure.kind(), error = %detail, "request failed");
            }
            Err(failure)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}
