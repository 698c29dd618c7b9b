//! REST API server and submission sinks for Podstudio.
//!
//! The server stores registrations, podcast settings and episodes in memory
//! and validates every body against the same schemas the form wizards use.
//! Two [`SubmissionSink`](podstudio_forms::SubmissionSink) implementations
//! connect a wizard to it:
//!
//! - [`HttpSink`] talks to a running server over HTTP
//! - [`StoreSink`] writes into a [`Store`] in the same process

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod sink;
pub mod store;

pub use client::{HttpSink, HttpSinkConfig};
pub use config::{ConfigLoadError, ServerConfig};
pub use error::{ApiError, ErrorBody};
pub use metrics::ApiMetrics;
pub use routes::{build_app, create_router, AppState, ListParams};
pub use sink::StoreSink;
pub use store::{ListQuery, Record, ResourceKind, Store, StoreError};
