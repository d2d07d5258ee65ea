//! HTTP access to the expense backend and the exchange-rate service.
//!
//! `HttpTransport` is the seam the stores depend on; `ApiClient` is the
//! `reqwest` implementation.

pub mod client;
pub mod error;

use async_trait::async_trait;
use serde_json::Value;

pub use client::ApiClient;
pub use error::ApiError;

use crate::outbox::Method;

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// `GET url?query` and parse the JSON body.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, ApiError>;

    /// Send a write with an optional JSON body. An empty response body
    /// yields `Value::Null`.
    async fn send_json(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError>;
}
