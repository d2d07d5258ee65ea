//! Scripted HTTP transport for unit and integration tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{ApiError, HttpTransport};
use crate::outbox::Method;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Answers requests from a queue of canned results, in order. An empty
/// queue answers with a server error.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value, ApiError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_ok(&self, value: Value) {
        self.responses.lock().unwrap().push_back(Ok(value));
    }

    pub fn respond_err(&self, err: ApiError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn answer(&self, request: RecordedRequest) -> Result<Value, ApiError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::ServerError("no scripted response".into())))
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        self.answer(RecordedRequest {
            method: "GET".into(),
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body: None,
        })
    }

    async fn send_json(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        self.answer(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            query: Vec::new(),
            body: body.cloned(),
        })
    }
}
