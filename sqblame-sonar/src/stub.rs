//! Recording transport for tests

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::transport::{HttpResponse, Transport};
use crate::Result;

type Handler = dyn Fn(&str, &BTreeMap<String, String>) -> Result<HttpResponse> + Send + Sync;

/// One recorded request
#[derive(Debug, Clone)]
pub struct Call {
    pub path: String,
    pub params: BTreeMap<String, String>,
}

/// Shared view of the requests a stub received
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn all(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.all().into_iter().map(|c| c.path).collect()
    }

    pub fn to(&self, path: &str) -> Vec<Call> {
        self.all().into_iter().filter(|c| c.path == path).collect()
    }
}

/// Transport answering from a closure and recording every request
pub struct StubTransport {
    handler: Box<Handler>,
    calls: CallLog,
    delay: Option<Duration>,
}

impl StubTransport {
    pub fn new<F>(handler: F) -> (Self, CallLog)
    where
        F: Fn(&str, &BTreeMap<String, String>) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        let calls = CallLog::default();
        let stub = Self {
            handler: Box::new(handler),
            calls: calls.clone(),
            delay: None,
        };
        (stub, calls)
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<HttpResponse> {
        let params: BTreeMap<String, String> = query.iter().cloned().collect();
        self.calls.0.lock().unwrap().push(Call {
            path: path.to_string(),
            params: params.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        (self.handler)(path, &params)
    }
}

/// 200 response with a JSON body
pub fn ok_json(value: Value) -> Result<HttpResponse> {
    Ok(HttpResponse::new(200, value.to_string()))
}

/// An issue search page reporting `total` in `paging`
pub fn issue_page(issues: Vec<Value>, total: u64) -> Result<HttpResponse> {
    ok_json(json!({
        "issues": issues,
        "paging": {"pageIndex": 1, "pageSize": 500, "total": total}
    }))
}

/// A minimal issue record
pub fn issue(key: &str, component: &str, line: Option<u32>) -> Value {
    let mut value = json!({"key": key, "component": component, "severity": "MAJOR", "type": "BUG"});
    if let Some(line) = line {
        value["line"] = json!(line);
    }
    value
}

/// Parameter value as an integer
pub fn int_param(params: &BTreeMap<String, String>, key: &str) -> u32 {
    params
        .get(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}
