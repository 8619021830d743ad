// In-memory upstream used by the tool and dispatcher tests

use jellyseerr_client::{ClientError, ClientResult, HttpMethod, QueryParams, UpstreamApi};
use serde_json::Value;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub params: Option<QueryParams>,
    pub body: Option<Value>,
}

enum Reply {
    Json(Value),
    Status(u16, String),
}

/// Records every call and answers with a canned reply.
pub(crate) struct RecordingUpstream {
    calls: Mutex<Vec<RecordedCall>>,
    reply: Reply,
}

impl RecordingUpstream {
    pub fn replying(payload: Value) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reply: Reply::Json(payload),
        }
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reply: Reply::Status(status, body.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl UpstreamApi for RecordingUpstream {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&QueryParams>,
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            params: params.cloned(),
            body: body.cloned(),
        });

        match &self.reply {
            Reply::Json(payload) => Ok(payload.clone()),
            Reply::Status(status, body) => Err(ClientError::Api {
                status: *status,
                method,
                url: format!("http://test.local/api/v1/{}", path.trim_start_matches('/')),
                body: body.clone(),
            }),
        }
    }
}
