use std::future::Future;

use serde::Serialize;
use tracing::{debug, warn};

use crate::credential::CredentialStore;
use crate::error::BoardError;

pub const UNAUTHORIZED: u16 = 401;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Fully resolved request handed to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs the actual I/O. An `Err` means no response was received.
pub trait HttpBackend {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, String>>;
}

/// A request relative to the API root, before hooks run.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Anonymous requests never trigger credential renewal.
    pub anonymous: bool,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            anonymous: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, BoardError> {
        let value = serde_json::to_value(body)
            .map_err(|err| BoardError::Validation(format!("unserializable request body: {err}")))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

/// Result of one trip through the transport hooks.
#[derive(Debug, Clone, PartialEq)]
pub enum Exchange {
    Completed(HttpResponse),
    Unauthorized(HttpResponse),
}

pub struct Transport<B, S> {
    backend: B,
    credentials: S,
    api_root: String,
}

impl<B, S> Transport<B, S>
where
    B: HttpBackend,
    S: CredentialStore,
{
    pub fn new(backend: B, credentials: S, api_root: impl Into<String>) -> Self {
        Self {
            backend,
            credentials,
            api_root: api_root.into(),
        }
    }

    pub fn credentials(&self) -> &S {
        &self.credentials
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn send(&self, request: &ApiRequest) -> Result<Exchange, BoardError> {
        let prepared = self.prepare(request)?;
        debug!(method = request.method.as_str(), path = %request.path, "sending request");

        let response = self.backend.execute(prepared).await.map_err(|err| {
            warn!(method = request.method.as_str(), path = %request.path, error = %err, "request failed without response");
            BoardError::Transport(err)
        })?;

        debug!(path = %request.path, status = response.status, "received response");
        if response.status == UNAUTHORIZED {
            return Ok(Exchange::Unauthorized(response));
        }
        Ok(Exchange::Completed(response))
    }

    fn prepare(&self, request: &ApiRequest) -> Result<HttpRequest, BoardError> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(token) = self.credentials.get() {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        let body = match request.body.as_ref() {
            Some(value) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                Some(serde_json::to_string(value).map_err(|err| {
                    BoardError::Validation(format!("unserializable request body: {err}"))
                })?)
            }
            None => None,
        };

        Ok(HttpRequest {
            method: request.method,
            url: format!("{}{}", self.api_root, request.path),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::credential::MemoryCredentialStore;

    struct EchoBackend {
        status: u16,
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl HttpBackend for EchoBackend {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String> {
            self.seen.borrow_mut().push(request);
            Ok(HttpResponse::new(self.status, "{}"))
        }
    }

    fn transport(status: u16, token: Option<&str>) -> Transport<EchoBackend, MemoryCredentialStore> {
        let store = match token {
            Some(token) => MemoryCredentialStore::with_token(token),
            None => MemoryCredentialStore::new(),
        };
        Transport::new(
            EchoBackend {
                status,
                seen: RefCell::new(vec![]),
            },
            store,
            "http://localhost:8080/api/v1",
        )
    }

    #[tokio::test]
    async fn pre_hook_attaches_bearer_and_json_body() {
        let transport = transport(200, Some("tok"));
        let request = ApiRequest::patch("/tasks/7/status")
            .with_json(&serde_json::json!({ "status": "COMPLETED" }))
            .expect("body");

        let exchange = transport.send(&request).await.expect("send");
        assert!(matches!(exchange, Exchange::Completed(_)));

        let seen = transport.backend().seen.borrow();
        let sent = &seen[0];
        assert_eq!(sent.url, "http://localhost:8080/api/v1/tasks/7/status");
        assert_eq!(sent.header("authorization"), Some("Bearer tok"));
        assert_eq!(sent.header("Content-Type"), Some("application/json"));
        assert_eq!(sent.body.as_deref(), Some(r#"{"status":"COMPLETED"}"#));
    }

    #[tokio::test]
    async fn post_hook_flags_unauthorized() {
        let transport = transport(401, None);
        let exchange = transport
            .send(&ApiRequest::get("/auth/me"))
            .await
            .expect("send");

        assert!(matches!(exchange, Exchange::Unauthorized(_)));
        let seen = transport.backend().seen.borrow();
        assert_eq!(seen[0].header("Authorization"), None);
        assert_eq!(seen[0].body, None);
    }
}
