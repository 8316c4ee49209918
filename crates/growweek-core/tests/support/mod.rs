#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use growweek_core::clock::FixedClock;
use growweek_core::transport::{HttpMethod, HttpRequest, HttpResponse};
use growweek_core::{
    Client, ClientConfig, HttpBackend, MemoryCredentialStore, Navigator, connect,
};
use serde_json::{Value, json};

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, String>;

struct MockInner {
    handler: Box<Handler>,
    log: RefCell<Vec<HttpRequest>>,
}

/// Scripted backend. Every call yields once before answering so that
/// concurrently issued requests interleave.
#[derive(Clone)]
pub struct MockBackend {
    inner: Rc<MockInner>,
}

impl MockBackend {
    pub fn new(handler: impl Fn(&HttpRequest) -> Result<HttpResponse, String> + 'static) -> Self {
        Self {
            inner: Rc::new(MockInner {
                handler: Box::new(handler),
                log: RefCell::new(vec![]),
            }),
        }
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.inner.log.borrow().clone()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.inner
            .log
            .borrow()
            .iter()
            .filter(|request| request.method == method && request.url.ends_with(path))
            .count()
    }

    pub fn total(&self) -> usize {
        self.inner.log.borrow().len()
    }
}

impl HttpBackend for MockBackend {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        self.inner.log.borrow_mut().push(request.clone());
        tokio::task::yield_now().await;
        (self.inner.handler)(&request)
    }
}

#[derive(Clone)]
pub struct TestNavigator {
    path: Rc<RefCell<String>>,
    visits: Rc<RefCell<Vec<String>>>,
}

impl TestNavigator {
    pub fn at(path: &str) -> Self {
        Self {
            path: Rc::new(RefCell::new(path.to_string())),
            visits: Rc::new(RefCell::new(vec![])),
        }
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.borrow().clone()
    }
}

impl Navigator for TestNavigator {
    fn current_path(&self) -> String {
        self.path.borrow().clone()
    }

    fn navigate(&self, path: &str) {
        *self.path.borrow_mut() = path.to_string();
        self.visits.borrow_mut().push(path.to_string());
    }
}

pub type TestClient = Client<MockBackend, Rc<MemoryCredentialStore>, TestNavigator, FixedClock>;

pub struct Harness {
    pub client: TestClient,
    pub backend: MockBackend,
    pub credentials: Rc<MemoryCredentialStore>,
    pub navigator: TestNavigator,
}

pub fn harness(backend: MockBackend, token: Option<&str>, path: &str) -> Harness {
    let credentials = Rc::new(match token {
        Some(token) => MemoryCredentialStore::with_token(token),
        None => MemoryCredentialStore::new(),
    });
    let navigator = TestNavigator::at(path);
    let clock = FixedClock::new(
        Utc.with_ymd_and_hms(2024, 11, 20, 10, 0, 0)
            .single()
            .expect("clock"),
    );
    let client = connect(
        backend.clone(),
        Rc::clone(&credentials),
        navigator.clone(),
        clock,
        &ClientConfig::default(),
    );
    Harness {
        client,
        backend,
        credentials,
        navigator,
    }
}

pub fn ok(data: Value) -> Result<HttpResponse, String> {
    Ok(HttpResponse::new(
        200,
        json!({ "success": true, "data": data }).to_string(),
    ))
}

pub fn rejected(status: u16, code: &str, message: &str) -> Result<HttpResponse, String> {
    Ok(HttpResponse::new(
        status,
        json!({
            "success": false,
            "data": null,
            "error": { "code": code, "message": message }
        })
        .to_string(),
    ))
}

pub fn unauthorized() -> Result<HttpResponse, String> {
    Ok(HttpResponse::new(401, ""))
}

pub fn task_json(id: i64, title: &str, status: &str) -> Value {
    json!({
        "id": id,
        "userId": 1,
        "weekId": 12,
        "title": title,
        "description": null,
        "status": status,
        "isSensitive": false,
        "originalTaskId": null,
        "isCarriedOver": false,
        "isDeleted": false,
        "isLocked": false,
        "lockedAt": null,
        "createdAt": "2024-11-18T09:00:00",
        "updatedAt": "2024-11-18T09:00:00"
    })
}

pub fn body_json(request: &HttpRequest) -> Value {
    request
        .body
        .as_deref()
        .and_then(|body| serde_json::from_str(body).ok())
        .unwrap_or(Value::Null)
}
