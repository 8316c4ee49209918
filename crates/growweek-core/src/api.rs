use std::future::Future;

use growweek_shared::{
    ApiEnvelope, ChangeTaskStatusRequest, CreateTaskRequest, TaskDto, UpdateTaskRequest,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::credential::CredentialStore;
use crate::error::{ApiFailure, BoardError};
use crate::session::{Navigator, SessionManager};
use crate::task::WeekId;
use crate::transport::{ApiRequest, HttpBackend, HttpResponse};

/// Remote operations the task cache depends on.
pub trait TaskApi {
    fn current_week_tasks(&self) -> impl Future<Output = Result<Vec<TaskDto>, BoardError>>;

    fn week_tasks(&self, week: WeekId) -> impl Future<Output = Result<Vec<TaskDto>, BoardError>>;

    fn create_task(
        &self,
        request: CreateTaskRequest,
    ) -> impl Future<Output = Result<TaskDto, BoardError>>;

    fn update_task(
        &self,
        id: i64,
        request: UpdateTaskRequest,
    ) -> impl Future<Output = Result<TaskDto, BoardError>>;

    fn change_status(
        &self,
        id: i64,
        request: ChangeTaskStatusRequest,
    ) -> impl Future<Output = Result<TaskDto, BoardError>>;

    fn delete_task(&self, id: i64) -> impl Future<Output = Result<(), BoardError>>;
}

/// `TaskApi` over the REST endpoints, routed through the session manager.
pub struct RemoteTaskApi<B, S, N> {
    session: SessionManager<B, S, N>,
}

impl<B, S, N> RemoteTaskApi<B, S, N>
where
    B: HttpBackend + 'static,
    S: CredentialStore + 'static,
    N: Navigator + 'static,
{
    pub fn new(session: SessionManager<B, S, N>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager<B, S, N> {
        &self.session
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, BoardError> {
        let response = self.session.authorized_request(&request).await?;
        decode_envelope(&response)
    }
}

impl<B, S, N> TaskApi for RemoteTaskApi<B, S, N>
where
    B: HttpBackend + 'static,
    S: CredentialStore + 'static,
    N: Navigator + 'static,
{
    async fn current_week_tasks(&self) -> Result<Vec<TaskDto>, BoardError> {
        self.call(ApiRequest::get("/tasks/current-week")).await
    }

    async fn week_tasks(&self, week: WeekId) -> Result<Vec<TaskDto>, BoardError> {
        self.call(ApiRequest::get(format!("/tasks/week/{week}"))).await
    }

    async fn create_task(&self, request: CreateTaskRequest) -> Result<TaskDto, BoardError> {
        self.call(ApiRequest::post("/tasks").with_json(&request)?).await
    }

    async fn update_task(&self, id: i64, request: UpdateTaskRequest) -> Result<TaskDto, BoardError> {
        self.call(ApiRequest::patch(format!("/tasks/{id}")).with_json(&request)?)
            .await
    }

    async fn change_status(
        &self,
        id: i64,
        request: ChangeTaskStatusRequest,
    ) -> Result<TaskDto, BoardError> {
        self.call(ApiRequest::patch(format!("/tasks/{id}/status")).with_json(&request)?)
            .await
    }

    async fn delete_task(&self, id: i64) -> Result<(), BoardError> {
        let response = self
            .session
            .authorized_request(&ApiRequest::delete(format!("/tasks/{id}")))
            .await?;
        decode_unit(&response)
    }
}

/// Unwraps the response envelope. `success: false` and non-2xx statuses
/// both become `ServerRejected`.
pub fn decode_envelope<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, BoardError> {
    let status = response.status;
    match serde_json::from_str::<ApiEnvelope<T>>(&response.body) {
        Ok(envelope) if envelope.success && response.is_success() => envelope
            .data
            .ok_or_else(|| BoardError::malformed(Some(status), "response envelope carries no data")),
        Ok(envelope) => Err(rejection(status, envelope.error)),
        Err(err) if response.is_success() => {
            debug!(status, error = %err, "undecodable success body");
            Err(BoardError::malformed(Some(status), format!("undecodable response: {err}")))
        }
        Err(_) => Err(rejection(status, error_body(&response.body))),
    }
}

/// Like [`decode_envelope`] for endpoints whose payload is ignored.
pub fn decode_unit(response: &HttpResponse) -> Result<(), BoardError> {
    let status = response.status;
    if response.body.trim().is_empty() {
        if response.is_success() {
            return Ok(());
        }
        return Err(rejection(status, None));
    }
    match serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&response.body) {
        Ok(envelope) if envelope.success && response.is_success() => Ok(()),
        Ok(envelope) => Err(rejection(status, envelope.error)),
        Err(_) if response.is_success() => Ok(()),
        Err(_) => Err(rejection(status, None)),
    }
}

fn error_body(body: &str) -> Option<growweek_shared::ApiErrorBody> {
    serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.error)
}

fn rejection(status: u16, body: Option<growweek_shared::ApiErrorBody>) -> BoardError {
    let failure = match body {
        Some(body) => ApiFailure::from_body(Some(status), body),
        None => ApiFailure::new(
            Some(status),
            format!("HTTP_{status}"),
            format!("request failed with status {status}"),
        ),
    };
    BoardError::ServerRejected(failure)
}
