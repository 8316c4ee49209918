use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use growweek_shared::{ApiEnvelope, RefreshResponse};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::credential::CredentialStore;
use crate::error::BoardError;
use crate::transport::{ApiRequest, Exchange, HttpBackend, HttpResponse, Transport};

/// Transparent retries allowed per request after an authorization failure.
const MAX_AUTH_RETRIES: u8 = 1;

/// Routes the browser between pages.
pub trait Navigator {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalOutcome {
    Renewed,
    Failed(String),
}

type RenewalFuture = Shared<LocalBoxFuture<'static, RenewalOutcome>>;

enum RenewalState {
    Idle,
    Renewing(RenewalFuture),
}

struct SessionInner<B, S, N> {
    transport: Transport<B, S>,
    navigator: N,
    config: ClientConfig,
    state: RefCell<RenewalState>,
    /// Bumped after every successful renewal.
    generation: Cell<u64>,
    renewals_started: Cell<u64>,
}

/// Wraps the transport with single-flight credential renewal.
pub struct SessionManager<B, S, N> {
    inner: Rc<SessionInner<B, S, N>>,
}

impl<B, S, N> Clone for SessionManager<B, S, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<B, S, N> SessionManager<B, S, N>
where
    B: HttpBackend + 'static,
    S: CredentialStore + 'static,
    N: Navigator + 'static,
{
    pub fn new(transport: Transport<B, S>, navigator: N, config: &ClientConfig) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                transport,
                navigator,
                config: config.clone(),
                state: RefCell::new(RenewalState::Idle),
                generation: Cell::new(0),
                renewals_started: Cell::new(0),
            }),
        }
    }

    pub fn credentials(&self) -> &S {
        self.inner.transport.credentials()
    }

    pub fn navigator(&self) -> &N {
        &self.inner.navigator
    }

    pub fn transport(&self) -> &Transport<B, S> {
        &self.inner.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn is_renewing(&self) -> bool {
        matches!(*self.inner.state.borrow(), RenewalState::Renewing(_))
    }

    pub fn renewals_started(&self) -> u64 {
        self.inner.renewals_started.get()
    }

    /// Sends `request`, renewing the credential at most once if the server
    /// answers 401. Anonymous requests get their 401 back untouched.
    #[tracing::instrument(skip(self, request), fields(method = request.method.as_str(), path = %request.path))]
    pub async fn authorized_request(&self, request: &ApiRequest) -> Result<HttpResponse, BoardError> {
        let mut attempt: u8 = 0;

        loop {
            let generation = self.inner.generation.get();
            let response = match self.inner.transport.send(request).await? {
                Exchange::Completed(response) => return Ok(response),
                Exchange::Unauthorized(response) => response,
            };

            if request.anonymous {
                return Ok(response);
            }

            if self.inner.is_renewal_request(request) {
                warn!("renewal endpoint rejected the session");
                self.inner.terminate();
                return Err(BoardError::AuthorizationTerminal);
            }

            if attempt >= MAX_AUTH_RETRIES {
                warn!(attempt, "request unauthorized again after renewal");
                self.inner.terminate();
                return Err(BoardError::AuthorizationTerminal);
            }
            attempt += 1;

            if self.inner.generation.get() != generation {
                debug!("credential renewed while request was in flight; retrying");
                continue;
            }

            match self.renew().await {
                RenewalOutcome::Renewed => continue,
                RenewalOutcome::Failed(_) => return Err(BoardError::AuthorizationTerminal),
            }
        }
    }

    /// Clears the credential and routes to sign-in.
    pub fn end_session(&self) {
        self.inner.terminate();
    }

    fn renew(&self) -> RenewalFuture {
        let mut state = self.inner.state.borrow_mut();
        if let RenewalState::Renewing(in_flight) = &*state {
            debug!("joining in-flight renewal");
            return in_flight.clone();
        }

        let inner = Rc::clone(&self.inner);
        let renewal = async move {
            let outcome = inner.perform_renewal().await;
            inner.finish_renewal(&outcome);
            outcome
        }
        .boxed_local()
        .shared();

        *state = RenewalState::Renewing(renewal.clone());
        self.inner
            .renewals_started
            .set(self.inner.renewals_started.get() + 1);
        info!("starting credential renewal");
        renewal
    }
}

impl<B, S, N> SessionInner<B, S, N>
where
    B: HttpBackend,
    S: CredentialStore,
    N: Navigator,
{
    fn is_renewal_request(&self, request: &ApiRequest) -> bool {
        request.path == self.config.refresh_path
    }

    async fn perform_renewal(&self) -> RenewalOutcome {
        let request = ApiRequest::post(self.config.refresh_path.clone());
        match self.transport.send(&request).await {
            Ok(Exchange::Completed(response)) if response.is_success() => {
                match refreshed_bearer(&response.body) {
                    Ok(Some(token)) => {
                        debug!("renewal returned a new bearer token");
                        self.transport.credentials().set(&token);
                        RenewalOutcome::Renewed
                    }
                    Ok(None) => {
                        debug!("renewal returned no bearer token; keeping current credential");
                        RenewalOutcome::Renewed
                    }
                    Err(reason) => RenewalOutcome::Failed(reason),
                }
            }
            Ok(Exchange::Completed(response)) => {
                RenewalOutcome::Failed(format!("renewal rejected with status {}", response.status))
            }
            Ok(Exchange::Unauthorized(_)) => {
                RenewalOutcome::Failed("renewal rejected as unauthorized".to_string())
            }
            Err(err) => RenewalOutcome::Failed(err.to_string()),
        }
    }

    fn finish_renewal(&self, outcome: &RenewalOutcome) {
        *self.state.borrow_mut() = RenewalState::Idle;
        match outcome {
            RenewalOutcome::Renewed => {
                self.generation.set(self.generation.get() + 1);
                info!(generation = self.generation.get(), "credential renewed");
            }
            RenewalOutcome::Failed(reason) => {
                warn!(%reason, "credential renewal failed");
                self.terminate();
            }
        }
    }

    fn terminate(&self) {
        self.transport.credentials().clear();
        let current = self.navigator.current_path();
        if self.config.is_auth_path(&current) {
            debug!(path = %current, "already on an auth page; not redirecting");
            return;
        }
        info!(from = %current, to = %self.config.login_path, "session ended; redirecting to sign-in");
        self.navigator.navigate(&self.config.login_path);
    }
}

/// Extracts a bearer token from a successful refresh body, if any.
fn refreshed_bearer(body: &str) -> Result<Option<String>, String> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    if let Ok(envelope) = serde_json::from_str::<ApiEnvelope<RefreshResponse>>(body) {
        if !envelope.success {
            let message = envelope
                .error
                .map(|error| error.message)
                .unwrap_or_else(|| "renewal reported failure".to_string());
            return Err(message);
        }
        return Ok(envelope
            .data
            .as_ref()
            .and_then(RefreshResponse::bearer)
            .map(str::to_string));
    }

    Ok(serde_json::from_str::<RefreshResponse>(body)
        .ok()
        .as_ref()
        .and_then(RefreshResponse::bearer)
        .map(str::to_string))
}
