use growweek_shared::{LoginRequest, LoginResponse, RegisterRequest, UserDto};
use tracing::{info, warn};

use crate::api::{decode_envelope, decode_unit};
use crate::credential::CredentialStore;
use crate::error::BoardError;
use crate::session::{Navigator, SessionManager};
use crate::transport::{ApiRequest, HttpBackend};

/// Sign-in, sign-up and sign-out over the session manager.
pub struct AuthClient<B, S, N> {
    session: SessionManager<B, S, N>,
}

impl<B, S, N> AuthClient<B, S, N>
where
    B: HttpBackend + 'static,
    S: CredentialStore + 'static,
    N: Navigator + 'static,
{
    pub fn new(session: SessionManager<B, S, N>) -> Self {
        Self { session }
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.credentials().get().is_some()
    }

    /// Where the app should go from `current_path`, if anywhere: signed-out
    /// users are sent to sign-in, signed-in users are bounced off auth pages.
    pub fn route_guard(&self, current_path: &str) -> Option<String> {
        let config = self.session.config();
        let on_auth_page = config.is_auth_path(current_path);
        match (self.is_signed_in(), on_auth_page) {
            (false, false) => Some(config.login_path.clone()),
            (true, true) => Some(config.home_path.clone()),
            _ => None,
        }
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, BoardError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(BoardError::Validation(
                "email and password are required".to_string(),
            ));
        }

        let request = ApiRequest::post("/auth/login")
            .with_json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?
            .anonymous();
        let response = self.session.authorized_request(&request).await?;
        let login: LoginResponse = decode_envelope(&response)?;

        self.session.credentials().set(&login.token);
        info!(user_id = login.user_id, "signed in");
        Ok(login)
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserDto, BoardError> {
        let (email, name) = (email.trim(), name.trim());
        if email.is_empty() || password.is_empty() || name.is_empty() {
            return Err(BoardError::Validation(
                "email, password and name are required".to_string(),
            ));
        }

        let request = ApiRequest::post("/auth/register")
            .with_json(&RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
            })?
            .anonymous();
        let response = self.session.authorized_request(&request).await?;
        decode_envelope(&response)
    }

    /// Always drops the local credential, even when the server call fails.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), BoardError> {
        let result = match self
            .session
            .authorized_request(&ApiRequest::post("/auth/logout"))
            .await
        {
            Ok(response) => decode_unit(&response),
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            warn!(error = %err, "server-side logout failed; clearing local session anyway");
        }
        self.session.end_session();
        result
    }

    pub async fn me(&self) -> Result<UserDto, BoardError> {
        let response = self
            .session
            .authorized_request(&ApiRequest::get("/auth/me"))
            .await?;
        decode_envelope(&response)
    }
}
