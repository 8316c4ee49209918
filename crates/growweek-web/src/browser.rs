use gloo::net::http::{
  Method,
  RequestBuilder
};
use growweek_core::transport::{
  HttpMethod,
  HttpRequest,
  HttpResponse
};
use growweek_core::{
  CredentialStore,
  HttpBackend,
  Navigator
};
use web_sys::RequestCredentials;

/// `fetch`-backed transport. Cookies
/// ride along so the server can renew
/// from its refresh cookie.
#[derive(Clone, Copy, Default)]
pub struct FetchBackend;

impl HttpBackend for FetchBackend {
  async fn execute(
    &self,
    request: HttpRequest
  ) -> Result<HttpResponse, String> {
    let method = match request.method
    {
      | HttpMethod::Get => Method::GET,
      | HttpMethod::Post => {
        Method::POST
      }
      | HttpMethod::Patch => {
        Method::PATCH
      }
      | HttpMethod::Delete => {
        Method::DELETE
      }
    };

    let mut builder =
      RequestBuilder::new(&request.url)
        .method(method)
        .credentials(
          RequestCredentials::Include
        );
    for (name, value) in
      &request.headers
    {
      builder =
        builder.header(name, value);
    }

    let prepared = match request.body
    {
      | Some(body) => {
        builder.body(body)
      }
      | None => builder.build()
    }
    .map_err(|err| {
      format!(
        "failed to build request: \
         {err}"
      )
    })?;

    let response = prepared
      .send()
      .await
      .map_err(|err| err.to_string())?;
    let status = response.status();
    let body = response
      .text()
      .await
      .unwrap_or_default();

    Ok(HttpResponse::new(status, body))
  }
}

/// Keeps the bearer token in
/// `localStorage` under the configured
/// key.
pub struct LocalStorageCredentialStore
{
  key: String
}

impl LocalStorageCredentialStore {
  pub fn new(key: &str) -> Self {
    Self {
      key: key.to_string()
    }
  }

  fn storage() -> Option<web_sys::Storage>
  {
    web_sys::window().and_then(
      |window| {
        window
          .local_storage()
          .ok()
          .flatten()
      }
    )
  }
}

impl CredentialStore
  for LocalStorageCredentialStore
{
  fn get(&self) -> Option<String> {
    Self::storage()
      .and_then(|storage| {
        storage
          .get_item(&self.key)
          .ok()
          .flatten()
      })
      .filter(|token| {
        !token.trim().is_empty()
      })
  }

  fn set(&self, token: &str) {
    match Self::storage() {
      | Some(storage) => {
        if storage
          .set_item(&self.key, token)
          .is_err()
        {
          tracing::warn!(
            key = %self.key,
            "failed to persist \
             credential"
          );
        }
      }
      | None => {
        tracing::warn!(
          "local storage unavailable; \
           credential not persisted"
        )
      }
    }
  }

  fn clear(&self) {
    if let Some(storage) =
      Self::storage()
    {
      let _ =
        storage.remove_item(&self.key);
    }
  }
}

/// Full page navigation through
/// `window.location`.
#[derive(Clone, Copy, Default)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
  fn current_path(&self) -> String {
    web_sys::window()
      .and_then(|window| {
        window
          .location()
          .pathname()
          .ok()
      })
      .unwrap_or_else(|| "/".to_string())
  }

  fn navigate(&self, path: &str) {
    let Some(window) = web_sys::window()
    else {
      return;
    };
    if window
      .location()
      .set_href(path)
      .is_err()
    {
      tracing::warn!(
        path,
        "navigation failed"
      );
    }
  }
}
