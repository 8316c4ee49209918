use std::fs;
use std::path::Path;

use anyhow::{
  Context,
  anyhow
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

const DEFAULT_API_BASE_URL: &str =
  "http://localhost:8080";
const DEFAULT_API_PREFIX: &str =
  "/api/v1";
const DEFAULT_CREDENTIAL_KEY: &str =
  "accessToken";
const DEFAULT_DRAG_DISTANCE: f64 = 8.0;
const MAX_DRAG_DISTANCE: f64 = 64.0;

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
#[serde(default)]
pub struct ClientConfig {
  pub api_base_url:   String,
  pub api_prefix:     String,
  pub login_path:     String,
  pub register_path:  String,
  pub home_path:      String,
  pub refresh_path:   String,
  pub credential_key: String,
  /// Pointer travel in CSS pixels
  /// before a press becomes a drag.
  pub drag_activation_distance: f64
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      api_base_url:   DEFAULT_API_BASE_URL
        .to_string(),
      api_prefix:     DEFAULT_API_PREFIX
        .to_string(),
      login_path:     "/login"
        .to_string(),
      register_path:  "/register"
        .to_string(),
      home_path:      "/".to_string(),
      refresh_path:   "/auth/refresh"
        .to_string(),
      credential_key:
        DEFAULT_CREDENTIAL_KEY
          .to_string(),
      drag_activation_distance:
        DEFAULT_DRAG_DISTANCE
    }
  }
}

impl ClientConfig {
  pub fn from_toml_str(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg: ClientConfig =
      toml::from_str(text).context(
        "failed to parse client config"
      )?;
    cfg.validate();
    Ok(cfg)
  }

  #[tracing::instrument]
  pub fn load(
    path: &Path
  ) -> anyhow::Result<Self> {
    let text =
      fs::read_to_string(path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    info!(config = %path.display(), "loading client config");
    Self::from_toml_str(&text)
      .with_context(|| {
        format!(
          "invalid config in {}",
          path.display()
        )
      })
  }

  /// Applies `key=value` overrides,
  /// accepting an optional
  /// `growweek.` prefix on keys.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("growweek.")
        .unwrap_or(&k)
        .to_string();
      let value = v.trim().to_string();
      debug!(key = %key, value = %value, "applying override");
      match key.as_str() {
        | "api_base_url" => {
          self.api_base_url = value
        }
        | "api_prefix" => {
          self.api_prefix = value
        }
        | "login_path" => {
          self.login_path = value
        }
        | "register_path" => {
          self.register_path = value
        }
        | "home_path" => {
          self.home_path = value
        }
        | "refresh_path" => {
          self.refresh_path = value
        }
        | "credential_key" => {
          self.credential_key = value
        }
        | "drag_activation_distance" => {
          self.drag_activation_distance =
            value.parse().with_context(
              || {
                format!(
                  "invalid drag \
                   distance: {value}"
                )
              }
            )?;
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: \
             {other}"
          ));
        }
      }
    }
    self.validate();
    Ok(())
  }

  /// Full URL prefix every request
  /// path is appended to.
  pub fn api_root(&self) -> String {
    format!(
      "{}{}",
      self.api_base_url,
      self.api_prefix
    )
  }

  pub fn is_auth_path(
    &self,
    path: &str
  ) -> bool {
    path.starts_with(&self.login_path)
      || path.starts_with(
        &self.register_path
      )
  }

  fn validate(&mut self) {
    self.api_base_url = self
      .api_base_url
      .trim_end_matches('/')
      .to_string();

    if !self.api_prefix.is_empty() {
      let trimmed = self
        .api_prefix
        .trim_matches('/');
      self.api_prefix =
        if trimmed.is_empty() {
          String::new()
        } else {
          format!("/{trimmed}")
        };
    }

    if !self
      .drag_activation_distance
      .is_finite()
      || self.drag_activation_distance
        < 0.0
    {
      warn!(
        value = self
          .drag_activation_distance,
        "invalid drag activation \
         distance; using default"
      );
      self.drag_activation_distance =
        DEFAULT_DRAG_DISTANCE;
    } else if self
      .drag_activation_distance
      > MAX_DRAG_DISTANCE
    {
      warn!(
        value = self
          .drag_activation_distance,
        "drag activation distance \
         too large; clamping"
      );
      self.drag_activation_distance =
        MAX_DRAG_DISTANCE;
    }

    if self.credential_key.trim().is_empty()
    {
      warn!(
        "empty credential key; using \
         default"
      );
      self.credential_key =
        DEFAULT_CREDENTIAL_KEY
          .to_string();
    }
  }
}
