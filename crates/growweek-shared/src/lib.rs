use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub code:    String,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub details:
    Option<serde_json::Value>
}

/// Envelope wrapping every server
/// response body.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct ApiEnvelope<T> {
  pub success:   bool,
  /// No `serde(default)` here; it
  /// would require `T: Default`.
  pub data:      Option<T>,
  #[serde(default)]
  pub error:     Option<ApiErrorBody>,
  #[serde(default)]
  pub timestamp: Option<String>
}

impl<T> ApiEnvelope<T> {
  pub fn ok(data: T) -> Self {
    Self {
      success:   true,
      data:      Some(data),
      error:     None,
      timestamp: None
    }
  }

  pub fn failure(
    code: &str,
    message: &str
  ) -> Self {
    Self {
      success:   false,
      data:      None,
      error:     Some(ApiErrorBody {
        code:    code.to_string(),
        message: message.to_string(),
        details: None
      }),
      timestamp: None
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
  pub id:               i64,
  #[serde(default)]
  pub user_id:          Option<i64>,
  #[serde(default)]
  pub week_id:          Option<i64>,
  pub title:            String,
  #[serde(default)]
  pub description:      Option<String>,
  pub status:           String,
  #[serde(default)]
  pub is_sensitive:     bool,
  #[serde(default)]
  pub original_task_id: Option<i64>,
  #[serde(default)]
  pub is_carried_over:  bool,
  #[serde(default)]
  pub is_deleted:       bool,
  #[serde(default)]
  pub is_locked:        bool,
  #[serde(default)]
  pub locked_at:        Option<String>,
  #[serde(default)]
  pub created_at:       Option<String>,
  #[serde(default)]
  pub updated_at:       Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct WeekDto {
  pub id:                  i64,
  #[serde(default)]
  pub week_number:         i64,
  pub start_date:          String,
  pub end_date:            String,
  #[serde(default)]
  pub is_review_completed: bool,
  #[serde(default)]
  pub review_completed_at:
    Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
  pub title:        String,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description:  Option<String>,
  pub is_sensitive: bool,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub week_id:      Option<i64>,
  pub created_date: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub title:        Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description:  Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub is_sensitive: Option<bool>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct ChangeTaskStatusRequest {
  pub status: String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct LoginRequest {
  pub email:    String,
  pub password: String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct RegisterRequest {
  pub email:    String,
  pub password: String,
  pub name:     String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
  pub user_id:       i64,
  pub email:         String,
  pub name:          String,
  pub token:         String,
  #[serde(default)]
  pub refresh_token: Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
  pub user_id: i64,
  pub email:   String,
  pub name:    String,
  #[serde(default)]
  pub roles:   Vec<String>
}

/// Body of a refresh response. Both
/// fields are optional because the
/// refresh context may live entirely
/// in a server-side cookie.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
  #[serde(default)]
  pub access_token: Option<String>,
  #[serde(default)]
  pub token:        Option<String>
}

impl RefreshResponse {
  pub fn bearer(
    &self
  ) -> Option<&str> {
    self
      .access_token
      .as_deref()
      .or(self.token.as_deref())
      .map(str::trim)
      .filter(|value| !value.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn task_dto_reads_camel_case_payload()
  {
    let raw = r#"{
      "id": 7,
      "userId": 3,
      "weekId": 12,
      "title": "Draft weekly plan",
      "status": "IN_PROGRESS",
      "isSensitive": true,
      "isCarriedOver": false,
      "isLocked": false,
      "createdAt": "2024-11-18T09:00:00",
      "updatedAt": "2024-11-18T09:30:00"
    }"#;

    let dto: TaskDto =
      serde_json::from_str(raw)
        .expect("task dto");
    assert_eq!(dto.id, 7);
    assert_eq!(dto.week_id, Some(12));
    assert!(dto.is_sensitive);
    assert_eq!(dto.description, None);
    assert_eq!(dto.locked_at, None);
  }

  #[test]
  fn envelope_failure_carries_error_body()
  {
    let raw = r#"{
      "success": false,
      "data": null,
      "error": { "code": "TASK_NOT_FOUND", "message": "no such task" },
      "timestamp": "2024-11-18T09:00:00"
    }"#;

    let envelope: ApiEnvelope<TaskDto> =
      serde_json::from_str(raw)
        .expect("envelope");
    assert!(!envelope.success);
    assert!(envelope.data.is_none());
    let error =
      envelope.error.expect("error");
    assert_eq!(
      error.code,
      "TASK_NOT_FOUND"
    );
    assert_eq!(error.details, None);
  }

  fn decode_any<T>(
    raw: &str
  ) -> ApiEnvelope<T>
  where
    T: serde::de::DeserializeOwned
  {
    serde_json::from_str(raw)
      .expect("envelope")
  }

  #[test]
  fn envelope_decodes_through_generic_caller()
  {
    let listed: ApiEnvelope<Vec<i64>> =
      decode_any(
        r#"{"success":true,"data":[1,2]}"#
      );
    assert_eq!(
      listed.data,
      Some(vec![1, 2])
    );

    let bare: ApiEnvelope<TaskDto> =
      decode_any(r#"{"success":true}"#);
    assert!(bare.success);
    assert!(bare.data.is_none());
    assert!(bare.error.is_none());
  }

  #[test]
  fn update_request_omits_untouched_fields()
  {
    let patch = UpdateTaskRequest {
      title: Some(
        "Renamed".to_string()
      ),
      ..UpdateTaskRequest::default()
    };

    let value =
      serde_json::to_value(&patch)
        .expect("serialize patch");
    assert_eq!(
      value,
      serde_json::json!({ "title": "Renamed" })
    );
  }

  #[test]
  fn refresh_response_prefers_access_token()
  {
    let both = RefreshResponse {
      access_token: Some(
        "fresh".to_string()
      ),
      token:        Some(
        "legacy".to_string()
      )
    };
    assert_eq!(
      both.bearer(),
      Some("fresh")
    );

    let blank = RefreshResponse {
      access_token: Some(
        "  ".to_string()
      ),
      token:        None
    };
    assert_eq!(blank.bearer(), None);
    assert_eq!(
      RefreshResponse::default()
        .bearer(),
      None
    );
  }
}
