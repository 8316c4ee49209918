use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use growweek_shared::{TaskDto, WeekDto};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BoardError;
use crate::status::{NormalizedStatus, Status, normalize_status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskId {
    /// Assigned by the server.
    Remote(i64),
    /// Optimistic create awaiting confirmation.
    Pending(Uuid),
}

impl TaskId {
    pub fn new_pending() -> Self {
        TaskId::Pending(Uuid::new_v4())
    }

    pub fn remote(self) -> Option<i64> {
        match self {
            TaskId::Remote(id) => Some(id),
            TaskId::Pending(_) => None,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, TaskId::Pending(_))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskId::Remote(id) => write!(f, "{id}"),
            TaskId::Pending(uuid) => write!(f, "pending-{uuid}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekId(pub i64);

impl std::fmt::Display for WeekId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: NormalizedStatus,
    pub is_sensitive: bool,
    pub is_carried_over: bool,
    pub is_locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` only while a create is waiting for the server to pick a week.
    pub week_id: Option<WeekId>,
    pub original_task_id: Option<i64>,
}

impl Task {
    pub fn status(&self) -> Option<Status> {
        self.status.known()
    }

    /// Builds a cache entry from the wire shape. `fallback_now` fills in
    /// timestamps the server left out.
    pub fn from_dto(dto: TaskDto, fallback_now: DateTime<Utc>) -> Result<Self, BoardError> {
        let created_at = parse_optional_timestamp(dto.created_at.as_deref())?.unwrap_or(fallback_now);
        let updated_at = parse_optional_timestamp(dto.updated_at.as_deref())?.unwrap_or(created_at);
        let locked_at = parse_optional_timestamp(dto.locked_at.as_deref())?;

        Ok(Self {
            id: TaskId::Remote(dto.id),
            title: dto.title,
            description: dto.description.filter(|text| !text.trim().is_empty()),
            status: normalize_status(&dto.status),
            is_sensitive: dto.is_sensitive,
            is_carried_over: dto.is_carried_over,
            is_locked: dto.is_locked,
            locked_at,
            created_at,
            updated_at,
            week_id: dto.week_id.map(WeekId),
            original_task_id: dto.original_task_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
    pub id: WeekId,
    pub week_number: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_review_completed: bool,
    pub review_completed_at: Option<DateTime<Utc>>,
}

impl Week {
    pub fn from_dto(dto: WeekDto) -> Result<Self, BoardError> {
        Ok(Self {
            id: WeekId(dto.id),
            week_number: dto.week_number,
            start_date: parse_date(&dto.start_date)?,
            end_date: parse_date(&dto.end_date)?,
            is_review_completed: dto.is_review_completed,
            review_completed_at: parse_optional_timestamp(dto.review_completed_at.as_deref())?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Accepts RFC 3339 as well as the zone-less local date-times the backend
/// emits; the latter are read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, BoardError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        && let Some(naive) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(naive.and_utc());
    }
    Err(BoardError::malformed(None, format!("unparseable timestamp: {raw}")))
}

fn parse_optional_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, BoardError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_timestamp(value).map(Some),
        None => Ok(None),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, BoardError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| parse_timestamp(trimmed).map(|ts| ts.date_naive()))
        .map_err(|_| BoardError::malformed(None, format!("unparseable date: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dto(status: &str) -> TaskDto {
        TaskDto {
            id: 7,
            user_id: Some(1),
            week_id: Some(12),
            title: "Review PR".to_string(),
            description: Some("   ".to_string()),
            status: status.to_string(),
            is_sensitive: false,
            original_task_id: None,
            is_carried_over: true,
            is_deleted: false,
            is_locked: false,
            locked_at: None,
            created_at: Some("2024-11-18T09:00:00".to_string()),
            updated_at: None,
        }
    }

    #[test]
    fn from_dto_normalizes_and_fills_timestamps() {
        let now = Utc.with_ymd_and_hms(2024, 11, 20, 0, 0, 0).single().expect("now");
        let task = Task::from_dto(dto("done"), now).expect("task");

        assert_eq!(task.id, TaskId::Remote(7));
        assert_eq!(task.status(), Some(Status::Completed));
        assert_eq!(task.description, None);
        assert_eq!(task.week_id, Some(WeekId(12)));
        let created = Utc.with_ymd_and_hms(2024, 11, 18, 9, 0, 0).single().expect("created");
        assert_eq!(task.created_at, created);
        assert_eq!(task.updated_at, created);
        assert!(task.is_carried_over);
    }

    #[test]
    fn parse_timestamp_accepts_offsets_and_local_times() {
        let with_offset = parse_timestamp("2024-11-18T10:00:00+01:00").expect("rfc3339");
        let local = parse_timestamp("2024-11-18T09:00:00.250").expect("local");
        assert_eq!(with_offset.timestamp(), local.timestamp());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn week_from_dto_parses_dates() {
        let week = Week::from_dto(WeekDto {
            id: 12,
            week_number: 47,
            start_date: "2024-11-18".to_string(),
            end_date: "2024-11-24".to_string(),
            is_review_completed: true,
            review_completed_at: Some("2024-11-24T18:00:00Z".to_string()),
        })
        .expect("week");

        assert_eq!(week.id, WeekId(12));
        assert!(week.is_review_completed);
        let mid = NaiveDate::from_ymd_opt(2024, 11, 20).expect("date");
        assert!(week.contains(mid));
    }

    #[test]
    fn pending_ids_have_no_remote_value() {
        let pending = TaskId::new_pending();
        assert!(pending.is_pending());
        assert_eq!(pending.remote(), None);
        assert_eq!(TaskId::Remote(42).remote(), Some(42));
        assert_eq!(TaskId::Remote(42).to_string(), "42");
    }
}
