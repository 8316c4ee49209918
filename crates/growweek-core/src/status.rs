use serde::{Deserialize, Serialize};

/// Canonical board status. The derived ordering is the column order and
/// carries no business meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    NotStarted,
    InProgress,
    Completed,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::NotStarted, Status::InProgress, Status::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotStarted => "NOT_STARTED",
            Status::InProgress => "IN_PROGRESS",
            Status::Completed => "COMPLETED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::NotStarted => "Not started",
            Status::InProgress => "In progress",
            Status::Completed => "Completed",
        }
    }

    pub fn column_index(self) -> usize {
        match self {
            Status::NotStarted => 0,
            Status::InProgress => 1,
            Status::Completed => 2,
        }
    }

    pub fn from_column_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status as it arrived from the server after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalizedStatus {
    Known(Status),
    Unrecognized(String),
}

impl NormalizedStatus {
    pub fn known(&self) -> Option<Status> {
        match self {
            NormalizedStatus::Known(status) => Some(*status),
            NormalizedStatus::Unrecognized(_) => None,
        }
    }
}

impl From<Status> for NormalizedStatus {
    fn from(status: Status) -> Self {
        NormalizedStatus::Known(status)
    }
}

/// Maps every status spelling the server has used over time onto the
/// canonical set. Unknown spellings are kept verbatim for logging.
pub fn normalize_status(raw: &str) -> NormalizedStatus {
    let key = raw
        .trim()
        .to_ascii_uppercase()
        .replace(['-', ' '], "_");

    match key.as_str() {
        "NOT_STARTED" | "TODO" | "TO_DO" => NormalizedStatus::Known(Status::NotStarted),
        "IN_PROGRESS" | "INPROGRESS" => NormalizedStatus::Known(Status::InProgress),
        "COMPLETED" | "DONE" => NormalizedStatus::Known(Status::Completed),
        _ => NormalizedStatus::Unrecognized(raw.to_string()),
    }
}
