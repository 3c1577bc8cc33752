//! Shared data model for the quotebot workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ──────────────────── Execution State ────────────────────

/// What the coordinator is doing right now.
///
/// `Running` means armed and waiting for the next interval tick or schedule
/// match; it is distinct from `Idle` (not armed). Only `Idle` and `Running`
/// are eligible to start a new task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Not armed, nothing in flight.
    Idle,
    /// Armed, countdown ticking, nothing in flight.
    Running,
    /// A task is generating content.
    FetchingContent,
    /// A task is delivering a text message.
    Sending,
}

impl ExecutionStatus {
    /// Busy states block new task starts.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::FetchingContent | Self::Sending)
    }
}

/// Kind of content a task produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// A generated quote, delivered as a text message.
    Text,
    /// A generated quote plus illustration, delivered as a photo + caption.
    Image,
}

impl ContentType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

/// What caused a task execution. Used only for logging and labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Manual,
    Interval,
    Schedule,
}

impl TriggerSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Interval => "interval",
            Self::Schedule => "scheduled",
        }
    }
}

// ──────────────────── Schedule Types ────────────────────

/// A registered time-of-day schedule entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Unique entry ID.
    pub id: String,
    /// 24-hour wall-clock time, "HH:MM".
    pub time: String,
    /// Content kind to produce when the entry fires.
    pub content_type: ContentType,
}

impl ScheduleEntry {
    /// Create an entry with a fresh unique ID.
    pub fn new(time: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            time: time.into(),
            content_type,
        }
    }
}

// ──────────────────── Log Types ────────────────────

/// Outcome tag on a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Error,
    Pending,
}

/// One entry in the observational log stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique entry ID.
    pub id: String,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
    /// Operator-facing message.
    pub message: String,
    /// Outcome tag.
    pub status: LogStatus,
    /// Raw diagnostic detail, kept separate from the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, status: LogStatus, details: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            message: message.into(),
            status,
            details,
        }
    }
}

// ──────────────────── Failure Taxonomy ────────────────────

/// Classified failure from a collaborator call.
///
/// The `Display` text is the operator-facing phrasing; raw remote diagnostics
/// are preserved in the variant payloads and surfaced via [`TaskError::detail`].
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("missing credential: {0} is required")]
    MissingCredential(&'static str),

    #[error("quota exceeded (429): free-tier limits are exhausted, wait a while and retry")]
    QuotaExceeded { detail: String },

    #[error(
        "quota restricted (limit: 0): this key or origin is not allowed free generation, \
         retrying will not help — use a billed API account or another origin"
    )]
    QuotaExceededPermanent { detail: String },

    #[error("authorization failed (403): the API key is invalid or unauthorized")]
    AuthInvalid { detail: String },

    #[error(
        "network error, possibly a cross-origin restriction — check connectivity \
         and that the API is reachable from this host"
    )]
    NetworkOrCors { detail: String },

    #[error("delivery rejected: {description}")]
    RemoteRejected { description: String },

    #[error("the model returned an empty response")]
    EmptyResponse,

    #[error("no image data in the model response")]
    NoImageInResponse,

    #[error("{0}")]
    Other(String),
}

impl TaskError {
    /// Raw diagnostic detail, when the variant carries one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::QuotaExceeded { detail }
            | Self::QuotaExceededPermanent { detail }
            | Self::AuthInvalid { detail }
            | Self::NetworkOrCors { detail } => Some(detail),
            Self::RemoteRejected { description } => Some(description),
            _ => None,
        }
    }

    /// Transient quota failures are the only retryable kind.
    pub fn is_retryable_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
