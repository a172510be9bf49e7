use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// Execution status reported by the judge, keyed by its numeric status id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JudgeStatus {
    InQueue,
    Processing,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeError,
    InternalError,
    ExecFormatError,
    MemoryLimitExceeded,
    /// A terminal status id this service does not know. Never counts as accepted.
    Unknown,
}

impl JudgeStatus {
    pub fn from_id(id: i64) -> Option<Self> {
        let status = match id {
            1 => JudgeStatus::InQueue,
            2 => JudgeStatus::Processing,
            3 => JudgeStatus::Accepted,
            4 => JudgeStatus::WrongAnswer,
            5 => JudgeStatus::TimeLimitExceeded,
            6 => JudgeStatus::CompilationError,
            7 => JudgeStatus::RuntimeError,
            8 => JudgeStatus::InternalError,
            9 => JudgeStatus::ExecFormatError,
            10 => JudgeStatus::MemoryLimitExceeded,
            _ => return None,
        };
        Some(status)
    }

    /// `None` for `Unknown`; the raw id then lives on the judge result.
    pub fn id(&self) -> Option<i64> {
        let id = match self {
            JudgeStatus::InQueue => 1,
            JudgeStatus::Processing => 2,
            JudgeStatus::Accepted => 3,
            JudgeStatus::WrongAnswer => 4,
            JudgeStatus::TimeLimitExceeded => 5,
            JudgeStatus::CompilationError => 6,
            JudgeStatus::RuntimeError => 7,
            JudgeStatus::InternalError => 8,
            JudgeStatus::ExecFormatError => 9,
            JudgeStatus::MemoryLimitExceeded => 10,
            JudgeStatus::Unknown => return None,
        };
        Some(id)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JudgeStatus::InQueue | JudgeStatus::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JudgeStatus::InQueue => "IN_QUEUE",
            JudgeStatus::Processing => "PROCESSING",
            JudgeStatus::Accepted => "ACCEPTED",
            JudgeStatus::WrongAnswer => "WRONG_ANSWER",
            JudgeStatus::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            JudgeStatus::CompilationError => "COMPILATION_ERROR",
            JudgeStatus::RuntimeError => "RUNTIME_ERROR",
            JudgeStatus::InternalError => "INTERNAL_ERROR",
            JudgeStatus::ExecFormatError => "EXEC_FORMAT_ERROR",
            JudgeStatus::MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
            JudgeStatus::Unknown => "UNKNOWN",
        }
    }
}

/// Per-case outcome: either what the judge said, or `ERROR` when the case never got a
/// judge verdict (submit failure, poll failure, poll timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CaseStatus {
    Judged(JudgeStatus),
    Error,
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseStatus::Judged(status) => f.write_str(status.as_str()),
            CaseStatus::Error => f.write_str("ERROR"),
        }
    }
}

impl From<CaseStatus> for String {
    fn from(status: CaseStatus) -> Self {
        status.to_string()
    }
}

impl TryFrom<String> for CaseStatus {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, String> {
        if raw == "ERROR" {
            return Ok(CaseStatus::Error);
        }
        serde_json::from_value::<JudgeStatus>(JsonValue::String(raw.clone()))
            .map(CaseStatus::Judged)
            .map_err(|_| format!("unknown case status '{}'", raw))
    }
}

/// Aggregate outcome of a graded coding submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeError,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Accepted => "ACCEPTED",
            Verdict::WrongAnswer => "WRONG_ANSWER",
            Verdict::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            Verdict::CompilationError => "COMPILATION_ERROR",
            Verdict::RuntimeError => "RUNTIME_ERROR",
        }
    }
}

impl std::str::FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(JsonValue::String(s.to_string()))
            .map_err(|_| format!("unknown verdict '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_number: usize,
    pub input: String,
    pub expected_output: String,
    pub actual_output: Option<String>,
    pub passed: bool,
    pub status: CaseStatus,
    pub status_id: Option<i64>,
    pub time_ms: Option<f64>,
    pub memory_kb: Option<i64>,
    pub error: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub timed_out: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingSubmission {
    pub id: Uuid,
    pub test_id: Uuid,
    pub question_id: i32,
    pub student_id: i64,
    pub language_id: i32,
    pub code: String,
    pub verdict: Verdict,
    pub score: f64,
    pub passed_count: i32,
    pub total_count: i32,
    pub case_results: Vec<CaseResult>,
    pub avg_time_ms: Option<f64>,
    pub avg_memory_kb: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewCodingSubmission {
    pub test_id: Uuid,
    pub question_id: i32,
    pub student_id: i64,
    pub language_id: i32,
    pub code: String,
    pub verdict: Verdict,
    pub score: f64,
    pub passed_count: i32,
    pub total_count: i32,
    pub case_results: Vec<CaseResult>,
    pub avg_time_ms: Option<f64>,
    pub avg_memory_kb: Option<f64>,
    pub error_message: Option<String>,
}

/// A selected option for one aptitude question. `selected_index` stays raw JSON so that
/// non-numeric input can be scored as unanswered instead of failing the whole submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AptitudeAnswer {
    pub question_id: i32,
    #[serde(default)]
    pub selected_index: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AptitudeSubmission {
    pub id: Uuid,
    pub test_id: Uuid,
    pub student_id: i64,
    pub answers: Vec<AptitudeAnswer>,
    pub score: i64,
    pub max_score: i64,
    pub required_score: Option<f64>,
    pub passed: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewAptitudeSubmission {
    pub test_id: Uuid,
    pub student_id: i64,
    pub answers: Vec<AptitudeAnswer>,
    pub score: i64,
    pub max_score: i64,
    pub required_score: Option<f64>,
    pub passed: bool,
}
