use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewMode {
    Tech,
    Hr,
}

impl InterviewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewMode::Tech => "TECH",
            InterviewMode::Hr => "HR",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InterviewMode::Tech => "Technical",
            InterviewMode::Hr => "HR",
        }
    }
}

impl FromStr for InterviewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TECH" => Ok(InterviewMode::Tech),
            "HR" => Ok(InterviewMode::Hr),
            other => Err(format!("Mode must be TECH or HR, got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Stopped,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Stopped => "STOPPED",
            SessionStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(SessionStatus::Active),
            "STOPPED" => Ok(SessionStatus::Stopped),
            "COMPLETED" => Ok(SessionStatus::Completed),
            other => Err(format!("unknown session status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub index: usize,
    pub question: String,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewAnswer {
    pub question_index: usize,
    pub answer: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub application_id: i64,
    pub job_id: i64,
    pub mode: InterviewMode,
    pub status: SessionStatus,
    pub questions: Vec<InterviewQuestion>,
    pub answers: Vec<InterviewAnswer>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl InterviewSession {
    pub fn answer_for(&self, index: usize) -> Option<&InterviewAnswer> {
        self.answers.iter().find(|a| a.question_index == index)
    }
}
