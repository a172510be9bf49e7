use crate::models::application::ApplicationStatus;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Shortlisted,
    Review,
    Rejected,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Shortlisted => "SHORTLISTED",
            DecisionStatus::Review => "REVIEW",
            DecisionStatus::Rejected => "REJECTED",
        }
    }
}

impl From<DecisionStatus> for ApplicationStatus {
    fn from(status: DecisionStatus) -> Self {
        match status {
            DecisionStatus::Shortlisted => ApplicationStatus::Shortlisted,
            DecisionStatus::Review => ApplicationStatus::Review,
            DecisionStatus::Rejected => ApplicationStatus::Rejected,
        }
    }
}

impl FromStr for DecisionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SHORTLISTED" => Ok(DecisionStatus::Shortlisted),
            "REVIEW" => Ok(DecisionStatus::Review),
            "REJECTED" => Ok(DecisionStatus::Rejected),
            other => Err(format!("unknown decision '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistDecision {
    pub application_id: i64,
    pub student_id: i64,
    pub new_status: DecisionStatus,
    pub reason: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortlistMode {
    Eligibility,
    #[default]
    ResumeScoring,
}
