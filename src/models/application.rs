use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "SHORTLISTED")]
    Shortlisted,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "REVIEW")]
    Review,
    #[serde(rename = "PASSED APTITUDE")]
    PassedAptitude,
    #[serde(rename = "FAILED APTITUDE")]
    FailedAptitude,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Shortlisted => "SHORTLISTED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Review => "REVIEW",
            ApplicationStatus::PassedAptitude => "PASSED APTITUDE",
            ApplicationStatus::FailedAptitude => "FAILED APTITUDE",
        }
    }

    /// Applications that have moved on to the test stage are no longer shortlisting input.
    pub fn is_past_shortlisting(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::PassedAptitude | ApplicationStatus::FailedAptitude
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(ApplicationStatus::Pending),
            "SHORTLISTED" => Ok(ApplicationStatus::Shortlisted),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            "REVIEW" => Ok(ApplicationStatus::Review),
            "PASSED APTITUDE" => Ok(ApplicationStatus::PassedAptitude),
            "FAILED APTITUDE" => Ok(ApplicationStatus::FailedAptitude),
            other => Err(format!("unknown application status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub job_id: i64,
    pub student_id: i64,
    pub status: ApplicationStatus,
    pub cgpa: Option<f64>,
    pub backlog: Option<i32>,
    pub skills: Option<String>,
    pub cv_url: Option<String>,
    pub decision_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub cgpa: Option<f64>,
    pub backlog: Option<i32>,
    pub cv_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetrics {
    pub cgpa: Option<f64>,
    pub backlog: Option<i32>,
}

impl CandidateMetrics {
    /// Application values win; each missing field falls back to the student profile.
    pub fn resolve(application: &Application, profile: Option<&StudentProfile>) -> Self {
        Self {
            cgpa: application.cgpa.or_else(|| profile.and_then(|p| p.cgpa)),
            backlog: application.backlog.or_else(|| profile.and_then(|p| p.backlog)),
        }
    }
}

impl Application {
    pub fn cv_reference<'a>(&'a self, profile: Option<&'a StudentProfile>) -> Option<&'a str> {
        self.cv_url
            .as_deref()
            .or_else(|| profile.and_then(|p| p.cv_url.as_deref()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
