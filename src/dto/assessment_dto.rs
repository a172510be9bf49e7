use crate::models::job::EligibilityPolicy;
use crate::models::question::Question;
use crate::models::submission::{AptitudeAnswer, CodingSubmission, Verdict};
use crate::models::test::TestDefinition;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body for creating or replacing a test definition.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TestPayload {
    pub company_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub cutoff: Option<f64>,
    #[validate(range(min = 1, max = 600))]
    pub time_limit_minutes: Option<i32>,
    pub allowed_languages: Option<Vec<i32>>,
    #[validate(length(min = 1))]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyActionPayload {
    pub company_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartTestResponse {
    pub test: TestDefinition,
    pub notified: usize,
    pub total_shortlisted: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AptitudeSubmitPayload {
    pub student_id: i64,
    pub answers: Vec<AptitudeAnswer>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CodeSubmitPayload {
    pub student_id: i64,
    pub question_id: i32,
    pub language_id: i32,
    #[validate(length(min = 1, max = 65536))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeSubmitResponse {
    pub submission_id: uuid::Uuid,
    pub verdict: Verdict,
    pub score: f64,
    pub passed_count: i32,
    pub total_count: i32,
    pub submission: CodingSubmission,
}

impl From<CodingSubmission> for CodeSubmitResponse {
    fn from(submission: CodingSubmission) -> Self {
        Self {
            submission_id: submission.id,
            verdict: submission.verdict,
            score: submission.score,
            passed_count: submission.passed_count,
            total_count: submission.total_count,
            submission,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentQuery {
    pub student_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PolicyPayload {
    pub company_id: i64,
    #[validate(range(min = 0.0, max = 10.0))]
    pub min_cgpa: Option<f64>,
    #[serde(default = "default_true")]
    pub cgpa_counts: bool,
    #[serde(default)]
    pub allow_backlog: bool,
    #[validate(range(min = 0))]
    pub max_backlog: Option<i32>,
}

fn default_true() -> bool {
    true
}

impl From<&PolicyPayload> for EligibilityPolicy {
    fn from(p: &PolicyPayload) -> Self {
        EligibilityPolicy {
            min_cgpa: p.min_cgpa,
            cgpa_counts: p.cgpa_counts,
            allow_backlog: p.allow_backlog,
            max_backlog: p.max_backlog,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EligibilityCheckPayload {
    pub cgpa: Option<f64>,
    pub backlog: Option<i32>,
}
