use crate::models::shortlist::DecisionStatus;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct ScoreRequest {
    pub resume_text: String,
    pub job_title: String,
    pub job_description: String,
    pub job_description_pdf_text: Option<String>,
    pub required_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreResponse {
    pub final_score: f64,
    pub decision: DecisionStatus,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("scoring service timed out after {0} ms")]
    Timeout(u64),

    #[error("scoring service unreachable: {0}")]
    Transport(String),

    #[error("scoring service returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("unreadable scoring response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ResumeScorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScoringError>;
}

#[derive(Clone)]
pub struct AtsClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl AtsClient {
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl ResumeScorer for AtsClient {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScoringError> {
        let timeout_ms = self.timeout.as_millis() as u64;
        let res = self
            .client
            .post(format!("{}/evaluate-resume", self.base_url))
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScoringError::Timeout(timeout_ms)
                } else {
                    tracing::error!(error = %e, "Scoring service request failed");
                    ScoringError::Transport(e.to_string())
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Scoring service rejected request");
            return Err(ScoringError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let text = res.text().await.map_err(|e| {
            if e.is_timeout() {
                ScoringError::Timeout(timeout_ms)
            } else {
                ScoringError::Transport(e.to_string())
            }
        })?;
        serde_json::from_str(&text).map_err(|e| ScoringError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_service_response_ignoring_extra_fields() {
        let raw = r#"{
            "final_score": 0.81,
            "decision": "SHORTLISTED",
            "feature_scores": {"semantic_similarity": 0.9},
            "explanation": "Final Score: 81.00%",
            "parsed_resume": {}
        }"#;
        let parsed: ScoreResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.decision, DecisionStatus::Shortlisted);
        assert!((parsed.final_score - 0.81).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_decision_is_a_decode_error() {
        let raw = r#"{"final_score": 0.5, "decision": "MAYBE", "explanation": ""}"#;
        assert!(serde_json::from_str::<ScoreResponse>(raw).is_err());
    }
}
