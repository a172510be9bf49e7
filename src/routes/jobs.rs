use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::{
        assessment_dto::{EligibilityCheckPayload, PolicyPayload},
        shortlist_dto::ShortlistPayload,
    },
    error::Result,
    models::{application::CandidateMetrics, job::EligibilityPolicy},
    AppState,
};

#[axum::debug_handler]
pub async fn update_policy(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    Json(payload): Json<PolicyPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state
        .job_service
        .update_eligibility_policy(payload.company_id, job_id, EligibilityPolicy::from(&payload))
        .await?;
    Ok(Json(job))
}

#[axum::debug_handler]
pub async fn check_eligibility(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    Json(payload): Json<EligibilityCheckPayload>,
) -> Result<impl IntoResponse> {
    let metrics = CandidateMetrics {
        cgpa: payload.cgpa,
        backlog: payload.backlog,
    };
    let outcome = state.job_service.check_eligibility(job_id, metrics).await?;
    Ok(Json(outcome))
}

#[axum::debug_handler]
pub async fn run_shortlist(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    Json(payload): Json<ShortlistPayload>,
) -> Result<impl IntoResponse> {
    let summary = state
        .shortlist_service
        .run_batch(payload.company_id, job_id, payload.mode)
        .await?;
    Ok(Json(summary))
}
