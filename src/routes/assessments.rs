use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::assessment_dto::{
        AptitudeSubmitPayload, CodeSubmitPayload, CodeSubmitResponse, CompanyActionPayload,
        StudentQuery, TestPayload,
    },
    error::{Error, Result},
    models::test::TestKind,
    AppState,
};

fn parse_kind(raw: &str) -> Result<TestKind> {
    raw.parse().map_err(Error::BadRequest)
}

#[axum::debug_handler]
pub async fn create_test(
    State(state): State<AppState>,
    Path((job_id, kind)): Path<(i64, String)>,
    Json(payload): Json<TestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let kind = parse_kind(&kind)?;
    let test = state.test_service.create_test(job_id, kind, payload).await?;
    Ok((StatusCode::CREATED, Json(test)))
}

#[axum::debug_handler]
pub async fn get_test(
    State(state): State<AppState>,
    Path((job_id, kind)): Path<(i64, String)>,
) -> Result<impl IntoResponse> {
    let test = state.test_service.get_test(job_id, parse_kind(&kind)?).await?;
    Ok(Json(test))
}

#[axum::debug_handler]
pub async fn update_test(
    State(state): State<AppState>,
    Path((job_id, kind)): Path<(i64, String)>,
    Json(payload): Json<TestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let kind = parse_kind(&kind)?;
    let test = state.test_service.update_test(job_id, kind, payload).await?;
    Ok(Json(test))
}

#[axum::debug_handler]
pub async fn start_test(
    State(state): State<AppState>,
    Path((job_id, kind)): Path<(i64, String)>,
    Json(payload): Json<CompanyActionPayload>,
) -> Result<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let started = state
        .test_service
        .start_test(payload.company_id, job_id, kind)
        .await?;
    Ok(Json(started))
}

#[axum::debug_handler]
pub async fn stop_test(
    State(state): State<AppState>,
    Path((job_id, kind)): Path<(i64, String)>,
    Json(payload): Json<CompanyActionPayload>,
) -> Result<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let test = state
        .test_service
        .stop_test(payload.company_id, job_id, kind)
        .await?;
    Ok(Json(test))
}

#[axum::debug_handler]
pub async fn submit_aptitude(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    Json(payload): Json<AptitudeSubmitPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let submission = state
        .test_service
        .submit_aptitude(job_id, payload.student_id, payload.answers)
        .await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

#[axum::debug_handler]
pub async fn submit_code(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    Json(payload): Json<CodeSubmitPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let submission = state
        .test_service
        .submit_code(
            job_id,
            payload.student_id,
            payload.question_id,
            payload.language_id,
            &payload.code,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(CodeSubmitResponse::from(submission))))
}

#[axum::debug_handler]
pub async fn list_code_submissions(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    Query(query): Query<StudentQuery>,
) -> Result<impl IntoResponse> {
    let submissions = state
        .test_service
        .list_code_submissions(job_id, query.student_id)
        .await?;
    Ok(Json(submissions))
}
