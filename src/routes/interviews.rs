use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::{
        assessment_dto::CompanyActionPayload,
        interview_dto::{AddQuestionPayload, StartInterviewPayload, SubmitAnswerPayload},
    },
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.interview_service.current(application_id).await?))
}

#[axum::debug_handler]
pub async fn start(
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
    Json(payload): Json<StartInterviewPayload>,
) -> Result<impl IntoResponse> {
    let session = state
        .interview_service
        .start(payload.company_id, application_id, &payload.mode)
        .await?;
    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn stop(
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
    Json(payload): Json<CompanyActionPayload>,
) -> Result<impl IntoResponse> {
    let session = state
        .interview_service
        .stop(payload.company_id, application_id)
        .await?;
    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn complete(
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
    Json(payload): Json<CompanyActionPayload>,
) -> Result<impl IntoResponse> {
    let session = state
        .interview_service
        .complete(payload.company_id, application_id)
        .await?;
    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn add_question(
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
    Json(payload): Json<AddQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let session = state
        .interview_service
        .add_question(payload.company_id, application_id, &payload.question)
        .await?;
    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
    Json(payload): Json<SubmitAnswerPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let session = state
        .interview_service
        .submit_answer(
            payload.student_id,
            application_id,
            payload.question_index,
            &payload.answer,
        )
        .await?;
    Ok(Json(session))
}
