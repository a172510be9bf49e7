pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::database::{PgStore, Store};
use crate::error::{Error, Result};
use crate::services::{
    ats_service::{AtsClient, ResumeScorer},
    grading_service::GradingService,
    interview_service::InterviewService,
    job_service::JobService,
    judge_client::{Judge0Client, JudgeApi, JudgeSettings},
    notification_service::{NotificationService, Notifier},
    shortlist_service::{PipelineSettings, ShortlistService},
    storage_service::{HttpObjectStorage, ObjectStorage},
    test_service::TestService,
    text_extract::{PdfToText, TextExtractor},
};
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// The external collaborators the engine talks to.
#[derive(Clone)]
pub struct Boundaries {
    pub store: Arc<dyn Store>,
    pub judge: Arc<dyn JudgeApi>,
    pub storage: Arc<dyn ObjectStorage>,
    pub extractor: Arc<dyn TextExtractor>,
    pub scorer: Arc<dyn ResumeScorer>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub test_service: TestService,
    pub job_service: JobService,
    pub shortlist_service: ShortlistService,
    pub interview_service: InterviewService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let judge_settings = JudgeSettings::from_config(config);
        let boundaries = Boundaries {
            store: Arc::new(PgStore::new(pool)),
            judge: Arc::new(Judge0Client::new(http_client.clone(), &judge_settings)),
            storage: Arc::new(HttpObjectStorage::new(
                http_client.clone(),
                config.storage_url.clone(),
                config.storage_service_key.clone(),
            )),
            extractor: Arc::new(PdfToText),
            scorer: Arc::new(AtsClient::new(
                http_client,
                &config.ats_service_url,
                Duration::from_millis(config.ats_timeout_ms),
            )),
        };

        Ok(Self::from_parts(
            boundaries,
            judge_settings,
            PipelineSettings::from_config(config),
        ))
    }

    pub fn from_parts(
        boundaries: Boundaries,
        judge_settings: JudgeSettings,
        pipeline: PipelineSettings,
    ) -> Self {
        let Boundaries {
            store,
            judge,
            storage,
            extractor,
            scorer,
        } = boundaries;

        let notifier: Arc<dyn Notifier> = Arc::new(NotificationService::new(store.clone()));
        let grader = GradingService::new(judge, judge_settings);

        Self {
            test_service: TestService::new(
                store.clone(),
                grader,
                notifier.clone(),
                pipeline.batch_concurrency,
            ),
            job_service: JobService::new(store.clone()),
            shortlist_service: ShortlistService::new(
                store.clone(),
                storage,
                extractor,
                scorer,
                notifier.clone(),
                pipeline,
            ),
            interview_service: InterviewService::new(store.clone(), notifier),
            store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let job_api = Router::new()
        .route(
            "/api/jobs/:job_id/eligibility-policy",
            axum::routing::put(routes::jobs::update_policy),
        )
        .route(
            "/api/jobs/:job_id/eligibility-check",
            post(routes::jobs::check_eligibility),
        )
        .route("/api/jobs/:job_id/shortlist", post(routes::jobs::run_shortlist));

    let assessment_api = Router::new()
        .route(
            "/api/jobs/:job_id/tests/:kind",
            get(routes::assessments::get_test)
                .post(routes::assessments::create_test)
                .put(routes::assessments::update_test),
        )
        .route(
            "/api/jobs/:job_id/tests/:kind/start",
            post(routes::assessments::start_test),
        )
        .route(
            "/api/jobs/:job_id/tests/:kind/stop",
            post(routes::assessments::stop_test),
        )
        .route(
            "/api/jobs/:job_id/aptitude/submissions",
            post(routes::assessments::submit_aptitude),
        )
        .route(
            "/api/jobs/:job_id/coding/submissions",
            get(routes::assessments::list_code_submissions).post(routes::assessments::submit_code),
        );

    let interview_api = Router::new()
        .route(
            "/api/applications/:application_id/interview",
            get(routes::interviews::get_session),
        )
        .route(
            "/api/applications/:application_id/interview/start",
            post(routes::interviews::start),
        )
        .route(
            "/api/applications/:application_id/interview/stop",
            post(routes::interviews::stop),
        )
        .route(
            "/api/applications/:application_id/interview/complete",
            post(routes::interviews::complete),
        )
        .route(
            "/api/applications/:application_id/interview/questions",
            post(routes::interviews::add_question),
        )
        .route(
            "/api/applications/:application_id/interview/answers",
            post(routes::interviews::submit_answer),
        );

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(job_api)
        .merge(assessment_api)
        .merge(interview_api)
        .with_state(state)
}
