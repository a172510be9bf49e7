#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use placement_backend::database::{MemoryStore, Store};
use placement_backend::error::Result as StoreResult;
use placement_backend::models::application::{Application, ApplicationStatus, StudentProfile};
use placement_backend::models::interview::{InterviewMode, InterviewSession};
use placement_backend::models::job::{EligibilityPolicy, Job};
use placement_backend::models::notification::{NewNotification, Notification};
use placement_backend::models::question::{AptitudeDetails, CodingDetails, Question, QuestionDetails};
use placement_backend::models::submission::{
    AptitudeSubmission, CodingSubmission, JudgeStatus, NewAptitudeSubmission, NewCodingSubmission,
};
use placement_backend::models::test::{NewTest, TestDefinition, TestKind};
use placement_backend::services::ats_service::{ResumeScorer, ScoreRequest, ScoreResponse, ScoringError};
use placement_backend::services::judge_client::{JudgeApi, JudgeError, JudgeResult, JudgeSettings, JudgeSubmission};
use placement_backend::services::shortlist_service::PipelineSettings;
use placement_backend::services::storage_service::{DownloadError, ObjectStorage};
use placement_backend::services::text_extract::{ExtractError, TextExtractor};
use placement_backend::{AppState, Boundaries};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const COMPANY: i64 = 10;
pub const OTHER_COMPANY: i64 = 99;

pub fn job(id: i64) -> Job {
    Job {
        id,
        company_id: COMPANY,
        title: "Backend Engineer".into(),
        description: "Build and operate Rust services".into(),
        required_skills: Some(r#"["Rust", "SQL"]"#.into()),
        description_pdf_url: None,
        policy: EligibilityPolicy {
            min_cgpa: Some(7.0),
            cgpa_counts: true,
            allow_backlog: false,
            max_backlog: None,
        },
        created_at: None,
    }
}

pub fn application(id: i64, job_id: i64, student_id: i64, status: ApplicationStatus) -> Application {
    Application {
        id,
        job_id,
        student_id,
        status,
        cgpa: Some(8.0),
        backlog: Some(0),
        skills: None,
        cv_url: None,
        decision_reason: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn student(id: i64) -> StudentProfile {
    StudentProfile {
        id,
        name: format!("Student {}", id),
        email: format!("student{}@campus.test", id),
        cgpa: None,
        backlog: None,
        cv_url: None,
    }
}

pub fn aptitude_question(id: i32, correct_index: i32, marks: i32) -> Question {
    Question {
        id,
        title: format!("Aptitude {}", id),
        description: None,
        details: QuestionDetails::Aptitude(AptitudeDetails {
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index,
            marks,
        }),
    }
}

pub fn coding_question(id: i32, inputs: &[&str], outputs: &[&str], points: i32) -> Question {
    Question {
        id,
        title: format!("Coding {}", id),
        description: None,
        details: QuestionDetails::Coding(CodingDetails {
            test_cases: inputs.iter().map(|s| s.to_string()).collect(),
            expected_outputs: outputs.iter().map(|s| s.to_string()).collect(),
            points,
            difficulty: None,
            sample_input: None,
            sample_output: None,
            constraints: None,
        }),
    }
}

/// Judge whose outcome is keyed by stdin. Unknown stdin stays in the queue forever.
#[derive(Default)]
pub struct ScriptedJudge {
    outcomes: HashMap<String, (JudgeStatus, String)>,
    refused: HashSet<String>,
    pub submissions: Mutex<Vec<JudgeSubmission>>,
}

impl ScriptedJudge {
    pub fn with(mut self, stdin: &str, status: JudgeStatus, stdout: &str) -> Self {
        self.outcomes
            .insert(stdin.to_string(), (status, stdout.to_string()));
        self
    }

    /// Submissions with this stdin are rejected outright.
    pub fn refuse(mut self, stdin: &str) -> Self {
        self.refused.insert(stdin.to_string());
        self
    }
}

#[async_trait]
impl JudgeApi for ScriptedJudge {
    async fn submit(&self, submission: &JudgeSubmission) -> Result<String, JudgeError> {
        self.submissions.lock().unwrap().push(submission.clone());
        if self.refused.contains(&submission.stdin) {
            return Err(JudgeError::Submit("status 503: judge unavailable".into()));
        }
        Ok(submission.stdin.clone())
    }

    async fn poll(&self, token: &str) -> Result<JudgeResult, JudgeError> {
        match self.outcomes.get(token) {
            Some((status, stdout)) => Ok(JudgeResult {
                status: *status,
                status_id: status.id().unwrap_or(99),
                description: Some(status.as_str().to_string()),
                stdout: Some(stdout.clone()),
                stderr: None,
                compile_output: None,
                time_ms: Some(12.0),
                memory_kb: Some(2048),
            }),
            None => Ok(JudgeResult::pending(JudgeStatus::InQueue)),
        }
    }
}

/// Object storage backed by two maps: bucket objects and plain URLs.
#[derive(Default)]
pub struct MapStorage {
    objects: HashMap<(String, String), Bytes>,
    urls: HashMap<String, Bytes>,
    pub calls: Mutex<Vec<String>>,
}

impl MapStorage {
    pub fn object(mut self, bucket: &str, path: &str, body: &[u8]) -> Self {
        self.objects
            .insert((bucket.into(), path.into()), Bytes::copy_from_slice(body));
        self
    }

    pub fn url(mut self, url: &str, body: &[u8]) -> Self {
        self.urls.insert(url.into(), Bytes::copy_from_slice(body));
        self
    }
}

#[async_trait]
impl ObjectStorage for MapStorage {
    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, DownloadError> {
        self.calls.lock().unwrap().push(format!("storage {}/{}", bucket, path));
        self.objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| DownloadError::Storage("Object not found".into()))
    }

    async fn http_get(&self, url: &str) -> Result<Bytes, DownloadError> {
        self.calls.lock().unwrap().push(format!("http {}", url));
        self.urls
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::Http("status 404: not found".into()))
    }
}

/// Treats everything after the `%PDF` marker as the document text.
pub struct PlainPdf;

#[async_trait]
impl TextExtractor for PlainPdf {
    async fn extract_pdf(&self, data: &[u8]) -> Result<String, ExtractError> {
        Ok(String::from_utf8_lossy(&data[4.min(data.len())..]).to_string())
    }
}

pub fn pdf(text: &str) -> Vec<u8> {
    let mut body = b"%PDF".to_vec();
    body.extend_from_slice(text.as_bytes());
    body
}

/// Scorer that must never be reached.
pub struct UnusedScorer;

#[async_trait]
impl ResumeScorer for UnusedScorer {
    async fn score(&self, _request: &ScoreRequest) -> Result<ScoreResponse, ScoringError> {
        Err(ScoringError::Transport("scorer not expected in this test".into()))
    }
}

pub fn judge_settings() -> JudgeSettings {
    JudgeSettings {
        api_url: "http://judge.invalid".into(),
        api_key: None,
        poll_timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(50),
        memory_limit_kb: 128_000,
        grading_concurrency: 2,
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

/// Memory store that yields to the runtime after every read, the way a database round trip
/// would, so concurrent callers interleave between a lookup and the write that follows it.
pub struct YieldingStore(pub Arc<MemoryStore>);

impl YieldingStore {
    async fn pause(&self) {
        tokio::task::yield_now().await;
    }
}

#[async_trait]
impl Store for YieldingStore {
    async fn get_job(&self, job_id: i64) -> StoreResult<Job> {
        let job = self.0.get_job(job_id).await;
        self.pause().await;
        job
    }

    async fn update_job_policy(&self, job_id: i64, policy: &EligibilityPolicy) -> StoreResult<Job> {
        self.0.update_job_policy(job_id, policy).await
    }

    async fn list_applications(&self, job_id: i64) -> StoreResult<Vec<Application>> {
        let apps = self.0.list_applications(job_id).await;
        self.pause().await;
        apps
    }

    async fn get_application(&self, application_id: i64) -> StoreResult<Application> {
        let app = self.0.get_application(application_id).await;
        self.pause().await;
        app
    }

    async fn find_application(&self, job_id: i64, student_id: i64) -> StoreResult<Option<Application>> {
        let app = self.0.find_application(job_id, student_id).await;
        self.pause().await;
        app
    }

    async fn update_application_status(
        &self,
        application_id: i64,
        status: ApplicationStatus,
        reason: Option<&str>,
    ) -> StoreResult<()> {
        self.0.update_application_status(application_id, status, reason).await
    }

    async fn get_student(&self, student_id: i64) -> StoreResult<Option<StudentProfile>> {
        let student = self.0.get_student(student_id).await;
        self.pause().await;
        student
    }

    async fn get_test(&self, job_id: i64, kind: TestKind) -> StoreResult<Option<TestDefinition>> {
        let test = self.0.get_test(job_id, kind).await;
        self.pause().await;
        test
    }

    async fn list_tests(&self, job_id: i64) -> StoreResult<Vec<TestDefinition>> {
        let tests = self.0.list_tests(job_id).await;
        self.pause().await;
        tests
    }

    async fn create_test(&self, test: NewTest) -> StoreResult<TestDefinition> {
        self.0.create_test(test).await
    }

    async fn update_test(&self, test: &TestDefinition) -> StoreResult<TestDefinition> {
        self.0.update_test(test).await
    }

    async fn create_coding_submission(&self, sub: NewCodingSubmission) -> StoreResult<CodingSubmission> {
        self.0.create_coding_submission(sub).await
    }

    async fn list_coding_submissions(
        &self,
        test_id: Uuid,
        student_id: i64,
    ) -> StoreResult<Vec<CodingSubmission>> {
        self.0.list_coding_submissions(test_id, student_id).await
    }

    async fn find_aptitude_submission(
        &self,
        test_id: Uuid,
        student_id: i64,
    ) -> StoreResult<Option<AptitudeSubmission>> {
        let found = self.0.find_aptitude_submission(test_id, student_id).await;
        self.pause().await;
        found
    }

    async fn create_aptitude_submission(
        &self,
        sub: NewAptitudeSubmission,
    ) -> StoreResult<AptitudeSubmission> {
        self.0.create_aptitude_submission(sub).await
    }

    async fn create_notification(&self, notification: NewNotification) -> StoreResult<Notification> {
        self.0.create_notification(notification).await
    }

    async fn latest_interview_session(
        &self,
        application_id: i64,
    ) -> StoreResult<Option<InterviewSession>> {
        self.0.latest_interview_session(application_id).await
    }

    async fn create_interview_session(
        &self,
        application_id: i64,
        job_id: i64,
        mode: InterviewMode,
    ) -> StoreResult<InterviewSession> {
        self.0.create_interview_session(application_id, job_id, mode).await
    }

    async fn save_interview_session(&self, session: &InterviewSession) -> StoreResult<InterviewSession> {
        self.0.save_interview_session(session).await
    }
}

pub fn harness_with(
    store: Arc<MemoryStore>,
    judge: Arc<dyn JudgeApi>,
    storage: Arc<dyn ObjectStorage>,
    scorer: Arc<dyn ResumeScorer>,
) -> Harness {
    let dyn_store: Arc<dyn Store> = store.clone();
    harness_over(store, dyn_store, judge, storage, scorer)
}

/// Services run against `service_store`; `store` is kept for seeding and assertions.
pub fn harness_over(
    store: Arc<MemoryStore>,
    service_store: Arc<dyn Store>,
    judge: Arc<dyn JudgeApi>,
    storage: Arc<dyn ObjectStorage>,
    scorer: Arc<dyn ResumeScorer>,
) -> Harness {
    let state = AppState::from_parts(
        Boundaries {
            store: service_store,
            judge,
            storage,
            extractor: Arc::new(PlainPdf),
            scorer,
        },
        judge_settings(),
        PipelineSettings {
            batch_concurrency: 3,
            ..PipelineSettings::default()
        },
    );
    Harness { store, state }
}

pub fn yielding_harness(judge: ScriptedJudge) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let service_store: Arc<dyn Store> = Arc::new(YieldingStore(store.clone()));
    harness_over(
        store,
        service_store,
        Arc::new(judge),
        Arc::new(MapStorage::default()),
        Arc::new(UnusedScorer),
    )
}

pub fn harness(judge: ScriptedJudge) -> Harness {
    harness_with(
        Arc::new(MemoryStore::new()),
        Arc::new(judge),
        Arc::new(MapStorage::default()),
        Arc::new(UnusedScorer),
    )
}
