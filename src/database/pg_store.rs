use crate::database::store::Store;
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus, StudentProfile};
use crate::models::interview::{
    InterviewAnswer, InterviewMode, InterviewQuestion, InterviewSession, SessionStatus,
};
use crate::models::job::{EligibilityPolicy, Job};
use crate::models::notification::{NewNotification, Notification};
use crate::models::question::Question;
use crate::models::submission::{
    AptitudeAnswer, AptitudeSubmission, CaseResult, CodingSubmission, NewAptitudeSubmission,
    NewCodingSubmission,
};
use crate::models::test::{NewTest, TestDefinition, TestKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_column<T>(raw: &str, column: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse()
        .map_err(|e| Error::Internal(format!("Corrupt {} column: {}", column, e)))
}

const JOB_COLUMNS: &str = "id, company_id, title, description, required_skills, description_pdf_url, \
     min_cgpa, cgpa_counts, allow_backlog, max_backlog, created_at";

#[derive(FromRow)]
struct JobRow {
    id: i64,
    company_id: i64,
    title: String,
    description: Option<String>,
    required_skills: Option<String>,
    description_pdf_url: Option<String>,
    min_cgpa: Option<f64>,
    cgpa_counts: bool,
    allow_backlog: bool,
    max_backlog: Option<i32>,
    created_at: Option<DateTime<Utc>>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            company_id: row.company_id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            required_skills: row.required_skills,
            description_pdf_url: row.description_pdf_url,
            policy: EligibilityPolicy {
                min_cgpa: row.min_cgpa,
                cgpa_counts: row.cgpa_counts,
                allow_backlog: row.allow_backlog,
                max_backlog: row.max_backlog,
            },
            created_at: row.created_at,
        }
    }
}

const APPLICATION_COLUMNS: &str = "id, job_id, student_id, status, cgpa, backlog, skills, cv_url, \
     decision_reason, created_at, updated_at";

#[derive(FromRow)]
struct ApplicationRow {
    id: i64,
    job_id: i64,
    student_id: i64,
    status: String,
    cgpa: Option<f64>,
    backlog: Option<i32>,
    skills: Option<String>,
    cv_url: Option<String>,
    decision_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        Ok(Application {
            id: row.id,
            job_id: row.job_id,
            student_id: row.student_id,
            status: parse_column::<ApplicationStatus>(&row.status, "applications.status")?,
            cgpa: row.cgpa,
            backlog: row.backlog,
            skills: row.skills,
            cv_url: row.cv_url,
            decision_reason: row.decision_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const TEST_COLUMNS: &str = "id, job_id, kind, title, description, status, cutoff, time_limit_minutes, \
     allowed_languages, questions, started_at, stopped_at, created_at, updated_at";

#[derive(FromRow)]
struct TestRow {
    id: Uuid,
    job_id: i64,
    kind: String,
    title: String,
    description: Option<String>,
    status: String,
    cutoff: Option<f64>,
    time_limit_minutes: i32,
    allowed_languages: Vec<i32>,
    questions: Json<Vec<Question>>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<TestRow> for TestDefinition {
    type Error = Error;

    fn try_from(row: TestRow) -> Result<Self> {
        Ok(TestDefinition {
            id: row.id,
            job_id: row.job_id,
            kind: parse_column(&row.kind, "assessment_tests.kind")?,
            title: row.title,
            description: row.description,
            status: parse_column(&row.status, "assessment_tests.status")?,
            cutoff: row.cutoff,
            time_limit_minutes: row.time_limit_minutes,
            allowed_languages: row.allowed_languages,
            questions: row.questions.0,
            started_at: row.started_at,
            stopped_at: row.stopped_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const CODING_COLUMNS: &str = "id, test_id, question_id, student_id, language_id, code, verdict, score, \
     passed_count, total_count, case_results, avg_time_ms, avg_memory_kb, error_message, created_at";

#[derive(FromRow)]
struct CodingRow {
    id: Uuid,
    test_id: Uuid,
    question_id: i32,
    student_id: i64,
    language_id: i32,
    code: String,
    verdict: String,
    score: f64,
    passed_count: i32,
    total_count: i32,
    case_results: Json<Vec<CaseResult>>,
    avg_time_ms: Option<f64>,
    avg_memory_kb: Option<f64>,
    error_message: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<CodingRow> for CodingSubmission {
    type Error = Error;

    fn try_from(row: CodingRow) -> Result<Self> {
        Ok(CodingSubmission {
            id: row.id,
            test_id: row.test_id,
            question_id: row.question_id,
            student_id: row.student_id,
            language_id: row.language_id,
            code: row.code,
            verdict: parse_column(&row.verdict, "coding_submissions.verdict")?,
            score: row.score,
            passed_count: row.passed_count,
            total_count: row.total_count,
            case_results: row.case_results.0,
            avg_time_ms: row.avg_time_ms,
            avg_memory_kb: row.avg_memory_kb,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}

const APTITUDE_COLUMNS: &str =
    "id, test_id, student_id, answers, score, max_score, required_score, passed, created_at";

#[derive(FromRow)]
struct AptitudeRow {
    id: Uuid,
    test_id: Uuid,
    student_id: i64,
    answers: Json<Vec<AptitudeAnswer>>,
    score: i64,
    max_score: i64,
    required_score: Option<f64>,
    passed: bool,
    created_at: Option<DateTime<Utc>>,
}

impl From<AptitudeRow> for AptitudeSubmission {
    fn from(row: AptitudeRow) -> Self {
        AptitudeSubmission {
            id: row.id,
            test_id: row.test_id,
            student_id: row.student_id,
            answers: row.answers.0,
            score: row.score,
            max_score: row.max_score,
            required_score: row.required_score,
            passed: row.passed,
            created_at: row.created_at,
        }
    }
}

const INTERVIEW_COLUMNS: &str =
    "id, application_id, job_id, mode, status, questions, answers, created_at, completed_at";

#[derive(FromRow)]
struct InterviewRow {
    id: Uuid,
    application_id: i64,
    job_id: i64,
    mode: String,
    status: String,
    questions: Json<Vec<InterviewQuestion>>,
    answers: Json<Vec<InterviewAnswer>>,
    created_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<InterviewRow> for InterviewSession {
    type Error = Error;

    fn try_from(row: InterviewRow) -> Result<Self> {
        Ok(InterviewSession {
            id: row.id,
            application_id: row.application_id,
            job_id: row.job_id,
            mode: parse_column::<InterviewMode>(&row.mode, "interview_sessions.mode")?,
            status: parse_column::<SessionStatus>(&row.status, "interview_sessions.status")?,
            questions: row.questions.0,
            answers: row.answers.0,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_job(&self, job_id: i64) -> Result<Job> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Job {} not found", job_id)))?;
        Ok(row.into())
    }

    async fn update_job_policy(&self, job_id: i64, policy: &EligibilityPolicy) -> Result<Job> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "UPDATE jobs SET min_cgpa = $1, cgpa_counts = $2, allow_backlog = $3, max_backlog = $4 \
             WHERE id = $5 RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(policy.min_cgpa)
        .bind(policy.cgpa_counts)
        .bind(policy.allow_backlog)
        .bind(policy.max_backlog)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Job {} not found", job_id)))?;
        Ok(row.into())
    }

    async fn list_applications(&self, job_id: i64) -> Result<Vec<Application>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {} FROM applications WHERE job_id = $1 ORDER BY id",
            APPLICATION_COLUMNS
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Application::try_from).collect()
    }

    async fn get_application(&self, application_id: i64) -> Result<Application> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {} FROM applications WHERE id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Application {} not found", application_id)))?;
        row.try_into()
    }

    async fn find_application(&self, job_id: i64, student_id: i64) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {} FROM applications WHERE job_id = $1 AND student_id = $2",
            APPLICATION_COLUMNS
        ))
        .bind(job_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Application::try_from).transpose()
    }

    async fn update_application_status(
        &self,
        application_id: i64,
        status: ApplicationStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE applications SET status = $1, decision_reason = COALESCE($2, decision_reason), \
             updated_at = NOW() WHERE id = $3",
        )
        .bind(status.as_str())
        .bind(reason)
        .bind(application_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "Application {} not found",
                application_id
            )));
        }
        Ok(())
    }

    async fn get_student(&self, student_id: i64) -> Result<Option<StudentProfile>> {
        let row = sqlx::query_as::<_, (i64, String, String, Option<f64>, Option<i32>, Option<String>)>(
            "SELECT id, name, email, cgpa, backlog, cv_url FROM students WHERE id = $1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, email, cgpa, backlog, cv_url)| StudentProfile {
            id,
            name,
            email,
            cgpa,
            backlog,
            cv_url,
        }))
    }

    async fn get_test(&self, job_id: i64, kind: TestKind) -> Result<Option<TestDefinition>> {
        let row = sqlx::query_as::<_, TestRow>(&format!(
            "SELECT {} FROM assessment_tests WHERE job_id = $1 AND kind = $2",
            TEST_COLUMNS
        ))
        .bind(job_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TestDefinition::try_from).transpose()
    }

    async fn list_tests(&self, job_id: i64) -> Result<Vec<TestDefinition>> {
        let rows = sqlx::query_as::<_, TestRow>(&format!(
            "SELECT {} FROM assessment_tests WHERE job_id = $1 ORDER BY created_at",
            TEST_COLUMNS
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TestDefinition::try_from).collect()
    }

    async fn create_test(&self, test: NewTest) -> Result<TestDefinition> {
        // unique (job_id, kind) turns a second insert into AlreadyExists via From<sqlx::Error>
        let row = sqlx::query_as::<_, TestRow>(&format!(
            "INSERT INTO assessment_tests \
             (id, job_id, kind, title, description, status, cutoff, time_limit_minutes, allowed_languages, questions) \
             VALUES ($1, $2, $3, $4, $5, 'CREATED', $6, $7, $8, $9) RETURNING {}",
            TEST_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(test.job_id)
        .bind(test.kind.as_str())
        .bind(&test.title)
        .bind(&test.description)
        .bind(test.cutoff)
        .bind(test.time_limit_minutes)
        .bind(&test.allowed_languages)
        .bind(Json(&test.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match Error::from(e) {
            Error::AlreadyExists(_) => Error::AlreadyExists(format!(
                "{} test already exists for job {}",
                test.kind.label(),
                test.job_id
            )),
            other => other,
        })?;
        row.try_into()
    }

    async fn update_test(&self, test: &TestDefinition) -> Result<TestDefinition> {
        let row = sqlx::query_as::<_, TestRow>(&format!(
            "UPDATE assessment_tests SET title = $1, description = $2, status = $3, cutoff = $4, \
             time_limit_minutes = $5, allowed_languages = $6, questions = $7, started_at = $8, \
             stopped_at = $9, updated_at = NOW() WHERE id = $10 RETURNING {}",
            TEST_COLUMNS
        ))
        .bind(&test.title)
        .bind(&test.description)
        .bind(test.status.as_str())
        .bind(test.cutoff)
        .bind(test.time_limit_minutes)
        .bind(&test.allowed_languages)
        .bind(Json(&test.questions))
        .bind(test.started_at)
        .bind(test.stopped_at)
        .bind(test.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Test {} not found", test.id)))?;
        row.try_into()
    }

    async fn create_coding_submission(&self, sub: NewCodingSubmission) -> Result<CodingSubmission> {
        let row = sqlx::query_as::<_, CodingRow>(&format!(
            "INSERT INTO coding_submissions \
             (id, test_id, question_id, student_id, language_id, code, verdict, score, passed_count, \
              total_count, case_results, avg_time_ms, avg_memory_kb, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING {}",
            CODING_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(sub.test_id)
        .bind(sub.question_id)
        .bind(sub.student_id)
        .bind(sub.language_id)
        .bind(&sub.code)
        .bind(sub.verdict.as_str())
        .bind(sub.score)
        .bind(sub.passed_count)
        .bind(sub.total_count)
        .bind(Json(&sub.case_results))
        .bind(sub.avg_time_ms)
        .bind(sub.avg_memory_kb)
        .bind(&sub.error_message)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn list_coding_submissions(
        &self,
        test_id: Uuid,
        student_id: i64,
    ) -> Result<Vec<CodingSubmission>> {
        let rows = sqlx::query_as::<_, CodingRow>(&format!(
            "SELECT {} FROM coding_submissions WHERE test_id = $1 AND student_id = $2 \
             ORDER BY created_at DESC",
            CODING_COLUMNS
        ))
        .bind(test_id)
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CodingSubmission::try_from).collect()
    }

    async fn find_aptitude_submission(
        &self,
        test_id: Uuid,
        student_id: i64,
    ) -> Result<Option<AptitudeSubmission>> {
        let row = sqlx::query_as::<_, AptitudeRow>(&format!(
            "SELECT {} FROM aptitude_submissions WHERE test_id = $1 AND student_id = $2 LIMIT 1",
            APTITUDE_COLUMNS
        ))
        .bind(test_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn create_aptitude_submission(
        &self,
        sub: NewAptitudeSubmission,
    ) -> Result<AptitudeSubmission> {
        let row = sqlx::query_as::<_, AptitudeRow>(&format!(
            "INSERT INTO aptitude_submissions \
             (id, test_id, student_id, answers, score, max_score, required_score, passed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (test_id, student_id) DO NOTHING RETURNING {}",
            APTITUDE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(sub.test_id)
        .bind(sub.student_id)
        .bind(Json(&sub.answers))
        .bind(sub.score)
        .bind(sub.max_score)
        .bind(sub.required_score)
        .bind(sub.passed)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            Error::DuplicateSubmission("You have already submitted this aptitude test".to_string())
        })?;
        Ok(row.into())
    }

    async fn create_notification(&self, notification: NewNotification) -> Result<Notification> {
        let row = sqlx::query_as::<
            _,
            (Uuid, i64, String, String, Option<i64>, Option<i64>, bool, Option<DateTime<Utc>>),
        >(
            "INSERT INTO notifications (id, student_id, title, message, job_id, application_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, student_id, title, message, job_id, application_id, is_read, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(notification.student_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.job_id)
        .bind(notification.application_id)
        .fetch_one(&self.pool)
        .await?;
        let (id, student_id, title, message, job_id, application_id, is_read, created_at) = row;
        Ok(Notification {
            id,
            student_id,
            title,
            message,
            job_id,
            application_id,
            is_read,
            created_at,
        })
    }

    async fn latest_interview_session(
        &self,
        application_id: i64,
    ) -> Result<Option<InterviewSession>> {
        let row = sqlx::query_as::<_, InterviewRow>(&format!(
            "SELECT {} FROM interview_sessions WHERE application_id = $1 \
             ORDER BY created_at DESC LIMIT 1",
            INTERVIEW_COLUMNS
        ))
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(InterviewSession::try_from).transpose()
    }

    async fn create_interview_session(
        &self,
        application_id: i64,
        job_id: i64,
        mode: InterviewMode,
    ) -> Result<InterviewSession> {
        let row = sqlx::query_as::<_, InterviewRow>(&format!(
            "INSERT INTO interview_sessions (id, application_id, job_id, mode, status, questions, answers) \
             VALUES ($1, $2, $3, $4, 'ACTIVE', '[]'::jsonb, '[]'::jsonb) RETURNING {}",
            INTERVIEW_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(application_id)
        .bind(job_id)
        .bind(mode.as_str())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn save_interview_session(&self, session: &InterviewSession) -> Result<InterviewSession> {
        let row = sqlx::query_as::<_, InterviewRow>(&format!(
            "UPDATE interview_sessions SET mode = $1, status = $2, questions = $3, answers = $4, \
             completed_at = $5 WHERE id = $6 RETURNING {}",
            INTERVIEW_COLUMNS
        ))
        .bind(session.mode.as_str())
        .bind(session.status.as_str())
        .bind(Json(&session.questions))
        .bind(Json(&session.answers))
        .bind(session.completed_at)
        .bind(session.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Interview session {} not found", session.id)))?;
        row.try_into()
    }
}
