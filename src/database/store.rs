use crate::error::Result;
use crate::models::application::{Application, ApplicationStatus, StudentProfile};
use crate::models::interview::{InterviewMode, InterviewSession};
use crate::models::job::{EligibilityPolicy, Job};
use crate::models::notification::{NewNotification, Notification};
use crate::models::submission::{
    AptitudeSubmission, CodingSubmission, NewAptitudeSubmission, NewCodingSubmission,
};
use crate::models::test::{NewTest, TestDefinition, TestKind};
use async_trait::async_trait;
use uuid::Uuid;

/// Row-level persistence used by the engine. Every call is atomic for the single row it touches
/// and nothing more.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_job(&self, job_id: i64) -> Result<Job>;
    async fn update_job_policy(&self, job_id: i64, policy: &EligibilityPolicy) -> Result<Job>;

    async fn list_applications(&self, job_id: i64) -> Result<Vec<Application>>;
    async fn get_application(&self, application_id: i64) -> Result<Application>;
    async fn find_application(&self, job_id: i64, student_id: i64) -> Result<Option<Application>>;
    async fn update_application_status(
        &self,
        application_id: i64,
        status: ApplicationStatus,
        reason: Option<&str>,
    ) -> Result<()>;

    async fn get_student(&self, student_id: i64) -> Result<Option<StudentProfile>>;

    async fn get_test(&self, job_id: i64, kind: TestKind) -> Result<Option<TestDefinition>>;
    async fn list_tests(&self, job_id: i64) -> Result<Vec<TestDefinition>>;
    /// Fails with `AlreadyExists` when the job already has a test of this kind.
    async fn create_test(&self, test: NewTest) -> Result<TestDefinition>;
    async fn update_test(&self, test: &TestDefinition) -> Result<TestDefinition>;

    async fn create_coding_submission(&self, sub: NewCodingSubmission) -> Result<CodingSubmission>;
    async fn list_coding_submissions(
        &self,
        test_id: Uuid,
        student_id: i64,
    ) -> Result<Vec<CodingSubmission>>;

    async fn find_aptitude_submission(
        &self,
        test_id: Uuid,
        student_id: i64,
    ) -> Result<Option<AptitudeSubmission>>;
    /// Fails with `DuplicateSubmission` when the student already has a submission for the test.
    async fn create_aptitude_submission(
        &self,
        sub: NewAptitudeSubmission,
    ) -> Result<AptitudeSubmission>;

    async fn create_notification(&self, notification: NewNotification) -> Result<Notification>;

    async fn latest_interview_session(
        &self,
        application_id: i64,
    ) -> Result<Option<InterviewSession>>;
    async fn create_interview_session(
        &self,
        application_id: i64,
        job_id: i64,
        mode: InterviewMode,
    ) -> Result<InterviewSession>;
    async fn save_interview_session(&self, session: &InterviewSession) -> Result<InterviewSession>;
}
