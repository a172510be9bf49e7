use crate::database::store::Store;
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus, StudentProfile};
use crate::models::interview::{InterviewMode, InterviewSession, SessionStatus};
use crate::models::job::{EligibilityPolicy, Job};
use crate::models::notification::{NewNotification, Notification};
use crate::models::submission::{
    AptitudeSubmission, CodingSubmission, NewAptitudeSubmission, NewCodingSubmission,
};
use crate::models::test::{NewTest, TestDefinition, TestKind, TestStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    jobs: HashMap<i64, Job>,
    applications: HashMap<i64, Application>,
    students: HashMap<i64, StudentProfile>,
    tests: HashMap<Uuid, TestDefinition>,
    coding_submissions: Vec<CodingSubmission>,
    aptitude_submissions: Vec<AptitudeSubmission>,
    notifications: Vec<Notification>,
    interviews: Vec<InterviewSession>,
}

/// In-process store with the same semantics as the Postgres one. Used for local runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_job(&self, job: Job) {
        self.tables.write().await.jobs.insert(job.id, job);
    }

    pub async fn insert_application(&self, application: Application) {
        self.tables
            .write()
            .await
            .applications
            .insert(application.id, application);
    }

    pub async fn insert_student(&self, student: StudentProfile) {
        self.tables.write().await.students.insert(student.id, student);
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.tables.read().await.notifications.clone()
    }

    pub async fn aptitude_submissions(&self) -> Vec<AptitudeSubmission> {
        self.tables.read().await.aptitude_submissions.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_job(&self, job_id: i64) -> Result<Job> {
        self.tables
            .read()
            .await
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", job_id)))
    }

    async fn update_job_policy(&self, job_id: i64, policy: &EligibilityPolicy) -> Result<Job> {
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", job_id)))?;
        job.policy = policy.clone();
        Ok(job.clone())
    }

    async fn list_applications(&self, job_id: i64) -> Result<Vec<Application>> {
        let tables = self.tables.read().await;
        let mut apps: Vec<Application> = tables
            .applications
            .values()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect();
        apps.sort_by_key(|a| a.id);
        Ok(apps)
    }

    async fn get_application(&self, application_id: i64) -> Result<Application> {
        self.tables
            .read()
            .await
            .applications
            .get(&application_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", application_id)))
    }

    async fn find_application(&self, job_id: i64, student_id: i64) -> Result<Option<Application>> {
        Ok(self
            .tables
            .read()
            .await
            .applications
            .values()
            .find(|a| a.job_id == job_id && a.student_id == student_id)
            .cloned())
    }

    async fn update_application_status(
        &self,
        application_id: i64,
        status: ApplicationStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let app = tables
            .applications
            .get_mut(&application_id)
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", application_id)))?;
        app.status = status;
        if let Some(reason) = reason {
            app.decision_reason = Some(reason.to_string());
        }
        app.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn get_student(&self, student_id: i64) -> Result<Option<StudentProfile>> {
        Ok(self.tables.read().await.students.get(&student_id).cloned())
    }

    async fn get_test(&self, job_id: i64, kind: TestKind) -> Result<Option<TestDefinition>> {
        Ok(self
            .tables
            .read()
            .await
            .tests
            .values()
            .find(|t| t.job_id == job_id && t.kind == kind)
            .cloned())
    }

    async fn list_tests(&self, job_id: i64) -> Result<Vec<TestDefinition>> {
        Ok(self
            .tables
            .read()
            .await
            .tests
            .values()
            .filter(|t| t.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn create_test(&self, test: NewTest) -> Result<TestDefinition> {
        let mut tables = self.tables.write().await;
        if tables
            .tests
            .values()
            .any(|t| t.job_id == test.job_id && t.kind == test.kind)
        {
            return Err(Error::AlreadyExists(format!(
                "{} test already exists for job {}",
                test.kind.label(),
                test.job_id
            )));
        }

        let now = Utc::now();
        let created = TestDefinition {
            id: Uuid::new_v4(),
            job_id: test.job_id,
            kind: test.kind,
            title: test.title,
            description: test.description,
            status: TestStatus::Created,
            cutoff: test.cutoff,
            time_limit_minutes: test.time_limit_minutes,
            allowed_languages: test.allowed_languages,
            questions: test.questions,
            started_at: None,
            stopped_at: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        tables.tests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_test(&self, test: &TestDefinition) -> Result<TestDefinition> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .tests
            .get_mut(&test.id)
            .ok_or_else(|| Error::NotFound(format!("Test {} not found", test.id)))?;
        *stored = test.clone();
        stored.updated_at = Some(Utc::now());
        Ok(stored.clone())
    }

    async fn create_coding_submission(&self, sub: NewCodingSubmission) -> Result<CodingSubmission> {
        let created = CodingSubmission {
            id: Uuid::new_v4(),
            test_id: sub.test_id,
            question_id: sub.question_id,
            student_id: sub.student_id,
            language_id: sub.language_id,
            code: sub.code,
            verdict: sub.verdict,
            score: sub.score,
            passed_count: sub.passed_count,
            total_count: sub.total_count,
            case_results: sub.case_results,
            avg_time_ms: sub.avg_time_ms,
            avg_memory_kb: sub.avg_memory_kb,
            error_message: sub.error_message,
            created_at: Some(Utc::now()),
        };
        self.tables
            .write()
            .await
            .coding_submissions
            .push(created.clone());
        Ok(created)
    }

    async fn list_coding_submissions(
        &self,
        test_id: Uuid,
        student_id: i64,
    ) -> Result<Vec<CodingSubmission>> {
        let tables = self.tables.read().await;
        // insertion order is creation order; newest first
        Ok(tables
            .coding_submissions
            .iter()
            .rev()
            .filter(|s| s.test_id == test_id && s.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn find_aptitude_submission(
        &self,
        test_id: Uuid,
        student_id: i64,
    ) -> Result<Option<AptitudeSubmission>> {
        Ok(self
            .tables
            .read()
            .await
            .aptitude_submissions
            .iter()
            .find(|s| s.test_id == test_id && s.student_id == student_id)
            .cloned())
    }

    async fn create_aptitude_submission(
        &self,
        sub: NewAptitudeSubmission,
    ) -> Result<AptitudeSubmission> {
        let created = AptitudeSubmission {
            id: Uuid::new_v4(),
            test_id: sub.test_id,
            student_id: sub.student_id,
            answers: sub.answers,
            score: sub.score,
            max_score: sub.max_score,
            required_score: sub.required_score,
            passed: sub.passed,
            created_at: Some(Utc::now()),
        };
        let mut tables = self.tables.write().await;
        if tables
            .aptitude_submissions
            .iter()
            .any(|s| s.test_id == created.test_id && s.student_id == created.student_id)
        {
            return Err(Error::DuplicateSubmission(
                "You have already submitted this aptitude test".to_string(),
            ));
        }
        tables.aptitude_submissions.push(created.clone());
        Ok(created)
    }

    async fn create_notification(&self, notification: NewNotification) -> Result<Notification> {
        let created = Notification {
            id: Uuid::new_v4(),
            student_id: notification.student_id,
            title: notification.title,
            message: notification.message,
            job_id: notification.job_id,
            application_id: notification.application_id,
            is_read: false,
            created_at: Some(Utc::now()),
        };
        self.tables.write().await.notifications.push(created.clone());
        Ok(created)
    }

    async fn latest_interview_session(
        &self,
        application_id: i64,
    ) -> Result<Option<InterviewSession>> {
        Ok(self
            .tables
            .read()
            .await
            .interviews
            .iter()
            .rev()
            .find(|s| s.application_id == application_id)
            .cloned())
    }

    async fn create_interview_session(
        &self,
        application_id: i64,
        job_id: i64,
        mode: InterviewMode,
    ) -> Result<InterviewSession> {
        let session = InterviewSession {
            id: Uuid::new_v4(),
            application_id,
            job_id,
            mode,
            status: SessionStatus::Active,
            questions: Vec::new(),
            answers: Vec::new(),
            created_at: Some(Utc::now()),
            completed_at: None,
        };
        self.tables.write().await.interviews.push(session.clone());
        Ok(session)
    }

    async fn save_interview_session(&self, session: &InterviewSession) -> Result<InterviewSession> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .interviews
            .iter_mut()
            .find(|s| s.id == session.id)
            .ok_or_else(|| Error::NotFound(format!("Interview session {} not found", session.id)))?;
        *stored = session.clone();
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_test(job_id: i64, kind: TestKind) -> NewTest {
        NewTest {
            job_id,
            kind,
            title: "Round 1".into(),
            description: None,
            cutoff: None,
            time_limit_minutes: 30,
            allowed_languages: vec![],
            questions: vec![],
        }
    }

    #[tokio::test]
    async fn second_test_of_same_kind_is_rejected() {
        let store = MemoryStore::new();
        store.create_test(new_test(1, TestKind::Aptitude)).await.unwrap();
        store.create_test(new_test(1, TestKind::Coding)).await.unwrap();

        let err = store
            .create_test(new_test(1, TestKind::Aptitude))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn one_aptitude_submission_per_student_and_test() {
        let store = MemoryStore::new();
        let test_id = Uuid::new_v4();
        let submission = |student_id| NewAptitudeSubmission {
            test_id,
            student_id,
            answers: vec![],
            score: 3,
            max_score: 10,
            required_score: None,
            passed: true,
        };

        store.create_aptitude_submission(submission(7)).await.unwrap();
        store.create_aptitude_submission(submission(8)).await.unwrap();
        let err = store
            .create_aptitude_submission(submission(7))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateSubmission(_)));
        assert_eq!(store.aptitude_submissions().await.len(), 2);
    }
}
