use crate::database::Store;
use crate::dto::assessment_dto::{StartTestResponse, TestPayload};
use crate::error::{Error, Result};
use crate::models::application::ApplicationStatus;
use crate::models::notification::NewNotification;
use crate::models::question::{assign_question_ids, Question};
use crate::models::submission::{
    AptitudeAnswer, AptitudeSubmission, CaseStatus, CodingSubmission, NewAptitudeSubmission,
    NewCodingSubmission,
};
use crate::models::test::{NewTest, TestDefinition, TestKind, TestStatus};
use crate::services::grading_service::{self, GradingService};
use crate::services::job_service::load_owned_job;
use crate::services::judge_client::default_language_ids;
use crate::services::notification_service::{fan_out, notify_best_effort, Notifier};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

const DEFAULT_TIME_LIMIT_MINUTES: i32 = 60;

#[derive(Clone)]
pub struct TestService {
    store: Arc<dyn Store>,
    grader: GradingService,
    notifier: Arc<dyn Notifier>,
    fan_out_width: usize,
}

fn validate_questions(kind: TestKind, questions: &[Question]) -> Result<()> {
    if questions.is_empty() {
        return Err(Error::BadRequest(
            "At least one question is required".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(questions.len());
    for q in questions {
        if q.id < 1 {
            return Err(Error::BadRequest(format!(
                "question {}: id must be a positive number",
                q.id
            )));
        }
        if !seen.insert(q.id) {
            return Err(Error::BadRequest(format!("question {}: duplicate question id", q.id)));
        }
        q.validate_for(kind).map_err(Error::BadRequest)?;
    }
    Ok(())
}

fn allowed_languages_for(kind: TestKind, requested: Option<Vec<i32>>) -> Vec<i32> {
    match kind {
        TestKind::Aptitude => Vec::new(),
        TestKind::Coding => requested
            .filter(|langs| !langs.is_empty())
            .unwrap_or_else(default_language_ids),
    }
}

impl TestService {
    pub fn new(
        store: Arc<dyn Store>,
        grader: GradingService,
        notifier: Arc<dyn Notifier>,
        fan_out_width: usize,
    ) -> Self {
        Self {
            store,
            grader,
            notifier,
            fan_out_width,
        }
    }

    async fn require_test(&self, job_id: i64, kind: TestKind) -> Result<TestDefinition> {
        self.store
            .get_test(job_id, kind)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} test not found", kind.label())))
    }

    pub async fn get_test(&self, job_id: i64, kind: TestKind) -> Result<TestDefinition> {
        self.require_test(job_id, kind).await
    }

    pub async fn create_test(
        &self,
        job_id: i64,
        kind: TestKind,
        payload: TestPayload,
    ) -> Result<TestDefinition> {
        load_owned_job(self.store.as_ref(), payload.company_id, job_id).await?;

        let questions = assign_question_ids(payload.questions);
        validate_questions(kind, &questions)?;

        let test = self
            .store
            .create_test(NewTest {
                job_id,
                kind,
                title: payload.title.trim().to_string(),
                description: payload.description,
                cutoff: payload.cutoff,
                time_limit_minutes: payload.time_limit_minutes.unwrap_or(DEFAULT_TIME_LIMIT_MINUTES),
                allowed_languages: allowed_languages_for(kind, payload.allowed_languages),
                questions,
            })
            .await?;

        tracing::info!(job_id, test_id = %test.id, kind = kind.as_str(), "Test created");
        Ok(test)
    }

    pub async fn update_test(
        &self,
        job_id: i64,
        kind: TestKind,
        payload: TestPayload,
    ) -> Result<TestDefinition> {
        load_owned_job(self.store.as_ref(), payload.company_id, job_id).await?;
        let mut test = self.require_test(job_id, kind).await?;

        if test.is_started() {
            return Err(Error::InvalidState(format!(
                "{} test cannot be edited while it is running; stop it first",
                kind.label()
            )));
        }

        let questions = assign_question_ids(payload.questions);
        validate_questions(kind, &questions)?;

        test.title = payload.title.trim().to_string();
        test.description = payload.description;
        test.cutoff = payload.cutoff;
        if let Some(minutes) = payload.time_limit_minutes {
            test.time_limit_minutes = minutes;
        }
        if kind == TestKind::Coding && payload.allowed_languages.is_some() {
            test.allowed_languages = allowed_languages_for(kind, payload.allowed_languages);
        }
        test.questions = questions;

        let updated = self.store.update_test(&test).await?;
        tracing::info!(job_id, test_id = %updated.id, "Test updated");
        Ok(updated)
    }

    /// Starts (or restarts) a test and notifies every shortlisted candidate of the job. Starting
    /// an already running test refreshes its start time.
    pub async fn start_test(
        &self,
        company_id: i64,
        job_id: i64,
        kind: TestKind,
    ) -> Result<StartTestResponse> {
        let job = load_owned_job(self.store.as_ref(), company_id, job_id).await?;
        let mut test = self.require_test(job_id, kind).await?;

        test.status = TestStatus::Started;
        test.started_at = Some(Utc::now());
        let test = self.store.update_test(&test).await?;
        tracing::info!(job_id, test_id = %test.id, kind = kind.as_str(), "Test started");

        let shortlisted: Vec<_> = self
            .store
            .list_applications(job_id)
            .await?
            .into_iter()
            .filter(|a| a.status == ApplicationStatus::Shortlisted)
            .collect();

        let notifications = shortlisted
            .iter()
            .map(|app| NewNotification {
                student_id: app.student_id,
                title: format!("{} Test Started", kind.label()),
                message: format!(
                    "The {} test for \"{}\" has started. You can now take the test from your applications page.",
                    kind.as_str(),
                    job.title
                ),
                job_id: Some(job_id),
                application_id: Some(app.id),
            })
            .collect();

        let report = fan_out(self.notifier.as_ref(), notifications, self.fan_out_width).await;
        tracing::info!(
            job_id,
            notified = report.sent,
            failed = report.failed,
            total = shortlisted.len(),
            "Test start notifications sent"
        );

        Ok(StartTestResponse {
            test,
            notified: report.sent,
            total_shortlisted: shortlisted.len(),
            errors: report.errors,
        })
    }

    pub async fn stop_test(
        &self,
        company_id: i64,
        job_id: i64,
        kind: TestKind,
    ) -> Result<TestDefinition> {
        load_owned_job(self.store.as_ref(), company_id, job_id).await?;
        let mut test = self.require_test(job_id, kind).await?;

        if test.status != TestStatus::Started {
            return Err(Error::InvalidState(format!(
                "{} test is not started (status {})",
                kind.label(),
                test.status
            )));
        }

        test.status = TestStatus::Stopped;
        test.stopped_at = Some(Utc::now());
        let test = self.store.update_test(&test).await?;
        tracing::info!(job_id, test_id = %test.id, kind = kind.as_str(), "Test stopped");
        Ok(test)
    }

    pub async fn submit_aptitude(
        &self,
        job_id: i64,
        student_id: i64,
        answers: Vec<AptitudeAnswer>,
    ) -> Result<AptitudeSubmission> {
        let test = self.require_test(job_id, TestKind::Aptitude).await?;
        if !test.is_started() {
            return Err(Error::InvalidState("Aptitude test is not active".to_string()));
        }

        if self
            .store
            .find_aptitude_submission(test.id, student_id)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateSubmission(
                "You have already submitted this aptitude test".to_string(),
            ));
        }

        let application = self
            .store
            .find_application(job_id, student_id)
            .await?
            .filter(|a| a.status == ApplicationStatus::Shortlisted)
            .ok_or_else(|| {
                Error::NotEligible("You must be shortlisted to take this test".to_string())
            })?;

        let scored = grading_service::score_aptitude(&test.questions, &answers);
        let required = grading_service::required_points(test.cutoff, scored.max_score);
        let passed = grading_service::passes_cutoff(scored.score, test.cutoff, scored.max_score);

        let submission = self
            .store
            .create_aptitude_submission(NewAptitudeSubmission {
                test_id: test.id,
                student_id,
                answers,
                score: scored.score,
                max_score: scored.max_score,
                required_score: required,
                passed,
            })
            .await?;

        let status = if passed {
            ApplicationStatus::PassedAptitude
        } else {
            ApplicationStatus::FailedAptitude
        };
        let reason = match required {
            Some(req) => format!("Aptitude score {}/{} (required {})", scored.score, scored.max_score, req),
            None => format!("Aptitude score {}/{}", scored.score, scored.max_score),
        };
        self.store
            .update_application_status(application.id, status, Some(&reason))
            .await?;

        let message = if passed {
            format!(
                "You scored {}/{} in the aptitude test for \"{}\" and passed. Watch for the next round.",
                scored.score, scored.max_score, test.title
            )
        } else {
            format!(
                "You scored {}/{} in the aptitude test for \"{}\", below the required cutoff.",
                scored.score, scored.max_score, test.title
            )
        };
        notify_best_effort(
            self.notifier.as_ref(),
            NewNotification {
                student_id,
                title: "Aptitude Test Result".to_string(),
                message,
                job_id: Some(job_id),
                application_id: Some(application.id),
            },
        )
        .await;

        tracing::info!(
            job_id,
            student_id,
            score = scored.score,
            max_score = scored.max_score,
            passed,
            "Aptitude submission graded"
        );
        Ok(submission)
    }

    /// Grades code against a question's hidden test cases. Every call creates a new submission,
    /// unless no case reached the judge at all; that surfaces as `Timeout` or `Upstream`.
    pub async fn submit_code(
        &self,
        job_id: i64,
        student_id: i64,
        question_id: i32,
        language_id: i32,
        code: &str,
    ) -> Result<CodingSubmission> {
        if code.trim().is_empty() {
            return Err(Error::BadRequest("code is required".to_string()));
        }

        let test = self.require_test(job_id, TestKind::Coding).await?;
        if !test.is_started() {
            return Err(Error::InvalidState(
                "Coding test has not started yet".to_string(),
            ));
        }

        let question = test
            .question(question_id)
            .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;
        let details = question.coding().ok_or_else(|| {
            Error::BadRequest(format!("Question {} is not a coding question", question_id))
        })?;

        if !test.allowed_languages.contains(&language_id) {
            return Err(Error::BadRequest(
                "Language not allowed for this test".to_string(),
            ));
        }

        let cpu_limit_secs = (test.time_limit_minutes.max(1) * 60) as f64;
        let report = self
            .grader
            .grade_submission(
                code,
                language_id,
                &details.test_cases,
                &details.expected_outputs,
                details.points,
                cpu_limit_secs,
            )
            .await;

        if report.total_count > 0 && report.cases.iter().all(|c| c.status == CaseStatus::Error) {
            let detail = report.first_error.clone().unwrap_or_default();
            tracing::error!(job_id, student_id, question_id, error = %detail, "Judge unavailable for every test case");
            return Err(if report.cases.iter().all(|c| c.timed_out) {
                Error::Timeout(format!("Judge did not return a result in time: {}", detail))
            } else {
                Error::Upstream(format!("Judge unavailable: {}", detail))
            });
        }

        let submission = self
            .store
            .create_coding_submission(NewCodingSubmission {
                test_id: test.id,
                question_id,
                student_id,
                language_id,
                code: code.to_string(),
                verdict: report.verdict,
                score: report.score,
                passed_count: report.passed_count as i32,
                total_count: report.total_count as i32,
                case_results: report.cases,
                avg_time_ms: report.avg_time_ms,
                avg_memory_kb: report.avg_memory_kb,
                error_message: report.first_error,
            })
            .await?;

        tracing::info!(
            job_id,
            student_id,
            question_id,
            submission_id = %submission.id,
            verdict = submission.verdict.as_str(),
            score = submission.score,
            "Coding submission graded"
        );
        Ok(submission)
    }

    pub async fn list_code_submissions(
        &self,
        job_id: i64,
        student_id: i64,
    ) -> Result<Vec<CodingSubmission>> {
        let test = self.require_test(job_id, TestKind::Coding).await?;
        self.store.list_coding_submissions(test.id, student_id).await
    }
}
