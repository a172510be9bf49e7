use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::application::Application;
use crate::models::interview::{
    InterviewAnswer, InterviewMode, InterviewQuestion, InterviewSession, SessionStatus,
};
use crate::models::job::Job;
use crate::models::notification::NewNotification;
use crate::services::job_service::load_owned_job;
use crate::services::notification_service::{notify_best_effort, Notifier};
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct InterviewService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl InterviewService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    async fn owned_application(
        &self,
        company_id: i64,
        application_id: i64,
    ) -> Result<(Application, Job)> {
        let application = self.store.get_application(application_id).await?;
        let job = load_owned_job(self.store.as_ref(), company_id, application.job_id).await?;
        Ok((application, job))
    }

    async fn require_session(&self, application_id: i64) -> Result<InterviewSession> {
        self.store
            .latest_interview_session(application_id)
            .await?
            .ok_or_else(|| Error::NotFound("No interview session for this application".to_string()))
    }

    /// Starts an interview, or resumes the latest one unless it is completed. The candidate is
    /// notified either way.
    pub async fn start(
        &self,
        company_id: i64,
        application_id: i64,
        mode: &str,
    ) -> Result<InterviewSession> {
        let mode: InterviewMode = mode.parse().map_err(Error::BadRequest)?;
        let (application, job) = self.owned_application(company_id, application_id).await?;

        let session = match self.store.latest_interview_session(application_id).await? {
            Some(mut session) if session.status != SessionStatus::Completed => {
                session.status = SessionStatus::Active;
                session.mode = mode;
                self.store.save_interview_session(&session).await?
            }
            _ => {
                self.store
                    .create_interview_session(application_id, job.id, mode)
                    .await?
            }
        };
        tracing::info!(application_id, session_id = %session.id, mode = mode.as_str(), "Interview started");

        notify_best_effort(
            self.notifier.as_ref(),
            NewNotification {
                student_id: application.student_id,
                title: "Interview Started".to_string(),
                message: format!(
                    "A {} interview for \"{}\" has started. Click to join the interview.",
                    mode.label(),
                    job.title
                ),
                job_id: Some(job.id),
                application_id: Some(application_id),
            },
        )
        .await;

        Ok(session)
    }

    pub async fn stop(&self, company_id: i64, application_id: i64) -> Result<InterviewSession> {
        self.owned_application(company_id, application_id).await?;
        let mut session = self.require_session(application_id).await?;

        if session.status != SessionStatus::Active {
            return Err(Error::InvalidState(format!(
                "Interview is not active (status {})",
                session.status
            )));
        }
        session.status = SessionStatus::Stopped;
        let session = self.store.save_interview_session(&session).await?;
        tracing::info!(application_id, session_id = %session.id, "Interview stopped");
        Ok(session)
    }

    pub async fn complete(&self, company_id: i64, application_id: i64) -> Result<InterviewSession> {
        self.owned_application(company_id, application_id).await?;
        let mut session = self.require_session(application_id).await?;

        if session.status == SessionStatus::Completed {
            return Err(Error::InvalidState("Interview is already completed".to_string()));
        }
        session.status = SessionStatus::Completed;
        session.completed_at = Some(Utc::now());
        let session = self.store.save_interview_session(&session).await?;
        tracing::info!(application_id, session_id = %session.id, "Interview completed");
        Ok(session)
    }

    /// Appends a question; its index is its position in the session.
    pub async fn add_question(
        &self,
        company_id: i64,
        application_id: i64,
        question: &str,
    ) -> Result<InterviewSession> {
        self.owned_application(company_id, application_id).await?;
        let mut session = self.require_session(application_id).await?;

        if session.status != SessionStatus::Active {
            return Err(Error::InvalidState(format!(
                "Questions can only be asked in an active interview (status {})",
                session.status
            )));
        }
        let index = session.questions.len();
        session.questions.push(InterviewQuestion {
            index,
            question: question.trim().to_string(),
            asked_at: Utc::now(),
        });
        let session = self.store.save_interview_session(&session).await?;
        tracing::debug!(application_id, index, "Interview question added");
        Ok(session)
    }

    /// Stores the candidate's answer for a question, replacing any earlier answer to it.
    pub async fn submit_answer(
        &self,
        student_id: i64,
        application_id: i64,
        question_index: usize,
        answer: &str,
    ) -> Result<InterviewSession> {
        let application = self.store.get_application(application_id).await?;
        if application.student_id != student_id {
            return Err(Error::NotFound("Application not found".to_string()));
        }
        let mut session = self.require_session(application_id).await?;

        if session.status == SessionStatus::Completed {
            return Err(Error::InvalidState("Interview is already completed".to_string()));
        }
        if question_index >= session.questions.len() {
            return Err(Error::BadRequest("Invalid question index".to_string()));
        }

        let now = Utc::now();
        match session
            .answers
            .iter_mut()
            .find(|a| a.question_index == question_index)
        {
            Some(existing) => {
                existing.answer = answer.to_string();
                existing.submitted_at = now;
            }
            None => session.answers.push(InterviewAnswer {
                question_index,
                answer: answer.to_string(),
                submitted_at: now,
            }),
        }

        self.store.save_interview_session(&session).await
    }

    pub async fn current(&self, application_id: i64) -> Result<InterviewSession> {
        self.require_session(application_id).await
    }
}
