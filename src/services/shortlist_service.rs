use crate::config::Config;
use crate::database::Store;
use crate::error::Result;
use crate::models::application::{Application, CandidateMetrics};
use crate::models::job::{EligibilityPolicy, Job};
use crate::models::notification::NewNotification;
use crate::models::shortlist::{DecisionStatus, ShortlistDecision, ShortlistMode};
use crate::services::ats_service::{ResumeScorer, ScoreRequest};
use crate::services::eligibility;
use crate::services::job_service::load_owned_job;
use crate::services::notification_service::{notify_best_effort, Notifier, MAX_REPORTED_ERRORS};
use crate::services::storage_service::{fetch_document, ObjectStorage};
use crate::services::text_extract::{is_pdf, TextExtractor};
use crate::utils::text::{excerpt, truncate_chars};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub batch_concurrency: usize,
    pub fallback_buckets: Vec<String>,
    pub min_resume_chars: usize,
    pub reason_limit: usize,
    pub excerpt_limit: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_concurrency: 4,
            fallback_buckets: vec!["resumes".to_string(), "cvs".to_string()],
            min_resume_chars: 50,
            reason_limit: 500,
            excerpt_limit: 200,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_concurrency: config.batch_concurrency.max(1),
            fallback_buckets: config.storage_fallback_buckets.clone(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShortlistSummary {
    pub processed: usize,
    pub shortlisted: usize,
    pub review: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub decisions: Vec<ShortlistDecision>,
}

impl ShortlistSummary {
    fn record(&mut self, outcome: CandidateOutcome) {
        self.processed += 1;
        match outcome.decision.new_status {
            DecisionStatus::Shortlisted => self.shortlisted += 1,
            DecisionStatus::Review => self.review += 1,
            DecisionStatus::Rejected => self.rejected += 1,
        }
        for error in outcome.errors {
            if self.errors.len() < MAX_REPORTED_ERRORS {
                self.errors.push(error);
            }
        }
        self.decisions.push(outcome.decision);
    }
}

struct CandidateOutcome {
    decision: ShortlistDecision,
    errors: Vec<String>,
}

/// Everything a candidate task reads; fixed once when the batch starts.
struct BatchContext {
    job: Job,
    policy: EligibilityPolicy,
    mode: ShortlistMode,
    job_description_pdf_text: Option<String>,
    required_skills: Vec<String>,
}

/// Intermediate verdict of the per-candidate steps, before it is persisted.
struct Verdict {
    status: DecisionStatus,
    reason: String,
    score: Option<f64>,
    explanation: Option<String>,
    error: Option<String>,
}

impl Verdict {
    fn new(status: DecisionStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            score: None,
            explanation: None,
            error: None,
        }
    }

    fn review_after_failure(reason: String) -> Self {
        let mut verdict = Self::new(DecisionStatus::Review, reason.clone());
        verdict.error = Some(reason);
        verdict
    }
}

#[derive(Clone)]
pub struct ShortlistService {
    store: Arc<dyn Store>,
    storage: Arc<dyn ObjectStorage>,
    extractor: Arc<dyn TextExtractor>,
    scorer: Arc<dyn ResumeScorer>,
    notifier: Arc<dyn Notifier>,
    settings: PipelineSettings,
}

impl ShortlistService {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn ObjectStorage>,
        extractor: Arc<dyn TextExtractor>,
        scorer: Arc<dyn ResumeScorer>,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            storage,
            extractor,
            scorer,
            notifier,
            settings,
        }
    }

    /// Decides every application of a job. Each candidate runs in its own task behind a
    /// semaphore; whatever happens to one candidate, every other candidate still gets a decision.
    pub async fn run_batch(
        &self,
        company_id: i64,
        job_id: i64,
        mode: ShortlistMode,
    ) -> Result<ShortlistSummary> {
        let job = load_owned_job(self.store.as_ref(), company_id, job_id).await?;
        let applications = self.store.list_applications(job_id).await?;

        let job_description_pdf_text = match mode {
            ShortlistMode::ResumeScoring => self.job_description_text(&job).await,
            ShortlistMode::Eligibility => None,
        };
        let ctx = Arc::new(BatchContext {
            policy: job.policy.clone(),
            required_skills: job.required_skills_list(),
            job,
            mode,
            job_description_pdf_text,
        });

        let mut summary = ShortlistSummary::default();
        let (candidates, skipped): (Vec<_>, Vec<_>) = applications
            .into_iter()
            .partition(|a| !a.status.is_past_shortlisting());
        summary.skipped = skipped.len();

        tracing::info!(
            job_id,
            mode = ?mode,
            candidates = candidates.len(),
            skipped = summary.skipped,
            "Shortlisting batch started"
        );

        let permits = Arc::new(Semaphore::new(self.settings.batch_concurrency.max(1)));
        let mut tasks = Vec::with_capacity(candidates.len());

        for application in candidates {
            let service = self.clone();
            let ctx = ctx.clone();
            let permits = permits.clone();
            let owner = (application.id, application.student_id);
            let handle = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await;
                service.process_candidate(&ctx, application).await
            });
            tasks.push((owner, handle));
        }

        for ((application_id, student_id), handle) in tasks {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(job_id, application_id, error = %e, "Candidate task aborted");
                    let reason = format!("evaluation error: candidate task failed ({})", e);
                    self.persist(&ctx, application_id, student_id, Verdict::review_after_failure(reason))
                        .await
                }
            };
            summary.record(outcome);
        }

        tracing::info!(
            job_id,
            processed = summary.processed,
            shortlisted = summary.shortlisted,
            review = summary.review,
            rejected = summary.rejected,
            errors = summary.errors.len(),
            "Shortlisting batch finished"
        );
        Ok(summary)
    }

    async fn job_description_text(&self, job: &Job) -> Option<String> {
        let reference = job.description_pdf_url.as_deref()?.trim();
        if reference.is_empty() {
            return None;
        }

        let fetched = match fetch_document(
            self.storage.as_ref(),
            &self.settings.fallback_buckets,
            reference,
        )
        .await
        {
            Ok(fetched) => fetched,
            Err(failure) => {
                tracing::warn!(job_id = job.id, reason = %failure.reason(), "Job description PDF unavailable");
                return None;
            }
        };
        if !is_pdf(&fetched.bytes) {
            tracing::warn!(job_id = job.id, "Job description file is not a PDF");
            return None;
        }

        match self.extractor.extract_pdf(&fetched.bytes).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(job_id = job.id, error = %e, "Job description PDF extraction failed");
                None
            }
        }
    }

    async fn process_candidate(&self, ctx: &BatchContext, application: Application) -> CandidateOutcome {
        let verdict = match self.decide(ctx, &application).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(application_id = application.id, error = %e, "Candidate lookup failed");
                Verdict::review_after_failure(format!("evaluation error: {}", e))
            }
        };
        self.persist(ctx, application.id, application.student_id, verdict)
            .await
    }

    /// The per-candidate steps. Only store lookups return `Err`; every other failure is already
    /// a Review verdict.
    async fn decide(&self, ctx: &BatchContext, application: &Application) -> Result<Verdict> {
        let profile = self.store.get_student(application.student_id).await?;
        let metrics = CandidateMetrics::resolve(application, profile.as_ref());

        let outcome = eligibility::evaluate(&ctx.policy, &metrics);
        if !outcome.eligible {
            return Ok(Verdict::new(
                DecisionStatus::Rejected,
                format!("ineligible: {}", outcome.summary()),
            ));
        }
        if ctx.mode == ShortlistMode::Eligibility {
            return Ok(Verdict::new(
                DecisionStatus::Shortlisted,
                "meets eligibility criteria",
            ));
        }

        let Some(reference) = application.cv_reference(profile.as_ref()) else {
            return Ok(Verdict::new(DecisionStatus::Review, "no CV on file"));
        };

        let fetched = match fetch_document(
            self.storage.as_ref(),
            &self.settings.fallback_buckets,
            reference,
        )
        .await
        {
            Ok(fetched) => fetched,
            Err(failure) => {
                return Ok(Verdict::review_after_failure(format!(
                    "CV {}",
                    failure.reason()
                )))
            }
        };
        tracing::debug!(application_id = application.id, source = %fetched.source, "CV downloaded");

        if !is_pdf(&fetched.bytes) {
            return Ok(Verdict::new(
                DecisionStatus::Review,
                "CV is not a PDF; only PDF resumes can be scored",
            ));
        }

        let text = match self.extractor.extract_pdf(&fetched.bytes).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                return Ok(Verdict::review_after_failure(format!(
                    "CV text extraction failed: {}",
                    e
                )))
            }
        };
        let chars = text.chars().count();
        if chars < self.settings.min_resume_chars {
            return Ok(Verdict::new(
                DecisionStatus::Review,
                format!(
                    "CV text too short to evaluate ({} characters, need {})",
                    chars, self.settings.min_resume_chars
                ),
            ));
        }

        let request = ScoreRequest {
            resume_text: text,
            job_title: ctx.job.title.clone(),
            job_description: ctx.job.description.clone(),
            job_description_pdf_text: ctx.job_description_pdf_text.clone(),
            required_skills: ctx.required_skills.clone(),
        };
        match self.scorer.score(&request).await {
            Ok(scored) => Ok(Verdict {
                status: scored.decision,
                reason: if scored.explanation.trim().is_empty() {
                    format!("resume score {:.2}", scored.final_score)
                } else {
                    scored.explanation.clone()
                },
                score: Some(scored.final_score),
                explanation: Some(scored.explanation),
                error: None,
            }),
            Err(e) => Ok(Verdict::review_after_failure(format!(
                "evaluation error: {}",
                e
            ))),
        }
    }

    async fn persist(
        &self,
        ctx: &BatchContext,
        application_id: i64,
        student_id: i64,
        verdict: Verdict,
    ) -> CandidateOutcome {
        let reason = truncate_chars(&verdict.reason, self.settings.reason_limit);
        let mut errors = Vec::new();
        if let Some(error) = &verdict.error {
            tracing::warn!(application_id, reason = %error, "Candidate sent to review");
            errors.push(format!("application {}: {}", application_id, error));
        }

        if let Err(e) = self
            .store
            .update_application_status(application_id, verdict.status.into(), Some(&reason))
            .await
        {
            tracing::warn!(application_id, error = %e, "Failed to store shortlist decision");
            errors.push(format!("application {}: failed to store decision: {}", application_id, e));
        }

        let summary_text = verdict
            .explanation
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&reason);
        let message = format!(
            "Your application for \"{}\" is now {}. {}",
            ctx.job.title,
            verdict.status.as_str(),
            excerpt(summary_text, self.settings.excerpt_limit)
        );
        notify_best_effort(
            self.notifier.as_ref(),
            NewNotification {
                student_id,
                title: "Application Update".to_string(),
                message,
                job_id: Some(ctx.job.id),
                application_id: Some(application_id),
            },
        )
        .await;

        CandidateOutcome {
            decision: ShortlistDecision {
                application_id,
                student_id,
                new_status: verdict.status,
                reason,
                score: verdict.score,
            },
            errors,
        }
    }
}
