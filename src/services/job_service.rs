use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::application::CandidateMetrics;
use crate::models::job::{EligibilityPolicy, Job};
use crate::services::eligibility::{self, EligibilityOutcome};
use std::sync::Arc;

/// Loads a job on behalf of a company, hiding jobs the company does not own.
pub async fn load_owned_job(store: &dyn Store, company_id: i64, job_id: i64) -> Result<Job> {
    match store.get_job(job_id).await {
        Ok(job) if job.company_id == company_id => Ok(job),
        Ok(_) | Err(Error::NotFound(_)) => Err(Error::NotFound(
            "Job not found or access denied".to_string(),
        )),
        Err(e) => Err(e),
    }
}

#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn Store>,
}

impl JobService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Replaces a job's eligibility policy. Refused while any of the job's tests is running.
    pub async fn update_eligibility_policy(
        &self,
        company_id: i64,
        job_id: i64,
        policy: EligibilityPolicy,
    ) -> Result<Job> {
        load_owned_job(self.store.as_ref(), company_id, job_id).await?;

        if let Some(test) = self
            .store
            .list_tests(job_id)
            .await?
            .into_iter()
            .find(|t| t.is_started())
        {
            return Err(Error::InvalidState(format!(
                "Eligibility policy cannot change while the {} test is running",
                test.kind.as_str()
            )));
        }

        let job = self.store.update_job_policy(job_id, &policy).await?;
        tracing::info!(job_id, ?policy, "Eligibility policy updated");
        Ok(job)
    }

    /// Apply-time check using the same evaluator the shortlisting batch uses.
    pub async fn check_eligibility(
        &self,
        job_id: i64,
        metrics: CandidateMetrics,
    ) -> Result<EligibilityOutcome> {
        let job = self.store.get_job(job_id).await?;
        Ok(eligibility::evaluate(&job.policy, &metrics))
    }
}
