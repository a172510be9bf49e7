use crate::models::application::CandidateMetrics;
use crate::models::job::EligibilityPolicy;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityOutcome {
    pub eligible: bool,
    pub reasons: Vec<String>,
}

impl EligibilityOutcome {
    pub fn summary(&self) -> String {
        self.reasons.join("; ")
    }
}

/// Checks candidate metrics against a job's policy. Every failing rule is reported; nothing
/// short-circuits. Used both when a student applies and when a batch shortlists.
pub fn evaluate(policy: &EligibilityPolicy, metrics: &CandidateMetrics) -> EligibilityOutcome {
    let mut reasons = Vec::new();

    if policy.cgpa_counts {
        if let Some(min) = policy.min_cgpa {
            match metrics.cgpa {
                None => reasons.push("CGPA required".to_string()),
                Some(cgpa) if cgpa < min => {
                    reasons.push(format!("CGPA {} is below the minimum {}", cgpa, min))
                }
                Some(_) => {}
            }
        }
    }

    // an absent backlog is never read as zero
    match metrics.backlog {
        None => reasons.push("Backlog count required".to_string()),
        Some(backlog) if !policy.allow_backlog => {
            if backlog != 0 {
                reasons.push(format!("{} active backlog(s); backlogs are not allowed", backlog));
            }
        }
        Some(backlog) => {
            if let Some(max) = policy.max_backlog {
                if backlog > max {
                    reasons.push(format!(
                        "{} active backlog(s) exceeds the maximum of {}",
                        backlog, max
                    ));
                }
            }
        }
    }

    EligibilityOutcome {
        eligible: reasons.is_empty(),
        reasons,
    }
}
