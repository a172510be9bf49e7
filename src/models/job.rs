use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CGPA and backlog rules a job posting gates applicants with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    pub min_cgpa: Option<f64>,
    #[serde(default = "default_cgpa_counts")]
    pub cgpa_counts: bool,
    #[serde(default)]
    pub allow_backlog: bool,
    pub max_backlog: Option<i32>,
}

fn default_cgpa_counts() -> bool {
    true
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            min_cgpa: None,
            cgpa_counts: default_cgpa_counts(),
            allow_backlog: false,
            max_backlog: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub company_id: i64,
    pub title: String,
    pub description: String,
    pub required_skills: Option<String>,
    pub description_pdf_url: Option<String>,
    pub policy: EligibilityPolicy,
    pub created_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Skills are stored either as a JSON array or as a comma-separated string.
    pub fn required_skills_list(&self) -> Vec<String> {
        let Some(raw) = self.required_skills.as_deref() else {
            return Vec::new();
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Vec::new();
        }

        if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
            return list
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
