mod common;

use async_trait::async_trait;
use common::*;
use mockall::mock;
use placement_backend::database::{MemoryStore, Store};
use placement_backend::models::application::ApplicationStatus;
use placement_backend::models::shortlist::{DecisionStatus, ShortlistMode};
use placement_backend::services::ats_service::{
    ResumeScorer, ScoreRequest, ScoreResponse, ScoringError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Scorer {}

    #[async_trait]
    impl ResumeScorer for Scorer {
        async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScoringError>;
    }
}

fn resume(marker: &str) -> Vec<u8> {
    pdf(&format!(
        "{} Rust developer with four years of backend experience, Postgres, Tokio and Axum.",
        marker
    ))
}

fn scored(decision: DecisionStatus, score: f64) -> ScoreResponse {
    ScoreResponse {
        final_score: score,
        decision,
        explanation: format!("Final Score: {:.0}%", score * 100.0),
    }
}

/// Scorer that records how many calls are in flight at once.
#[derive(Default)]
struct GaugeScorer {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl ResumeScorer for GaugeScorer {
    async fn score(&self, _request: &ScoreRequest) -> Result<ScoreResponse, ScoringError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(scored(DecisionStatus::Shortlisted, 0.9))
    }
}

async fn with_cv(store: &MemoryStore, id: i64, student_id: i64, cv: &str) {
    let mut app = application(id, 1, student_id, ApplicationStatus::Pending);
    app.cv_url = Some(cv.to_string());
    store.insert_application(app).await;
}

#[tokio::test]
async fn eligibility_mode_decides_by_rules_and_skips_later_stages() {
    let h = harness(ScriptedJudge::default());
    h.store.insert_job(job(1)).await;
    h.store
        .insert_application(application(1, 1, 1, ApplicationStatus::Pending))
        .await;
    let mut low = application(2, 1, 2, ApplicationStatus::Pending);
    low.cgpa = Some(6.1);
    h.store.insert_application(low).await;
    let mut backlog = application(3, 1, 3, ApplicationStatus::Review);
    backlog.backlog = None;
    h.store.insert_application(backlog).await;
    h.store
        .insert_application(application(4, 1, 4, ApplicationStatus::PassedAptitude))
        .await;

    let summary = h
        .state
        .shortlist_service
        .run_batch(COMPANY, 1, ShortlistMode::Eligibility)
        .await
        .unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.shortlisted, 1);
    assert_eq!(summary.rejected, 2);
    assert_eq!(summary.review, 0);
    assert_eq!(summary.skipped, 1);
    assert!(summary.errors.is_empty());

    let first = h.store.get_application(1).await.unwrap();
    assert_eq!(first.status, ApplicationStatus::Shortlisted);
    assert_eq!(first.decision_reason.as_deref(), Some("meets eligibility criteria"));

    let second = h.store.get_application(2).await.unwrap();
    assert_eq!(second.status, ApplicationStatus::Rejected);
    assert!(second.decision_reason.unwrap().starts_with("ineligible"));

    let third = h.store.get_application(3).await.unwrap();
    assert!(third.decision_reason.unwrap().contains("Backlog count required"));

    let untouched = h.store.get_application(4).await.unwrap();
    assert_eq!(untouched.status, ApplicationStatus::PassedAptitude);

    assert_eq!(h.store.notifications().await.len(), 3);
}

#[tokio::test]
async fn profile_metrics_fill_gaps_in_the_application() {
    let h = harness(ScriptedJudge::default());
    h.store.insert_job(job(1)).await;
    let mut app = application(1, 1, 1, ApplicationStatus::Pending);
    app.cgpa = None;
    app.backlog = None;
    h.store.insert_application(app).await;
    let mut profile = student(1);
    profile.cgpa = Some(9.1);
    profile.backlog = Some(0);
    h.store.insert_student(profile).await;

    let summary = h
        .state
        .shortlist_service
        .run_batch(COMPANY, 1, ShortlistMode::Eligibility)
        .await
        .unwrap();
    assert_eq!(summary.shortlisted, 1);
}

#[tokio::test]
async fn one_scoring_failure_does_not_stop_the_batch() {
    let store = Arc::new(MemoryStore::new());
    store.insert_job(job(1)).await;
    let mut storage = MapStorage::default();
    for n in 1..=4 {
        let path = format!("{}.pdf", n);
        storage = storage.object("resumes", &path, &resume(&format!("candidate-{}", n)));
        with_cv(&store, n, n, &format!("resumes/{}", path)).await;
    }

    let mut scorer = MockScorer::new();
    scorer.expect_score().times(4).returning(|req| {
        if req.resume_text.contains("candidate-2") {
            Err(ScoringError::Timeout(30_000))
        } else if req.resume_text.contains("candidate-3") {
            Ok(scored(DecisionStatus::Rejected, 0.41))
        } else {
            Ok(scored(DecisionStatus::Shortlisted, 0.82))
        }
    });

    let h = harness_with(
        store,
        Arc::new(ScriptedJudge::default()),
        Arc::new(storage),
        Arc::new(scorer),
    );
    let summary = h
        .state
        .shortlist_service
        .run_batch(COMPANY, 1, ShortlistMode::ResumeScoring)
        .await
        .unwrap();

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.shortlisted, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.review, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("application 2"));

    let failed = h.store.get_application(2).await.unwrap();
    assert_eq!(failed.status, ApplicationStatus::Review);
    assert!(failed.decision_reason.unwrap().starts_with("evaluation error"));

    let decision = summary
        .decisions
        .iter()
        .find(|d| d.application_id == 1)
        .unwrap();
    assert_eq!(decision.new_status, DecisionStatus::Shortlisted);
    assert_eq!(decision.score, Some(0.82));

    // every candidate hears back, including the failed one
    assert_eq!(h.store.notifications().await.len(), 4);
}

#[tokio::test]
async fn storage_failure_falls_back_to_http_download() {
    let store = Arc::new(MemoryStore::new());
    store.insert_job(job(1)).await;
    let cv = "https://files.example.com/storage/v1/object/public/uploads/cv-7.pdf";
    with_cv(&store, 7, 7, cv).await;

    let storage = Arc::new(MapStorage::default().url(cv, &resume("via-http")));
    let mut scorer = MockScorer::new();
    scorer
        .expect_score()
        .withf(|req| {
            req.resume_text.starts_with("via-http")
                && req.required_skills == vec!["Rust".to_string(), "SQL".to_string()]
                && req.job_title == "Backend Engineer"
        })
        .times(1)
        .returning(|_| Ok(scored(DecisionStatus::Review, 0.66)));

    let h = harness_with(
        store,
        Arc::new(ScriptedJudge::default()),
        storage.clone(),
        Arc::new(scorer),
    );
    let summary = h
        .state
        .shortlist_service
        .run_batch(COMPANY, 1, ShortlistMode::ResumeScoring)
        .await
        .unwrap();

    assert_eq!(summary.review, 1);
    assert!(summary.errors.is_empty());
    assert_eq!(
        *storage.calls.lock().unwrap(),
        vec![
            "storage uploads/cv-7.pdf".to_string(),
            "storage resumes/cv-7.pdf".to_string(),
            "storage cvs/cv-7.pdf".to_string(),
            format!("http {}", cv),
        ]
    );
}

#[tokio::test]
async fn unusable_cvs_go_to_review_with_a_reason() {
    let store = Arc::new(MemoryStore::new());
    store.insert_job(job(1)).await;
    store
        .insert_application(application(1, 1, 1, ApplicationStatus::Pending))
        .await;
    with_cv(&store, 2, 2, "resumes/letter.docx").await;
    with_cv(&store, 3, 3, "resumes/short.pdf").await;
    with_cv(&store, 4, 4, "https://cdn.example.com/missing.pdf").await;
    with_cv(&store, 5, 5, "resumes/gone.pdf").await;

    let storage = MapStorage::default()
        .object("resumes", "letter.docx", b"PK\x03\x04word")
        .object("resumes", "short.pdf", &pdf("too short"));

    let mut scorer = MockScorer::new();
    scorer.expect_score().never();

    let h = harness_with(
        store,
        Arc::new(ScriptedJudge::default()),
        Arc::new(storage),
        Arc::new(scorer),
    );
    let summary = h
        .state
        .shortlist_service
        .run_batch(COMPANY, 1, ShortlistMode::ResumeScoring)
        .await
        .unwrap();
    assert_eq!(summary.review, 5);

    let reason = |id: i64| {
        let store = h.store.clone();
        async move { store.get_application(id).await.unwrap().decision_reason.unwrap() }
    };
    assert_eq!(reason(1).await, "no CV on file");
    assert!(reason(2).await.contains("not a PDF"));
    assert!(reason(3).await.contains("(9 characters"));
    assert!(reason(4).await.contains("could not be parsed"));
    assert!(reason(5).await.contains("download failed"));

    // only the two download failures are operator errors
    assert_eq!(summary.errors.len(), 2);
}

#[tokio::test]
async fn job_description_pdf_is_extracted_once_per_batch() {
    let store = Arc::new(MemoryStore::new());
    let mut posting = job(1);
    posting.description_pdf_url = Some("jobs/jd-1.pdf".into());
    store.insert_job(posting).await;
    let storage = MapStorage::default()
        .object("jobs", "jd-1.pdf", &pdf("Full job description"))
        .object("resumes", "a.pdf", &resume("a"))
        .object("resumes", "b.pdf", &resume("b"));
    with_cv(&store, 1, 1, "resumes/a.pdf").await;
    with_cv(&store, 2, 2, "resumes/b.pdf").await;
    let storage = Arc::new(storage);

    let mut scorer = MockScorer::new();
    scorer
        .expect_score()
        .withf(|req| req.job_description_pdf_text.as_deref() == Some("Full job description"))
        .times(2)
        .returning(|_| Ok(scored(DecisionStatus::Shortlisted, 0.9)));

    let h = harness_with(
        store,
        Arc::new(ScriptedJudge::default()),
        storage.clone(),
        Arc::new(scorer),
    );
    h.state
        .shortlist_service
        .run_batch(COMPANY, 1, ShortlistMode::ResumeScoring)
        .await
        .unwrap();

    let jd_downloads = storage
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.contains("jd-1.pdf"))
        .count();
    assert_eq!(jd_downloads, 1);
}

#[tokio::test]
async fn batch_for_a_foreign_job_is_refused() {
    let h = harness(ScriptedJudge::default());
    h.store.insert_job(job(1)).await;

    let err = h
        .state
        .shortlist_service
        .run_batch(OTHER_COMPANY, 1, ShortlistMode::Eligibility)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Job not found or access denied"));
}

#[tokio::test]
async fn batch_width_caps_concurrent_candidates() {
    let store = Arc::new(MemoryStore::new());
    store.insert_job(job(1)).await;
    let mut storage = MapStorage::default();
    for n in 1..=7 {
        let path = format!("{}.pdf", n);
        storage = storage.object("resumes", &path, &resume(&format!("candidate-{}", n)));
        with_cv(&store, n, n, &format!("resumes/{}", path)).await;
    }

    let scorer = Arc::new(GaugeScorer::default());
    let h = harness_with(
        store,
        Arc::new(ScriptedJudge::default()),
        Arc::new(storage),
        scorer.clone(),
    );
    let summary = h
        .state
        .shortlist_service
        .run_batch(COMPANY, 1, ShortlistMode::ResumeScoring)
        .await
        .unwrap();

    assert_eq!(summary.processed, 7);
    assert_eq!(summary.shortlisted, 7);
    // the harness runs batches three wide
    assert_eq!(scorer.peak.load(Ordering::SeqCst), 3);
    assert_eq!(scorer.in_flight.load(Ordering::SeqCst), 0);
}
