use crate::models::question::Question;
use crate::models::submission::{AptitudeAnswer, CaseResult, CaseStatus, JudgeStatus, Verdict};
use crate::services::judge_client::{await_result, JudgeApi, JudgeError, JudgeSettings, JudgeSubmission};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct GradingReport {
    pub cases: Vec<CaseResult>,
    pub passed_count: usize,
    pub total_count: usize,
    pub verdict: Verdict,
    pub score: f64,
    pub avg_time_ms: Option<f64>,
    pub avg_memory_kb: Option<f64>,
    pub first_error: Option<String>,
}

#[derive(Clone)]
pub struct GradingService {
    judge: Arc<dyn JudgeApi>,
    settings: JudgeSettings,
}

impl GradingService {
    pub fn new(judge: Arc<dyn JudgeApi>, settings: JudgeSettings) -> Self {
        Self { judge, settings }
    }

    /// Runs `code` against every test case. Cases run concurrently up to the configured width,
    /// results stay in input order, and the verdict is derived only once every case resolved.
    pub async fn grade_submission(
        &self,
        code: &str,
        language_id: i32,
        test_cases: &[String],
        expected_outputs: &[String],
        points: i32,
        cpu_limit_secs: f64,
    ) -> GradingReport {
        let width = self.settings.grading_concurrency.max(1);

        // each case future owns its inputs so the whole grading future stays Send
        let pending: Vec<_> = test_cases
            .iter()
            .enumerate()
            .map(|(idx, input)| {
                let case = PendingCase {
                    case_number: idx + 1,
                    submission: JudgeSubmission {
                        source_code: code.to_string(),
                        language_id,
                        stdin: input.clone(),
                        cpu_time_limit: cpu_limit_secs,
                        memory_limit: self.settings.memory_limit_kb,
                    },
                    expected: expected_outputs.get(idx).cloned().unwrap_or_default(),
                };
                run_case(Arc::clone(&self.judge), self.settings.clone(), case)
            })
            .collect();

        let cases: Vec<CaseResult> = stream::iter(pending).buffered(width).collect().await;

        build_report(cases, points)
    }
}

struct PendingCase {
    case_number: usize,
    submission: JudgeSubmission,
    expected: String,
}

async fn run_case(judge: Arc<dyn JudgeApi>, settings: JudgeSettings, case: PendingCase) -> CaseResult {
    let PendingCase {
        case_number,
        submission,
        expected,
    } = case;

    let token = match judge.submit(&submission).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(case_number, error = %e, "Test case submission failed");
            return error_case(case_number, &submission.stdin, &expected, None, e);
        }
    };

    let result = match await_result(
        judge.as_ref(),
        &token,
        settings.poll_timeout,
        settings.poll_interval,
    )
    .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(case_number, token = %token, error = %e, "Test case did not resolve");
            return error_case(case_number, &submission.stdin, &expected, Some(token), e);
        }
    };

    let actual = result.stdout.clone().unwrap_or_default();
    let passed = case_passed(&actual, &expected, result.status);

    CaseResult {
        case_number,
        input: submission.stdin,
        expected_output: expected.trim().to_string(),
        actual_output: Some(actual.trim().to_string()),
        passed,
        status: CaseStatus::Judged(result.status),
        status_id: Some(result.status_id),
        time_ms: result.time_ms,
        memory_kb: result.memory_kb,
        error: result.error_text(),
        token: Some(token),
        timed_out: false,
    }
}

fn error_case(
    case_number: usize,
    input: &str,
    expected: &str,
    token: Option<String>,
    err: JudgeError,
) -> CaseResult {
    CaseResult {
        case_number,
        input: input.to_string(),
        expected_output: expected.trim().to_string(),
        actual_output: None,
        passed: false,
        status: CaseStatus::Error,
        status_id: None,
        time_ms: None,
        memory_kb: None,
        timed_out: matches!(err, JudgeError::Timeout { .. }),
        error: Some(err.to_string()),
        token,
    }
}

/// Exact match after one outer trim, and only for runs the judge accepted.
pub fn case_passed(actual: &str, expected: &str, status: JudgeStatus) -> bool {
    status == JudgeStatus::Accepted && actual.trim() == expected.trim()
}

/// First match wins: all passed, any timeout, any compile error, any runtime error, otherwise
/// wrong answer. A poll timeout counts as a timeout.
pub fn aggregate_verdict(cases: &[CaseResult]) -> Verdict {
    let has = |status: JudgeStatus| {
        cases
            .iter()
            .any(|c| c.status == CaseStatus::Judged(status))
    };

    if !cases.is_empty() && cases.iter().all(|c| c.passed) {
        Verdict::Accepted
    } else if has(JudgeStatus::TimeLimitExceeded) || cases.iter().any(|c| c.timed_out) {
        Verdict::TimeLimitExceeded
    } else if has(JudgeStatus::CompilationError) {
        Verdict::CompilationError
    } else if has(JudgeStatus::RuntimeError) {
        Verdict::RuntimeError
    } else {
        Verdict::WrongAnswer
    }
}

pub fn coding_score(passed: usize, total: usize, points: i32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (passed as f64 / total as f64) * points as f64
}

pub fn build_report(cases: Vec<CaseResult>, points: i32) -> GradingReport {
    let total_count = cases.len();
    let passed_count = cases.iter().filter(|c| c.passed).count();
    let verdict = aggregate_verdict(&cases);
    let score = coding_score(passed_count, total_count, points);

    // cases without a measurement count as zero, matching how the judge history is averaged
    let average = |values: Vec<f64>| -> Option<f64> {
        if values.is_empty() || total_count == 0 {
            None
        } else {
            Some(values.iter().sum::<f64>() / total_count as f64)
        }
    };
    let avg_time_ms = average(cases.iter().filter_map(|c| c.time_ms).collect());
    let avg_memory_kb = average(
        cases
            .iter()
            .filter_map(|c| c.memory_kb.map(|m| m as f64))
            .collect(),
    );
    let first_error = cases.iter().find_map(|c| c.error.clone());

    GradingReport {
        cases,
        passed_count,
        total_count,
        verdict,
        score,
        avg_time_ms,
        avg_memory_kb,
        first_error,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AptitudeScore {
    pub score: i64,
    pub max_score: i64,
}

/// Reads a selected option index. Negative, fractional or non-numeric values mean unanswered;
/// zero is a real answer.
pub fn selected_index(value: &JsonValue) -> Option<i64> {
    let idx = match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        _ => None,
    }?;
    (idx >= 0).then_some(idx)
}

pub fn score_aptitude(questions: &[Question], answers: &[AptitudeAnswer]) -> AptitudeScore {
    let mut score = 0i64;
    let mut max_score = 0i64;

    for question in questions {
        let Some(details) = question.aptitude() else {
            continue;
        };
        max_score += details.marks as i64;

        let chosen = answers
            .iter()
            .find(|a| a.question_id == question.id)
            .and_then(|a| selected_index(&a.selected_index));
        if chosen == Some(details.correct_index as i64) {
            score += details.marks as i64;
        }
    }

    AptitudeScore { score, max_score }
}

/// Points needed to pass. Cutoffs in 0..=100 are percentages of `max_score`, rounded up;
/// larger cutoffs are absolute points. `None` means no cutoff.
pub fn required_points(cutoff: Option<f64>, max_score: i64) -> Option<f64> {
    let cutoff = cutoff?;
    if (0.0..=100.0).contains(&cutoff) {
        // multiply before dividing so 70% of 10 is 7, not 7.000000000000001
        Some((cutoff * max_score as f64 / 100.0).ceil())
    } else {
        Some(cutoff)
    }
}

pub fn passes_cutoff(score: i64, cutoff: Option<f64>, max_score: i64) -> bool {
    match required_points(cutoff, max_score) {
        Some(required) => score as f64 >= required,
        None => true,
    }
}
