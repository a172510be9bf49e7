use crate::models::submission::JudgeStatus;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::Instant;

/// Default Judge0 language ids offered when a coding test does not list its own.
pub const DEFAULT_LANGUAGES: [(&str, i32); 4] = [("C", 50), ("C++", 54), ("JAVA", 91), ("PYTHON", 92)];

pub fn default_language_ids() -> Vec<i32> {
    DEFAULT_LANGUAGES.iter().map(|(_, id)| *id).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("judge submission failed: {0}")]
    Submit(String),

    #[error("judge poll failed: {0}")]
    Poll(String),

    #[error("timed out after {waited_ms} ms waiting for judge result")]
    Timeout { waited_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct JudgeSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub poll_timeout: Duration,
    pub poll_interval: Duration,
    pub memory_limit_kb: u32,
    pub grading_concurrency: usize,
}

impl JudgeSettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            api_url: config.judge0_api_url.trim_end_matches('/').to_string(),
            api_key: config.judge0_api_key.clone(),
            poll_timeout: Duration::from_millis(config.judge_poll_timeout_ms),
            poll_interval: Duration::from_millis(config.judge_poll_interval_ms),
            memory_limit_kb: config.judge_memory_limit_kb,
            grading_concurrency: config.grading_concurrency.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeSubmission {
    pub source_code: String,
    pub language_id: i32,
    pub stdin: String,
    pub cpu_time_limit: f64,
    pub memory_limit: u32,
}

/// One poll response. Output fields are only meaningful once `status` is terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeResult {
    pub status: JudgeStatus,
    pub status_id: i64,
    pub description: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub time_ms: Option<f64>,
    pub memory_kb: Option<i64>,
}

impl JudgeResult {
    pub fn pending(status: JudgeStatus) -> Self {
        Self {
            status,
            status_id: status.id().unwrap_or_default(),
            description: None,
            stdout: None,
            stderr: None,
            compile_output: None,
            time_ms: None,
            memory_kb: None,
        }
    }

    /// stderr, then compiler output, then the status description for non-accepted runs.
    pub fn error_text(&self) -> Option<String> {
        let non_empty = |s: &Option<String>| s.as_ref().filter(|v| !v.trim().is_empty()).cloned();
        non_empty(&self.stderr)
            .or_else(|| non_empty(&self.compile_output))
            .or_else(|| {
                (self.status != JudgeStatus::Accepted).then(|| {
                    self.description
                        .clone()
                        .unwrap_or_else(|| self.status.as_str().to_string())
                })
            })
    }
}

#[async_trait]
pub trait JudgeApi: Send + Sync {
    /// One outbound submission. Never retried here; a retry creates a second judge-side run.
    async fn submit(&self, submission: &JudgeSubmission) -> Result<String, JudgeError>;
    async fn poll(&self, token: &str) -> Result<JudgeResult, JudgeError>;
}

#[derive(Debug)]
pub enum PollState {
    InProgress,
    Terminal(JudgeResult),
    TimedOut,
}

/// Polls until the judge reports a terminal status or `max_wait` elapses. The sleep between
/// polls yields to the runtime. Poll failures end the loop immediately.
pub async fn await_result(
    judge: &dyn JudgeApi,
    token: &str,
    max_wait: Duration,
    interval: Duration,
) -> Result<JudgeResult, JudgeError> {
    let started = Instant::now();

    loop {
        let state = if started.elapsed() >= max_wait {
            PollState::TimedOut
        } else {
            let result = judge.poll(token).await?;
            if result.status.is_terminal() {
                PollState::Terminal(result)
            } else {
                PollState::InProgress
            }
        };

        match state {
            PollState::Terminal(result) => return Ok(result),
            PollState::TimedOut => {
                tracing::warn!(token, waited_ms = max_wait.as_millis() as u64, "Judge poll timed out");
                return Err(JudgeError::Timeout {
                    waited_ms: max_wait.as_millis() as u64,
                });
            }
            PollState::InProgress => tokio::time::sleep(interval).await,
        }
    }
}

#[derive(Clone)]
pub struct Judge0Client {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct StatusBody {
    id: i64,
    description: Option<String>,
}

#[derive(Deserialize)]
struct PollResponse {
    status: Option<StatusBody>,
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    #[serde(default)]
    time: JsonValue,
    memory: Option<i64>,
}

/// Judge0 reports time as a string of seconds ("0.012"); some deployments send a number.
fn seconds_to_ms(raw: &JsonValue) -> Option<f64> {
    let secs = match raw {
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        JsonValue::Number(n) => n.as_f64(),
        _ => None,
    }?;
    Some(secs * 1000.0)
}

impl Judge0Client {
    pub fn new(client: Client, settings: &JudgeSettings) -> Self {
        Self {
            client,
            base_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
        }
    }

    fn with_key(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("X-RapidAPI-Key", key),
            None => req,
        }
    }
}

#[async_trait]
impl JudgeApi for Judge0Client {
    async fn submit(&self, submission: &JudgeSubmission) -> Result<String, JudgeError> {
        let body = serde_json::json!({
            "source_code": submission.source_code,
            "language_id": submission.language_id,
            "stdin": submission.stdin,
            "cpu_time_limit": submission.cpu_time_limit,
            "memory_limit": submission.memory_limit,
            "wait": false,
        });

        let resp = self
            .with_key(self.client.post(format!("{}/submissions", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Judge submission request failed");
                JudgeError::Submit(e.to_string())
            })?;

        let status = resp.status();
        let txt = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %txt, "Judge rejected submission");
            return Err(JudgeError::Submit(format!("status {}: {}", status.as_u16(), txt)));
        }

        let parsed: TokenResponse = serde_json::from_str(&txt)
            .map_err(|e| JudgeError::Submit(format!("unreadable response: {}", e)))?;
        tracing::debug!(token = %parsed.token, language_id = submission.language_id, "Judge submission accepted");
        Ok(parsed.token)
    }

    async fn poll(&self, token: &str) -> Result<JudgeResult, JudgeError> {
        let resp = self
            .with_key(self.client.get(format!("{}/submissions/{}", self.base_url, token)))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(token, error = %e, "Judge poll request failed");
                JudgeError::Poll(e.to_string())
            })?;

        let status = resp.status();
        let txt = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(JudgeError::Poll(format!("status {}: {}", status.as_u16(), txt)));
        }

        let parsed: PollResponse = serde_json::from_str(&txt)
            .map_err(|e| JudgeError::Poll(format!("unreadable response: {}", e)))?;
        let status_body = parsed
            .status
            .ok_or_else(|| JudgeError::Poll("response carries no status".to_string()))?;
        let judge_status = JudgeStatus::from_id(status_body.id).unwrap_or_else(|| {
            tracing::warn!(token, status_id = status_body.id, "Judge reported an unrecognised status");
            JudgeStatus::Unknown
        });

        Ok(JudgeResult {
            status: judge_status,
            status_id: status_body.id,
            description: status_body.description,
            stdout: parsed.stdout,
            stderr: parsed.stderr,
            compile_output: parsed.compile_output,
            time_ms: seconds_to_ms(&parsed.time),
            memory_kb: parsed.memory,
        })
    }
}
