use crate::database::Store;
use crate::error::Result;
use crate::models::notification::NewNotification;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

/// Upper bound on the error strings a batch report carries.
pub const MAX_REPORTED_ERRORS: usize = 50;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> Result<()>;
}

/// Writes notifications into the store; delivery to the student happens elsewhere.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify(&self, notification: NewNotification) -> Result<()> {
        let student_id = notification.student_id;
        let created = self.store.create_notification(notification).await?;
        tracing::debug!(student_id, notification_id = %created.id, "Notification stored");
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FanOutReport {
    pub sent: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Sends one notification per entry with bounded concurrency. A failure for one recipient is
/// recorded and never stops the others.
pub async fn fan_out(
    notifier: &dyn Notifier,
    notifications: Vec<NewNotification>,
    width: usize,
) -> FanOutReport {
    let outcomes: Vec<(i64, Result<()>)> = stream::iter(notifications)
        .map(|n| async move {
            let student_id = n.student_id;
            (student_id, notifier.notify(n).await)
        })
        .buffer_unordered(width.max(1))
        .collect()
        .await;

    let mut report = FanOutReport::default();
    for (student_id, outcome) in outcomes {
        match outcome {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::warn!(student_id, error = %e, "Failed to notify student");
                report.failed += 1;
                if report.errors.len() < MAX_REPORTED_ERRORS {
                    report.errors.push(format!("student {}: {}", student_id, e));
                }
            }
        }
    }
    report
}

/// Fire-and-forget: logs a failure and returns whether the notification went out.
pub async fn notify_best_effort(notifier: &dyn Notifier, notification: NewNotification) -> bool {
    let student_id = notification.student_id;
    match notifier.notify(notification).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(student_id, error = %e, "Notification failed");
            false
        }
    }
}
