use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub student_id: i64,
    pub title: String,
    pub message: String,
    pub job_id: Option<i64>,
    pub application_id: Option<i64>,
    pub is_read: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub student_id: i64,
    pub title: String,
    pub message: String,
    pub job_id: Option<i64>,
    pub application_id: Option<i64>,
}
