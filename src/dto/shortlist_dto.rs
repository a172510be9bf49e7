use crate::models::shortlist::ShortlistMode;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ShortlistPayload {
    pub company_id: i64,
    #[serde(default)]
    pub mode: ShortlistMode,
}
