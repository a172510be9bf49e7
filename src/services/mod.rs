pub mod ats_service;
pub mod eligibility;
pub mod grading_service;
pub mod interview_service;
pub mod job_service;
pub mod judge_client;
pub mod notification_service;
pub mod shortlist_service;
pub mod storage_service;
pub mod test_service;
pub mod text_extract;
