pub mod assessment_dto;
pub mod interview_dto;
pub mod shortlist_dto;
