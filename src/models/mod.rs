pub mod application;
pub mod interview;
pub mod job;
pub mod notification;
pub mod question;
pub mod shortlist;
pub mod submission;
