pub mod assessments;
pub mod health;
pub mod interviews;
pub mod jobs;
