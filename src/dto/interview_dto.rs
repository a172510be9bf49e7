use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize)]
pub struct StartInterviewPayload {
    pub company_id: i64,
    pub mode: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddQuestionPayload {
    pub company_id: i64,
    #[validate(length(min = 1, max = 2000))]
    pub question: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerPayload {
    pub student_id: i64,
    pub question_index: usize,
    #[validate(length(min = 1))]
    pub answer: String,
}
