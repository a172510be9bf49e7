use crate::models::test::TestKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub details: QuestionDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionDetails {
    Aptitude(AptitudeDetails),
    Coding(CodingDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AptitudeDetails {
    pub options: Vec<String>,
    pub correct_index: i32,
    #[serde(default = "default_marks")]
    pub marks: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingDetails {
    pub test_cases: Vec<String>,
    pub expected_outputs: Vec<String>,
    #[serde(default = "default_points")]
    pub points: i32,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub sample_input: Option<String>,
    #[serde(default)]
    pub sample_output: Option<String>,
    #[serde(default)]
    pub constraints: Option<String>,
}

fn default_marks() -> i32 {
    1
}

fn default_points() -> i32 {
    10
}

pub const APTITUDE_OPTION_COUNT: usize = 4;

impl Question {
    pub fn aptitude(&self) -> Option<&AptitudeDetails> {
        match &self.details {
            QuestionDetails::Aptitude(details) => Some(details),
            QuestionDetails::Coding(_) => None,
        }
    }

    pub fn coding(&self) -> Option<&CodingDetails> {
        match &self.details {
            QuestionDetails::Coding(details) => Some(details),
            QuestionDetails::Aptitude(_) => None,
        }
    }

    /// Checks the question against the shape rules of the test kind it is attached to.
    pub fn validate_for(&self, kind: TestKind) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err(format!("question {}: title is required", self.id));
        }

        match (&self.details, kind) {
            (QuestionDetails::Aptitude(apt), TestKind::Aptitude) => {
                if apt.options.len() != APTITUDE_OPTION_COUNT {
                    return Err(format!(
                        "question {}: exactly {} options are required, got {}",
                        self.id,
                        APTITUDE_OPTION_COUNT,
                        apt.options.len()
                    ));
                }
                if !(0..APTITUDE_OPTION_COUNT as i32).contains(&apt.correct_index) {
                    return Err(format!(
                        "question {}: correct_index {} is outside 0..=3",
                        self.id, apt.correct_index
                    ));
                }
                if apt.marks < 1 {
                    return Err(format!("question {}: marks must be at least 1", self.id));
                }
                Ok(())
            }
            (QuestionDetails::Coding(code), TestKind::Coding) => {
                if code.test_cases.is_empty() {
                    return Err(format!(
                        "question {}: at least one test case is required",
                        self.id
                    ));
                }
                if code.test_cases.len() != code.expected_outputs.len() {
                    return Err(format!(
                        "question {}: {} test cases but {} expected outputs",
                        self.id,
                        code.test_cases.len(),
                        code.expected_outputs.len()
                    ));
                }
                if code.points < 1 {
                    return Err(format!("question {}: points must be at least 1", self.id));
                }
                Ok(())
            }
            (_, kind) => Err(format!(
                "question {}: not a valid question for a {} test",
                self.id,
                kind.as_str()
            )),
        }
    }
}

/// Gives every question that arrived without an id the lowest positive id no other question
/// uses. Explicit ids, including invalid ones, are left for validation.
pub fn assign_question_ids(questions: Vec<Question>) -> Vec<Question> {
    let mut taken: HashSet<i32> = questions.iter().map(|q| q.id).filter(|id| *id > 0).collect();
    let mut next = 1;

    questions
        .into_iter()
        .map(|mut q| {
            if q.id == 0 {
                while taken.contains(&next) {
                    next += 1;
                }
                q.id = next;
                taken.insert(next);
            }
            q
        })
        .collect()
}
