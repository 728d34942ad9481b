//! Question domain entity and its inputs.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Question belonging to a survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i32,
    pub survey_id: i32,
    pub text: Option<String>,
}

/// Question creation data. The survey must already exist.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewQuestion {
    #[validate(range(min = 1, message = "'survey_id' is required to create a question"))]
    pub survey_id: i32,
    #[validate(length(min = 1, message = "'text' is required to create a question"))]
    pub text: String,
}

/// Full replacement of a question's mutable fields.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct QuestionChanges {
    #[validate(range(min = 1, message = "'id' is required to update a question"))]
    pub id: i32,
    /// Column is NOT NULL, so an update must name a survey.
    #[validate(range(min = 1, message = "'survey_id' is required to update a question"))]
    pub survey_id: i32,
    pub text: Option<String>,
}
