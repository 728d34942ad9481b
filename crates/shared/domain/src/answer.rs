//! Answer domain entity and its inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Answer to a question, optionally attributed to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: i32,
    pub question_id: i32,
    pub user_id: Option<i32>,
    pub text: Option<String>,
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Answer creation data.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewAnswer {
    #[validate(range(min = 1, message = "'question_id' is required to create an answer"))]
    pub question_id: i32,
    pub user_id: Option<i32>,
    #[validate(length(min = 1, message = "'text' is required to create an answer"))]
    pub text: String,
}

/// Full replacement of an answer's mutable fields.
///
/// The question an answer belongs to never changes.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AnswerChanges {
    #[validate(range(min = 1, message = "'id' is required to update an answer"))]
    pub id: i32,
    pub user_id: Option<i32>,
    pub text: Option<String>,
}
