//! Survey domain entity and its inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Survey as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    pub id: i32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Survey creation data.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewSurvey {
    #[validate(length(min = 1, message = "'title' is required to create a survey"))]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<i32>,
}

/// Full replacement of a survey's mutable fields.
///
/// Fields left as `None` are written as NULL; nothing is merged with the
/// stored row.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SurveyChanges {
    #[validate(range(min = 1, message = "'id' is required to update a survey"))]
    pub id: i32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<i32>,
}
