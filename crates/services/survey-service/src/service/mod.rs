//! Service layer - survey business logic.

mod survey_service;

pub use survey_service::{SurveyManager, SurveyService};

#[cfg(any(test, feature = "test-utils"))]
pub use survey_service::MockSurveyService;
