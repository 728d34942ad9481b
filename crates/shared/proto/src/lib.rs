//! gRPC protocol buffer definitions.
//!
//! This crate contains the generated definitions for `SurveyService`:
//! create/get/update/delete for surveys, questions, answers and users.

/// Survey service definitions.
pub mod survey {
    tonic::include_proto!("survey");
}

// Re-export commonly used items
pub use survey::survey_service_client::SurveyServiceClient;
pub use survey::survey_service_server::{SurveyService, SurveyServiceServer};
