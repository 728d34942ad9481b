//! Domain layer - Survey entities and the inputs that create or change them.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! The gRPC adapter maps these types to and from the generated proto messages.

pub mod answer;
pub mod error;
pub mod question;
pub mod survey;
pub mod user;
pub mod validation;

pub use answer::{Answer, AnswerChanges, NewAnswer};
pub use error::{DomainError, DomainResult};
pub use question::{NewQuestion, Question, QuestionChanges};
pub use survey::{NewSurvey, Survey, SurveyChanges};
pub use user::{NewUser, User, UserChanges};
pub use validation::validate;
