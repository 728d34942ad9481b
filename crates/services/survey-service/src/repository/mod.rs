//! Repository layer for data access.
//!
//! Repositories borrow whatever connection they are given, normally the
//! transaction of the current [`Session`](crate::infra::Session), so every
//! statement of one operation runs in the same unit of work.

pub mod entities;
mod answer_repository;
mod question_repository;
mod survey_repository;
mod user_repository;

pub use answer_repository::AnswerRepository;
pub use question_repository::QuestionRepository;
pub use survey_repository::SurveyRepository;
pub use user_repository::UserRepository;

use sea_orm::{DbErr, SqlErr};

use common::AppError;

/// Map a foreign-key violation raised by a delete to [`AppError::InUse`].
fn restricted_delete(err: DbErr, describe: impl FnOnce() -> String) -> AppError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => AppError::in_use(describe()),
        _ => AppError::from(err),
    }
}
