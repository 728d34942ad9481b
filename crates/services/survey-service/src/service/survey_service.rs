//! Survey service - CRUD over surveys, questions, users and answers.
//!
//! Every operation follows the same shape: acquire a session for the call
//! context, validate the input, query or mutate through the repositories on
//! the session's transaction, commit mutations with [`safe_commit`], and
//! return the row. A failed write is reported like a failed commit.
//! [`SessionLease::finish`](crate::infra::SessionLease::finish) rolls back
//! whatever a failed operation left pending, and the lease closes an owned
//! session whichever way the operation exits.

use async_trait::async_trait;

use common::{AppError, AppResult};
use domain::{
    Answer, AnswerChanges, NewAnswer, NewQuestion, NewSurvey, NewUser, Question, QuestionChanges,
    Survey, SurveyChanges, User, UserChanges,
};

use crate::infra::{safe_commit, CallContext, SessionProvider};
use crate::repository::{AnswerRepository, QuestionRepository, SurveyRepository, UserRepository};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Survey service trait for dependency injection.
///
/// Updates replace every mutable field: a `None` in the changes is stored
/// as NULL.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SurveyService: Send + Sync {
    async fn create_survey(&self, ctx: &mut CallContext, input: NewSurvey) -> AppResult<Survey>;

    async fn get_survey(&self, ctx: &mut CallContext, id: i32) -> AppResult<Survey>;

    async fn update_survey(&self, ctx: &mut CallContext, changes: SurveyChanges)
        -> AppResult<Survey>;

    /// Fails with `InUse` while the survey still has questions.
    async fn delete_survey(&self, ctx: &mut CallContext, id: i32) -> AppResult<bool>;

    /// All surveys ordered by id
    async fn list_surveys(&self, ctx: &mut CallContext) -> AppResult<Vec<Survey>>;

    /// Fails with `NotFound` if the survey does not exist.
    async fn create_question(&self, ctx: &mut CallContext, input: NewQuestion)
        -> AppResult<Question>;

    async fn get_question(&self, ctx: &mut CallContext, id: i32) -> AppResult<Question>;

    async fn update_question(
        &self,
        ctx: &mut CallContext,
        changes: QuestionChanges,
    ) -> AppResult<Question>;

    /// Fails with `InUse` while the question still has answers.
    async fn delete_question(&self, ctx: &mut CallContext, id: i32) -> AppResult<bool>;

    async fn create_user(&self, ctx: &mut CallContext, input: NewUser) -> AppResult<User>;

    async fn get_user(&self, ctx: &mut CallContext, id: i32) -> AppResult<User>;

    async fn update_user(&self, ctx: &mut CallContext, changes: UserChanges) -> AppResult<User>;

    /// Deletes the user and keeps their answers, unattributed.
    async fn delete_user(&self, ctx: &mut CallContext, id: i32) -> AppResult<bool>;

    /// All users ordered by id
    async fn list_users(&self, ctx: &mut CallContext) -> AppResult<Vec<User>>;

    /// Fails with `NotFound` if the question, or a given user, does not exist.
    async fn create_answer(&self, ctx: &mut CallContext, input: NewAnswer) -> AppResult<Answer>;

    async fn get_answer(&self, ctx: &mut CallContext, id: i32) -> AppResult<Answer>;

    async fn update_answer(&self, ctx: &mut CallContext, changes: AnswerChanges)
        -> AppResult<Answer>;

    async fn delete_answer(&self, ctx: &mut CallContext, id: i32) -> AppResult<bool>;
}

/// Concrete implementation of SurveyService backed by the relational store.
pub struct SurveyManager {
    sessions: SessionProvider,
}

impl SurveyManager {
    pub fn new(sessions: SessionProvider) -> Self {
        Self { sessions }
    }
}

fn not_found(entity: &str, id: i32) -> AppError {
    AppError::not_found(format!("{} not found with id: {}", entity, id))
}

/// Failed writes are reported like failed commits, with the driver's text.
fn write_failed(err: AppError) -> AppError {
    match err {
        AppError::Database(e) => {
            tracing::error!(error = %e, "Database write failed");
            AppError::persistence(e.to_string())
        }
        other => other,
    }
}

#[async_trait]
impl SurveyService for SurveyManager {
    // =========================================================================
    // Surveys
    // =========================================================================

    async fn create_survey(&self, ctx: &mut CallContext, input: NewSurvey) -> AppResult<Survey> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<Survey> = async {
            let session = lease.session();
            domain::validate(&input)?;

            let txn = session.txn().await?;
            let survey = SurveyRepository::new(txn)
                .insert(input)
                .await
                .map_err(write_failed)?;
            safe_commit(session).await?;

            tracing::info!(survey_id = survey.id, "Survey created");
            Ok(survey)
        }
        .await;
        lease.finish(result).await
    }

    async fn get_survey(&self, ctx: &mut CallContext, id: i32) -> AppResult<Survey> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<Survey> = async {
            let txn = lease.session().txn().await?;
            let survey = SurveyRepository::new(txn).find_by_id(id).await?;
            survey.ok_or_else(|| not_found("Survey", id))
        }
        .await;
        lease.finish(result).await
    }

    async fn update_survey(
        &self,
        ctx: &mut CallContext,
        changes: SurveyChanges,
    ) -> AppResult<Survey> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<Survey> = async {
            let session = lease.session();
            domain::validate(&changes)?;

            let id = changes.id;
            let txn = session.txn().await?;
            let survey = SurveyRepository::new(txn)
                .replace(changes)
                .await
                .map_err(write_failed)?
                .ok_or_else(|| not_found("Survey", id))?;
            safe_commit(session).await?;

            tracing::info!(survey_id = id, "Survey updated");
            Ok(survey)
        }
        .await;
        lease.finish(result).await
    }

    async fn delete_survey(&self, ctx: &mut CallContext, id: i32) -> AppResult<bool> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<bool> = async {
            let session = lease.session();

            let txn = session.txn().await?;
            let surveys = SurveyRepository::new(txn);
            if !surveys.exists(id).await? {
                return Err(not_found("Survey", id));
            }

            let questions = QuestionRepository::new(txn).count_for_survey(id).await?;
            if questions > 0 {
                return Err(AppError::in_use(format!(
                    "Survey {} still has {} question(s)",
                    id, questions
                )));
            }

            let deleted = surveys.delete(id).await.map_err(write_failed)?;
            safe_commit(session).await?;

            tracing::info!(survey_id = id, "Survey deleted");
            Ok(deleted)
        }
        .await;
        lease.finish(result).await
    }

    async fn list_surveys(&self, ctx: &mut CallContext) -> AppResult<Vec<Survey>> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<Vec<Survey>> = async {
            let txn = lease.session().txn().await?;
            SurveyRepository::new(txn).list().await
        }
        .await;
        lease.finish(result).await
    }

    // =========================================================================
    // Questions
    // =========================================================================

    async fn create_question(
        &self,
        ctx: &mut CallContext,
        input: NewQuestion,
    ) -> AppResult<Question> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<Question> = async {
            let session = lease.session();
            domain::validate(&input)?;

            let txn = session.txn().await?;
            if !SurveyRepository::new(txn).exists(input.survey_id).await? {
                return Err(not_found("Survey", input.survey_id));
            }

            let question = QuestionRepository::new(txn)
                .insert(input)
                .await
                .map_err(write_failed)?;
            safe_commit(session).await?;

            tracing::info!(
                question_id = question.id,
                survey_id = question.survey_id,
                "Question created"
            );
            Ok(question)
        }
        .await;
        lease.finish(result).await
    }

    async fn get_question(&self, ctx: &mut CallContext, id: i32) -> AppResult<Question> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<Question> = async {
            let txn = lease.session().txn().await?;
            let question = QuestionRepository::new(txn).find_by_id(id).await?;
            question.ok_or_else(|| not_found("Question", id))
        }
        .await;
        lease.finish(result).await
    }

    async fn update_question(
        &self,
        ctx: &mut CallContext,
        changes: QuestionChanges,
    ) -> AppResult<Question> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<Question> = async {
            let session = lease.session();
            domain::validate(&changes)?;

            let id = changes.id;
            let txn = session.txn().await?;
            let questions = QuestionRepository::new(txn);
            if !questions.exists(id).await? {
                return Err(not_found("Question", id));
            }
            if !SurveyRepository::new(txn).exists(changes.survey_id).await? {
                return Err(not_found("Survey", changes.survey_id));
            }

            let question = questions
                .replace(changes)
                .await
                .map_err(write_failed)?
                .ok_or_else(|| not_found("Question", id))?;
            safe_commit(session).await?;

            tracing::info!(question_id = id, "Question updated");
            Ok(question)
        }
        .await;
        lease.finish(result).await
    }

    async fn delete_question(&self, ctx: &mut CallContext, id: i32) -> AppResult<bool> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<bool> = async {
            let session = lease.session();

            let txn = session.txn().await?;
            let questions = QuestionRepository::new(txn);
            if !questions.exists(id).await? {
                return Err(not_found("Question", id));
            }

            let answers = AnswerRepository::new(txn).count_for_question(id).await?;
            if answers > 0 {
                return Err(AppError::in_use(format!(
                    "Question {} still has {} answer(s)",
                    id, answers
                )));
            }

            let deleted = questions.delete(id).await.map_err(write_failed)?;
            safe_commit(session).await?;

            tracing::info!(question_id = id, "Question deleted");
            Ok(deleted)
        }
        .await;
        lease.finish(result).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn create_user(&self, ctx: &mut CallContext, input: NewUser) -> AppResult<User> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<User> = async {
            let session = lease.session();
            domain::validate(&input)?;

            let txn = session.txn().await?;
            let user = UserRepository::new(txn)
                .insert(input)
                .await
                .map_err(write_failed)?;
            safe_commit(session).await?;

            tracing::info!(user_id = user.id, "User created");
            Ok(user)
        }
        .await;
        lease.finish(result).await
    }

    async fn get_user(&self, ctx: &mut CallContext, id: i32) -> AppResult<User> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<User> = async {
            let txn = lease.session().txn().await?;
            let user = UserRepository::new(txn).find_by_id(id).await?;
            user.ok_or_else(|| not_found("User", id))
        }
        .await;
        lease.finish(result).await
    }

    async fn update_user(&self, ctx: &mut CallContext, changes: UserChanges) -> AppResult<User> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<User> = async {
            let session = lease.session();
            domain::validate(&changes)?;

            let id = changes.id;
            let txn = session.txn().await?;
            let user = UserRepository::new(txn)
                .replace(changes)
                .await
                .map_err(write_failed)?
                .ok_or_else(|| not_found("User", id))?;
            safe_commit(session).await?;

            tracing::info!(user_id = id, "User updated");
            Ok(user)
        }
        .await;
        lease.finish(result).await
    }

    async fn delete_user(&self, ctx: &mut CallContext, id: i32) -> AppResult<bool> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<bool> = async {
            let session = lease.session();

            let txn = session.txn().await?;
            let users = UserRepository::new(txn);
            if !users.exists(id).await? {
                return Err(not_found("User", id));
            }

            let orphaned = AnswerRepository::new(txn)
                .detach_user(id)
                .await
                .map_err(write_failed)?;
            let deleted = users.delete(id).await.map_err(write_failed)?;
            safe_commit(session).await?;

            tracing::info!(user_id = id, orphaned_answers = orphaned, "User deleted");
            Ok(deleted)
        }
        .await;
        lease.finish(result).await
    }

    async fn list_users(&self, ctx: &mut CallContext) -> AppResult<Vec<User>> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<Vec<User>> = async {
            let txn = lease.session().txn().await?;
            UserRepository::new(txn).list().await
        }
        .await;
        lease.finish(result).await
    }

    // =========================================================================
    // Answers
    // =========================================================================

    async fn create_answer(&self, ctx: &mut CallContext, input: NewAnswer) -> AppResult<Answer> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<Answer> = async {
            let session = lease.session();
            domain::validate(&input)?;

            let txn = session.txn().await?;
            if !QuestionRepository::new(txn).exists(input.question_id).await? {
                return Err(not_found("Question", input.question_id));
            }
            if let Some(user_id) = input.user_id {
                if !UserRepository::new(txn).exists(user_id).await? {
                    return Err(not_found("User", user_id));
                }
            }

            let answer = AnswerRepository::new(txn)
                .insert(input)
                .await
                .map_err(write_failed)?;
            safe_commit(session).await?;

            tracing::info!(
                answer_id = answer.id,
                question_id = answer.question_id,
                "Answer created"
            );
            Ok(answer)
        }
        .await;
        lease.finish(result).await
    }

    async fn get_answer(&self, ctx: &mut CallContext, id: i32) -> AppResult<Answer> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<Answer> = async {
            let txn = lease.session().txn().await?;
            let answer = AnswerRepository::new(txn).find_by_id(id).await?;
            answer.ok_or_else(|| not_found("Answer", id))
        }
        .await;
        lease.finish(result).await
    }

    async fn update_answer(
        &self,
        ctx: &mut CallContext,
        changes: AnswerChanges,
    ) -> AppResult<Answer> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<Answer> = async {
            let session = lease.session();
            domain::validate(&changes)?;

            let id = changes.id;
            let txn = session.txn().await?;
            let answers = AnswerRepository::new(txn);
            if answers.find_by_id(id).await?.is_none() {
                return Err(not_found("Answer", id));
            }
            if let Some(user_id) = changes.user_id {
                if !UserRepository::new(txn).exists(user_id).await? {
                    return Err(not_found("User", user_id));
                }
            }

            let answer = answers
                .replace(changes)
                .await
                .map_err(write_failed)?
                .ok_or_else(|| not_found("Answer", id))?;
            safe_commit(session).await?;

            tracing::info!(answer_id = id, "Answer updated");
            Ok(answer)
        }
        .await;
        lease.finish(result).await
    }

    async fn delete_answer(&self, ctx: &mut CallContext, id: i32) -> AppResult<bool> {
        let mut lease = self.sessions.acquire(ctx);
        let result: AppResult<bool> = async {
            let session = lease.session();

            let txn = session.txn().await?;
            let answers = AnswerRepository::new(txn);
            if answers.find_by_id(id).await?.is_none() {
                return Err(not_found("Answer", id));
            }

            let deleted = answers.delete(id).await.map_err(write_failed)?;
            safe_commit(session).await?;

            tracing::info!(answer_id = id, "Answer deleted");
            Ok(deleted)
        }
        .await;
        lease.finish(result).await
    }
}
