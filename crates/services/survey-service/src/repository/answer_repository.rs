//! Answer repository.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use super::entities::answer::{self, ActiveModel, Entity as AnswerEntity};
use common::AppResult;
use domain::{Answer, AnswerChanges, NewAnswer};

/// Answer queries and mutations on a borrowed connection.
pub struct AnswerRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> AnswerRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Answer>> {
        let result = AnswerEntity::find_by_id(id).one(self.conn).await?;
        Ok(result.map(Answer::from))
    }

    /// Number of answers given to a question
    pub async fn count_for_question(&self, question_id: i32) -> AppResult<u64> {
        let count = AnswerEntity::find()
            .filter(answer::Column::QuestionId.eq(question_id))
            .count(self.conn)
            .await?;

        Ok(count)
    }

    /// Insert an answer stamped with the current time
    pub async fn insert(&self, input: NewAnswer) -> AppResult<Answer> {
        let active_model = ActiveModel {
            question_id: Set(input.question_id),
            user_id: Set(input.user_id),
            text: Set(Some(input.text)),
            recorded_at: Set(Some(Utc::now())),
            ..Default::default()
        };

        let model = active_model.insert(self.conn).await?;
        Ok(Answer::from(model))
    }

    /// Overwrite the mutable fields; `None` if the answer does not exist.
    pub async fn replace(&self, changes: AnswerChanges) -> AppResult<Option<Answer>> {
        let Some(model) = AnswerEntity::find_by_id(changes.id).one(self.conn).await? else {
            return Ok(None);
        };

        let mut active: ActiveModel = model.into();
        active.user_id = Set(changes.user_id);
        active.text = Set(changes.text);

        let model = active.update(self.conn).await?;
        Ok(Some(Answer::from(model)))
    }

    /// Clear the user of every answer they gave, returning how many changed.
    pub async fn detach_user(&self, user_id: i32) -> AppResult<u64> {
        let result = AnswerEntity::update_many()
            .col_expr(answer::Column::UserId, Expr::value(Option::<i32>::None))
            .filter(answer::Column::UserId.eq(user_id))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = AnswerEntity::delete_by_id(id).exec(self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
