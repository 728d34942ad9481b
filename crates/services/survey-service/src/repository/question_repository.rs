//! Question repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use super::entities::question::{self, ActiveModel, Entity as QuestionEntity};
use super::restricted_delete;
use common::AppResult;
use domain::{NewQuestion, Question, QuestionChanges};

/// Question queries and mutations on a borrowed connection.
pub struct QuestionRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> QuestionRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Question>> {
        let result = QuestionEntity::find_by_id(id).one(self.conn).await?;
        Ok(result.map(Question::from))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let count = QuestionEntity::find_by_id(id).count(self.conn).await?;
        Ok(count > 0)
    }

    /// Number of questions attached to a survey
    pub async fn count_for_survey(&self, survey_id: i32) -> AppResult<u64> {
        let count = QuestionEntity::find()
            .filter(question::Column::SurveyId.eq(survey_id))
            .count(self.conn)
            .await?;

        Ok(count)
    }

    pub async fn insert(&self, input: NewQuestion) -> AppResult<Question> {
        let active_model = ActiveModel {
            survey_id: Set(input.survey_id),
            text: Set(Some(input.text)),
            ..Default::default()
        };

        let model = active_model.insert(self.conn).await?;
        Ok(Question::from(model))
    }

    /// Overwrite the mutable fields; `None` if the question does not exist.
    pub async fn replace(&self, changes: QuestionChanges) -> AppResult<Option<Question>> {
        let Some(model) = QuestionEntity::find_by_id(changes.id).one(self.conn).await? else {
            return Ok(None);
        };

        let mut active: ActiveModel = model.into();
        active.survey_id = Set(changes.survey_id);
        active.text = Set(changes.text);

        let model = active.update(self.conn).await?;
        Ok(Some(Question::from(model)))
    }

    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = QuestionEntity::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(|e| restricted_delete(e, || format!("Question {} still has answers", id)))?;

        Ok(result.rows_affected > 0)
    }
}
