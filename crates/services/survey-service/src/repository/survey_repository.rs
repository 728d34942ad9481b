//! Survey repository.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryOrder, Set,
};

use super::entities::survey::{self, ActiveModel, Entity as SurveyEntity};
use super::restricted_delete;
use common::AppResult;
use domain::{NewSurvey, Survey, SurveyChanges};

/// Survey queries and mutations on a borrowed connection.
pub struct SurveyRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SurveyRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Find survey by ID
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Survey>> {
        let result = SurveyEntity::find_by_id(id).one(self.conn).await?;
        Ok(result.map(Survey::from))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let count = SurveyEntity::find_by_id(id).count(self.conn).await?;
        Ok(count > 0)
    }

    /// All surveys, oldest first
    pub async fn list(&self) -> AppResult<Vec<Survey>> {
        let models = SurveyEntity::find()
            .order_by_asc(survey::Column::Id)
            .all(self.conn)
            .await?;

        Ok(models.into_iter().map(Survey::from).collect())
    }

    /// Insert a survey stamped with the current time
    pub async fn insert(&self, input: NewSurvey) -> AppResult<Survey> {
        let active_model = ActiveModel {
            title: Set(Some(input.title)),
            description: Set(input.description),
            status: Set(input.status),
            created_at: Set(Some(Utc::now())),
            ..Default::default()
        };

        let model = active_model.insert(self.conn).await?;
        Ok(Survey::from(model))
    }

    /// Overwrite the mutable fields; `None` if the survey does not exist.
    pub async fn replace(&self, changes: SurveyChanges) -> AppResult<Option<Survey>> {
        let Some(model) = SurveyEntity::find_by_id(changes.id).one(self.conn).await? else {
            return Ok(None);
        };

        let mut active: ActiveModel = model.into();
        active.title = Set(changes.title);
        active.description = Set(changes.description);
        active.status = Set(changes.status);

        let model = active.update(self.conn).await?;
        Ok(Some(Survey::from(model)))
    }

    /// Delete by ID; `false` if nothing was deleted.
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = SurveyEntity::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(|e| restricted_delete(e, || format!("Survey {} still has questions", id)))?;

        Ok(result.rows_affected > 0)
    }
}
