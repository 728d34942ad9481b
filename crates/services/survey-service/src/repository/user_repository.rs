//! User repository.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryOrder, Set,
};

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use common::AppResult;
use domain::{NewUser, User, UserChanges};

/// User queries and mutations on a borrowed connection.
pub struct UserRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id).one(self.conn).await?;
        Ok(result.map(User::from))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let count = UserEntity::find_by_id(id).count(self.conn).await?;
        Ok(count > 0)
    }

    /// All users, oldest first
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let models = UserEntity::find()
            .order_by_asc(user::Column::Id)
            .all(self.conn)
            .await?;

        Ok(models.into_iter().map(User::from).collect())
    }

    pub async fn insert(&self, input: NewUser) -> AppResult<User> {
        let active_model = ActiveModel {
            name: Set(Some(input.name)),
            last_name: Set(input.last_name),
            email: Set(input.email),
            gender: Set(input.gender),
            phone: Set(input.phone),
            created_at: Set(Some(Utc::now())),
            ..Default::default()
        };

        let model = active_model.insert(self.conn).await?;
        Ok(User::from(model))
    }

    /// Overwrite the mutable fields; `None` if the user does not exist.
    pub async fn replace(&self, changes: UserChanges) -> AppResult<Option<User>> {
        let Some(model) = UserEntity::find_by_id(changes.id).one(self.conn).await? else {
            return Ok(None);
        };

        let mut active: ActiveModel = model.into();
        active.name = Set(changes.name);
        active.last_name = Set(changes.last_name);
        active.email = Set(changes.email);
        active.gender = Set(changes.gender);
        active.phone = Set(changes.phone);

        let model = active.update(self.conn).await?;
        Ok(Some(User::from(model)))
    }

    /// Permanently delete user; `false` if nothing was deleted.
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = UserEntity::delete_by_id(id).exec(self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
