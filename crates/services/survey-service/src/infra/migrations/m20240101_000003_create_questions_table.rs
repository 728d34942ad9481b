//! Migration: Create questions table.
//!
//! A survey cannot be deleted while it still has questions.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Questions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Questions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Questions::SurveyId).integer().not_null())
                    .col(ColumnDef::new(Questions::Text).string_len(255).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_questions_survey_id")
                            .from(Questions::Table, Questions::SurveyId)
                            .to(Surveys::Table, Surveys::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_questions_survey_id")
                    .table(Questions::Table)
                    .col(Questions::SurveyId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Questions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Questions {
    Table,
    Id,
    SurveyId,
    Text,
}

#[derive(Iden)]
enum Surveys {
    Table,
    Id,
}
