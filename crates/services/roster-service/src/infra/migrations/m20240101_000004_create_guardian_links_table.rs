//! Migration: guardian to student links.

use sea_orm_migration::prelude::*;

use super::m20240101_000003_create_profiles_table::Profiles;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GuardianLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GuardianLinks::StudentProfileId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GuardianLinks::GuardianProfileId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GuardianLinks::Relation)
                            .string_len(16)
                            .not_null()
                            .default("guardian"),
                    )
                    .col(
                        ColumnDef::new(GuardianLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(GuardianLinks::StudentProfileId)
                            .col(GuardianLinks::GuardianProfileId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_guardian_links_student")
                            .from(GuardianLinks::Table, GuardianLinks::StudentProfileId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_guardian_links_guardian")
                            .from(GuardianLinks::Table, GuardianLinks::GuardianProfileId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GuardianLinks::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum GuardianLinks {
    Table,
    StudentProfileId,
    GuardianProfileId,
    Relation,
    CreatedAt,
}
