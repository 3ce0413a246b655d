//! Migration: role profiles (students, teachers, guardians).

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_accounts_table::Accounts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Profiles::AccountId).uuid().not_null())
                    .col(ColumnDef::new(Profiles::Role).string_len(16).not_null())
                    .col(ColumnDef::new(Profiles::SecondaryId).string_len(32).null())
                    .col(ColumnDef::new(Profiles::Phone).string_len(20).null())
                    .col(ColumnDef::new(Profiles::Address).string_len(500).null())
                    .col(ColumnDef::new(Profiles::BirthDate).date().null())
                    .col(
                        ColumnDef::new(Profiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Profiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profiles_account")
                            .from(Profiles::Table, Profiles::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One profile per role and account
        manager
            .create_index(
                Index::create()
                    .name("uq_profiles_role_account")
                    .table(Profiles::Table)
                    .col(Profiles::Role)
                    .col(Profiles::AccountId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // NIS / NIP are unique within their role; NULLs never collide
        manager
            .create_index(
                Index::create()
                    .name("uq_profiles_role_secondary_id")
                    .table(Profiles::Table)
                    .col(Profiles::Role)
                    .col(Profiles::SecondaryId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum Profiles {
    Table,
    Id,
    AccountId,
    Role,
    SecondaryId,
    Phone,
    Address,
    BirthDate,
    CreatedAt,
    UpdatedAt,
}
