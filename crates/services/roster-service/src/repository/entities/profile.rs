//! Profile database entity for SeaORM.

use sea_orm::entity::prelude::*;

use common::AppError;
use domain::{Profile, Role};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub role: String,
    pub secondary_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<Date>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Profile {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let role: Role = model.role.parse().map_err(|_| {
            AppError::internal(format!(
                "profile {} has unknown role '{}'",
                model.id, model.role
            ))
        })?;

        Ok(Profile {
            id: model.id,
            account_id: model.account_id,
            role,
            secondary_id: model.secondary_id,
            phone: model.phone,
            address: model.address,
            birth_date: model.birth_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
