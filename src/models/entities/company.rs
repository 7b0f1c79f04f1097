// 详细注释：Company实体的SeaORM定义

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use crate::models::structs::{default_id, Company};

/// 公司实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(default = "default_id")]
    pub id: String,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub category: String,                   // Supplier / Client
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Company> for ActiveModel {
    fn from(company: &Company) -> Self {
        Self {
            id: Set(company.id.clone()),
            name: Set(company.name.clone()),
            category: Set(company.category.to_string()),
        }
    }
}

impl From<&Model> for Company {
    fn from(model: &Model) -> Self {
        Company {
            id: model.id.clone(),
            name: model.name.clone(),
            category: model.category.parse().unwrap_or_default(),
        }
    }
}
