// 详细注释：Project实体的SeaORM定义

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::structs::{default_id, Project};

/// 项目实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(default = "default_id")]
    pub id: String,
    pub name: String,
    pub number: i32,
    #[sea_orm(column_type = "Text")]
    pub status: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Project> for ActiveModel {
    fn from(project: &Project) -> Self {
        Self {
            id: Set(project.id.clone()),
            name: Set(project.name.clone()),
            number: Set(project.number),
            status: Set(project.status.to_string()),
            last_updated: Set(project.last_updated),
        }
    }
}

impl From<&Model> for Project {
    fn from(model: &Model) -> Self {
        Project {
            id: model.id.clone(),
            name: model.name.clone(),
            number: model.number,
            status: model.status.parse().unwrap_or_default(),
            last_updated: model.last_updated,
        }
    }
}
