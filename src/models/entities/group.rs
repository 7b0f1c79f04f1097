// 详细注释：Group实体的SeaORM定义

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::structs::{default_id, Group};

/// 通道分组实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "channel_groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(default = "default_id")]
    pub id: String,
    pub job_id: String,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub status: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Group> for ActiveModel {
    fn from(group: &Group) -> Self {
        Self {
            id: Set(group.id.clone()),
            job_id: Set(group.job_id.clone()),
            name: Set(group.name.clone()),
            status: Set(group.status.to_string()),
            last_updated: Set(group.last_updated),
        }
    }
}

impl From<&Model> for Group {
    fn from(model: &Model) -> Self {
        Group {
            id: model.id.clone(),
            job_id: model.job_id.clone(),
            name: model.name.clone(),
            status: model.status.parse().unwrap_or_default(),
            last_updated: model.last_updated,
        }
    }
}
