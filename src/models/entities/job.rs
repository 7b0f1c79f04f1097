// 详细注释：Job实体的SeaORM定义

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::structs::{default_id, Job};

/// 作业实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(default = "default_id")]
    pub id: String,
    pub project_id: String,
    #[sea_orm(column_type = "Text")]
    pub stage: String,                      // In-House / On-Site
    #[sea_orm(column_type = "Text")]
    pub phase: String,                      // Commissioning / ATP
    #[sea_orm(column_type = "Text")]
    pub status: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Job> for ActiveModel {
    fn from(job: &Job) -> Self {
        Self {
            id: Set(job.id.clone()),
            project_id: Set(job.project_id.clone()),
            stage: Set(job.stage.to_string()),
            phase: Set(job.phase.to_string()),
            status: Set(job.status.to_string()),
            last_updated: Set(job.last_updated),
        }
    }
}

impl From<&Model> for Job {
    fn from(model: &Model) -> Self {
        Job {
            id: model.id.clone(),
            project_id: model.project_id.clone(),
            stage: model.stage.parse().unwrap_or_default(),
            phase: model.phase.parse().unwrap_or_default(),
            status: model.status.parse().unwrap_or_default(),
            last_updated: model.last_updated,
        }
    }
}
