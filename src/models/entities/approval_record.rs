// 详细注释：ApprovalRecord实体的SeaORM定义
// (channel_id, user_id) 上有唯一索引，由持久化服务建表时创建

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::structs::{default_id, ApprovalRecord};

/// 通道审批记录实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "approval_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(default = "default_id")]
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    #[sea_orm(column_type = "Text")]
    pub company_category: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ApprovalRecord> for ActiveModel {
    fn from(record: &ApprovalRecord) -> Self {
        Self {
            id: Set(record.id.clone()),
            channel_id: Set(record.channel_id.clone()),
            user_id: Set(record.user_id.clone()),
            company_category: Set(record.company_category.to_string()),
            timestamp: Set(record.timestamp),
        }
    }
}

impl From<&Model> for ApprovalRecord {
    fn from(model: &Model) -> Self {
        ApprovalRecord {
            id: model.id.clone(),
            channel_id: model.channel_id.clone(),
            user_id: model.user_id.clone(),
            company_category: model.company_category.parse().unwrap_or_default(),
            timestamp: model.timestamp,
        }
    }
}
