// 详细注释：多对多关联表的SeaORM定义
// 项目成员、项目公司、项目设备池、通道必需设备类型共用此表，以 kind 区分

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::enums::AssociationKind;

/// 关联实体，主键为 (kind, owner_id, member_id)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "associations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub kind: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub owner_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub member_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn link(kind: AssociationKind, owner_id: &str, member_id: &str) -> Self {
        Self {
            kind: Set(kind.to_string()),
            owner_id: Set(owner_id.to_string()),
            member_id: Set(member_id.to_string()),
            created_at: Set(Utc::now()),
        }
    }
}
