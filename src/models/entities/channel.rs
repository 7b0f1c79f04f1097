// 详细注释：Channel实体的SeaORM定义
// 枚举字段按显示字符串存储

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::structs::{default_id, Channel};

/// 通道实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "channels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(default = "default_id")]
    pub id: String,
    pub group_id: String,
    pub name: String,

    // 测量配置
    #[sea_orm(column_type = "Text")]
    pub measurement_type: String,
    #[sea_orm(column_type = "Text")]
    pub measurement_units: String,
    pub min_range: f64,
    pub max_range: f64,
    #[sea_orm(nullable)]
    pub full_scale_range: Option<f64>,

    // 误差配置
    pub max_error: f64,
    #[sea_orm(column_type = "Text")]
    pub error_type: String,

    // 注入配置
    pub min_injection_range: f64,
    pub max_injection_range: f64,
    #[sea_orm(column_type = "Text")]
    pub injection_units: String,

    // 状态与审批要求
    #[sea_orm(column_type = "Text")]
    pub status: String,
    pub required_supplier_approval: bool,
    pub required_client_approval: bool,
    pub last_updated: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Channel> for ActiveModel {
    fn from(channel: &Channel) -> Self {
        Self {
            id: Set(channel.id.clone()),
            group_id: Set(channel.group_id.clone()),
            name: Set(channel.name.clone()),
            measurement_type: Set(channel.measurement_type.to_string()),
            measurement_units: Set(channel.measurement_units.to_string()),
            min_range: Set(channel.min_range),
            max_range: Set(channel.max_range),
            full_scale_range: Set(channel.full_scale_range),
            max_error: Set(channel.max_error),
            error_type: Set(channel.error_type.to_string()),
            min_injection_range: Set(channel.min_injection_range),
            max_injection_range: Set(channel.max_injection_range),
            injection_units: Set(channel.injection_units.to_string()),
            status: Set(channel.status.to_string()),
            required_supplier_approval: Set(channel.required_supplier_approval),
            required_client_approval: Set(channel.required_client_approval),
            last_updated: Set(channel.last_updated),
        }
    }
}

impl From<&Model> for Channel {
    fn from(model: &Model) -> Self {
        Channel {
            id: model.id.clone(),
            group_id: model.group_id.clone(),
            name: model.name.clone(),
            measurement_type: model.measurement_type.parse().unwrap_or_default(),
            measurement_units: model.measurement_units.parse().unwrap_or_default(),
            min_range: model.min_range,
            max_range: model.max_range,
            full_scale_range: model.full_scale_range,
            max_error: model.max_error,
            error_type: model.error_type.parse().unwrap_or_default(),
            min_injection_range: model.min_injection_range,
            max_injection_range: model.max_injection_range,
            injection_units: model.injection_units.parse().unwrap_or_default(),
            status: model.status.parse().unwrap_or_default(),
            required_supplier_approval: model.required_supplier_approval,
            required_client_approval: model.required_client_approval,
            last_updated: model.last_updated,
        }
    }
}
