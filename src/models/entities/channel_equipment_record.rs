// 详细注释：ChannelEquipmentRecord实体的SeaORM定义
// 记录只插入不更新

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::structs::{default_id, ChannelEquipmentRecord};

/// 通道设备使用记录实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "channel_equipment_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(default = "default_id")]
    pub id: String,
    pub channel_id: String,
    pub test_equipment_type_id: String,
    pub test_equipment_id: String,
    pub timestamp: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub calibration_due_date: Option<DateTime<Utc>>, // 写入时的到期日快照
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ChannelEquipmentRecord> for ActiveModel {
    fn from(record: &ChannelEquipmentRecord) -> Self {
        Self {
            id: Set(record.id.clone()),
            channel_id: Set(record.channel_id.clone()),
            test_equipment_type_id: Set(record.test_equipment_type_id.clone()),
            test_equipment_id: Set(record.test_equipment_id.clone()),
            timestamp: Set(record.timestamp),
            calibration_due_date: Set(record.calibration_due_date),
        }
    }
}

impl From<&Model> for ChannelEquipmentRecord {
    fn from(model: &Model) -> Self {
        ChannelEquipmentRecord {
            id: model.id.clone(),
            channel_id: model.channel_id.clone(),
            test_equipment_type_id: model.test_equipment_type_id.clone(),
            test_equipment_id: model.test_equipment_id.clone(),
            timestamp: model.timestamp,
            calibration_due_date: model.calibration_due_date,
        }
    }
}
