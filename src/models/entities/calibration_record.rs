// 详细注释：CalibrationRecord实体的SeaORM定义

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::structs::{default_id, CalibrationRecord};

/// 设备校准记录实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "calibration_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(default = "default_id")]
    pub id: String,
    pub test_equipment_id: String,
    pub calibration_date: DateTime<Utc>,
    pub calibration_due_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CalibrationRecord> for ActiveModel {
    fn from(record: &CalibrationRecord) -> Self {
        Self {
            id: Set(record.id.clone()),
            test_equipment_id: Set(record.test_equipment_id.clone()),
            calibration_date: Set(record.calibration_date),
            calibration_due_date: Set(record.calibration_due_date),
        }
    }
}

impl From<&Model> for CalibrationRecord {
    fn from(model: &Model) -> Self {
        CalibrationRecord {
            id: model.id.clone(),
            test_equipment_id: model.test_equipment_id.clone(),
            calibration_date: model.calibration_date,
            calibration_due_date: model.calibration_due_date,
        }
    }
}
