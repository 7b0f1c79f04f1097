// 详细注释：TestEquipment实体的SeaORM定义
// 校准记录单独存放在 calibration_records 表，加载设备时由持久化服务补齐

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use crate::models::structs::{default_id, TestEquipment};

/// 测试设备实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_equipment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(default = "default_id")]
    pub id: String,
    pub name: String,
    pub manufacturer: String,
    pub model_name: String,
    pub serial_number: String,
    #[sea_orm(nullable)]
    pub test_equipment_type_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TestEquipment> for ActiveModel {
    fn from(equipment: &TestEquipment) -> Self {
        Self {
            id: Set(equipment.id.clone()),
            name: Set(equipment.name.clone()),
            manufacturer: Set(equipment.manufacturer.clone()),
            model_name: Set(equipment.model.clone()),
            serial_number: Set(equipment.serial_number.clone()),
            test_equipment_type_id: Set(equipment.test_equipment_type_id.clone()),
        }
    }
}

impl From<&Model> for TestEquipment {
    fn from(model: &Model) -> Self {
        TestEquipment {
            id: model.id.clone(),
            name: model.name.clone(),
            manufacturer: model.manufacturer.clone(),
            model: model.model_name.clone(),
            serial_number: model.serial_number.clone(),
            test_equipment_type_id: model.test_equipment_type_id.clone(),
            calibration_records: Vec::new(),
        }
    }
}
