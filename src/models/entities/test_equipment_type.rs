// 详细注释：TestEquipmentType实体的SeaORM定义

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use crate::models::structs::{default_id, TestEquipmentType};

/// 测试设备类型实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_equipment_types")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(default = "default_id")]
    pub id: String,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TestEquipmentType> for ActiveModel {
    fn from(equipment_type: &TestEquipmentType) -> Self {
        Self {
            id: Set(equipment_type.id.clone()),
            name: Set(equipment_type.name.clone()),
        }
    }
}

impl From<&Model> for TestEquipmentType {
    fn from(model: &Model) -> Self {
        TestEquipmentType {
            id: model.id.clone(),
            name: model.name.clone(),
        }
    }
}
