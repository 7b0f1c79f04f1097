// 详细注释：TestPoint实体的SeaORM定义

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::structs::{default_id, TestPoint};

/// 测试点实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_points")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(default = "default_id")]
    pub id: String,
    pub channel_id: String,

    pub nominal_injection_value: f64,
    pub nominal_test_value: f64,
    #[sea_orm(nullable)]
    pub measured_injection_value: Option<f64>,
    #[sea_orm(nullable)]
    pub measured_test_value: Option<f64>,
    #[sea_orm(nullable)]
    pub measured_error: Option<f64>,

    #[sea_orm(column_type = "Text")]
    pub test_result: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TestPoint> for ActiveModel {
    fn from(point: &TestPoint) -> Self {
        Self {
            id: Set(point.id.clone()),
            channel_id: Set(point.channel_id.clone()),
            nominal_injection_value: Set(point.nominal_injection_value),
            nominal_test_value: Set(point.nominal_test_value),
            measured_injection_value: Set(point.measured_injection_value),
            measured_test_value: Set(point.measured_test_value),
            measured_error: Set(point.measured_error),
            test_result: Set(point.test_result.to_string()),
            notes: Set(point.notes.clone()),
            last_updated: Set(point.last_updated),
        }
    }
}

impl From<&Model> for TestPoint {
    fn from(model: &Model) -> Self {
        TestPoint {
            id: model.id.clone(),
            channel_id: model.channel_id.clone(),
            nominal_injection_value: model.nominal_injection_value,
            nominal_test_value: model.nominal_test_value,
            measured_injection_value: model.measured_injection_value,
            measured_test_value: model.measured_test_value,
            measured_error: model.measured_error,
            test_result: model.test_result.parse().unwrap_or_default(),
            notes: model.notes.clone(),
            last_updated: model.last_updated,
        }
    }
}
