//! # 测试点评估器
//!
//! ## 业务作用
//! 为单个测试点提供误差和上下限的计算，并记录操作人员录入的测量结果。
//!
//! ## 状态说明
//! 测试点从 `Untested` 开始，`Pass` / `Fail` 由操作人员在界面上判定后写入。
//! 评估器只提供判断依据（误差、上下限、是否在容差内），从不自行改写判定结果。
//!
//! 测试点的增删改之后，调用方负责触发通道及上级的状态汇总。

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::tolerance_calculator::{DefaultToleranceCalculator, IToleranceCalculator, ToleranceSpec};
use crate::models::enums::TestResult;
use crate::models::structs::{Channel, TestPoint};
use crate::utils::error::AppResult;

/// 一次测量录入
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementUpdate {
    pub measured_injection_value: Option<f64>,
    pub measured_test_value: Option<f64>,
    /// 未提供时按 标称值 - 实测值 自动计算
    pub measured_error: Option<f64>,
    pub test_result: TestResult,
    pub notes: Option<String>,
}

/// 测试点评估结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPointEvaluation {
    pub test_point_id: String,
    pub error: Option<f64>,
    pub max_error: f64,
    pub lower_limit: f64,
    pub upper_limit: f64,
    pub within_tolerance: Option<bool>,
}

/// 测试点评估器
pub struct TestPointEvaluator {
    calculator: Arc<dyn IToleranceCalculator>,
}

impl Default for TestPointEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(DefaultToleranceCalculator))
    }
}

impl TestPointEvaluator {
    pub fn new(calculator: Arc<dyn IToleranceCalculator>) -> Self {
        Self { calculator }
    }

    /// 误差 = 标称测量值 - 实测值，未测量时为 None
    pub fn calc_error(&self, point: &TestPoint) -> Option<f64> {
        point
            .measured_test_value
            .map(|measured| point.nominal_test_value - measured)
    }

    /// %RDG 的读数基准：实测值优先，未测量时取标称值
    fn reference_value(point: &TestPoint) -> f64 {
        point.measured_test_value.unwrap_or(point.nominal_test_value)
    }

    pub fn max_error(&self, channel: &Channel, point: &TestPoint) -> AppResult<f64> {
        let spec = ToleranceSpec::from_channel(channel);
        self.calculator.max_error(&spec, Self::reference_value(point))
    }

    pub fn lower_limit(&self, channel: &Channel, point: &TestPoint) -> AppResult<f64> {
        Ok(point.nominal_test_value - self.max_error(channel, point)?)
    }

    pub fn upper_limit(&self, channel: &Channel, point: &TestPoint) -> AppResult<f64> {
        Ok(point.nominal_test_value + self.max_error(channel, point)?)
    }

    /// 实测值是否落在容差内，供界面比对使用
    pub fn within_tolerance(&self, channel: &Channel, point: &TestPoint) -> AppResult<Option<bool>> {
        let Some(measured) = point.measured_test_value else {
            return Ok(None);
        };
        let max_error = self.max_error(channel, point)?;
        Ok(Some((point.nominal_test_value - measured).abs() <= max_error))
    }

    pub fn evaluate(&self, channel: &Channel, point: &TestPoint) -> AppResult<TestPointEvaluation> {
        let max_error = self.max_error(channel, point)?;
        let error = self.calc_error(point);
        Ok(TestPointEvaluation {
            test_point_id: point.id.clone(),
            error,
            max_error,
            lower_limit: point.nominal_test_value - max_error,
            upper_limit: point.nominal_test_value + max_error,
            within_tolerance: error.map(|e| e.abs() <= max_error),
        })
    }

    /// 写入测量结果并刷新更新时间
    pub fn record_measurement(&self, point: &mut TestPoint, update: MeasurementUpdate) {
        point.measured_injection_value = update.measured_injection_value;
        point.measured_test_value = update.measured_test_value;
        point.measured_error = update.measured_error.or_else(|| self.calc_error(point));
        point.test_result = update.test_result;
        point.notes = update.notes.filter(|n| !n.trim().is_empty());
        point.touch();
        log::debug!(
            "[TEST_POINT] 测试点 {} 录入结果: {}",
            point.id,
            point.test_result
        );
    }

    /// 清除测量值和备注，恢复为未测试
    pub fn reset(&self, point: &mut TestPoint) {
        point.measured_injection_value = None;
        point.measured_test_value = None;
        point.measured_error = None;
        point.test_result = TestResult::Untested;
        point.notes = None;
        point.touch();
    }
}
