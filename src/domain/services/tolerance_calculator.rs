//! # 容差计算器
//!
//! ## 业务作用
//! 根据通道的误差类型把误差幅值换算为工程单位下的最大允许误差，
//! 并以标称测量值为中心给出上下限。
//!
//! ## 计算规则
//! - **Eng Units**: 最大误差 = 幅值
//! - **%FS**: 最大误差 = 满量程 × 幅值 / 100，通道必须配置满量程
//! - **%RDG**: 最大误差 = 读数 × 幅值 / 100，读数取实测值，未测量时取标称值
//!
//! 计算是纯函数，不修改任何状态。

use serde::{Deserialize, Serialize};

use crate::models::enums::ErrorType;
use crate::models::structs::Channel;
use crate::utils::error::{AppError, AppResult};

/// 通道的容差参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceSpec {
    pub error_type: ErrorType,
    /// 误差幅值
    pub max_error: f64,
    pub full_scale_range: Option<f64>,
}

impl ToleranceSpec {
    pub fn new(error_type: ErrorType, max_error: f64, full_scale_range: Option<f64>) -> Self {
        Self {
            error_type,
            max_error,
            full_scale_range,
        }
    }

    pub fn from_channel(channel: &Channel) -> Self {
        Self::new(channel.error_type, channel.max_error, channel.full_scale_range)
    }

    /// 通道创建时的参数校验
    pub fn validate(&self) -> AppResult<()> {
        if !self.max_error.is_finite() || self.max_error < 0.0 {
            return Err(AppError::configuration_error(format!(
                "误差幅值必须为非负有限数: {}",
                self.max_error
            )));
        }

        match (self.error_type, self.full_scale_range) {
            (ErrorType::PercentFullScale, None) => Err(AppError::configuration_error(
                "误差类型为 %FS 时必须配置满量程",
            )),
            (_, Some(fsr)) if !fsr.is_finite() => Err(AppError::configuration_error(format!(
                "满量程必须为有限数: {}",
                fsr
            ))),
            _ => Ok(()),
        }
    }
}

/// 容差窗口
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceWindow {
    pub max_error: f64,
    pub lower_limit: f64,
    pub upper_limit: f64,
}

impl ToleranceWindow {
    /// 值是否落在闭区间 [lower_limit, upper_limit] 内
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower_limit && value <= self.upper_limit
    }
}

/// 容差计算接口
#[cfg_attr(test, mockall::automock)]
pub trait IToleranceCalculator: Send + Sync {
    /// 计算最大允许误差
    ///
    /// `reference_value` 只在 %RDG 时使用
    fn max_error(&self, spec: &ToleranceSpec, reference_value: f64) -> AppResult<f64>;

    /// 计算以 `nominal` 为中心的容差窗口
    fn window(&self, spec: &ToleranceSpec, nominal: f64, reference_value: f64) -> AppResult<ToleranceWindow> {
        let max_error = self.max_error(spec, reference_value)?;
        Ok(ToleranceWindow {
            max_error,
            lower_limit: nominal - max_error,
            upper_limit: nominal + max_error,
        })
    }
}

/// 默认容差计算器
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultToleranceCalculator;

impl IToleranceCalculator for DefaultToleranceCalculator {
    fn max_error(&self, spec: &ToleranceSpec, reference_value: f64) -> AppResult<f64> {
        match spec.error_type {
            ErrorType::EngUnits => Ok(spec.max_error),
            ErrorType::PercentFullScale => {
                let fsr = spec.full_scale_range.ok_or_else(|| {
                    AppError::configuration_error("误差类型为 %FS 时必须配置满量程")
                })?;
                Ok(fsr * (spec.max_error / 100.0))
            }
            ErrorType::PercentReading => Ok(reference_value * (spec.max_error / 100.0)),
        }
    }
}
