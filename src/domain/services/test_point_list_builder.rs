//! # 测试点列表生成器
//!
//! ## 业务作用
//! 通道创建时为其生成初始测试点列表：
//! - **Standard**: 在注入量程和测量量程上各自等间隔取 `count` 个点，首点为下限，末点为上限
//! - **Custom**: 按顺序使用调用方提供的 (注入值, 测量值) 对
//!
//! 提供的值不足时不报错，只记录警告，并通过 `shortfall()` 告知调用方少生成了多少个点。

use serde::{Deserialize, Serialize};

use crate::models::enums::TestPointListType;
use crate::models::structs::{Channel, TestPoint};
use crate::utils::error::{AppError, AppResult};

/// 测试点列表生成请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPointListRequest {
    pub list_type: TestPointListType,
    /// 请求生成的测试点个数
    pub count: usize,
    /// 自定义注入值，仅 Custom 使用
    #[serde(default)]
    pub injection_values: Vec<f64>,
    /// 自定义测量值，仅 Custom 使用
    #[serde(default)]
    pub test_values: Vec<f64>,
}

impl TestPointListRequest {
    pub fn standard(count: usize) -> Self {
        Self {
            list_type: TestPointListType::Standard,
            count,
            injection_values: Vec::new(),
            test_values: Vec::new(),
        }
    }

    pub fn custom(count: usize, injection_values: Vec<f64>, test_values: Vec<f64>) -> Self {
        Self {
            list_type: TestPointListType::Custom,
            count,
            injection_values,
            test_values,
        }
    }
}

/// 生成结果
#[derive(Debug, Clone, PartialEq)]
pub struct TestPointListBuild {
    pub test_points: Vec<TestPoint>,
    pub requested: usize,
}

impl TestPointListBuild {
    pub fn built(&self) -> usize {
        self.test_points.len()
    }

    /// 少生成的测试点个数
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.test_points.len())
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TestPointListBuilder;

impl TestPointListBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, channel: &Channel, request: &TestPointListRequest) -> AppResult<TestPointListBuild> {
        let test_points = match request.list_type {
            TestPointListType::Standard => Self::build_standard(channel, request.count)?,
            TestPointListType::Custom => Self::build_custom(channel, request),
        };

        let build = TestPointListBuild {
            test_points,
            requested: request.count,
        };

        if !build.is_complete() {
            crate::log_config_warning!(
                "[TEST_POINT_LIST] 通道 {} 请求 {} 个测试点，实际生成 {} 个",
                channel.name,
                build.requested,
                build.built()
            );
        }

        Ok(build)
    }

    fn build_standard(channel: &Channel, count: usize) -> AppResult<Vec<TestPoint>> {
        if count < 2 {
            return Err(AppError::configuration_error(format!(
                "标准测试点列表至少需要 2 个点，请求了 {} 个",
                count
            )));
        }

        let steps = (count - 1) as f64;
        let injection_step = channel.injection_range() / steps;
        let test_step = channel.measurement_range() / steps;

        let mut points = Vec::with_capacity(count);
        for i in 0..count {
            // 末点直接取上限，避免累计误差
            let (injection, test) = if i == count - 1 {
                (channel.max_injection_range, channel.max_range)
            } else {
                (
                    channel.min_injection_range + injection_step * i as f64,
                    channel.min_range + test_step * i as f64,
                )
            };

            if !injection.is_finite() || !test.is_finite() {
                continue;
            }
            points.push(TestPoint::new(&channel.id, injection, test));
        }

        Ok(points)
    }

    fn build_custom(channel: &Channel, request: &TestPointListRequest) -> Vec<TestPoint> {
        request
            .injection_values
            .iter()
            .zip(request.test_values.iter())
            .take(request.count)
            .filter(|(injection, test)| injection.is_finite() && test.is_finite())
            .map(|(injection, test)| TestPoint::new(&channel.id, *injection, *test))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_channel() -> Channel {
        let mut channel = Channel::new("group", "LT-300");
        channel.min_range = 0.0;
        channel.max_range = 100.0;
        channel.min_injection_range = -5.0;
        channel.max_injection_range = 5.0;
        channel
    }

    fn pairs(build: &TestPointListBuild) -> Vec<(f64, f64)> {
        build
            .test_points
            .iter()
            .map(|p| (p.nominal_injection_value, p.nominal_test_value))
            .collect()
    }

    #[test]
    fn test_standard_list_is_evenly_spaced() {
        let channel = create_test_channel();
        let build = TestPointListBuilder::new()
            .build(&channel, &TestPointListRequest::standard(5))
            .unwrap();

        assert!(build.is_complete());
        assert_eq!(
            pairs(&build),
            vec![(-5.0, 0.0), (-2.5, 25.0), (0.0, 50.0), (2.5, 75.0), (5.0, 100.0)]
        );
        assert!(build.test_points.iter().all(|p| p.channel_id == channel.id));
    }

    /// 末点精确等于量程上限
    #[test]
    fn test_standard_list_last_point_hits_maximum() {
        let mut channel = create_test_channel();
        channel.min_range = 0.1;
        channel.max_range = 0.7;
        let build = TestPointListBuilder::new()
            .build(&channel, &TestPointListRequest::standard(7))
            .unwrap();

        let last = build.test_points.last().unwrap();
        assert_eq!(last.nominal_test_value, 0.7);
        assert_eq!(last.nominal_injection_value, 5.0);
        assert_eq!(build.test_points[0].nominal_test_value, 0.1);
    }

    #[test]
    fn test_standard_list_requires_two_points() {
        let channel = create_test_channel();
        let err = TestPointListBuilder::new()
            .build(&channel, &TestPointListRequest::standard(1))
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_custom_list_uses_values_verbatim() {
        let channel = create_test_channel();
        let request = TestPointListRequest::custom(3, vec![-0.5, 0.0, 0.5], vec![-10.0, 0.0, 10.0]);
        let build = TestPointListBuilder::new().build(&channel, &request).unwrap();

        assert_eq!(pairs(&build), vec![(-0.5, -10.0), (0.0, 0.0), (0.5, 10.0)]);
    }

    /// 提供的值不足时只报告缺口，不报错
    #[test]
    fn test_custom_list_reports_shortfall() {
        let _ = env_logger::builder().is_test(true).try_init();
        let channel = create_test_channel();
        let request = TestPointListRequest::custom(4, vec![1.0, 2.0, 3.0], vec![10.0, 20.0]);
        let build = TestPointListBuilder::new().build(&channel, &request).unwrap();

        assert_eq!(build.built(), 2);
        assert_eq!(build.requested, 4);
        assert_eq!(build.shortfall(), 2);
        assert!(!build.is_complete());
    }

    #[test]
    fn test_custom_list_truncates_to_count_and_skips_non_finite() {
        let channel = create_test_channel();
        let request = TestPointListRequest::custom(
            2,
            vec![f64::NAN, 2.0, 3.0],
            vec![10.0, 20.0, 30.0],
        );
        let build = TestPointListBuilder::new().build(&channel, &request).unwrap();

        assert_eq!(pairs(&build), vec![(2.0, 20.0)]);
        assert_eq!(build.shortfall(), 1);
    }
}
