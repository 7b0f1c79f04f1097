//! # 状态汇总器
//!
//! ## 业务作用
//! 把测试点结果逐级汇总为通道、分组、作业、项目的状态和进度百分比。
//!
//! ## 汇总规则
//! - **通道**: 全部未测试（含无测试点）→ Untested；全部通过 → Pass；任一失败 → Fail；其余 → In-Progress
//! - **分组/作业/项目**: 全部通道 Untested → Not Started；全部 Pass → Complete；其余 → In-Progress。
//!   含失败通道的上级显示为 In-Progress
//! - **百分比**: round(100 × 数量 / 总数)，四舍六入五成双；总数为 0 时未测试占 100
//!
//! 汇总是拉取式的：调用方在修改测试点或通道后显式触发，重复执行结果不变。

use serde::{Deserialize, Serialize};

use crate::models::enums::{ChannelStatus, ProgressStatus, TestResult};
use crate::models::structs::{next_timestamp, Channel, Group, Job, Project, TestPoint};

/// 计算百分比并取整
///
/// 总数为 0 时返回 0
pub fn calc_percent(value: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let percent = (value as f64 / total as f64) * 100.0;
    percent.round_ties_even() as u32
}

/// 测试点结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPointStats {
    pub untested: usize,
    pub passed: usize,
    pub failed: usize,
}

impl TestPointStats {
    pub fn total(&self) -> usize {
        self.untested + self.passed + self.failed
    }
}

/// 通道状态统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub untested: usize,
    pub passed: usize,
    pub failed: usize,
    pub in_progress: usize,
}

impl ChannelStats {
    pub fn total(&self) -> usize {
        self.untested + self.passed + self.failed + self.in_progress
    }
}

/// 通道内测试点进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPointProgress {
    pub percent_untested: u32,
    pub percent_passed: u32,
    pub percent_failed: u32,
}

/// 上级对象的通道进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelProgress {
    pub percent_untested: u32,
    pub percent_passed: u32,
    pub percent_failed: u32,
    pub percent_in_progress: u32,
}

/// 具有进度状态的上级对象（分组、作业、项目）
pub trait ProgressTracked {
    fn progress_status(&self) -> ProgressStatus;
    fn set_progress_status(&mut self, status: ProgressStatus);
}

macro_rules! impl_progress_tracked {
    ($($ty:ty),*) => {
        $(
            impl ProgressTracked for $ty {
                fn progress_status(&self) -> ProgressStatus {
                    self.status
                }

                fn set_progress_status(&mut self, status: ProgressStatus) {
                    self.status = status;
                    self.last_updated = next_timestamp(self.last_updated);
                }
            }
        )*
    };
}

impl_progress_tracked!(Project, Job, Group);

#[derive(Debug, Default, Clone, Copy)]
pub struct StatusAggregator;

impl StatusAggregator {
    pub fn testpoint_stats(test_points: &[TestPoint]) -> TestPointStats {
        test_points
            .iter()
            .fold(TestPointStats::default(), |mut stats, point| {
                match point.test_result {
                    TestResult::Untested => stats.untested += 1,
                    TestResult::Pass => stats.passed += 1,
                    TestResult::Fail => stats.failed += 1,
                }
                stats
            })
    }

    pub fn channel_stats(channels: &[Channel]) -> ChannelStats {
        channels
            .iter()
            .fold(ChannelStats::default(), |mut stats, channel| {
                match channel.status {
                    ChannelStatus::Untested => stats.untested += 1,
                    ChannelStatus::Pass => stats.passed += 1,
                    ChannelStatus::Fail => stats.failed += 1,
                    ChannelStatus::InProgress => stats.in_progress += 1,
                }
                stats
            })
    }

    pub fn channel_status(test_points: &[TestPoint]) -> ChannelStatus {
        let stats = Self::testpoint_stats(test_points);
        let total = stats.total();

        if stats.untested == total {
            ChannelStatus::Untested
        } else if stats.passed == total {
            ChannelStatus::Pass
        } else if stats.failed > 0 {
            ChannelStatus::Fail
        } else {
            ChannelStatus::InProgress
        }
    }

    pub fn parent_status(channels: &[Channel]) -> ProgressStatus {
        let stats = Self::channel_stats(channels);
        let total = stats.total();

        if stats.untested == total {
            ProgressStatus::NotStarted
        } else if stats.passed == total {
            ProgressStatus::Complete
        } else {
            ProgressStatus::InProgress
        }
    }

    pub fn testpoint_progress(test_points: &[TestPoint]) -> TestPointProgress {
        let stats = Self::testpoint_stats(test_points);
        let total = stats.total();
        if total == 0 {
            return TestPointProgress {
                percent_untested: 100,
                percent_passed: 0,
                percent_failed: 0,
            };
        }

        TestPointProgress {
            percent_untested: calc_percent(stats.untested, total),
            percent_passed: calc_percent(stats.passed, total),
            percent_failed: calc_percent(stats.failed, total),
        }
    }

    pub fn channel_progress(channels: &[Channel]) -> ChannelProgress {
        let stats = Self::channel_stats(channels);
        let total = stats.total();
        if total == 0 {
            return ChannelProgress {
                percent_untested: 100,
                percent_passed: 0,
                percent_failed: 0,
                percent_in_progress: 0,
            };
        }

        ChannelProgress {
            percent_untested: calc_percent(stats.untested, total),
            percent_passed: calc_percent(stats.passed, total),
            percent_failed: calc_percent(stats.failed, total),
            percent_in_progress: calc_percent(stats.in_progress, total),
        }
    }

    /// 重新计算通道状态，状态变化时返回 true 并刷新更新时间
    pub fn refresh_channel(channel: &mut Channel, test_points: &[TestPoint]) -> bool {
        let status = Self::channel_status(test_points);
        if channel.status == status {
            return false;
        }
        log::debug!(
            "[STATUS] 通道 {} 状态 {} -> {}",
            channel.name,
            channel.status,
            status
        );
        channel.status = status;
        channel.touch();
        true
    }

    /// 重新计算上级对象状态，状态变化时返回 true
    pub fn refresh_parent<T: ProgressTracked>(parent: &mut T, channels: &[Channel]) -> bool {
        let status = Self::parent_status(channels);
        if parent.progress_status() == status {
            return false;
        }
        parent.set_progress_status(status);
        true
    }
}
