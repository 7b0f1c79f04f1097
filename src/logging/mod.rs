//! # 日志记录模块 (Logging Module)
//!
//! ## 业务说明
//! 记录校准过程中的用户操作、配置异常和测试失败，为审计追踪和问题定位提供依据
//!
//! ## 日志策略
//! - **业务日志**: 创建通道、记录测量、指定设备、审批等操作
//! - **配置警告**: 测试点列表生成不足、配置值越界
//! - **测试失败**: 测量结果超出容差
//!
//! 各模块日志以 `[TAG]` 前缀区分来源，例如 `[WORKFLOW]`、`[STATUS]`、`[PERSISTENCE]`。

pub mod logger_config;

pub use logger_config::*;

/// 便捷日志宏 - 记录核心问题日志

/// 记录测试执行失败日志
#[macro_export]
macro_rules! log_test_failure {
    ($msg:expr) => {
        log::error!("[测试执行失败] {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        log::error!("[测试执行失败] {}", format!($msg, $($arg)*));
    };
}

/// 记录用户操作日志
#[macro_export]
macro_rules! log_user_operation {
    ($msg:expr) => {
        log::info!("[用户操作] {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        log::info!("[用户操作] {}", format!($msg, $($arg)*));
    };
}

/// 记录用户配置操作警告
#[macro_export]
macro_rules! log_config_warning {
    ($msg:expr) => {
        log::warn!("[配置警告] {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        log::warn!("[配置警告] {}", format!($msg, $($arg)*));
    };
}

// 重新导出宏
pub use log_config_warning;
pub use log_test_failure;
pub use log_user_operation;
