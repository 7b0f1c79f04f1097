/// ICATS 仪表校准测试跟踪 - 核心库
///
/// 层级：项目 → 作业 → 分组 → 通道 → 测试点
pub mod domain;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

// 重新导出常用类型，方便使用
pub use domain::*;
pub use models::*;
pub use services::*;
pub use utils::{AppConfig, AppError, AppResult, ConfigManager};
