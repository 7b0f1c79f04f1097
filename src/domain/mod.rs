//! 领域层模块
//!
//! 包含校准测试的业务规则，不依赖持久化实现

pub mod services;

// 重新导出领域服务
pub use services::*;
