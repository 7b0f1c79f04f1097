/// 服务层模块，包含应用层和基础设施层的服务定义
///
/// 按照清洁架构原则组织：
/// - Application Layer: 应用服务，协调业务流程
/// - Infrastructure Layer: 基础设施服务，处理外部依赖
///
/// 领域组件位于 `crate::domain`，不依赖任何存储实现。

/// 应用层服务模块
pub mod application;

/// 基础设施层服务模块
pub mod infrastructure;

/// 服务层基础trait定义
pub mod traits;

// 重新导出基础trait
pub use traits::{BaseService, ChannelPurge, PersistenceService};

// 重新导出应用层服务
pub use application::{
    CalibrationWorkflowService, ChannelCreation, ChannelSummary, NewChannelRequest, ProgressSummary,
};

// 重新导出基础设施实现
pub use infrastructure::SqliteOrmPersistenceService;
