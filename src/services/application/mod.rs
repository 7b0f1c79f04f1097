/// 应用层服务模块
///
/// 应用层负责协调领域服务和基础设施服务，实现完整的业务流程
/// 提供面向界面层的工作单元API

/// 校准流程服务 - 项目层级、通道、测试点、设备和审批的全部操作
pub mod calibration_workflow_service;

pub use calibration_workflow_service::{
    CalibrationWorkflowService, ChannelCreation, ChannelSummary, NewChannelRequest, ProgressSummary,
};
