/// 领域服务模块
///
/// 业务说明：
/// 本模块是领域层的核心，包含校准测试的全部业务规则
/// 这些服务只操作内存中的模型，不访问数据库，由应用层负责加载和保存
///
/// 模块组织原则：
/// - 每个服务一个独立模块文件
/// - 可替换的计算以 trait 形式定义（如容差计算）
/// - 相关的类型定义放在对应模块中

/// 容差计算器
///
/// 业务说明：按误差类型计算最大允许误差和上下限
pub mod tolerance_calculator;

/// 测试点评估器
///
/// 业务说明：计算测试点误差、上下限，录入测量结果
pub mod test_point_evaluator;

/// 测试点列表生成器
///
/// 业务说明：通道创建时生成标准或自定义测试点列表
pub mod test_point_list_builder;

/// 设备使用台账
///
/// 业务说明：记录通道各类型测试设备的使用历史，查询当前设备
pub mod equipment_assignment_ledger;

/// 审批台账
///
/// 业务说明：管理供应商/客户审批记录和审批要求
pub mod approval_ledger;

/// 状态汇总器
///
/// 业务说明：测试点 → 通道 → 分组 → 作业 → 项目 的状态与进度汇总
pub mod status_aggregator;

pub use tolerance_calculator::{DefaultToleranceCalculator, IToleranceCalculator, ToleranceSpec, ToleranceWindow};
pub use test_point_evaluator::{MeasurementUpdate, TestPointEvaluation, TestPointEvaluator};
pub use test_point_list_builder::{TestPointListBuild, TestPointListBuilder, TestPointListRequest};
pub use equipment_assignment_ledger::{AssignmentOutcome, EquipmentAssignmentLedger};
pub use approval_ledger::{update_required_approvals, ApprovalGate, ApprovalLedger};
pub use status_aggregator::{
    calc_percent, ChannelProgress, ChannelStats, ProgressTracked, StatusAggregator, TestPointProgress,
    TestPointStats,
};
