/// 服务层基础trait定义
/// 提供各层服务的接口规范，支持依赖注入和测试

use async_trait::async_trait;
use std::collections::HashSet;
use crate::utils::error::AppResult;
use crate::models::enums::AssociationKind;
use crate::models::structs::*;

/// 基础服务trait，所有服务都应实现
#[async_trait]
pub trait BaseService: Send + Sync {
    /// 服务名称
    fn service_name(&self) -> &'static str;

    /// 初始化服务
    async fn initialize(&mut self) -> AppResult<()>;

    /// 关闭服务
    async fn shutdown(&mut self) -> AppResult<()>;

    /// 健康检查
    async fn health_check(&self) -> AppResult<()>;
}

/// 删除通道时一并删除的从属记录数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelPurge {
    pub test_points: u64,
    pub equipment_records: u64,
    pub approvals: u64,
    pub required_equipment_types: u64,
}

/// 数据持久化服务trait
///
/// 所有集合都通过显式查询返回，不依赖 ORM 的延迟加载关系。
/// `delete_*`（按ID）在记录不存在时返回 NotFoundError，
/// `delete_*_by_*`（按外键批量）返回删除的行数。
#[async_trait]
pub trait PersistenceService: BaseService {
    // --- 项目层级 ---

    /// 保存项目（存在则更新）
    async fn save_project(&self, project: &Project) -> AppResult<()>;

    /// 加载项目
    async fn load_project(&self, id: &str) -> AppResult<Option<Project>>;

    /// 加载所有项目，按编号排序
    async fn load_all_projects(&self) -> AppResult<Vec<Project>>;

    /// 删除项目
    async fn delete_project(&self, id: &str) -> AppResult<()>;

    /// 保存作业
    async fn save_job(&self, job: &Job) -> AppResult<()>;

    /// 加载作业
    async fn load_job(&self, id: &str) -> AppResult<Option<Job>>;

    /// 加载项目下的作业
    async fn load_jobs_by_project(&self, project_id: &str) -> AppResult<Vec<Job>>;

    /// 删除作业
    async fn delete_job(&self, id: &str) -> AppResult<()>;

    /// 保存分组
    async fn save_group(&self, group: &Group) -> AppResult<()>;

    /// 加载分组
    async fn load_group(&self, id: &str) -> AppResult<Option<Group>>;

    /// 加载作业下的分组
    async fn load_groups_by_job(&self, job_id: &str) -> AppResult<Vec<Group>>;

    /// 删除分组
    async fn delete_group(&self, id: &str) -> AppResult<()>;

    // --- 通道与测试点 ---

    /// 保存通道
    async fn save_channel(&self, channel: &Channel) -> AppResult<()>;

    /// 加载通道
    async fn load_channel(&self, id: &str) -> AppResult<Option<Channel>>;

    /// 加载分组下的通道，按名称排序
    async fn load_channels_by_group(&self, group_id: &str) -> AppResult<Vec<Channel>>;

    /// 加载作业下所有分组的通道
    async fn load_channels_by_job(&self, job_id: &str) -> AppResult<Vec<Channel>>;

    /// 加载项目下所有作业的通道
    async fn load_channels_by_project(&self, project_id: &str) -> AppResult<Vec<Channel>>;

    /// 删除通道
    async fn delete_channel(&self, id: &str) -> AppResult<()>;

    /// 在一个事务内写入新通道、其测试点和必需设备类型，任一步失败则全部回滚
    async fn create_channel_with_test_points(
        &self,
        channel: &Channel,
        points: &[TestPoint],
        required_equipment_type_ids: &HashSet<String>,
    ) -> AppResult<()>;

    /// 在一个事务内删除通道及其测试点、设备记录、审批和必需设备类型
    ///
    /// 通道不存在时返回 NotFoundError，不删除任何记录
    async fn purge_channel(&self, channel_id: &str) -> AppResult<ChannelPurge>;

    /// 保存测试点
    async fn save_test_point(&self, point: &TestPoint) -> AppResult<()>;

    /// 批量保存测试点
    async fn save_test_points(&self, points: &[TestPoint]) -> AppResult<()>;

    /// 加载测试点
    async fn load_test_point(&self, id: &str) -> AppResult<Option<TestPoint>>;

    /// 加载通道的测试点，按标称注入值排序
    async fn load_test_points_by_channel(&self, channel_id: &str) -> AppResult<Vec<TestPoint>>;

    /// 删除测试点
    async fn delete_test_point(&self, id: &str) -> AppResult<()>;

    /// 删除通道的全部测试点
    async fn delete_test_points_by_channel(&self, channel_id: &str) -> AppResult<u64>;

    // --- 公司与用户 ---

    /// 保存公司
    async fn save_company(&self, company: &Company) -> AppResult<()>;

    /// 加载公司
    async fn load_company(&self, id: &str) -> AppResult<Option<Company>>;

    /// 加载所有公司
    async fn load_all_companies(&self) -> AppResult<Vec<Company>>;

    /// 保存用户
    async fn save_user(&self, user: &User) -> AppResult<()>;

    /// 加载用户
    async fn load_user(&self, id: &str) -> AppResult<Option<User>>;

    /// 加载公司的员工
    async fn load_users_by_company(&self, company_id: &str) -> AppResult<Vec<User>>;

    // --- 测试设备 ---

    /// 保存设备类型
    async fn save_test_equipment_type(&self, equipment_type: &TestEquipmentType) -> AppResult<()>;

    /// 加载设备类型
    async fn load_test_equipment_type(&self, id: &str) -> AppResult<Option<TestEquipmentType>>;

    /// 加载所有设备类型
    async fn load_all_test_equipment_types(&self) -> AppResult<Vec<TestEquipmentType>>;

    /// 保存设备（不含校准记录）
    async fn save_test_equipment(&self, equipment: &TestEquipment) -> AppResult<()>;

    /// 加载设备及其校准记录
    async fn load_test_equipment(&self, id: &str) -> AppResult<Option<TestEquipment>>;

    /// 加载某类型的全部设备及其校准记录
    async fn load_test_equipment_by_type(&self, equipment_type_id: &str) -> AppResult<Vec<TestEquipment>>;

    /// 保存校准记录
    async fn save_calibration_record(&self, record: &CalibrationRecord) -> AppResult<()>;

    /// 删除校准记录
    async fn delete_calibration_record(&self, id: &str) -> AppResult<()>;

    // --- 通道台账 ---

    /// 追加设备使用记录
    async fn insert_channel_equipment_record(&self, record: &ChannelEquipmentRecord) -> AppResult<()>;

    /// 加载通道的设备使用记录，按写入顺序
    async fn load_channel_equipment_records(&self, channel_id: &str) -> AppResult<Vec<ChannelEquipmentRecord>>;

    /// 删除通道的全部设备使用记录
    async fn delete_channel_equipment_records(&self, channel_id: &str) -> AppResult<u64>;

    /// 写入审批记录，同一用户对同一通道已有记录时返回 false
    async fn insert_approval_record(&self, record: &ApprovalRecord) -> AppResult<bool>;

    /// 加载通道的审批记录
    async fn load_approval_records(&self, channel_id: &str) -> AppResult<Vec<ApprovalRecord>>;

    /// 删除某用户对通道的审批，返回是否删除了记录
    async fn delete_approval_record(&self, channel_id: &str, user_id: &str) -> AppResult<bool>;

    /// 删除通道的全部审批记录
    async fn delete_approval_records(&self, channel_id: &str) -> AppResult<u64>;

    // --- 多对多关联 ---

    /// 添加关联，已存在时返回 false
    async fn add_association(&self, kind: AssociationKind, owner_id: &str, member_id: &str) -> AppResult<bool>;

    /// 删除关联，不存在时返回 false
    async fn remove_association(&self, kind: AssociationKind, owner_id: &str, member_id: &str) -> AppResult<bool>;

    /// 加载关联的成员ID
    async fn load_association_members(&self, kind: AssociationKind, owner_id: &str) -> AppResult<HashSet<String>>;

    /// 用给定集合替换关联，返回 (新增数, 删除数)
    async fn replace_associations(
        &self,
        kind: AssociationKind,
        owner_id: &str,
        member_ids: &HashSet<String>,
    ) -> AppResult<(usize, usize)>;
}
