//! # 校准流程服务 (Calibration Workflow Service)
//!
//! ## 业务作用
//! 面向界面层的工作单元接口：每个方法完成一次完整的业务操作，
//! 负责加载实体、调用领域组件、写回存储，并在测试点或通道变化后自下而上刷新状态。
//!
//! ## 状态传播
//! 测试点变化 → 通道状态 → 分组 → 作业 → 项目。每次变化都重算整条链，
//! 各级状态始终由存储中的当前数据推导。并发写入交错导致的过期状态
//! 可通过 `update_each_parent_status` 重跑修复，重复执行结果不变。
//!
//! 通道的创建和删除各自在一个存储事务内完成。
//!
//! ## 错误约定
//! - 引用的实体不存在 → `NotFoundError`
//! - 请求自相矛盾（设备类型不符、审批人未归属公司等）→ `ValidationError`
//! - 容差或测试点数量配置不合法 → `ConfigurationError`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::services::{
    update_required_approvals, ApprovalGate, ApprovalLedger, AssignmentOutcome, ChannelProgress,
    ChannelStats, EquipmentAssignmentLedger, MeasurementUpdate, StatusAggregator, TestPointEvaluation,
    TestPointEvaluator, TestPointListBuild, TestPointListBuilder, TestPointListRequest,
    TestPointProgress, TestPointStats, ToleranceSpec,
};
use crate::models::enums::*;
use crate::models::structs::*;
use crate::services::traits::{ChannelPurge, PersistenceService};
use crate::utils::config::CalibrationConfig;
use crate::utils::error::{AppError, AppResult};
use crate::{log_test_failure, log_user_operation};

/// 创建通道请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChannelRequest {
    pub group_id: String,
    pub name: String,
    pub measurement_type: MeasurementType,
    pub measurement_units: EngUnits,
    pub min_range: f64,
    pub max_range: f64,
    #[serde(default)]
    pub full_scale_range: Option<f64>,
    pub max_error: f64,
    pub error_type: ErrorType,
    pub min_injection_range: f64,
    pub max_injection_range: f64,
    pub injection_units: EngUnits,
    /// 未提供时按配置的默认类型和点数生成
    #[serde(default)]
    pub test_points: Option<TestPointListRequest>,
    #[serde(default)]
    pub required_equipment_type_ids: HashSet<String>,
}

impl NewChannelRequest {
    /// 以 4-20mA 模拟量输入为缺省参数
    pub fn new(group_id: impl Into<String>, name: impl Into<String>) -> Self {
        let template = Channel::new(String::new(), String::new());
        Self {
            group_id: group_id.into(),
            name: name.into(),
            measurement_type: template.measurement_type,
            measurement_units: template.measurement_units,
            min_range: template.min_range,
            max_range: template.max_range,
            full_scale_range: template.full_scale_range,
            max_error: template.max_error,
            error_type: template.error_type,
            min_injection_range: template.min_injection_range,
            max_injection_range: template.max_injection_range,
            injection_units: template.injection_units,
            test_points: None,
            required_equipment_type_ids: HashSet::new(),
        }
    }

    fn to_channel(&self) -> Channel {
        let mut channel = Channel::new(&self.group_id, self.name.trim());
        channel.measurement_type = self.measurement_type;
        channel.measurement_units = self.measurement_units;
        channel.min_range = self.min_range;
        channel.max_range = self.max_range;
        channel.full_scale_range = self.full_scale_range;
        channel.max_error = self.max_error;
        channel.error_type = self.error_type;
        channel.min_injection_range = self.min_injection_range;
        channel.max_injection_range = self.max_injection_range;
        channel.injection_units = self.injection_units;
        channel
    }
}

/// 创建通道的结果，包含测试点生成报告
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelCreation {
    pub channel: Channel,
    pub build: TestPointListBuild,
}

/// 分组、作业或项目的进度汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub id: String,
    pub name: String,
    pub status: ProgressStatus,
    pub channel_count: usize,
    pub stats: ChannelStats,
    pub progress: ChannelProgress,
    pub last_updated: DateTime<Utc>,
}

/// 单个通道的汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: String,
    pub name: String,
    pub status: ChannelStatus,
    pub test_point_count: usize,
    pub stats: TestPointStats,
    pub progress: TestPointProgress,
    pub approvals: ApprovalGate,
    pub missing_equipment_types: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

/// 校准流程服务
pub struct CalibrationWorkflowService {
    persistence: Arc<dyn PersistenceService>,
    evaluator: TestPointEvaluator,
    list_builder: TestPointListBuilder,
    calibration_config: CalibrationConfig,
}

impl CalibrationWorkflowService {
    pub fn new(persistence: Arc<dyn PersistenceService>, calibration_config: CalibrationConfig) -> Self {
        Self::with_evaluator(persistence, calibration_config, TestPointEvaluator::default())
    }

    pub fn with_evaluator(
        persistence: Arc<dyn PersistenceService>,
        calibration_config: CalibrationConfig,
        evaluator: TestPointEvaluator,
    ) -> Self {
        Self {
            persistence,
            evaluator,
            list_builder: TestPointListBuilder::new(),
            calibration_config,
        }
    }

    pub fn persistence(&self) -> &Arc<dyn PersistenceService> {
        &self.persistence
    }

    // ========================================================================
    // 实体加载
    // ========================================================================

    pub async fn require_project(&self, id: &str) -> AppResult<Project> {
        self.persistence
            .load_project(id)
            .await?
            .ok_or_else(|| AppError::not_found_error("Project", format!("项目 {} 不存在", id)))
    }

    pub async fn require_job(&self, id: &str) -> AppResult<Job> {
        self.persistence
            .load_job(id)
            .await?
            .ok_or_else(|| AppError::not_found_error("Job", format!("作业 {} 不存在", id)))
    }

    pub async fn require_group(&self, id: &str) -> AppResult<Group> {
        self.persistence
            .load_group(id)
            .await?
            .ok_or_else(|| AppError::not_found_error("Group", format!("分组 {} 不存在", id)))
    }

    pub async fn require_channel(&self, id: &str) -> AppResult<Channel> {
        self.persistence
            .load_channel(id)
            .await?
            .ok_or_else(|| AppError::not_found_error("Channel", format!("通道 {} 不存在", id)))
    }

    pub async fn require_test_point(&self, id: &str) -> AppResult<TestPoint> {
        self.persistence
            .load_test_point(id)
            .await?
            .ok_or_else(|| AppError::not_found_error("TestPoint", format!("测试点 {} 不存在", id)))
    }

    async fn require_company(&self, id: &str) -> AppResult<Company> {
        self.persistence
            .load_company(id)
            .await?
            .ok_or_else(|| AppError::not_found_error("Company", format!("公司 {} 不存在", id)))
    }

    async fn require_user(&self, id: &str) -> AppResult<User> {
        self.persistence
            .load_user(id)
            .await?
            .ok_or_else(|| AppError::not_found_error("User", format!("用户 {} 不存在", id)))
    }

    async fn require_test_equipment_type(&self, id: &str) -> AppResult<TestEquipmentType> {
        self.persistence
            .load_test_equipment_type(id)
            .await?
            .ok_or_else(|| AppError::not_found_error("TestEquipmentType", format!("设备类型 {} 不存在", id)))
    }

    async fn require_test_equipment(&self, id: &str) -> AppResult<TestEquipment> {
        self.persistence
            .load_test_equipment(id)
            .await?
            .ok_or_else(|| AppError::not_found_error("TestEquipment", format!("测试设备 {} 不存在", id)))
    }

    // ========================================================================
    // 项目层级
    // ========================================================================

    pub async fn create_project(&self, name: &str, number: i32) -> AppResult<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation_error("项目名称不能为空"));
        }
        let project = Project::new(name, number);
        self.persistence.save_project(&project).await?;
        log_user_operation!("创建项目 {} ({})", project.name, project.number);
        Ok(project)
    }

    pub async fn create_job(&self, project_id: &str, stage: JobStage, phase: JobPhase) -> AppResult<Job> {
        let project = self.require_project(project_id).await?;
        let job = Job::new(&project.id, stage, phase);
        self.persistence.save_job(&job).await?;
        log_user_operation!("项目 {} 创建作业 {} / {}", project.name, stage, phase);
        Ok(job)
    }

    pub async fn create_group(&self, job_id: &str, name: &str) -> AppResult<Group> {
        let job = self.require_job(job_id).await?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation_error("分组名称不能为空"));
        }
        let group = Group::new(&job.id, name);
        self.persistence.save_group(&group).await?;
        log_user_operation!("创建分组 {}", group.name);
        Ok(group)
    }

    /// 删除分组及其下全部通道，然后刷新作业和项目状态
    pub async fn delete_group(&self, group_id: &str) -> AppResult<()> {
        let group = self.require_group(group_id).await?;
        self.purge_group(&group).await?;
        self.refresh_job_chain(&group.job_id).await?;
        log_user_operation!("删除分组 {}", group.name);
        Ok(())
    }

    /// 删除作业及其下全部分组，然后刷新项目状态
    pub async fn delete_job(&self, job_id: &str) -> AppResult<()> {
        let job = self.require_job(job_id).await?;
        self.purge_job(&job).await?;
        self.refresh_project(&job.project_id).await?;
        log_user_operation!("删除作业 {}", job.id);
        Ok(())
    }

    /// 删除项目、其下全部作业以及项目的成员、公司和设备关联
    pub async fn delete_project(&self, project_id: &str) -> AppResult<()> {
        let project = self.require_project(project_id).await?;
        for job in self.persistence.load_jobs_by_project(&project.id).await? {
            self.purge_job(&job).await?;
        }

        let empty = HashSet::new();
        for kind in [
            AssociationKind::ProjectMember,
            AssociationKind::ProjectCompany,
            AssociationKind::ProjectTestEquipment,
        ] {
            self.persistence.replace_associations(kind, &project.id, &empty).await?;
        }

        self.persistence.delete_project(&project.id).await?;
        log_user_operation!("删除项目 {} ({})", project.name, project.number);
        Ok(())
    }

    async fn purge_job(&self, job: &Job) -> AppResult<()> {
        for group in self.persistence.load_groups_by_job(&job.id).await? {
            self.purge_group(&group).await?;
        }
        self.persistence.delete_job(&job.id).await
    }

    async fn purge_group(&self, group: &Group) -> AppResult<()> {
        for channel in self.persistence.load_channels_by_group(&group.id).await? {
            self.purge_channel(&channel.id).await?;
        }
        self.persistence.delete_group(&group.id).await
    }

    /// 删除通道及全部从属记录
    async fn purge_channel(&self, channel_id: &str) -> AppResult<ChannelPurge> {
        let purge = self.persistence.purge_channel(channel_id).await?;
        log::debug!(
            "[WORKFLOW] 通道 {} 已删除: 测试点 {}，设备记录 {}，审批 {}",
            channel_id,
            purge.test_points,
            purge.equipment_records,
            purge.approvals
        );
        Ok(purge)
    }

    // ========================================================================
    // 状态传播
    // ========================================================================

    async fn refresh_channel(&self, channel: &mut Channel) -> AppResult<bool> {
        let points = self.persistence.load_test_points_by_channel(&channel.id).await?;
        let changed = StatusAggregator::refresh_channel(channel, &points);
        if changed {
            self.persistence.save_channel(channel).await?;
        }
        Ok(changed)
    }

    async fn refresh_group(&self, group_id: &str) -> AppResult<Group> {
        let mut group = self.require_group(group_id).await?;
        let channels = self.persistence.load_channels_by_group(&group.id).await?;
        if StatusAggregator::refresh_parent(&mut group, &channels) {
            self.persistence.save_group(&group).await?;
        }
        Ok(group)
    }

    async fn refresh_job(&self, job_id: &str) -> AppResult<Job> {
        let mut job = self.require_job(job_id).await?;
        let channels = self.persistence.load_channels_by_job(&job.id).await?;
        if StatusAggregator::refresh_parent(&mut job, &channels) {
            self.persistence.save_job(&job).await?;
        }
        Ok(job)
    }

    async fn refresh_project(&self, project_id: &str) -> AppResult<Project> {
        let mut project = self.require_project(project_id).await?;
        let channels = self.persistence.load_channels_by_project(&project.id).await?;
        if StatusAggregator::refresh_parent(&mut project, &channels) {
            self.persistence.save_project(&project).await?;
        }
        Ok(project)
    }

    async fn refresh_job_chain(&self, job_id: &str) -> AppResult<()> {
        let job = self.refresh_job(job_id).await?;
        self.refresh_project(&job.project_id).await?;
        Ok(())
    }

    async fn refresh_group_chain(&self, group_id: &str) -> AppResult<()> {
        let group = self.refresh_group(group_id).await?;
        self.refresh_job_chain(&group.job_id).await
    }

    /// 从通道开始依次重算通道、分组、作业、项目的状态
    ///
    /// 每一级都按存储中的当前数据重新推导，可重复执行，用于修复并发写入留下的过期状态
    pub async fn update_each_parent_status(&self, channel_id: &str) -> AppResult<Channel> {
        let mut channel = self.require_channel(channel_id).await?;
        self.refresh_channel(&mut channel).await?;
        self.refresh_group_chain(&channel.group_id).await?;
        Ok(channel)
    }

    // ========================================================================
    // 通道
    // ========================================================================

    /// 创建通道并生成测试点
    pub async fn create_channel(&self, request: NewChannelRequest) -> AppResult<ChannelCreation> {
        let group = self.require_group(&request.group_id).await?;
        let job = self.require_job(&group.job_id).await?;

        if request.name.trim().is_empty() {
            return Err(AppError::validation_error("通道名称不能为空"));
        }

        let mut channel = request.to_channel();
        ToleranceSpec::from_channel(&channel).validate()?;

        let list_request = request
            .test_points
            .clone()
            .unwrap_or_else(|| self.default_list_request());
        if list_request.count > self.calibration_config.max_testpoints_per_channel {
            return Err(AppError::configuration_error(format!(
                "通道 {} 请求 {} 个测试点，超过上限 {}",
                channel.name, list_request.count, self.calibration_config.max_testpoints_per_channel
            )));
        }

        for type_id in &request.required_equipment_type_ids {
            self.require_test_equipment_type(type_id).await?;
        }

        let build = self.list_builder.build(&channel, &list_request)?;
        update_required_approvals(&mut channel, job.phase);
        StatusAggregator::refresh_channel(&mut channel, &build.test_points);

        self.persistence
            .create_channel_with_test_points(&channel, &build.test_points, &request.required_equipment_type_ids)
            .await?;
        self.refresh_group_chain(&group.id).await?;

        log_user_operation!(
            "分组 {} 创建通道 {}，生成 {}/{} 个测试点",
            group.name,
            channel.name,
            build.built(),
            build.requested
        );
        Ok(ChannelCreation { channel, build })
    }

    fn default_list_request(&self) -> TestPointListRequest {
        let count = self.calibration_config.default_testpoint_count;
        match self.calibration_config.default_list_type {
            TestPointListType::Standard => TestPointListRequest::standard(count),
            TestPointListType::Custom => TestPointListRequest::custom(count, Vec::new(), Vec::new()),
        }
    }

    /// 删除通道及其测试点、设备记录、审批和必需设备类型，然后刷新上级状态
    pub async fn delete_channel(&self, channel_id: &str) -> AppResult<()> {
        let channel = self.require_channel(channel_id).await?;
        self.purge_channel(&channel.id).await?;
        self.refresh_group_chain(&channel.group_id).await?;
        log_user_operation!("删除通道 {}", channel.name);
        Ok(())
    }

    /// 按作业当前期次重新计算审批要求
    pub async fn refresh_required_approvals(&self, channel_id: &str) -> AppResult<Channel> {
        let mut channel = self.require_channel(channel_id).await?;
        let group = self.require_group(&channel.group_id).await?;
        let job = self.require_job(&group.job_id).await?;

        let before = (channel.required_supplier_approval, channel.required_client_approval);
        update_required_approvals(&mut channel, job.phase);
        if before != (channel.required_supplier_approval, channel.required_client_approval) {
            channel.touch();
            self.persistence.save_channel(&channel).await?;
        }
        Ok(channel)
    }

    pub async fn set_required_equipment_types(
        &self,
        channel_id: &str,
        type_ids: &HashSet<String>,
    ) -> AppResult<(usize, usize)> {
        let channel = self.require_channel(channel_id).await?;
        for type_id in type_ids {
            self.require_test_equipment_type(type_id).await?;
        }
        self.persistence
            .replace_associations(AssociationKind::ChannelRequiredEquipmentType, &channel.id, type_ids)
            .await
    }

    pub async fn required_equipment_types(&self, channel_id: &str) -> AppResult<HashSet<String>> {
        self.persistence
            .load_association_members(AssociationKind::ChannelRequiredEquipmentType, channel_id)
            .await
    }

    // ========================================================================
    // 测试点
    // ========================================================================

    pub async fn add_test_point(
        &self,
        channel_id: &str,
        nominal_injection_value: f64,
        nominal_test_value: f64,
    ) -> AppResult<TestPoint> {
        let channel = self.require_channel(channel_id).await?;
        if !nominal_injection_value.is_finite() || !nominal_test_value.is_finite() {
            return Err(AppError::validation_error("测试点标称值必须是有限数"));
        }

        let existing = self.persistence.load_test_points_by_channel(&channel.id).await?;
        if existing.len() >= self.calibration_config.max_testpoints_per_channel {
            return Err(AppError::configuration_error(format!(
                "通道 {} 已有 {} 个测试点，达到上限",
                channel.name,
                existing.len()
            )));
        }

        let point = TestPoint::new(&channel.id, nominal_injection_value, nominal_test_value);
        self.persistence.save_test_point(&point).await?;
        self.update_each_parent_status(&channel.id).await?;
        Ok(point)
    }

    /// 录入测量结果，并刷新通道及上级状态
    pub async fn record_measurement(&self, test_point_id: &str, update: MeasurementUpdate) -> AppResult<TestPoint> {
        let mut point = self.require_test_point(test_point_id).await?;
        self.evaluator.record_measurement(&mut point, update);
        self.persistence.save_test_point(&point).await?;

        let channel = self.update_each_parent_status(&point.channel_id).await?;
        if point.test_result == TestResult::Fail {
            log_test_failure!(
                "通道 {} 测试点 {} 判定失败，标称 {}，实测 {:?}",
                channel.name,
                point.id,
                point.nominal_test_value,
                point.measured_test_value
            );
        }
        Ok(point)
    }

    /// 清除测量结果，恢复为未测试
    pub async fn reset_test_point(&self, test_point_id: &str) -> AppResult<TestPoint> {
        let mut point = self.require_test_point(test_point_id).await?;
        self.evaluator.reset(&mut point);
        self.persistence.save_test_point(&point).await?;
        self.update_each_parent_status(&point.channel_id).await?;
        Ok(point)
    }

    pub async fn delete_test_point(&self, test_point_id: &str) -> AppResult<()> {
        let point = self.require_test_point(test_point_id).await?;
        self.persistence.delete_test_point(&point.id).await?;
        self.update_each_parent_status(&point.channel_id).await?;
        Ok(())
    }

    pub async fn evaluate_test_point(&self, test_point_id: &str) -> AppResult<TestPointEvaluation> {
        let point = self.require_test_point(test_point_id).await?;
        let channel = self.require_channel(&point.channel_id).await?;
        self.evaluator.evaluate(&channel, &point)
    }

    pub async fn test_points(&self, channel_id: &str) -> AppResult<Vec<TestPoint>> {
        self.persistence.load_test_points_by_channel(channel_id).await
    }

    // ========================================================================
    // 设备
    // ========================================================================

    async fn equipment_ledger(&self, channel_id: &str) -> AppResult<EquipmentAssignmentLedger> {
        let records = self.persistence.load_channel_equipment_records(channel_id).await?;
        Ok(EquipmentAssignmentLedger::new(channel_id, records))
    }

    /// 指定通道某类型使用的设备，设备必须属于该类型
    pub async fn assign_equipment(
        &self,
        channel_id: &str,
        equipment_type_id: &str,
        equipment_id: &str,
    ) -> AppResult<AssignmentOutcome> {
        let channel = self.require_channel(channel_id).await?;
        let equipment_type = self.require_test_equipment_type(equipment_type_id).await?;
        let equipment = self.require_test_equipment(equipment_id).await?;

        if !equipment_type.has_test_equipment(&equipment) {
            return Err(AppError::validation_error(format!(
                "设备 {} 不属于类型 {}",
                equipment.name, equipment_type.name
            )));
        }

        let mut ledger = self.equipment_ledger(&channel.id).await?;
        let outcome = ledger.assign(&equipment, &equipment_type.id, Utc::now());
        if let AssignmentOutcome::Appended(record) = &outcome {
            self.persistence.insert_channel_equipment_record(record).await?;
            log_user_operation!(
                "通道 {} 的 {} 使用设备 {}",
                channel.name,
                equipment_type.name,
                equipment.name
            );
        }
        Ok(outcome)
    }

    pub async fn current_test_equipment(
        &self,
        channel_id: &str,
        equipment_type_id: &str,
    ) -> AppResult<Option<TestEquipment>> {
        let ledger = self.equipment_ledger(channel_id).await?;
        match ledger.current(equipment_type_id) {
            Some(equipment_id) => self.persistence.load_test_equipment(equipment_id).await,
            None => Ok(None),
        }
    }

    pub async fn equipment_history(
        &self,
        channel_id: &str,
        equipment_type_id: &str,
    ) -> AppResult<Vec<ChannelEquipmentRecord>> {
        let ledger = self.equipment_ledger(channel_id).await?;
        Ok(ledger.history(equipment_type_id).into_iter().cloned().collect())
    }

    /// 必需但尚未指定设备的类型
    pub async fn missing_equipment_types(&self, channel_id: &str) -> AppResult<Vec<String>> {
        let required = self.required_equipment_types(channel_id).await?;
        let ledger = self.equipment_ledger(channel_id).await?;
        Ok(ledger.missing_types(&required))
    }

    // ========================================================================
    // 审批
    // ========================================================================

    async fn approval_ledger(&self, channel_id: &str) -> AppResult<ApprovalLedger> {
        let records = self.persistence.load_approval_records(channel_id).await?;
        Ok(ApprovalLedger::new(channel_id, records))
    }

    /// 设置或撤销用户对通道的审批，重复操作不产生变化
    pub async fn set_approval(&self, channel_id: &str, user_id: &str, approved: bool) -> AppResult<ApprovalGate> {
        let channel = self.require_channel(channel_id).await?;
        let user = self.require_user(user_id).await?;
        let mut ledger = self.approval_ledger(&channel.id).await?;

        if approved {
            let company_id = user.company_id.as_deref().ok_or_else(|| {
                AppError::validation_error(format!("用户 {} 未归属任何公司，不能审批", user.username))
            })?;
            let company = self.require_company(company_id).await?;
            if let Some(record) = ledger.add(&user.id, company.category, Utc::now()) {
                if self.persistence.insert_approval_record(&record).await? {
                    log_user_operation!(
                        "{} ({}) 审批通道 {}",
                        user.first_letter_last_name(),
                        company.category,
                        channel.name
                    );
                }
            }
        } else if ledger.remove(&user.id).is_some()
            && self.persistence.delete_approval_record(&channel.id, &user.id).await?
        {
            log_user_operation!("{} 撤销通道 {} 的审批", user.first_letter_last_name(), channel.name);
        }

        // 并发审批时本地台账可能与存储不一致，以存储为准
        let stored = self.approval_ledger(&channel.id).await?;
        Ok(stored.gate(&channel))
    }

    pub async fn channel_approvals(&self, channel_id: &str) -> AppResult<ApprovalGate> {
        let channel = self.require_channel(channel_id).await?;
        let ledger = self.approval_ledger(&channel.id).await?;
        Ok(ledger.gate(&channel))
    }

    pub async fn supplier_approval_record(&self, channel_id: &str) -> AppResult<Option<ApprovalRecord>> {
        let ledger = self.approval_ledger(channel_id).await?;
        Ok(ledger.supplier_approval_record().cloned())
    }

    pub async fn client_approval_record(&self, channel_id: &str) -> AppResult<Option<ApprovalRecord>> {
        let ledger = self.approval_ledger(channel_id).await?;
        Ok(ledger.client_approval_record().cloned())
    }

    // ========================================================================
    // 参考数据：公司、用户、设备
    // ========================================================================

    pub async fn register_company(&self, company: &Company) -> AppResult<()> {
        if company.name.trim().is_empty() {
            return Err(AppError::validation_error("公司名称不能为空"));
        }
        self.persistence.save_company(company).await
    }

    pub async fn register_user(&self, user: &User) -> AppResult<()> {
        if user.username.trim().is_empty() {
            return Err(AppError::validation_error("用户名不能为空"));
        }
        if let Some(company_id) = &user.company_id {
            self.require_company(company_id).await?;
        }
        self.persistence.save_user(user).await
    }

    /// 调整用户所属公司，None 表示离开当前公司
    pub async fn set_user_company(&self, user_id: &str, company_id: Option<&str>) -> AppResult<User> {
        let mut user = self.require_user(user_id).await?;
        if let Some(current_id) = user.company_id.clone() {
            if let Some(current) = self.persistence.load_company(&current_id).await? {
                current.remove_employee(&mut user);
            }
        }
        if let Some(company_id) = company_id {
            let company = self.require_company(company_id).await?;
            company.add_employee(&mut user);
        }
        self.persistence.save_user(&user).await?;
        Ok(user)
    }

    pub async fn company_employees(&self, company_id: &str) -> AppResult<Vec<User>> {
        let company = self.require_company(company_id).await?;
        self.persistence.load_users_by_company(&company.id).await
    }

    pub async fn register_test_equipment_type(&self, equipment_type: &TestEquipmentType) -> AppResult<()> {
        self.persistence.save_test_equipment_type(equipment_type).await
    }

    /// 保存设备及其携带的校准记录
    pub async fn register_test_equipment(&self, equipment: &TestEquipment) -> AppResult<()> {
        if let Some(type_id) = &equipment.test_equipment_type_id {
            self.require_test_equipment_type(type_id).await?;
        }
        self.persistence.save_test_equipment(equipment).await?;
        for record in &equipment.calibration_records {
            self.persistence.save_calibration_record(record).await?;
        }
        Ok(())
    }

    /// 调整设备类型，None 表示移出当前类型
    pub async fn set_equipment_type(&self, equipment_id: &str, type_id: Option<&str>) -> AppResult<TestEquipment> {
        let mut equipment = self.require_test_equipment(equipment_id).await?;
        if let Some(current_id) = equipment.test_equipment_type_id.clone() {
            if let Some(current) = self.persistence.load_test_equipment_type(&current_id).await? {
                current.remove_test_equipment(&mut equipment);
            }
        }
        if let Some(type_id) = type_id {
            let equipment_type = self.require_test_equipment_type(type_id).await?;
            equipment_type.add_test_equipment(&mut equipment);
        }
        self.persistence.save_test_equipment(&equipment).await?;
        Ok(equipment)
    }

    pub async fn add_calibration_record(
        &self,
        equipment_id: &str,
        calibration_date: DateTime<Utc>,
        calibration_due_date: DateTime<Utc>,
    ) -> AppResult<CalibrationRecord> {
        let mut equipment = self.require_test_equipment(equipment_id).await?;
        if calibration_due_date < calibration_date {
            return Err(AppError::validation_error("校准到期日不能早于校准日期"));
        }
        let record = CalibrationRecord::new(&equipment.id, calibration_date, calibration_due_date);
        equipment.add_calibration_record(record.clone());
        self.persistence.save_calibration_record(&record).await?;
        log::info!(
            "[WORKFLOW] 设备 {} 新增校准记录，到期日 {}",
            equipment.name,
            calibration_due_date.format("%Y-%m-%d")
        );
        Ok(record)
    }

    pub async fn remove_calibration_record(&self, record_id: &str) -> AppResult<()> {
        self.persistence.delete_calibration_record(record_id).await
    }

    pub async fn equipment_due_date(&self, equipment_id: &str) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self.require_test_equipment(equipment_id).await?.due_date())
    }

    // ========================================================================
    // 项目关联
    // ========================================================================

    pub async fn set_project_members(&self, project_id: &str, user_ids: &HashSet<String>) -> AppResult<(usize, usize)> {
        let project = self.require_project(project_id).await?;
        for user_id in user_ids {
            self.require_user(user_id).await?;
        }
        self.persistence
            .replace_associations(AssociationKind::ProjectMember, &project.id, user_ids)
            .await
    }

    pub async fn set_project_companies(
        &self,
        project_id: &str,
        company_ids: &HashSet<String>,
    ) -> AppResult<(usize, usize)> {
        let project = self.require_project(project_id).await?;
        for company_id in company_ids {
            self.require_company(company_id).await?;
        }
        self.persistence
            .replace_associations(AssociationKind::ProjectCompany, &project.id, company_ids)
            .await
    }

    pub async fn set_project_test_equipment(
        &self,
        project_id: &str,
        equipment_ids: &HashSet<String>,
    ) -> AppResult<(usize, usize)> {
        let project = self.require_project(project_id).await?;
        for equipment_id in equipment_ids {
            self.require_test_equipment(equipment_id).await?;
        }
        self.persistence
            .replace_associations(AssociationKind::ProjectTestEquipment, &project.id, equipment_ids)
            .await
    }

    pub async fn project_members(&self, project_id: &str) -> AppResult<Vec<User>> {
        let ids = self
            .persistence
            .load_association_members(AssociationKind::ProjectMember, project_id)
            .await?;
        let mut users = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(user) = self.persistence.load_user(id).await? {
                users.push(user);
            }
        }
        users.sort_by(|a, b| a.last_name.cmp(&b.last_name).then_with(|| a.first_name.cmp(&b.first_name)));
        Ok(users)
    }

    pub async fn project_companies(&self, project_id: &str) -> AppResult<Vec<Company>> {
        let ids = self
            .persistence
            .load_association_members(AssociationKind::ProjectCompany, project_id)
            .await?;
        let mut companies = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(company) = self.persistence.load_company(id).await? {
                companies.push(company);
            }
        }
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    /// 项目的供应商，关联多家时按名称取第一家
    pub async fn project_supplier(&self, project_id: &str) -> AppResult<Option<Company>> {
        let companies = self.project_companies(project_id).await?;
        Ok(Company::suppliers(&companies).into_iter().next().cloned())
    }

    /// 项目的客户，关联多家时按名称取第一家
    pub async fn project_client(&self, project_id: &str) -> AppResult<Option<Company>> {
        let companies = self.project_companies(project_id).await?;
        Ok(Company::clients(&companies).into_iter().next().cloned())
    }

    /// 项目设备池中属于某类型的设备
    pub async fn project_test_equipment_of_type(
        &self,
        project_id: &str,
        equipment_type_id: &str,
    ) -> AppResult<Vec<TestEquipment>> {
        let pool = self
            .persistence
            .load_association_members(AssociationKind::ProjectTestEquipment, project_id)
            .await?;
        let equipment = self.persistence.load_test_equipment_by_type(equipment_type_id).await?;
        Ok(equipment.into_iter().filter(|e| pool.contains(&e.id)).collect())
    }

    // ========================================================================
    // 汇总查询
    // ========================================================================

    fn progress_summary(
        id: &str,
        name: String,
        last_updated: DateTime<Utc>,
        channels: &[Channel],
    ) -> ProgressSummary {
        ProgressSummary {
            id: id.to_string(),
            name,
            status: StatusAggregator::parent_status(channels),
            channel_count: channels.len(),
            stats: StatusAggregator::channel_stats(channels),
            progress: StatusAggregator::channel_progress(channels),
            last_updated,
        }
    }

    pub async fn project_summary(&self, project_id: &str) -> AppResult<ProgressSummary> {
        let project = self.require_project(project_id).await?;
        let channels = self.persistence.load_channels_by_project(&project.id).await?;
        let name = format!("{} - {}", project.number, project.name);
        Ok(Self::progress_summary(&project.id, name, project.last_updated, &channels))
    }

    pub async fn job_summary(&self, job_id: &str) -> AppResult<ProgressSummary> {
        let job = self.require_job(job_id).await?;
        let channels = self.persistence.load_channels_by_job(&job.id).await?;
        let name = format!("{} {}", job.stage, job.phase);
        Ok(Self::progress_summary(&job.id, name, job.last_updated, &channels))
    }

    pub async fn group_summary(&self, group_id: &str) -> AppResult<ProgressSummary> {
        let group = self.require_group(group_id).await?;
        let channels = self.persistence.load_channels_by_group(&group.id).await?;
        Ok(Self::progress_summary(&group.id, group.name.clone(), group.last_updated, &channels))
    }

    pub async fn channel_summary(&self, channel_id: &str) -> AppResult<ChannelSummary> {
        let channel = self.require_channel(channel_id).await?;
        let points = self.persistence.load_test_points_by_channel(&channel.id).await?;
        let approvals = self.approval_ledger(&channel.id).await?.gate(&channel);
        let missing_equipment_types = self.missing_equipment_types(&channel.id).await?;

        Ok(ChannelSummary {
            id: channel.id.clone(),
            name: channel.name.clone(),
            status: StatusAggregator::channel_status(&points),
            test_point_count: points.len(),
            stats: StatusAggregator::testpoint_stats(&points),
            progress: StatusAggregator::testpoint_progress(&points),
            approvals,
            missing_equipment_types,
            last_updated: channel.last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::infrastructure::SqliteOrmPersistenceService;
    use crate::services::traits::BaseService;
    use chrono::Duration;

    async fn create_test_service() -> CalibrationWorkflowService {
        let _ = env_logger::builder().is_test(true).try_init();
        let persistence = SqliteOrmPersistenceService::new_in_memory().await.unwrap();
        CalibrationWorkflowService::new(Arc::new(persistence), CalibrationConfig::default())
    }

    async fn seed_group(service: &CalibrationWorkflowService, phase: JobPhase) -> (Project, Job, Group) {
        let project = service.create_project("Water Treatment Plant", 1001).await.unwrap();
        let job = service.create_job(&project.id, JobStage::OnSite, phase).await.unwrap();
        let group = service.create_group(&job.id, "Panel A").await.unwrap();
        (project, job, group)
    }

    async fn seed_channel(service: &CalibrationWorkflowService, group: &Group, name: &str) -> ChannelCreation {
        let mut request = NewChannelRequest::new(&group.id, name);
        request.min_range = 0.0;
        request.max_range = 100.0;
        request.measurement_units = EngUnits::DegreesCelsius;
        request.max_error = 0.5;
        request.test_points = Some(TestPointListRequest::standard(5));
        service.create_channel(request).await.unwrap()
    }

    fn result(test_result: TestResult, measured: f64) -> MeasurementUpdate {
        MeasurementUpdate {
            measured_test_value: Some(measured),
            test_result,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_channel_builds_points_and_approvals() {
        let service = create_test_service().await;
        let (_, _, group) = seed_group(&service, JobPhase::Atp).await;

        let creation = seed_channel(&service, &group, "TT-101").await;
        assert!(creation.build.is_complete());
        assert_eq!(creation.channel.status, ChannelStatus::Untested);
        assert!(creation.channel.required_supplier_approval);
        assert!(creation.channel.required_client_approval);

        let points = service.test_points(&creation.channel.id).await.unwrap();
        let nominal: Vec<f64> = points.iter().map(|p| p.nominal_test_value).collect();
        assert_eq!(nominal, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
    }

    #[tokio::test]
    async fn test_create_channel_rejects_invalid_requests() {
        let service = create_test_service().await;
        let (_, _, group) = seed_group(&service, JobPhase::Commissioning).await;

        let mut request = NewChannelRequest::new(&group.id, "PT-1");
        request.error_type = ErrorType::PercentFullScale;
        let err = service.create_channel(request).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");

        let mut request = NewChannelRequest::new(&group.id, "PT-2");
        request.test_points = Some(TestPointListRequest::standard(500));
        let err = service.create_channel(request).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");

        let request = NewChannelRequest::new("missing-group", "PT-3");
        assert!(service.create_channel(request).await.unwrap_err().is_not_found());

        assert!(service.persistence().load_channels_by_group(&group.id).await.unwrap().is_empty());
    }

    /// 测量结果自下而上传播到分组、作业、项目
    #[tokio::test]
    async fn test_measurements_propagate_status() {
        let service = create_test_service().await;
        let (project, job, group) = seed_group(&service, JobPhase::Commissioning).await;
        let creation = seed_channel(&service, &group, "TT-101").await;
        let points = service.test_points(&creation.channel.id).await.unwrap();

        service
            .record_measurement(&points[0].id, result(TestResult::Pass, 0.1))
            .await
            .unwrap();
        let channel = service.require_channel(&creation.channel.id).await.unwrap();
        assert_eq!(channel.status, ChannelStatus::InProgress);
        assert_eq!(service.require_group(&group.id).await.unwrap().status, ProgressStatus::InProgress);
        assert_eq!(service.require_job(&job.id).await.unwrap().status, ProgressStatus::InProgress);

        for point in &points[1..] {
            service
                .record_measurement(&point.id, result(TestResult::Pass, point.nominal_test_value))
                .await
                .unwrap();
        }
        assert_eq!(
            service.require_channel(&channel.id).await.unwrap().status,
            ChannelStatus::Pass
        );
        assert_eq!(
            service.require_project(&project.id).await.unwrap().status,
            ProgressStatus::Complete
        );

        let recorded = service.require_test_point(&points[0].id).await.unwrap();
        assert!((recorded.measured_error.unwrap() - (-0.1)).abs() < 1e-9);

        service
            .record_measurement(&points[2].id, result(TestResult::Fail, 51.0))
            .await
            .unwrap();
        assert_eq!(
            service.require_channel(&channel.id).await.unwrap().status,
            ChannelStatus::Fail
        );
        assert_eq!(
            service.require_project(&project.id).await.unwrap().status,
            ProgressStatus::InProgress
        );
    }

    #[tokio::test]
    async fn test_evaluate_and_delete_test_point() {
        let service = create_test_service().await;
        let (_, _, group) = seed_group(&service, JobPhase::Commissioning).await;
        let creation = seed_channel(&service, &group, "TT-101").await;

        let point = service.add_test_point(&creation.channel.id, 12.0, 50.0).await.unwrap();
        service
            .record_measurement(&point.id, result(TestResult::Pass, 50.3))
            .await
            .unwrap();

        let evaluation = service.evaluate_test_point(&point.id).await.unwrap();
        assert_eq!(evaluation.lower_limit, 49.5);
        assert_eq!(evaluation.upper_limit, 50.5);
        assert_eq!(evaluation.within_tolerance, Some(true));

        service.delete_test_point(&point.id).await.unwrap();
        assert!(service.delete_test_point(&point.id).await.unwrap_err().is_not_found());
        assert_eq!(service.test_points(&creation.channel.id).await.unwrap().len(), 5);
        assert_eq!(
            service.require_channel(&creation.channel.id).await.unwrap().status,
            ChannelStatus::Untested
        );
    }

    #[tokio::test]
    async fn test_equipment_assignment_flow() {
        let service = create_test_service().await;
        let (_, _, group) = seed_group(&service, JobPhase::Commissioning).await;

        let calibrator = TestEquipmentType::new("Loop Calibrator");
        let meter = TestEquipmentType::new("Multimeter");
        service.register_test_equipment_type(&calibrator).await.unwrap();
        service.register_test_equipment_type(&meter).await.unwrap();

        let mut fluke = TestEquipment::new("Fluke 754");
        calibrator.add_test_equipment(&mut fluke);
        let now = Utc::now();
        fluke.add_calibration_record(CalibrationRecord::new(&fluke.id, now, now + Duration::days(365)));
        service.register_test_equipment(&fluke).await.unwrap();

        let mut request = NewChannelRequest::new(&group.id, "FT-1");
        request.required_equipment_type_ids = [calibrator.id.clone(), meter.id.clone()].into_iter().collect();
        let channel = service.create_channel(request).await.unwrap().channel;

        let mut missing = vec![calibrator.id.clone(), meter.id.clone()];
        missing.sort();
        assert_eq!(service.missing_equipment_types(&channel.id).await.unwrap(), missing);

        // 设备类型不符
        let err = service.assign_equipment(&channel.id, &meter.id, &fluke.id).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let first = service.assign_equipment(&channel.id, &calibrator.id, &fluke.id).await.unwrap();
        assert!(first.is_appended());
        assert_eq!(first.record().calibration_due_date, fluke.due_date());
        let again = service.assign_equipment(&channel.id, &calibrator.id, &fluke.id).await.unwrap();
        assert!(!again.is_appended());

        let current = service.current_test_equipment(&channel.id, &calibrator.id).await.unwrap();
        assert_eq!(current.map(|e| e.id), Some(fluke.id.clone()));
        assert_eq!(service.missing_equipment_types(&channel.id).await.unwrap(), vec![meter.id.clone()]);
        assert_eq!(service.equipment_history(&channel.id, &calibrator.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_approval_toggle() {
        let service = create_test_service().await;
        let (_, _, group) = seed_group(&service, JobPhase::Atp).await;
        let channel = seed_channel(&service, &group, "LT-5").await.channel;

        let supplier = Company::new("Acme Instruments", CompanyCategory::Supplier);
        let client = Company::new("City Water", CompanyCategory::Client);
        service.register_company(&supplier).await.unwrap();
        service.register_company(&client).await.unwrap();

        let mut engineer = User::new("mchaplin", "Mark", "Chaplin");
        supplier.add_employee(&mut engineer);
        let mut witness = User::new("jdoe", "Jane", "Doe");
        client.add_employee(&mut witness);
        let freelancer = User::new("nobody", "No", "Body");
        for user in [&engineer, &witness, &freelancer] {
            service.register_user(user).await.unwrap();
        }

        let err = service.set_approval(&channel.id, &freelancer.id, true).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let gate = service.set_approval(&channel.id, &engineer.id, true).await.unwrap();
        assert!(!gate.is_satisfied());
        service.set_approval(&channel.id, &engineer.id, true).await.unwrap();
        let gate = service.set_approval(&channel.id, &witness.id, true).await.unwrap();
        assert!(gate.is_satisfied());
        assert_eq!(
            service.supplier_approval_record(&channel.id).await.unwrap().map(|r| r.user_id),
            Some(engineer.id.clone())
        );

        let gate = service.set_approval(&channel.id, &witness.id, false).await.unwrap();
        assert!(gate.client_approval.is_none());
        assert!(service.client_approval_record(&channel.id).await.unwrap().is_none());
        assert_eq!(service.channel_approvals(&channel.id).await.unwrap().supplier_approval.unwrap().user_id, engineer.id);
        assert_eq!(service.persistence().load_approval_records(&channel.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_required_approvals_follows_phase_change() {
        let service = create_test_service().await;
        let (_, mut job, group) = seed_group(&service, JobPhase::Commissioning).await;
        let channel = seed_channel(&service, &group, "PT-7").await.channel;
        assert!(!channel.required_client_approval);

        job.phase = JobPhase::Atp;
        service.persistence().save_job(&job).await.unwrap();
        assert!(!service.require_channel(&channel.id).await.unwrap().required_client_approval);

        let refreshed = service.refresh_required_approvals(&channel.id).await.unwrap();
        assert!(refreshed.required_client_approval);
        assert!(refreshed.last_updated > channel.last_updated);
    }

    #[tokio::test]
    async fn test_delete_channel_removes_dependents() {
        let service = create_test_service().await;
        let (_, _, group) = seed_group(&service, JobPhase::Atp).await;

        let equipment_type = TestEquipmentType::new("Calibrator");
        service.register_test_equipment_type(&equipment_type).await.unwrap();
        let mut equipment = TestEquipment::new("Beamex MC6");
        equipment_type.add_test_equipment(&mut equipment);
        service.register_test_equipment(&equipment).await.unwrap();

        let supplier = Company::new("Acme", CompanyCategory::Supplier);
        service.register_company(&supplier).await.unwrap();
        let mut user = User::new("tech", "Sam", "Tech");
        supplier.add_employee(&mut user);
        service.register_user(&user).await.unwrap();

        let mut request = NewChannelRequest::new(&group.id, "FT-9");
        request.required_equipment_type_ids.insert(equipment_type.id.clone());
        let channel = service.create_channel(request).await.unwrap().channel;
        let points = service.test_points(&channel.id).await.unwrap();
        service.record_measurement(&points[0].id, result(TestResult::Pass, 4.0)).await.unwrap();
        service.assign_equipment(&channel.id, &equipment_type.id, &equipment.id).await.unwrap();
        service.set_approval(&channel.id, &user.id, true).await.unwrap();
        assert_eq!(service.require_group(&group.id).await.unwrap().status, ProgressStatus::InProgress);

        service.delete_channel(&channel.id).await.unwrap();

        let store = service.persistence();
        assert!(store.load_channel(&channel.id).await.unwrap().is_none());
        assert!(store.load_test_points_by_channel(&channel.id).await.unwrap().is_empty());
        assert!(store.load_channel_equipment_records(&channel.id).await.unwrap().is_empty());
        assert!(store.load_approval_records(&channel.id).await.unwrap().is_empty());
        assert!(service.required_equipment_types(&channel.id).await.unwrap().is_empty());
        assert_eq!(service.require_group(&group.id).await.unwrap().status, ProgressStatus::NotStarted);
        assert!(service.delete_channel(&channel.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_project_cascades() {
        let service = create_test_service().await;
        let (project, job, group) = seed_group(&service, JobPhase::Commissioning).await;
        let channel = seed_channel(&service, &group, "TT-1").await.channel;
        let company = Company::new("Acme", CompanyCategory::Supplier);
        service.register_company(&company).await.unwrap();
        service
            .set_project_companies(&project.id, &[company.id.clone()].into_iter().collect())
            .await
            .unwrap();

        service.delete_project(&project.id).await.unwrap();

        let store = service.persistence();
        assert!(store.load_project(&project.id).await.unwrap().is_none());
        assert!(store.load_job(&job.id).await.unwrap().is_none());
        assert!(store.load_group(&group.id).await.unwrap().is_none());
        assert!(store.load_channel(&channel.id).await.unwrap().is_none());
        assert!(store
            .load_association_members(AssociationKind::ProjectCompany, &project.id)
            .await
            .unwrap()
            .is_empty());
        // 公司本身是参考数据，不随项目删除
        assert!(store.load_company(&company.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_project_memberships() {
        let service = create_test_service().await;
        let (project, _, _) = seed_group(&service, JobPhase::Commissioning).await;

        let supplier = Company::new("Acme", CompanyCategory::Supplier);
        let client = Company::new("City Water", CompanyCategory::Client);
        service.register_company(&supplier).await.unwrap();
        service.register_company(&client).await.unwrap();

        let companies: HashSet<String> = [supplier.id.clone(), client.id.clone()].into_iter().collect();
        assert_eq!(service.set_project_companies(&project.id, &companies).await.unwrap(), (2, 0));
        assert_eq!(service.set_project_companies(&project.id, &companies).await.unwrap(), (0, 0));
        assert_eq!(service.project_supplier(&project.id).await.unwrap().map(|c| c.id), Some(supplier.id.clone()));
        assert_eq!(service.project_client(&project.id).await.unwrap().map(|c| c.id), Some(client.id.clone()));

        let only_supplier: HashSet<String> = [supplier.id.clone()].into_iter().collect();
        assert_eq!(service.set_project_companies(&project.id, &only_supplier).await.unwrap(), (0, 1));
        assert!(service.project_client(&project.id).await.unwrap().is_none());

        let missing: HashSet<String> = ["no-such-user".to_string()].into_iter().collect();
        assert!(service.set_project_members(&project.id, &missing).await.unwrap_err().is_not_found());

        let user = User::new("mchaplin", "Mark", "Chaplin");
        service.register_user(&user).await.unwrap();
        let members: HashSet<String> = [user.id.clone()].into_iter().collect();
        service.set_project_members(&project.id, &members).await.unwrap();
        assert_eq!(service.project_members(&project.id).await.unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn test_project_test_equipment_of_type() {
        let service = create_test_service().await;
        let (project, _, _) = seed_group(&service, JobPhase::Commissioning).await;

        let calibrator = TestEquipmentType::new("Calibrator");
        let meter = TestEquipmentType::new("Multimeter");
        service.register_test_equipment_type(&calibrator).await.unwrap();
        service.register_test_equipment_type(&meter).await.unwrap();

        let mut in_pool = TestEquipment::new("Fluke 754");
        calibrator.add_test_equipment(&mut in_pool);
        let mut not_in_pool = TestEquipment::new("Beamex MC6");
        calibrator.add_test_equipment(&mut not_in_pool);
        let mut other_type = TestEquipment::new("Fluke 87V");
        meter.add_test_equipment(&mut other_type);
        for equipment in [&in_pool, &not_in_pool, &other_type] {
            service.register_test_equipment(equipment).await.unwrap();
        }

        let pool: HashSet<String> = [in_pool.id.clone(), other_type.id.clone()].into_iter().collect();
        service.set_project_test_equipment(&project.id, &pool).await.unwrap();

        let calibrators = service.project_test_equipment_of_type(&project.id, &calibrator.id).await.unwrap();
        assert_eq!(calibrators.len(), 1);
        assert_eq!(calibrators[0].id, in_pool.id);
    }

    #[tokio::test]
    async fn test_calibration_records_and_due_date() {
        let service = create_test_service().await;
        let equipment = TestEquipment::new("Fluke 754");
        service.register_test_equipment(&equipment).await.unwrap();
        assert_eq!(service.equipment_due_date(&equipment.id).await.unwrap(), None);

        let now = Utc::now();
        let early = service
            .add_calibration_record(&equipment.id, now - Duration::days(400), now - Duration::days(35))
            .await
            .unwrap();
        let late = service
            .add_calibration_record(&equipment.id, now - Duration::days(30), now + Duration::days(335))
            .await
            .unwrap();
        let due = service.equipment_due_date(&equipment.id).await.unwrap().unwrap();
        assert_eq!(due.timestamp(), late.calibration_due_date.timestamp());

        service.remove_calibration_record(&late.id).await.unwrap();
        let due = service.equipment_due_date(&equipment.id).await.unwrap().unwrap();
        assert_eq!(due.timestamp(), early.calibration_due_date.timestamp());

        let err = service
            .add_calibration_record(&equipment.id, now, now - Duration::days(1))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_user_and_equipment_reassignment() {
        let service = create_test_service().await;
        let acme = Company::new("Acme", CompanyCategory::Supplier);
        let other = Company::new("Other", CompanyCategory::Supplier);
        service.register_company(&acme).await.unwrap();
        service.register_company(&other).await.unwrap();

        let user = User::new("tech", "Sam", "Tech");
        service.register_user(&user).await.unwrap();
        let moved = service.set_user_company(&user.id, Some(&acme.id)).await.unwrap();
        assert!(acme.has_employee(&moved));
        let moved = service.set_user_company(&user.id, Some(&other.id)).await.unwrap();
        assert!(other.has_employee(&moved));
        assert!(service.company_employees(&acme.id).await.unwrap().is_empty());
        let left = service.set_user_company(&user.id, None).await.unwrap();
        assert!(left.company_id.is_none());

        let calibrator = TestEquipmentType::new("Calibrator");
        service.register_test_equipment_type(&calibrator).await.unwrap();
        let equipment = TestEquipment::new("Fluke 754");
        service.register_test_equipment(&equipment).await.unwrap();
        let typed = service.set_equipment_type(&equipment.id, Some(&calibrator.id)).await.unwrap();
        assert!(calibrator.has_test_equipment(&typed));
        let untyped = service.set_equipment_type(&equipment.id, None).await.unwrap();
        assert!(untyped.test_equipment_type_id.is_none());
    }

    #[tokio::test]
    async fn test_summaries() {
        let service = create_test_service().await;
        let (project, job, group) = seed_group(&service, JobPhase::Commissioning).await;
        let first = seed_channel(&service, &group, "TT-1").await.channel;
        seed_channel(&service, &group, "TT-2").await;

        let points = service.test_points(&first.id).await.unwrap();
        for point in &points {
            service
                .record_measurement(&point.id, result(TestResult::Pass, point.nominal_test_value))
                .await
                .unwrap();
        }

        let summary = service.group_summary(&group.id).await.unwrap();
        assert_eq!(summary.channel_count, 2);
        assert_eq!(summary.status, ProgressStatus::InProgress);
        assert_eq!(summary.progress.percent_passed, 50);
        assert_eq!(summary.progress.percent_untested, 50);

        assert_eq!(service.job_summary(&job.id).await.unwrap().stats, summary.stats);
        let project_summary = service.project_summary(&project.id).await.unwrap();
        assert_eq!(project_summary.name, "1001 - Water Treatment Plant");
        assert_eq!(project_summary.channel_count, 2);

        let channel_summary = service.channel_summary(&first.id).await.unwrap();
        assert_eq!(channel_summary.status, ChannelStatus::Pass);
        assert_eq!(channel_summary.test_point_count, 5);
        assert_eq!(channel_summary.progress.percent_passed, 100);
        assert!(channel_summary.approvals.supplier_required);
        assert!(channel_summary.missing_equipment_types.is_empty());
    }

    #[tokio::test]
    async fn test_update_each_parent_status_is_idempotent() {
        let service = create_test_service().await;
        let (_, _, group) = seed_group(&service, JobPhase::Commissioning).await;
        let channel = seed_channel(&service, &group, "TT-1").await.channel;

        let before = service.require_group(&group.id).await.unwrap();
        service.update_each_parent_status(&channel.id).await.unwrap();
        let refreshed = service.update_each_parent_status(&channel.id).await.unwrap();
        let after = service.require_group(&group.id).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(refreshed, service.require_channel(&channel.id).await.unwrap());
    }

    /// 绕过流程服务直接写入的测试点结果，重跑汇总后反映到整条链
    #[tokio::test]
    async fn test_update_each_parent_status_repairs_from_channel() {
        let service = create_test_service().await;
        let (project, job, group) = seed_group(&service, JobPhase::Commissioning).await;
        let channel = seed_channel(&service, &group, "TT-1").await.channel;

        let mut points = service.test_points(&channel.id).await.unwrap();
        for point in &mut points {
            point.test_result = TestResult::Pass;
        }
        service.persistence().save_test_points(&points).await.unwrap();
        assert_eq!(
            service.require_channel(&channel.id).await.unwrap().status,
            ChannelStatus::Untested
        );

        let repaired = service.update_each_parent_status(&channel.id).await.unwrap();
        assert_eq!(repaired.status, ChannelStatus::Pass);
        assert_eq!(service.require_channel(&channel.id).await.unwrap().status, ChannelStatus::Pass);
        assert_eq!(service.require_group(&group.id).await.unwrap().status, ProgressStatus::Complete);
        assert_eq!(service.require_job(&job.id).await.unwrap().status, ProgressStatus::Complete);
        assert_eq!(service.require_project(&project.id).await.unwrap().status, ProgressStatus::Complete);
    }

    async fn create_file_service(dir: &tempfile::TempDir) -> CalibrationWorkflowService {
        let _ = env_logger::builder().is_test(true).try_init();
        let path = dir.path().join("icats.sqlite");
        let persistence = SqliteOrmPersistenceService::new(Some(path.as_path())).await.unwrap();
        CalibrationWorkflowService::new(Arc::new(persistence), CalibrationConfig::default())
    }

    /// 并发录入后重跑汇总，存储的通道状态与测试点推导结果一致
    #[tokio::test]
    async fn test_concurrent_measurements_converge_after_refresh() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = create_file_service(&dir).await;
        let (project, _, group) = seed_group(&service, JobPhase::Commissioning).await;

        for round in 0..5 {
            let mut request = NewChannelRequest::new(&group.id, format!("TT-{}", round));
            request.test_points = Some(TestPointListRequest::standard(8));
            let channel = service.create_channel(request).await.unwrap().channel;
            let points = service.test_points(&channel.id).await.unwrap();

            let results = futures::future::join_all(points.iter().map(|point| {
                service.record_measurement(&point.id, result(TestResult::Pass, point.nominal_test_value))
            }))
            .await;
            assert!(results.iter().all(|r| r.is_ok()));

            service.update_each_parent_status(&channel.id).await.unwrap();
            let stored = service.require_channel(&channel.id).await.unwrap();
            let derived = StatusAggregator::channel_status(&service.test_points(&channel.id).await.unwrap());
            assert_eq!(stored.status, derived);
            assert_eq!(stored.status, ChannelStatus::Pass);
        }
        assert_eq!(service.require_project(&project.id).await.unwrap().status, ProgressStatus::Complete);
    }

    /// 同一用户并发审批同一通道，只保留一条记录
    #[tokio::test]
    async fn test_concurrent_approvals_store_one_record() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = create_file_service(&dir).await;
        let (_, _, group) = seed_group(&service, JobPhase::Atp).await;

        let supplier = Company::new("Acme Instruments", CompanyCategory::Supplier);
        service.register_company(&supplier).await.unwrap();

        for round in 0..5 {
            let channel = seed_channel(&service, &group, &format!("PT-{}", round)).await.channel;
            let mut user = User::new(format!("tech{}", round), "Sam", "Tech");
            supplier.add_employee(&mut user);
            service.register_user(&user).await.unwrap();

            let gates = futures::future::join_all(
                (0..8).map(|_| service.set_approval(&channel.id, &user.id, true)),
            )
            .await;

            let stored = service.persistence().load_approval_records(&channel.id).await.unwrap();
            assert_eq!(stored.len(), 1);
            for gate in gates {
                let gate = gate.unwrap();
                assert_eq!(gate.supplier_approval.map(|r| r.id), Some(stored[0].id.clone()));
            }
        }
    }

    mockall::mock! {
        Store {}

        #[async_trait::async_trait]
        impl BaseService for Store {
            fn service_name(&self) -> &'static str;
            async fn initialize(&mut self) -> AppResult<()>;
            async fn shutdown(&mut self) -> AppResult<()>;
            async fn health_check(&self) -> AppResult<()>;
        }

        #[async_trait::async_trait]
        impl PersistenceService for Store {
            async fn save_project(&self, project: &Project) -> AppResult<()>;
            async fn load_project(&self, id: &str) -> AppResult<Option<Project>>;
            async fn load_all_projects(&self) -> AppResult<Vec<Project>>;
            async fn delete_project(&self, id: &str) -> AppResult<()>;
            async fn save_job(&self, job: &Job) -> AppResult<()>;
            async fn load_job(&self, id: &str) -> AppResult<Option<Job>>;
            async fn load_jobs_by_project(&self, project_id: &str) -> AppResult<Vec<Job>>;
            async fn delete_job(&self, id: &str) -> AppResult<()>;
            async fn save_group(&self, group: &Group) -> AppResult<()>;
            async fn load_group(&self, id: &str) -> AppResult<Option<Group>>;
            async fn load_groups_by_job(&self, job_id: &str) -> AppResult<Vec<Group>>;
            async fn delete_group(&self, id: &str) -> AppResult<()>;
            async fn save_channel(&self, channel: &Channel) -> AppResult<()>;
            async fn load_channel(&self, id: &str) -> AppResult<Option<Channel>>;
            async fn load_channels_by_group(&self, group_id: &str) -> AppResult<Vec<Channel>>;
            async fn load_channels_by_job(&self, job_id: &str) -> AppResult<Vec<Channel>>;
            async fn load_channels_by_project(&self, project_id: &str) -> AppResult<Vec<Channel>>;
            async fn delete_channel(&self, id: &str) -> AppResult<()>;
            async fn create_channel_with_test_points(&self, channel: &Channel, points: &[TestPoint], required_equipment_type_ids: &HashSet<String>) -> AppResult<()>;
            async fn purge_channel(&self, channel_id: &str) -> AppResult<ChannelPurge>;
            async fn save_test_point(&self, point: &TestPoint) -> AppResult<()>;
            async fn save_test_points(&self, points: &[TestPoint]) -> AppResult<()>;
            async fn load_test_point(&self, id: &str) -> AppResult<Option<TestPoint>>;
            async fn load_test_points_by_channel(&self, channel_id: &str) -> AppResult<Vec<TestPoint>>;
            async fn delete_test_point(&self, id: &str) -> AppResult<()>;
            async fn delete_test_points_by_channel(&self, channel_id: &str) -> AppResult<u64>;
            async fn save_company(&self, company: &Company) -> AppResult<()>;
            async fn load_company(&self, id: &str) -> AppResult<Option<Company>>;
            async fn load_all_companies(&self) -> AppResult<Vec<Company>>;
            async fn save_user(&self, user: &User) -> AppResult<()>;
            async fn load_user(&self, id: &str) -> AppResult<Option<User>>;
            async fn load_users_by_company(&self, company_id: &str) -> AppResult<Vec<User>>;
            async fn save_test_equipment_type(&self, equipment_type: &TestEquipmentType) -> AppResult<()>;
            async fn load_test_equipment_type(&self, id: &str) -> AppResult<Option<TestEquipmentType>>;
            async fn load_all_test_equipment_types(&self) -> AppResult<Vec<TestEquipmentType>>;
            async fn save_test_equipment(&self, equipment: &TestEquipment) -> AppResult<()>;
            async fn load_test_equipment(&self, id: &str) -> AppResult<Option<TestEquipment>>;
            async fn load_test_equipment_by_type(&self, equipment_type_id: &str) -> AppResult<Vec<TestEquipment>>;
            async fn save_calibration_record(&self, record: &CalibrationRecord) -> AppResult<()>;
            async fn delete_calibration_record(&self, id: &str) -> AppResult<()>;
            async fn insert_channel_equipment_record(&self, record: &ChannelEquipmentRecord) -> AppResult<()>;
            async fn load_channel_equipment_records(&self, channel_id: &str) -> AppResult<Vec<ChannelEquipmentRecord>>;
            async fn delete_channel_equipment_records(&self, channel_id: &str) -> AppResult<u64>;
            async fn insert_approval_record(&self, record: &ApprovalRecord) -> AppResult<bool>;
            async fn load_approval_records(&self, channel_id: &str) -> AppResult<Vec<ApprovalRecord>>;
            async fn delete_approval_record(&self, channel_id: &str, user_id: &str) -> AppResult<bool>;
            async fn delete_approval_records(&self, channel_id: &str) -> AppResult<u64>;
            async fn add_association(&self, kind: AssociationKind, owner_id: &str, member_id: &str) -> AppResult<bool>;
            async fn remove_association(&self, kind: AssociationKind, owner_id: &str, member_id: &str) -> AppResult<bool>;
            async fn load_association_members(&self, kind: AssociationKind, owner_id: &str) -> AppResult<HashSet<String>>;
            async fn replace_associations(&self, kind: AssociationKind, owner_id: &str, member_ids: &HashSet<String>) -> AppResult<(usize, usize)>;
        }
    }

    fn failing_store(group: &Group, job: &Job) -> MockStore {
        let mut store = MockStore::new();
        let group = group.clone();
        let job = job.clone();
        store.expect_load_group().returning(move |_| Ok(Some(group.clone())));
        store.expect_load_job().returning(move |_| Ok(Some(job.clone())));
        store
    }

    /// 通道写入失败时直接返回错误，不再刷新上级状态
    #[tokio::test]
    async fn test_create_channel_stops_when_store_write_fails() {
        let job = Job::new("project", JobStage::InHouse, JobPhase::Commissioning);
        let group = Group::new(&job.id, "Panel A");
        let mut store = failing_store(&group, &job);
        store
            .expect_create_channel_with_test_points()
            .times(1)
            .returning(|_, _, _| Err(AppError::persistence_error("磁盘已满")));
        store.expect_save_group().never();
        store.expect_save_job().never();
        store.expect_save_project().never();

        let service = CalibrationWorkflowService::new(Arc::new(store), CalibrationConfig::default());
        let err = service
            .create_channel(NewChannelRequest::new(&group.id, "TT-1"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PERSISTENCE_ERROR");
    }

    #[tokio::test]
    async fn test_delete_channel_stops_when_purge_fails() {
        let job = Job::new("project", JobStage::InHouse, JobPhase::Commissioning);
        let group = Group::new(&job.id, "Panel A");
        let channel = Channel::new(&group.id, "TT-1");
        let mut store = MockStore::new();
        let loaded = channel.clone();
        store.expect_load_channel().returning(move |_| Ok(Some(loaded.clone())));
        store
            .expect_purge_channel()
            .times(1)
            .returning(|_| Err(AppError::persistence_error("数据库已锁定")));
        store.expect_load_group().never();

        let service = CalibrationWorkflowService::new(Arc::new(store), CalibrationConfig::default());
        let err = service.delete_channel(&channel.id).await.unwrap_err();
        assert_eq!(err.error_code(), "PERSISTENCE_ERROR");
    }
}
