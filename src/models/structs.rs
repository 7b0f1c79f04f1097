//! # 核心结构体定义
//!
//! 层级: Project → Job → Group → Channel → TestPoint。
//! 父子关系只通过外键字段表达，集合由持久化层的显式查询返回。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{
    ChannelStatus, CompanyCategory, EngUnits, ErrorType, JobPhase, JobStage, MeasurementType,
    ProgressStatus, TestResult,
};

/// 生成默认UUID字符串的辅助函数
pub fn default_id() -> String {
    Uuid::new_v4().to_string()
}

/// 计算下一个更新时间戳
///
/// 时钟分辨率不足或回拨时仍保证严格递增，轮询方据此判断数据是否过期
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// 项目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default = "default_id")]
    pub id: String,
    /// 项目名称
    pub name: String,
    /// 面向用户的项目编号
    pub number: i32,
    /// 由下属通道状态汇总得出
    #[serde(default)]
    pub status: ProgressStatus,
    pub last_updated: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, number: i32) -> Self {
        Self {
            id: default_id(),
            name: name.into(),
            number,
            status: ProgressStatus::NotStarted,
            last_updated: Utc::now(),
        }
    }
}

/// 作业
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default = "default_id")]
    pub id: String,
    pub project_id: String,
    /// 厂内 / 现场
    pub stage: JobStage,
    /// 调试 / 验收
    pub phase: JobPhase,
    #[serde(default)]
    pub status: ProgressStatus,
    pub last_updated: DateTime<Utc>,
}

impl Job {
    pub fn new(project_id: impl Into<String>, stage: JobStage, phase: JobPhase) -> Self {
        Self {
            id: default_id(),
            project_id: project_id.into(),
            stage,
            phase,
            status: ProgressStatus::NotStarted,
            last_updated: Utc::now(),
        }
    }
}

/// 通道分组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default = "default_id")]
    pub id: String,
    pub job_id: String,
    pub name: String,
    #[serde(default)]
    pub status: ProgressStatus,
    pub last_updated: DateTime<Utc>,
}

impl Group {
    pub fn new(job_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: default_id(),
            job_id: job_id.into(),
            name: name.into(),
            status: ProgressStatus::NotStarted,
            last_updated: Utc::now(),
        }
    }
}

/// 被测通道
///
/// **业务含义**: 一个需要校准的仪表通道。测量量程描述被测信号，
/// 注入量程描述校准源注入的信号，两者按测试点一一对应。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default = "default_id")]
    pub id: String,
    pub group_id: String,
    /// 通道名称（位号）
    pub name: String,

    /// 测量类型
    pub measurement_type: MeasurementType,
    /// 测量单位
    pub measurement_units: EngUnits,
    /// 测量量程下限
    pub min_range: f64,
    /// 测量量程上限
    pub max_range: f64,
    /// 满量程，仅在误差类型为 %FS 时必需
    #[serde(default)]
    pub full_scale_range: Option<f64>,

    /// 误差幅值，含义由 `error_type` 决定
    pub max_error: f64,
    pub error_type: ErrorType,

    /// 注入量程下限
    pub min_injection_range: f64,
    /// 注入量程上限
    pub max_injection_range: f64,
    /// 注入单位
    pub injection_units: EngUnits,

    #[serde(default)]
    pub status: ChannelStatus,
    /// 是否需要供应商审批
    #[serde(default)]
    pub required_supplier_approval: bool,
    /// 是否需要客户审批
    #[serde(default)]
    pub required_client_approval: bool,
    pub last_updated: DateTime<Utc>,
}

impl Channel {
    /// 创建通道，量程与误差参数使用 4-20mA 的缺省值，调用方随后覆盖
    pub fn new(group_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: default_id(),
            group_id: group_id.into(),
            name: name.into(),
            measurement_type: MeasurementType::AnalogueInput,
            measurement_units: EngUnits::Milliamps,
            min_range: 4.0,
            max_range: 20.0,
            full_scale_range: None,
            max_error: 0.0,
            error_type: ErrorType::EngUnits,
            min_injection_range: 4.0,
            max_injection_range: 20.0,
            injection_units: EngUnits::Milliamps,
            status: ChannelStatus::Untested,
            required_supplier_approval: false,
            required_client_approval: false,
            last_updated: Utc::now(),
        }
    }

    /// 测量量程跨度
    pub fn measurement_range(&self) -> f64 {
        self.max_range - self.min_range
    }

    /// 注入量程跨度
    pub fn injection_range(&self) -> f64 {
        self.max_injection_range - self.min_injection_range
    }

    pub fn touch(&mut self) {
        self.last_updated = next_timestamp(self.last_updated);
    }
}

/// 测试点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPoint {
    #[serde(default = "default_id")]
    pub id: String,
    pub channel_id: String,

    /// 标称注入值
    pub nominal_injection_value: f64,
    /// 标称测量值
    pub nominal_test_value: f64,

    #[serde(default)]
    pub measured_injection_value: Option<f64>,
    #[serde(default)]
    pub measured_test_value: Option<f64>,
    #[serde(default)]
    pub measured_error: Option<f64>,

    #[serde(default)]
    pub test_result: TestResult,
    #[serde(default)]
    pub notes: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl TestPoint {
    pub fn new(channel_id: impl Into<String>, nominal_injection_value: f64, nominal_test_value: f64) -> Self {
        Self {
            id: default_id(),
            channel_id: channel_id.into(),
            nominal_injection_value,
            nominal_test_value,
            measured_injection_value: None,
            measured_test_value: None,
            measured_error: None,
            test_result: TestResult::Untested,
            notes: None,
            last_updated: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = next_timestamp(self.last_updated);
    }
}

/// 通道设备使用记录
/// 记录一经写入不再修改，某类型的当前设备取时间戳最新的一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEquipmentRecord {
    #[serde(default = "default_id")]
    pub id: String,
    pub channel_id: String,
    pub test_equipment_type_id: String,
    pub test_equipment_id: String,
    pub timestamp: DateTime<Utc>,
    /// 记录时设备的校准到期日快照
    #[serde(default)]
    pub calibration_due_date: Option<DateTime<Utc>>,
}

/// 通道审批记录
/// 每个用户对每个通道最多一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    #[serde(default = "default_id")]
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    /// 审批时用户所属公司的类别
    pub company_category: CompanyCategory,
    pub timestamp: DateTime<Utc>,
}

/// 设备校准记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    #[serde(default = "default_id")]
    pub id: String,
    pub test_equipment_id: String,
    pub calibration_date: DateTime<Utc>,
    pub calibration_due_date: DateTime<Utc>,
}

impl CalibrationRecord {
    pub fn new(
        test_equipment_id: impl Into<String>,
        calibration_date: DateTime<Utc>,
        calibration_due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: default_id(),
            test_equipment_id: test_equipment_id.into(),
            calibration_date,
            calibration_due_date,
        }
    }
}

/// 测试设备类型（如 "Multimeter"、"Loop Calibrator"）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEquipmentType {
    #[serde(default = "default_id")]
    pub id: String,
    pub name: String,
}

impl TestEquipmentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: default_id(),
            name: name.into(),
        }
    }

    /// 将设备归入本类型，已归入时不做任何修改
    pub fn add_test_equipment(&self, equipment: &mut TestEquipment) {
        if !self.has_test_equipment(equipment) {
            equipment.test_equipment_type_id = Some(self.id.clone());
        }
    }

    pub fn has_test_equipment(&self, equipment: &TestEquipment) -> bool {
        equipment.test_equipment_type_id.as_deref() == Some(self.id.as_str())
    }

    pub fn remove_test_equipment(&self, equipment: &mut TestEquipment) {
        if self.has_test_equipment(equipment) {
            equipment.test_equipment_type_id = None;
        }
    }
}

/// 测试设备
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEquipment {
    #[serde(default = "default_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub test_equipment_type_id: Option<String>,
    /// 校准记录，由持久化层按设备加载
    #[serde(default)]
    pub calibration_records: Vec<CalibrationRecord>,
}

impl TestEquipment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: default_id(),
            name: name.into(),
            manufacturer: String::new(),
            model: String::new(),
            serial_number: String::new(),
            test_equipment_type_id: None,
            calibration_records: Vec::new(),
        }
    }

    pub fn add_calibration_record(&mut self, record: CalibrationRecord) {
        if !self.has_calibration_record(&record.id) {
            self.calibration_records.push(record);
        }
    }

    pub fn has_calibration_record(&self, record_id: &str) -> bool {
        self.calibration_records.iter().any(|r| r.id == record_id)
    }

    pub fn remove_calibration_record(&mut self, record_id: &str) {
        self.calibration_records.retain(|r| r.id != record_id);
    }

    /// 校准到期日：所有校准记录中最晚的到期日，无记录时为 None
    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.calibration_records
            .iter()
            .map(|r| r.calibration_due_date)
            .max()
    }
}

/// 公司
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default = "default_id")]
    pub id: String,
    pub name: String,
    pub category: CompanyCategory,
}

impl Company {
    pub fn new(name: impl Into<String>, category: CompanyCategory) -> Self {
        Self {
            id: default_id(),
            name: name.into(),
            category,
        }
    }

    pub fn add_employee(&self, user: &mut User) {
        if !self.has_employee(user) {
            user.company_id = Some(self.id.clone());
        }
    }

    pub fn has_employee(&self, user: &User) -> bool {
        user.company_id.as_deref() == Some(self.id.as_str())
    }

    pub fn remove_employee(&self, user: &mut User) {
        if self.has_employee(user) {
            user.company_id = None;
        }
    }

    /// 筛选供应商公司
    pub fn suppliers(companies: &[Company]) -> Vec<&Company> {
        companies
            .iter()
            .filter(|c| c.category == CompanyCategory::Supplier)
            .collect()
    }

    /// 筛选客户公司
    pub fn clients(companies: &[Company]) -> Vec<&Company> {
        companies
            .iter()
            .filter(|c| c.category == CompanyCategory::Client)
            .collect()
    }
}

/// 用户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default = "default_id")]
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company_id: Option<String>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: default_id(),
            username: username.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: String::new(),
            company_id: None,
        }
    }

    /// "Mark Chaplin"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// "M. Chaplin"
    pub fn first_letter_last_name(&self) -> String {
        match self.first_name.chars().next() {
            Some(initial) => format!("{}. {}", initial, self.last_name),
            None => self.last_name.clone(),
        }
    }
}
