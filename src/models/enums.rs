//! # 模型枚举类型模块
//!
//! ## 业务作用
//! 本模块定义了校准测试系统中使用的各种枚举类型，包括：
//! - **测试结果枚举**: 单个测试点的判定结果
//! - **状态枚举**: 通道状态与项目/作业/分组的进度状态
//! - **通道配置枚举**: 测量类型、工程单位、误差类型
//! - **作业枚举**: 作业阶段与作业期次，决定审批要求
//! - **参考数据枚举**: 公司类别、关联关系类型
//!
//! ## 设计原则
//! - **字符串转换**: Display 与 FromStr 使用界面和数据库中的显示字符串，双向可逆
//! - **默认值**: 为枚举提供合理的默认值
//! - **序列化支持**: 所有枚举都支持JSON序列化

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// 测试点结果
/// 测试点创建时为未测试，通过/失败由操作人员外部判定后写入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestResult {
    /// 未测试
    Untested,
    /// 通过
    Pass,
    /// 失败
    Fail,
}

impl Default for TestResult {
    fn default() -> Self {
        Self::Untested
    }
}

impl TestResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestResult::Untested => "Untested",
            TestResult::Pass => "Pass",
            TestResult::Fail => "Fail",
        }
    }
}

impl Display for TestResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TestResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Untested" => Ok(TestResult::Untested),
            "Pass" => Ok(TestResult::Pass),
            "Fail" => Ok(TestResult::Fail),
            _ => Err(format!("Invalid TestResult: {}", s)),
        }
    }
}

/// 通道状态
/// 由通道下全部测试点的结果统计推导，不直接编辑
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelStatus {
    /// 全部测试点未测试（含没有测试点的情况）
    Untested,
    /// 全部测试点通过
    Pass,
    /// 至少一个测试点失败
    Fail,
    /// 部分测试点已有结果且无失败
    InProgress,
}

impl Default for ChannelStatus {
    fn default() -> Self {
        Self::Untested
    }
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::Untested => "Untested",
            ChannelStatus::Pass => "Pass",
            ChannelStatus::Fail => "Fail",
            ChannelStatus::InProgress => "In-Progress",
        }
    }
}

impl Display for ChannelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChannelStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Untested" => Ok(ChannelStatus::Untested),
            "Pass" => Ok(ChannelStatus::Pass),
            "Fail" => Ok(ChannelStatus::Fail),
            "In-Progress" => Ok(ChannelStatus::InProgress),
            _ => Err(format!("Invalid ChannelStatus: {}", s)),
        }
    }
}

/// 分组/作业/项目的进度状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressStatus {
    /// 未开始
    NotStarted,
    /// 进行中（包括含有失败通道的情况）
    InProgress,
    /// 全部通道通过
    Complete,
}

impl Default for ProgressStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "Not Started",
            ProgressStatus::InProgress => "In-Progress",
            ProgressStatus::Complete => "Complete",
        }
    }
}

impl Display for ProgressStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProgressStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Not Started" => Ok(ProgressStatus::NotStarted),
            "In-Progress" => Ok(ProgressStatus::InProgress),
            "Complete" => Ok(ProgressStatus::Complete),
            _ => Err(format!("Invalid ProgressStatus: {}", s)),
        }
    }
}

/// 测量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementType {
    AnalogueInput,
    AnalogueOutput,
    DigitalInput,
    DigitalOutput,
    Frequency,
    Temperature,
    Pressure,
}

impl Default for MeasurementType {
    fn default() -> Self {
        Self::AnalogueInput
    }
}

impl MeasurementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementType::AnalogueInput => "Analogue Input",
            MeasurementType::AnalogueOutput => "Analogue Output",
            MeasurementType::DigitalInput => "Digital Input",
            MeasurementType::DigitalOutput => "Digital Output",
            MeasurementType::Frequency => "Frequency",
            MeasurementType::Temperature => "Temperature",
            MeasurementType::Pressure => "Pressure",
        }
    }
}

impl Display for MeasurementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MeasurementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Analogue Input" => Ok(MeasurementType::AnalogueInput),
            "Analogue Output" => Ok(MeasurementType::AnalogueOutput),
            "Digital Input" => Ok(MeasurementType::DigitalInput),
            "Digital Output" => Ok(MeasurementType::DigitalOutput),
            "Frequency" => Ok(MeasurementType::Frequency),
            "Temperature" => Ok(MeasurementType::Temperature),
            "Pressure" => Ok(MeasurementType::Pressure),
            _ => Err(format!("Invalid MeasurementType: {}", s)),
        }
    }
}

/// 工程单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngUnits {
    /// 伏特
    Volts,
    /// 毫安
    Milliamps,
    /// 摄氏度
    DegreesCelsius,
    /// 赫兹
    Hertz,
    /// 欧姆
    Ohms,
    /// 磅/平方英寸
    Psi,
}

impl Default for EngUnits {
    fn default() -> Self {
        Self::Milliamps
    }
}

impl EngUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngUnits::Volts => "V",
            EngUnits::Milliamps => "mA",
            EngUnits::DegreesCelsius => "degC",
            EngUnits::Hertz => "Hz",
            EngUnits::Ohms => "Ohms",
            EngUnits::Psi => "psi",
        }
    }
}

impl Display for EngUnits {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EngUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "V" => Ok(EngUnits::Volts),
            "mA" => Ok(EngUnits::Milliamps),
            "degC" => Ok(EngUnits::DegreesCelsius),
            "Hz" => Ok(EngUnits::Hertz),
            "Ohms" => Ok(EngUnits::Ohms),
            "psi" => Ok(EngUnits::Psi),
            _ => Err(format!("Invalid EngUnits: {}", s)),
        }
    }
}

/// 允许误差的表达方式
///
/// **计算规则**:
/// - `EngUnits`: 误差幅值即工程单位下的绝对误差
/// - `PercentFullScale`: 满量程的百分比
/// - `PercentReading`: 读数（实测值，缺省时为标称值）的百分比
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    EngUnits,
    PercentFullScale,
    PercentReading,
}

impl Default for ErrorType {
    fn default() -> Self {
        Self::EngUnits
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::EngUnits => "Eng Units",
            ErrorType::PercentFullScale => "%FS",
            ErrorType::PercentReading => "%RDG",
        }
    }
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ErrorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Eng Units" => Ok(ErrorType::EngUnits),
            "%FS" => Ok(ErrorType::PercentFullScale),
            "%RDG" => Ok(ErrorType::PercentReading),
            _ => Err(format!("Invalid ErrorType: {}", s)),
        }
    }
}

/// 作业阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStage {
    /// 厂内
    InHouse,
    /// 现场
    OnSite,
}

impl Default for JobStage {
    fn default() -> Self {
        Self::InHouse
    }
}

impl Display for JobStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStage::InHouse => "In-House",
            JobStage::OnSite => "On-Site",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for JobStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "In-House" => Ok(JobStage::InHouse),
            "On-Site" => Ok(JobStage::OnSite),
            _ => Err(format!("Invalid JobStage: {}", s)),
        }
    }
}

/// 作业期次
/// ATP（验收测试）期次的通道额外需要客户审批
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobPhase {
    /// 调试
    Commissioning,
    /// 验收测试
    Atp,
}

impl Default for JobPhase {
    fn default() -> Self {
        Self::Commissioning
    }
}

impl Display for JobPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobPhase::Commissioning => "Commissioning",
            JobPhase::Atp => "ATP",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for JobPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Commissioning" => Ok(JobPhase::Commissioning),
            "ATP" => Ok(JobPhase::Atp),
            _ => Err(format!("Invalid JobPhase: {}", s)),
        }
    }
}

/// 测试点列表生成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestPointListType {
    /// 在量程内等间隔生成
    Standard,
    /// 使用调用方提供的值
    Custom,
}

impl Default for TestPointListType {
    fn default() -> Self {
        Self::Standard
    }
}

impl Display for TestPointListType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TestPointListType::Standard => "Standard",
            TestPointListType::Custom => "Custom",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TestPointListType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Standard" => Ok(TestPointListType::Standard),
            "Custom" => Ok(TestPointListType::Custom),
            _ => Err(format!("Invalid TestPointListType: {}", s)),
        }
    }
}

/// 公司类别，审批记录按此分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanyCategory {
    /// 供应商
    Supplier,
    /// 客户
    Client,
}

impl Default for CompanyCategory {
    fn default() -> Self {
        Self::Supplier
    }
}

impl Display for CompanyCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompanyCategory::Supplier => "Supplier",
            CompanyCategory::Client => "Client",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CompanyCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Supplier" => Ok(CompanyCategory::Supplier),
            "Client" => Ok(CompanyCategory::Client),
            _ => Err(format!("Invalid CompanyCategory: {}", s)),
        }
    }
}

/// 多对多关联的类型
/// 所有关联共用一张表，以 (kind, owner_id, member_id) 唯一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationKind {
    /// 项目 -> 成员用户
    ProjectMember,
    /// 项目 -> 参与公司
    ProjectCompany,
    /// 项目 -> 测试设备池
    ProjectTestEquipment,
    /// 通道 -> 必需的测试设备类型
    ChannelRequiredEquipmentType,
}

impl Display for AssociationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssociationKind::ProjectMember => "ProjectMember",
            AssociationKind::ProjectCompany => "ProjectCompany",
            AssociationKind::ProjectTestEquipment => "ProjectTestEquipment",
            AssociationKind::ChannelRequiredEquipmentType => "ChannelRequiredEquipmentType",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AssociationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ProjectMember" => Ok(AssociationKind::ProjectMember),
            "ProjectCompany" => Ok(AssociationKind::ProjectCompany),
            "ProjectTestEquipment" => Ok(AssociationKind::ProjectTestEquipment),
            "ChannelRequiredEquipmentType" => Ok(AssociationKind::ChannelRequiredEquipmentType),
            _ => Err(format!("Invalid AssociationKind: {}", s)),
        }
    }
}
