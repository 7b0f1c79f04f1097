use config::{Config, Environment, File, FileFormat};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::enums::TestPointListType;
use crate::utils::error::{AppError, AppResult};

/// 环境变量前缀，例如 `ICATS_CALIBRATION_CONFIG__MAX_TESTPOINTS_PER_CHANNEL=50`
pub const ENV_PREFIX: &str = "ICATS";
/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/icats_config.json";

/// 应用程序主配置结构
/// 包含应用程序运行所需的所有配置信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 应用程序基本设置
    pub app_settings: AppSettings,
    /// 校准与测试点配置
    pub calibration_config: CalibrationConfig,
    /// 日志配置
    pub logging_config: LoggingConfig,
    /// 数据存储配置
    pub persistence_config: PersistenceConfig,
}

/// 应用程序基本设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// 应用程序名称
    pub app_name: String,
    /// 应用程序版本
    pub app_version: String,
    /// 运行环境 (development, testing, production)
    pub environment: String,
    /// 是否启用调试模式
    pub debug_mode: bool,
}

/// 校准配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// 单个通道允许的最大测试点数
    pub max_testpoints_per_channel: usize,
    /// 创建通道时的默认测试点数
    pub default_testpoint_count: usize,
    /// 默认测试点列表类型
    pub default_list_type: TestPointListType,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 日志文件路径
    pub log_file_path: Option<PathBuf>,
    /// 是否启用控制台输出
    pub console_output: bool,
    /// 是否启用文件输出
    pub file_output: bool,
}

/// 数据持久化配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// SQLite 数据库文件路径
    pub database_path: PathBuf,
    /// 使用内存数据库（数据不落盘）
    pub in_memory: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_name: "ICATS".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            debug_mode: true,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_testpoints_per_channel: 21,
            default_testpoint_count: 5,
            default_list_type: TestPointListType::Standard,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file_path: Some(PathBuf::from("logs/icats.log")),
            console_output: true,
            file_output: false,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/icats_data.sqlite"),
            in_memory: false,
        }
    }
}

/// 配置管理器
/// 负责加载、保存和管理应用程序配置
pub struct ConfigManager {
    config: AppConfig,
    config_file_path: PathBuf,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new(config_file_path: PathBuf) -> Self {
        Self {
            config: AppConfig::default(),
            config_file_path,
        }
    }

    pub fn config_file_path(&self) -> &Path {
        &self.config_file_path
    }

    /// 从文件加载配置，并用 `ICATS_` 前缀的环境变量覆盖
    pub async fn load_from_file(&mut self) -> AppResult<()> {
        self.load_with_env(Environment::with_prefix(ENV_PREFIX)).await
    }

    async fn load_with_env(&mut self, env: Environment) -> AppResult<()> {
        if !self.config_file_path.exists() {
            // 如果配置文件不存在，创建默认配置文件
            log::info!(
                "[CONFIG] 配置文件不存在，写入默认配置: {}",
                self.config_file_path.display()
            );
            self.config = AppConfig::default();
            self.save_to_file().await?;
        }

        let settings = Config::builder()
            .add_source(File::from(self.config_file_path.as_path()).format(FileFormat::Json))
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        self.config = settings.try_deserialize::<AppConfig>()?;
        log::debug!("[CONFIG] 已加载配置: {}", self.config_file_path.display());
        Ok(())
    }

    /// 将配置保存到文件
    pub async fn save_to_file(&self) -> AppResult<()> {
        // 确保目录存在
        if let Some(parent) = self.config_file_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::io_error(format!("创建配置目录失败: {}", e), e.kind().to_string())
                })?;
            }
        }

        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| AppError::json_error(format!("序列化配置失败: {}", e)))?;

        tokio::fs::write(&self.config_file_path, content)
            .await
            .map_err(|e| AppError::io_error(format!("写入配置文件失败: {}", e), e.kind().to_string()))?;

        Ok(())
    }

    /// 获取配置的只读引用
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取配置的可变引用
    pub fn get_config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// 验证配置的有效性
    pub fn validate_config(&self) -> AppResult<()> {
        validate(&self.config)
    }

    /// 重置为默认配置
    pub fn reset_to_default(&mut self) {
        self.config = AppConfig::default();
    }
}

/// 验证配置的有效性
pub fn validate(config: &AppConfig) -> AppResult<()> {
    let valid_environments = ["development", "testing", "production"];
    if !valid_environments.contains(&config.app_settings.environment.as_str()) {
        return Err(AppError::configuration_error(format!(
            "无效的环境配置: {}，有效值: {:?}",
            config.app_settings.environment, valid_environments
        )));
    }

    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.logging_config.log_level.as_str()) {
        return Err(AppError::configuration_error(format!(
            "无效的日志级别: {}，有效值: {:?}",
            config.logging_config.log_level, valid_log_levels
        )));
    }

    let calibration = &config.calibration_config;
    if calibration.max_testpoints_per_channel < 2 {
        return Err(AppError::configuration_error(format!(
            "每通道最大测试点数至少为 2，当前为 {}",
            calibration.max_testpoints_per_channel
        )));
    }
    if calibration.default_testpoint_count < 2
        || calibration.default_testpoint_count > calibration.max_testpoints_per_channel
    {
        return Err(AppError::configuration_error(format!(
            "默认测试点数 {} 超出范围 [2, {}]",
            calibration.default_testpoint_count, calibration.max_testpoints_per_channel
        )));
    }

    let persistence = &config.persistence_config;
    if !persistence.in_memory && persistence.database_path.as_os_str().is_empty() {
        return Err(AppError::configuration_error("数据库路径不能为空"));
    }

    Ok(())
}

/// 全局配置管理器实例
static GLOBAL_CONFIG: OnceCell<Mutex<ConfigManager>> = OnceCell::new();

/// 初始化全局配置管理器
pub async fn init_global_config(config_path: Option<PathBuf>) -> AppResult<AppConfig> {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config_manager = ConfigManager::new(config_path);

    config_manager.load_from_file().await?;
    config_manager.validate_config()?;
    let config = config_manager.get_config().clone();

    GLOBAL_CONFIG
        .set(Mutex::new(config_manager))
        .map_err(|_| AppError::configuration_error("全局配置已经初始化"))?;

    Ok(config)
}

/// 获取全局配置的只读访问
pub fn get_global_config() -> AppResult<AppConfig> {
    let config_manager = GLOBAL_CONFIG
        .get()
        .ok_or_else(|| AppError::configuration_error("全局配置未初始化"))?
        .lock()
        .map_err(|_| AppError::concurrency_error("获取全局配置锁失败"))?;

    Ok(config_manager.get_config().clone())
}
