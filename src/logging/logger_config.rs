//! 日志配置模块
//!
//! 基于 env_logger 的日志初始化，`RUST_LOG` 环境变量优先于配置文件中的级别

use chrono::Local;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::utils::config::LoggingConfig;
use crate::utils::error::{AppError, AppResult};

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 日志输出目标
    pub target: LogTarget,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid LogLevel: {}", s)),
        }
    }
}

/// 日志输出目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogTarget {
    Console,
    File { path: PathBuf },
    /// 同时写控制台和文件
    ConsoleAndFile { path: PathBuf },
    /// 不安装日志器
    Disabled,
}

/// 写文件的同时把同一份内容写到 stderr
struct ConsoleTee<W: Write> {
    file: W,
}

impl<W: Write> Write for ConsoleTee<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write_all(buf)?;
        std::io::stderr().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()?;
        std::io::stderr().flush()
    }
}

fn open_log_file(path: &Path) -> AppResult<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            target: LogTarget::Console,
        }
    }
}

impl From<&LoggingConfig> for LoggerConfig {
    fn from(config: &LoggingConfig) -> Self {
        let level = config.log_level.parse().unwrap_or(LogLevel::Info);
        // 未配置文件路径时 file_output 不生效
        let file = config.log_file_path.as_ref().filter(|_| config.file_output);
        let target = match (file, config.console_output) {
            (Some(path), true) => LogTarget::ConsoleAndFile { path: path.clone() },
            (Some(path), false) => LogTarget::File { path: path.clone() },
            (None, true) => LogTarget::Console,
            (None, false) => LogTarget::Disabled,
        };
        Self { level, target }
    }
}

/// 初始化全局日志，重复初始化返回错误
pub fn init_logger(config: &LoggerConfig) -> AppResult<()> {
    if config.target == LogTarget::Disabled {
        return Ok(());
    }

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(config.level.into())
        .filter_module("sqlx", LevelFilter::Warn)
        .filter_module("sea_orm", LevelFilter::Warn)
        .parse_env("RUST_LOG")
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });

    match &config.target {
        LogTarget::File { path } => {
            builder.target(env_logger::Target::Pipe(Box::new(open_log_file(path)?)));
        }
        LogTarget::ConsoleAndFile { path } => {
            let tee = ConsoleTee { file: open_log_file(path)? };
            builder.target(env_logger::Target::Pipe(Box::new(tee)));
        }
        LogTarget::Console | LogTarget::Disabled => {}
    }

    builder
        .try_init()
        .map_err(|e| AppError::configuration_error(format!("日志初始化失败: {}", e)))
}
