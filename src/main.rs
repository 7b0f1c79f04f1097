// ICATS 命令行入口：加载配置、初始化日志和数据库，输出各项目的校准进度

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

use icats_lib::logging::{init_logger, LoggerConfig};
use icats_lib::services::traits::{BaseService, PersistenceService};
use icats_lib::services::{CalibrationWorkflowService, SqliteOrmPersistenceService};
use icats_lib::utils::init_global_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = init_global_config(config_path)
        .await
        .context("加载配置失败")?;

    init_logger(&LoggerConfig::from(&config.logging_config)).context("初始化日志失败")?;
    log::info!(
        "[MAIN] {} v{} 启动 ({})",
        config.app_settings.app_name,
        config.app_settings.app_version,
        config.app_settings.environment
    );

    let persistence = SqliteOrmPersistenceService::from_config(&config.persistence_config)
        .await
        .context("打开数据库失败")?;
    persistence.health_check().await.context("数据库健康检查失败")?;
    let persistence: Arc<dyn PersistenceService> = Arc::new(persistence);

    let workflow = CalibrationWorkflowService::new(persistence.clone(), config.calibration_config.clone());

    let projects = persistence.load_all_projects().await?;
    if projects.is_empty() {
        println!("暂无项目");
        return Ok(());
    }

    for project in &projects {
        let summary = workflow.project_summary(&project.id).await?;
        println!(
            "{:<40} {:<12} 通道 {:>4}  通过 {:>3}%  失败 {:>3}%  进行中 {:>3}%  未测试 {:>3}%",
            summary.name,
            summary.status.to_string(),
            summary.channel_count,
            summary.progress.percent_passed,
            summary.progress.percent_failed,
            summary.progress.percent_in_progress,
            summary.progress.percent_untested
        );
    }

    Ok(())
}
