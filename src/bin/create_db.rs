// 创建（或升级）ICATS SQLite 数据库的简单程序

use std::path::PathBuf;

use icats_lib::services::traits::{BaseService, PersistenceService};
use icats_lib::services::SqliteOrmPersistenceService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let db_file_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/icats_data.sqlite"));

    println!("正在创建SQLite数据库...");
    let service = SqliteOrmPersistenceService::new(Some(db_file_path.as_path())).await?;
    service.health_check().await?;

    println!("数据库创建完成！");
    println!("数据库文件位置: {:?}", service.db_file_path().canonicalize()?);
    println!("已有项目 {} 个", service.load_all_projects().await?.len());

    Ok(())
}
