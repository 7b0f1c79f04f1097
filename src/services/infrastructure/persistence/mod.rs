/// 数据持久化模块
/// 基于 SeaORM + SQLite 实现 PersistenceService

pub mod sqlite_orm_persistence_service;

pub use sqlite_orm_persistence_service::SqliteOrmPersistenceService;
