// 详细注释：使用SeaORM和SQLite实现数据持久化服务

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Index, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Schema, TransactionTrait,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::models::entities;
use crate::models::enums::AssociationKind;
use crate::models::structs::*;
use crate::services::traits::{BaseService, ChannelPurge, PersistenceService};
use crate::utils::config::PersistenceConfig;
use crate::utils::error::{AppError, AppResult};

// 默认的SQLite数据库文件名
const DEFAULT_DB_FILE: &str = "icats_data.sqlite";
// 内存数据库标识
const MEMORY_DB: &str = ":memory:";

/// 存在则更新，不存在则插入
macro_rules! upsert_model {
    ($db:expr, $entity:ty, $active:ident, $id:expr, $what:expr) => {{
        let existing = <$entity>::find_by_id($id)
            .one($db)
            .await
            .map_err(|e| AppError::persistence_error(format!("查询{}失败: {}", $what, e)))?;

        if existing.is_some() {
            $active
                .update($db)
                .await
                .map_err(|e| AppError::persistence_error(format!("更新{}失败: {}", $what, e)))?;
        } else {
            <$entity>::insert($active)
                .exec($db)
                .await
                .map_err(|e| AppError::persistence_error(format!("插入{}失败: {}", $what, e)))?;
        }
    }};
}

/// 按主键删除，未删除任何行时返回 NotFoundError
macro_rules! delete_by_id_or_not_found {
    ($db:expr, $entity:ty, $id:expr, $resource:expr) => {{
        let delete_result = <$entity>::delete_by_id($id.to_string())
            .exec($db)
            .await
            .map_err(|e| AppError::persistence_error(format!("删除{}失败: {}", $resource, e)))?;
        if delete_result.rows_affected == 0 {
            Err(AppError::not_found_error($resource, format!("未找到ID为 {} 的记录进行删除", $id)))
        } else {
            Ok(())
        }
    }};
}

/// 基于SeaORM和SQLite的持久化服务实现
pub struct SqliteOrmPersistenceService {
    db_conn: Arc<DatabaseConnection>, // 使用Arc以便在多处共享连接
    db_file_path: PathBuf,
}

impl SqliteOrmPersistenceService {
    /// 创建新的 SqliteOrmPersistenceService 实例
    ///
    /// # Arguments
    ///
    /// * `db_path_opt` - SQLite数据库文件的可选路径。`:memory:` 表示内存数据库，None 使用当前目录下的默认文件。
    pub async fn new(db_path_opt: Option<&Path>) -> AppResult<Self> {
        let determined_db_file_path = match db_path_opt {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir()
                .map_err(|e| AppError::io_error("获取当前目录失败", e.kind().to_string()))?
                .join(DEFAULT_DB_FILE),
        };

        let in_memory = determined_db_file_path.to_str() == Some(MEMORY_DB);
        let db_url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            if let Some(parent_dir) = determined_db_file_path.parent() {
                if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                    tokio::fs::create_dir_all(parent_dir).await.map_err(|e| {
                        AppError::io_error(
                            format!("创建数据库目录失败: {:?}", parent_dir),
                            e.kind().to_string(),
                        )
                    })?;
                }
            }
            format!("sqlite://{}?mode=rwc", determined_db_file_path.to_string_lossy())
        };

        // 内存数据库每个连接都是独立的库，只能使用单连接
        let mut connect_opts = ConnectOptions::new(db_url);
        connect_opts
            .max_connections(if in_memory { 1 } else { 5 })
            .min_connections(1)
            .connect_timeout(Duration::from_secs(30))
            .sqlx_logging(false);
        if in_memory {
            // 连接被回收后内存库随之丢失
            connect_opts
                .idle_timeout(Duration::from_secs(24 * 3600))
                .max_lifetime(Duration::from_secs(24 * 3600));
        }

        let conn = Database::connect(connect_opts)
            .await
            .map_err(|db_err| AppError::persistence_error(db_err.to_string()))?;

        Self::setup_schema(&conn).await?;

        log::info!("[PERSISTENCE] 数据库已连接: {}", determined_db_file_path.display());
        Ok(Self {
            db_conn: Arc::new(conn),
            db_file_path: determined_db_file_path,
        })
    }

    /// 创建内存数据库服务，主要用于测试
    pub async fn new_in_memory() -> AppResult<Self> {
        Self::new(Some(Path::new(MEMORY_DB))).await
    }

    /// 根据持久化配置创建
    pub async fn from_config(config: &PersistenceConfig) -> AppResult<Self> {
        if config.in_memory {
            Self::new_in_memory().await
        } else {
            Self::new(Some(config.database_path.as_path())).await
        }
    }

    pub fn db_file_path(&self) -> &Path {
        &self.db_file_path
    }

    /// 获取数据库连接（用于迁移等操作）
    pub fn get_database_connection(&self) -> &DatabaseConnection {
        self.db_conn.as_ref()
    }

    async fn begin(&self) -> AppResult<sea_orm::DatabaseTransaction> {
        self.db_conn
            .begin()
            .await
            .map_err(|e| AppError::persistence_error(format!("开启事务失败: {}", e)))
    }

    /// 初始化数据库表结构
    async fn setup_schema(db: &DatabaseConnection) -> AppResult<()> {
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);

        macro_rules! create_table {
            ($entity:expr, $table:expr) => {{
                let stmt = schema.create_table_from_entity($entity).if_not_exists().to_owned();
                db.execute(backend.build(&stmt))
                    .await
                    .map_err(|e| AppError::persistence_error(format!("创建 {} 表失败: {}", $table, e)))?;
            }};
        }

        create_table!(entities::project::Entity, "projects");
        create_table!(entities::job::Entity, "jobs");
        create_table!(entities::group::Entity, "channel_groups");
        create_table!(entities::channel::Entity, "channels");
        create_table!(entities::test_point::Entity, "test_points");
        create_table!(entities::company::Entity, "companies");
        create_table!(entities::user::Entity, "users");
        create_table!(entities::test_equipment_type::Entity, "test_equipment_types");
        create_table!(entities::test_equipment::Entity, "test_equipment");
        create_table!(entities::calibration_record::Entity, "calibration_records");
        create_table!(entities::channel_equipment_record::Entity, "channel_equipment_records");
        create_table!(entities::approval_record::Entity, "approval_records");
        create_table!(entities::association::Entity, "associations");

        // 每个用户对每个通道最多一条审批
        let approval_index = Index::create()
            .name("idx_approval_records_channel_user")
            .table(entities::approval_record::Entity)
            .col(entities::approval_record::Column::ChannelId)
            .col(entities::approval_record::Column::UserId)
            .unique()
            .if_not_exists()
            .to_owned();
        db.execute(backend.build(&approval_index))
            .await
            .map_err(|e| AppError::persistence_error(format!("创建审批唯一索引失败: {}", e)))?;

        log::info!("[PERSISTENCE] 数据库表结构设置完成或已存在。");
        Ok(())
    }

    async fn load_calibration_records(&self, equipment_id: &str) -> AppResult<Vec<CalibrationRecord>> {
        let models = entities::calibration_record::Entity::find()
            .filter(entities::calibration_record::Column::TestEquipmentId.eq(equipment_id))
            .order_by_asc(entities::calibration_record::Column::CalibrationDate)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载校准记录失败: {}", e)))?;
        Ok(models.iter().map(|m| m.into()).collect())
    }

    async fn with_calibration_records(&self, model: &entities::test_equipment::Model) -> AppResult<TestEquipment> {
        let mut equipment: TestEquipment = model.into();
        equipment.calibration_records = self.load_calibration_records(&equipment.id).await?;
        Ok(equipment)
    }
}

#[async_trait]
impl BaseService for SqliteOrmPersistenceService {
    fn service_name(&self) -> &'static str {
        "SqliteOrmPersistenceService"
    }

    async fn initialize(&mut self) -> AppResult<()> {
        // 连接和建表已在 new 中完成
        log::info!("{} 已初始化。", self.service_name());
        Ok(())
    }

    async fn shutdown(&mut self) -> AppResult<()> {
        log::info!("{} 已关闭。", self.service_name());
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        self.db_conn.ping().await.map_err(|db_err| {
            AppError::persistence_error(format!("数据库健康检查失败: {}", db_err))
        })?;
        log::debug!("数据库连接健康。");
        Ok(())
    }
}

#[async_trait]
impl PersistenceService for SqliteOrmPersistenceService {
    // --- Project ---
    async fn save_project(&self, project: &Project) -> AppResult<()> {
        let active_model: entities::project::ActiveModel = project.into();
        upsert_model!(self.db_conn.as_ref(), entities::project::Entity, active_model, project.id.clone(), "项目");
        Ok(())
    }

    async fn load_project(&self, id: &str) -> AppResult<Option<Project>> {
        let model = entities::project::Entity::find_by_id(id.to_string())
            .one(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载项目失败: {}", e)))?;
        Ok(model.map(|m| (&m).into()))
    }

    async fn load_all_projects(&self) -> AppResult<Vec<Project>> {
        let models = entities::project::Entity::find()
            .order_by_asc(entities::project::Column::Number)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载所有项目失败: {}", e)))?;
        Ok(models.iter().map(|m| m.into()).collect())
    }

    async fn delete_project(&self, id: &str) -> AppResult<()> {
        delete_by_id_or_not_found!(self.db_conn.as_ref(), entities::project::Entity, id, "Project")
    }

    // --- Job ---
    async fn save_job(&self, job: &Job) -> AppResult<()> {
        let active_model: entities::job::ActiveModel = job.into();
        upsert_model!(self.db_conn.as_ref(), entities::job::Entity, active_model, job.id.clone(), "作业");
        Ok(())
    }

    async fn load_job(&self, id: &str) -> AppResult<Option<Job>> {
        let model = entities::job::Entity::find_by_id(id.to_string())
            .one(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载作业失败: {}", e)))?;
        Ok(model.map(|m| (&m).into()))
    }

    async fn load_jobs_by_project(&self, project_id: &str) -> AppResult<Vec<Job>> {
        let models = entities::job::Entity::find()
            .filter(entities::job::Column::ProjectId.eq(project_id))
            .order_by_asc(entities::job::Column::Stage)
            .order_by_asc(entities::job::Column::Phase)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载项目作业失败: {}", e)))?;
        Ok(models.iter().map(|m| m.into()).collect())
    }

    async fn delete_job(&self, id: &str) -> AppResult<()> {
        delete_by_id_or_not_found!(self.db_conn.as_ref(), entities::job::Entity, id, "Job")
    }

    // --- Group ---
    async fn save_group(&self, group: &Group) -> AppResult<()> {
        let active_model: entities::group::ActiveModel = group.into();
        upsert_model!(self.db_conn.as_ref(), entities::group::Entity, active_model, group.id.clone(), "分组");
        Ok(())
    }

    async fn load_group(&self, id: &str) -> AppResult<Option<Group>> {
        let model = entities::group::Entity::find_by_id(id.to_string())
            .one(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载分组失败: {}", e)))?;
        Ok(model.map(|m| (&m).into()))
    }

    async fn load_groups_by_job(&self, job_id: &str) -> AppResult<Vec<Group>> {
        let models = entities::group::Entity::find()
            .filter(entities::group::Column::JobId.eq(job_id))
            .order_by_asc(entities::group::Column::Name)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载作业分组失败: {}", e)))?;
        Ok(models.iter().map(|m| m.into()).collect())
    }

    async fn delete_group(&self, id: &str) -> AppResult<()> {
        delete_by_id_or_not_found!(self.db_conn.as_ref(), entities::group::Entity, id, "Group")
    }

    // --- Channel ---
    async fn save_channel(&self, channel: &Channel) -> AppResult<()> {
        let active_model: entities::channel::ActiveModel = channel.into();
        upsert_model!(self.db_conn.as_ref(), entities::channel::Entity, active_model, channel.id.clone(), "通道");
        Ok(())
    }

    async fn load_channel(&self, id: &str) -> AppResult<Option<Channel>> {
        let model = entities::channel::Entity::find_by_id(id.to_string())
            .one(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载通道失败: {}", e)))?;
        Ok(model.map(|m| (&m).into()))
    }

    async fn load_channels_by_group(&self, group_id: &str) -> AppResult<Vec<Channel>> {
        let models = entities::channel::Entity::find()
            .filter(entities::channel::Column::GroupId.eq(group_id))
            .order_by_asc(entities::channel::Column::Name)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载分组通道失败: {}", e)))?;
        Ok(models.iter().map(|m| m.into()).collect())
    }

    async fn load_channels_by_job(&self, job_id: &str) -> AppResult<Vec<Channel>> {
        let groups = self.load_groups_by_job(job_id).await?;
        // 保持分组顺序展开
        let per_group = futures::future::try_join_all(
            groups.iter().map(|g| self.load_channels_by_group(&g.id)),
        )
        .await?;
        Ok(per_group.into_iter().flatten().collect())
    }

    async fn load_channels_by_project(&self, project_id: &str) -> AppResult<Vec<Channel>> {
        let jobs = self.load_jobs_by_project(project_id).await?;
        let per_job = futures::future::try_join_all(
            jobs.iter().map(|j| self.load_channels_by_job(&j.id)),
        )
        .await?;
        Ok(per_job.into_iter().flatten().collect())
    }

    async fn delete_channel(&self, id: &str) -> AppResult<()> {
        delete_by_id_or_not_found!(self.db_conn.as_ref(), entities::channel::Entity, id, "Channel")
    }

    async fn create_channel_with_test_points(
        &self,
        channel: &Channel,
        points: &[TestPoint],
        required_equipment_type_ids: &HashSet<String>,
    ) -> AppResult<()> {
        // 未提交的事务在出错返回时随 drop 回滚
        let txn = self.begin().await?;

        let channel_model: entities::channel::ActiveModel = channel.into();
        upsert_model!(&txn, entities::channel::Entity, channel_model, channel.id.clone(), "通道");

        for point in points {
            let point_model: entities::test_point::ActiveModel = point.into();
            upsert_model!(&txn, entities::test_point::Entity, point_model, point.id.clone(), "测试点");
        }

        let kind = AssociationKind::ChannelRequiredEquipmentType;
        entities::association::Entity::delete_many()
            .filter(entities::association::Column::Kind.eq(kind.to_string()))
            .filter(entities::association::Column::OwnerId.eq(channel.id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::persistence_error(format!("清除通道设备类型失败: {}", e)))?;
        for type_id in required_equipment_type_ids {
            let link = entities::association::ActiveModel::link(kind, &channel.id, type_id);
            entities::association::Entity::insert(link)
                .exec(&txn)
                .await
                .map_err(|e| AppError::persistence_error(format!("写入通道设备类型失败: {}", e)))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::persistence_error(format!("提交通道事务失败: {}", e)))?;
        log::debug!(
            "[PERSISTENCE] 通道 {} 已写入，测试点 {} 个",
            channel.name,
            points.len()
        );
        Ok(())
    }

    async fn purge_channel(&self, channel_id: &str) -> AppResult<ChannelPurge> {
        let txn = self.begin().await?;

        let test_points = entities::test_point::Entity::delete_many()
            .filter(entities::test_point::Column::ChannelId.eq(channel_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::persistence_error(format!("删除通道测试点失败: {}", e)))?
            .rows_affected;
        let equipment_records = entities::channel_equipment_record::Entity::delete_many()
            .filter(entities::channel_equipment_record::Column::ChannelId.eq(channel_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::persistence_error(format!("删除设备使用记录失败: {}", e)))?
            .rows_affected;
        let approvals = entities::approval_record::Entity::delete_many()
            .filter(entities::approval_record::Column::ChannelId.eq(channel_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::persistence_error(format!("删除通道审批记录失败: {}", e)))?
            .rows_affected;
        let required_equipment_types = entities::association::Entity::delete_many()
            .filter(
                entities::association::Column::Kind
                    .eq(AssociationKind::ChannelRequiredEquipmentType.to_string()),
            )
            .filter(entities::association::Column::OwnerId.eq(channel_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::persistence_error(format!("删除通道设备类型失败: {}", e)))?
            .rows_affected;

        delete_by_id_or_not_found!(&txn, entities::channel::Entity, channel_id, "Channel")?;

        txn.commit()
            .await
            .map_err(|e| AppError::persistence_error(format!("提交删除事务失败: {}", e)))?;
        Ok(ChannelPurge {
            test_points,
            equipment_records,
            approvals,
            required_equipment_types,
        })
    }

    // --- TestPoint ---
    async fn save_test_point(&self, point: &TestPoint) -> AppResult<()> {
        let active_model: entities::test_point::ActiveModel = point.into();
        upsert_model!(self.db_conn.as_ref(), entities::test_point::Entity, active_model, point.id.clone(), "测试点");
        Ok(())
    }

    async fn save_test_points(&self, points: &[TestPoint]) -> AppResult<()> {
        for point in points {
            self.save_test_point(point).await?;
        }
        Ok(())
    }

    async fn load_test_point(&self, id: &str) -> AppResult<Option<TestPoint>> {
        let model = entities::test_point::Entity::find_by_id(id.to_string())
            .one(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载测试点失败: {}", e)))?;
        Ok(model.map(|m| (&m).into()))
    }

    async fn load_test_points_by_channel(&self, channel_id: &str) -> AppResult<Vec<TestPoint>> {
        let models = entities::test_point::Entity::find()
            .filter(entities::test_point::Column::ChannelId.eq(channel_id))
            .order_by_asc(entities::test_point::Column::NominalInjectionValue)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载通道测试点失败: {}", e)))?;
        Ok(models.iter().map(|m| m.into()).collect())
    }

    async fn delete_test_point(&self, id: &str) -> AppResult<()> {
        delete_by_id_or_not_found!(self.db_conn.as_ref(), entities::test_point::Entity, id, "TestPoint")
    }

    async fn delete_test_points_by_channel(&self, channel_id: &str) -> AppResult<u64> {
        let result = entities::test_point::Entity::delete_many()
            .filter(entities::test_point::Column::ChannelId.eq(channel_id))
            .exec(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("删除通道测试点失败: {}", e)))?;
        Ok(result.rows_affected)
    }

    // --- Company / User ---
    async fn save_company(&self, company: &Company) -> AppResult<()> {
        let active_model: entities::company::ActiveModel = company.into();
        upsert_model!(self.db_conn.as_ref(), entities::company::Entity, active_model, company.id.clone(), "公司");
        Ok(())
    }

    async fn load_company(&self, id: &str) -> AppResult<Option<Company>> {
        let model = entities::company::Entity::find_by_id(id.to_string())
            .one(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载公司失败: {}", e)))?;
        Ok(model.map(|m| (&m).into()))
    }

    async fn load_all_companies(&self) -> AppResult<Vec<Company>> {
        let models = entities::company::Entity::find()
            .order_by_asc(entities::company::Column::Name)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载所有公司失败: {}", e)))?;
        Ok(models.iter().map(|m| m.into()).collect())
    }

    async fn save_user(&self, user: &User) -> AppResult<()> {
        let active_model: entities::user::ActiveModel = user.into();
        upsert_model!(self.db_conn.as_ref(), entities::user::Entity, active_model, user.id.clone(), "用户");
        Ok(())
    }

    async fn load_user(&self, id: &str) -> AppResult<Option<User>> {
        let model = entities::user::Entity::find_by_id(id.to_string())
            .one(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载用户失败: {}", e)))?;
        Ok(model.map(|m| (&m).into()))
    }

    async fn load_users_by_company(&self, company_id: &str) -> AppResult<Vec<User>> {
        let models = entities::user::Entity::find()
            .filter(entities::user::Column::CompanyId.eq(company_id))
            .order_by_asc(entities::user::Column::LastName)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载公司员工失败: {}", e)))?;
        Ok(models.iter().map(|m| m.into()).collect())
    }

    // --- Test equipment ---
    async fn save_test_equipment_type(&self, equipment_type: &TestEquipmentType) -> AppResult<()> {
        let active_model: entities::test_equipment_type::ActiveModel = equipment_type.into();
        upsert_model!(
            self.db_conn.as_ref(),
            entities::test_equipment_type::Entity,
            active_model,
            equipment_type.id.clone(),
            "设备类型"
        );
        Ok(())
    }

    async fn load_test_equipment_type(&self, id: &str) -> AppResult<Option<TestEquipmentType>> {
        let model = entities::test_equipment_type::Entity::find_by_id(id.to_string())
            .one(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载设备类型失败: {}", e)))?;
        Ok(model.map(|m| (&m).into()))
    }

    async fn load_all_test_equipment_types(&self) -> AppResult<Vec<TestEquipmentType>> {
        let models = entities::test_equipment_type::Entity::find()
            .order_by_asc(entities::test_equipment_type::Column::Name)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载所有设备类型失败: {}", e)))?;
        Ok(models.iter().map(|m| m.into()).collect())
    }

    async fn save_test_equipment(&self, equipment: &TestEquipment) -> AppResult<()> {
        let active_model: entities::test_equipment::ActiveModel = equipment.into();
        upsert_model!(
            self.db_conn.as_ref(),
            entities::test_equipment::Entity,
            active_model,
            equipment.id.clone(),
            "测试设备"
        );
        Ok(())
    }

    async fn load_test_equipment(&self, id: &str) -> AppResult<Option<TestEquipment>> {
        let model = entities::test_equipment::Entity::find_by_id(id.to_string())
            .one(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载测试设备失败: {}", e)))?;
        match model {
            Some(m) => Ok(Some(self.with_calibration_records(&m).await?)),
            None => Ok(None),
        }
    }

    async fn load_test_equipment_by_type(&self, equipment_type_id: &str) -> AppResult<Vec<TestEquipment>> {
        let models = entities::test_equipment::Entity::find()
            .filter(entities::test_equipment::Column::TestEquipmentTypeId.eq(equipment_type_id))
            .order_by_asc(entities::test_equipment::Column::Name)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载类型设备失败: {}", e)))?;

        let mut equipment = Vec::with_capacity(models.len());
        for model in &models {
            equipment.push(self.with_calibration_records(model).await?);
        }
        Ok(equipment)
    }

    async fn save_calibration_record(&self, record: &CalibrationRecord) -> AppResult<()> {
        let active_model: entities::calibration_record::ActiveModel = record.into();
        upsert_model!(
            self.db_conn.as_ref(),
            entities::calibration_record::Entity,
            active_model,
            record.id.clone(),
            "校准记录"
        );
        Ok(())
    }

    async fn delete_calibration_record(&self, id: &str) -> AppResult<()> {
        delete_by_id_or_not_found!(self.db_conn.as_ref(), entities::calibration_record::Entity, id, "CalibrationRecord")
    }

    // --- Channel equipment records ---
    async fn insert_channel_equipment_record(&self, record: &ChannelEquipmentRecord) -> AppResult<()> {
        let active_model: entities::channel_equipment_record::ActiveModel = record.into();
        entities::channel_equipment_record::Entity::insert(active_model)
            .exec(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("写入设备使用记录失败: {}", e)))?;
        Ok(())
    }

    async fn load_channel_equipment_records(&self, channel_id: &str) -> AppResult<Vec<ChannelEquipmentRecord>> {
        let models = entities::channel_equipment_record::Entity::find()
            .filter(entities::channel_equipment_record::Column::ChannelId.eq(channel_id))
            .order_by_asc(entities::channel_equipment_record::Column::Timestamp)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载设备使用记录失败: {}", e)))?;
        Ok(models.iter().map(|m| m.into()).collect())
    }

    async fn delete_channel_equipment_records(&self, channel_id: &str) -> AppResult<u64> {
        let result = entities::channel_equipment_record::Entity::delete_many()
            .filter(entities::channel_equipment_record::Column::ChannelId.eq(channel_id))
            .exec(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("删除设备使用记录失败: {}", e)))?;
        Ok(result.rows_affected)
    }

    // --- Approval records ---
    async fn insert_approval_record(&self, record: &ApprovalRecord) -> AppResult<bool> {
        let active_model: entities::approval_record::ActiveModel = record.into();
        // 唯一索引冲突时不写入，并发审批也只会留下一条
        let inserted = entities::approval_record::Entity::insert(active_model)
            .on_conflict(
                OnConflict::columns([
                    entities::approval_record::Column::ChannelId,
                    entities::approval_record::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("写入审批记录失败: {}", e)))?;
        Ok(inserted > 0)
    }

    async fn load_approval_records(&self, channel_id: &str) -> AppResult<Vec<ApprovalRecord>> {
        let models = entities::approval_record::Entity::find()
            .filter(entities::approval_record::Column::ChannelId.eq(channel_id))
            .order_by_asc(entities::approval_record::Column::Timestamp)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载审批记录失败: {}", e)))?;
        Ok(models.iter().map(|m| m.into()).collect())
    }

    async fn delete_approval_record(&self, channel_id: &str, user_id: &str) -> AppResult<bool> {
        let result = entities::approval_record::Entity::delete_many()
            .filter(entities::approval_record::Column::ChannelId.eq(channel_id))
            .filter(entities::approval_record::Column::UserId.eq(user_id))
            .exec(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("删除审批记录失败: {}", e)))?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_approval_records(&self, channel_id: &str) -> AppResult<u64> {
        let result = entities::approval_record::Entity::delete_many()
            .filter(entities::approval_record::Column::ChannelId.eq(channel_id))
            .exec(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("删除通道审批记录失败: {}", e)))?;
        Ok(result.rows_affected)
    }

    // --- Associations ---
    async fn add_association(&self, kind: AssociationKind, owner_id: &str, member_id: &str) -> AppResult<bool> {
        let key = (kind.to_string(), owner_id.to_string(), member_id.to_string());
        let existing = entities::association::Entity::find_by_id(key)
            .one(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("查询关联失败: {}", e)))?;
        if existing.is_some() {
            return Ok(false);
        }

        let active_model = entities::association::ActiveModel::link(kind, owner_id, member_id);
        entities::association::Entity::insert(active_model)
            .exec(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("写入关联失败: {}", e)))?;
        Ok(true)
    }

    async fn remove_association(&self, kind: AssociationKind, owner_id: &str, member_id: &str) -> AppResult<bool> {
        let key = (kind.to_string(), owner_id.to_string(), member_id.to_string());
        let result = entities::association::Entity::delete_by_id(key)
            .exec(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("删除关联失败: {}", e)))?;
        Ok(result.rows_affected > 0)
    }

    async fn load_association_members(&self, kind: AssociationKind, owner_id: &str) -> AppResult<HashSet<String>> {
        let models = entities::association::Entity::find()
            .filter(entities::association::Column::Kind.eq(kind.to_string()))
            .filter(entities::association::Column::OwnerId.eq(owner_id))
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载关联失败: {}", e)))?;
        Ok(models.into_iter().map(|m| m.member_id).collect())
    }

    async fn replace_associations(
        &self,
        kind: AssociationKind,
        owner_id: &str,
        member_ids: &HashSet<String>,
    ) -> AppResult<(usize, usize)> {
        let current = self.load_association_members(kind, owner_id).await?;

        let mut added = 0;
        for member_id in member_ids.difference(&current) {
            if self.add_association(kind, owner_id, member_id).await? {
                added += 1;
            }
        }

        let mut removed = 0;
        for member_id in current.difference(member_ids) {
            if self.remove_association(kind, owner_id, member_id).await? {
                removed += 1;
            }
        }

        log::debug!(
            "[PERSISTENCE] {} {} 关联更新: +{} -{} ({})",
            kind,
            owner_id,
            added,
            removed,
            Utc::now().to_rfc3339()
        );
        Ok((added, removed))
    }
}
