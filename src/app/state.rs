// ==========================================
// 质检点检表管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接、仓储和API实例
// 说明: 每个 AppState 持有一个 SQLite 连接；多进程/多实例并发由 SQLite 锁协调
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ChecklistApi, ReportApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, warn_if_schema_mismatch};
use crate::engine::code_allocator::{AllocationPolicy, CodeAllocator};
use crate::repository::{
    ActionLogRepository, ChecklistRepository, InspectionRepository, ParameterRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 点检表API
    pub checklist_api: Arc<ChecklistApi>,

    /// 报表API
    pub report_api: Arc<ReportApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 参数目录仓储（主数据同步用）
    pub parameter_repo: Arc<ParameterRepository>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开连接并建表（幂等）
    /// 2. 初始化所有Repository
    /// 3. 按配置创建编码分配器
    /// 4. 创建所有API实例
    pub fn new(db_path: &str) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        warn_if_schema_mismatch(&conn);
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let checklist_repo = Arc::new(ChecklistRepository::new(conn.clone()));
        let inspection_repo = Arc::new(InspectionRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let parameter_repo = Arc::new(ParameterRepository::new(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let policy = AllocationPolicy {
            max_attempts: config_manager
                .get_allocation_max_attempts()
                .map_err(|e| format!("读取编码分配配置失败: {}", e))?,
            backoff: config_manager
                .get_allocation_backoff()
                .map_err(|e| format!("读取编码分配配置失败: {}", e))?,
        };
        tracing::debug!(
            max_attempts = policy.max_attempts,
            backoff_ms = policy.backoff.as_millis() as u64,
            "编码分配策略"
        );
        let allocator = Arc::new(CodeAllocator::new(policy));

        // ==========================================
        // 初始化API层
        // ==========================================
        let checklist_api = Arc::new(ChecklistApi::new(
            checklist_repo,
            inspection_repo.clone(),
            action_log_repo.clone(),
            allocator,
        ));
        let report_api = Arc::new(ReportApi::new(
            inspection_repo,
            parameter_repo.clone(),
            config_manager.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path: db_path.to_string(),
            checklist_api,
            report_api,
            config_manager,
            parameter_repo,
            action_log_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 QC_INSPECTION_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("QC_INSPECTION_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./qc_inspection.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("qc-inspection");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("qc_inspection.db");
        }
    }

    path.to_string_lossy().to_string()
}
