// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用辅助函数
// ==========================================
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;

use qc_inspection::api::{ApiError, ChecklistApi, FailureKind, ReportApi};
use qc_inspection::app::AppState;
use qc_inspection::db::open_sqlite_connection;
use qc_inspection::domain::{CatalogParameter, Checklist};
use qc_inspection::repository::{ChecklistRepository, ParameterCatalog, RepositoryError};

use crate::test_helpers::{create_test_db, new_checklist, test_ts};

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 包含完整组装的 AppState 与临时数据库
pub struct ApiTestEnv {
    pub db_path: String,
    pub state: AppState,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建新的测试环境
    pub fn new() -> Self {
        qc_inspection::logging::init_test();
        let (temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
        let state = AppState::new(&db_path).expect("初始化AppState失败");
        Self {
            db_path,
            state,
            _temp_file: temp_file,
        }
    }

    /// 在同一数据库上再组装一个独立的 AppState（独立连接）
    pub fn another_state(&self) -> AppState {
        AppState::new(&self.db_path).expect("初始化AppState失败")
    }

    pub fn checklist_api(&self) -> &Arc<ChecklistApi> {
        &self.state.checklist_api
    }

    pub fn report_api(&self) -> &Arc<ReportApi> {
        &self.state.report_api
    }

    /// 在测试日期 08:00 创建一张点检表
    pub fn create_checklist(&self, fg_code: &str) -> Checklist {
        self.state
            .checklist_api
            .create_checklist_at(new_checklist(fg_code), "tester", test_ts(8, 0))
            .expect("创建点检表失败")
    }

    /// 写入参数目录，返回带ID的参数
    pub fn seed_parameters(&self, params: Vec<CatalogParameter>) -> Vec<CatalogParameter> {
        params
            .into_iter()
            .map(|mut p| {
                p.id = self.state.parameter_repo.insert(&p).expect("写入参数失败");
                p
            })
            .collect()
    }

    /// 直接写入指定编码的点检表（绕过分配器）
    pub fn insert_with_code(&self, code: &str) -> Checklist {
        let conn = open_sqlite_connection(&self.db_path).expect("打开数据库失败");
        let repo = ChecklistRepository::new(Arc::new(Mutex::new(conn)));
        let code = code.to_string();
        repo.insert_with_allocated_code::<RepositoryError, _>(|_| {
            Ok(Some(new_checklist("FG-SEED").into_checklist(code, test_ts(7, 0), None)))
        })
        .expect("写入点检表失败")
        .expect("写入点检表被回滚")
    }

    /// 当前目录中 FG 的可见参数
    pub fn visible_parameters(&self, fg_code: &str) -> Vec<CatalogParameter> {
        self.state
            .parameter_repo
            .parameters_for(fg_code)
            .expect("查询参数失败")
    }
}

/// 断言错误分类
pub fn assert_kind<T: std::fmt::Debug>(result: Result<T, ApiError>, expected: FailureKind) {
    match result {
        Ok(v) => panic!("期望 {:?}，实际成功: {:?}", expected, v),
        Err(e) => assert_eq!(e.kind(), expected, "错误: {}", e),
    }
}
